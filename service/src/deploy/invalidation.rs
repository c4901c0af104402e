//! Edge cache invalidation

use std::sync::Arc;

use tracing::debug;

use crate::errors::DeployError;
use crate::providers::{CdnService, InvalidationInfo};

/// Paths purged on every invalidation. Partial purges are never issued.
const ALL_PATHS: &str = "/*";

pub struct CacheInvalidator {
    cdn: Arc<dyn CdnService>,
}

impl CacheInvalidator {
    pub fn new(cdn: Arc<dyn CdnService>) -> Self {
        Self { cdn }
    }

    pub async fn invalidate_all(
        &self,
        distribution_id: &str,
    ) -> Result<InvalidationInfo, DeployError> {
        debug!("Invalidating all paths on distribution {}", distribution_id);
        self.cdn
            .create_invalidation(distribution_id, &[ALL_PATHS.to_string()])
            .await
    }
}
