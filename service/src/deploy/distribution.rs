//! Distribution resolution.
//!
//! Finding the distribution for a deploy is an ordered strategy chain: a
//! statically configured shared distribution wins over an origin-match
//! scan. Creation stays with the engine; resolution only ever returns
//! something that already exists.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use crate::errors::DeployError;
use crate::providers::{CdnService, DistributionInfo};

/// One way of locating an existing distribution for an origin
#[async_trait]
pub trait ResolveStrategy: Send + Sync {
    async fn resolve(
        &self,
        origin_domain: &str,
    ) -> Result<Option<DistributionInfo>, DeployError>;
}

/// Operator-provisioned shared distribution, taken on faith from
/// configuration. Used in wildcard topologies where one distribution
/// serves every page and none are created per page.
pub struct ConfiguredDistribution {
    cdn: Arc<dyn CdnService>,
    distribution_id: String,
}

#[async_trait]
impl ResolveStrategy for ConfiguredDistribution {
    async fn resolve(
        &self,
        _origin_domain: &str,
    ) -> Result<Option<DistributionInfo>, DeployError> {
        match self.cdn.get_distribution(&self.distribution_id).await? {
            Some(info) => Ok(Some(info)),
            // An id the operator configured but the CDN does not know is a
            // config problem, not a miss
            None => Err(DeployError::ConfigError(format!(
                "configured distribution {} does not exist",
                self.distribution_id
            ))),
        }
    }
}

/// Scan all distributions for one whose origin already points at the
/// bucket. This is the idempotency guard against creating duplicates on
/// retry.
pub struct OriginScan {
    cdn: Arc<dyn CdnService>,
}

#[async_trait]
impl ResolveStrategy for OriginScan {
    async fn resolve(
        &self,
        origin_domain: &str,
    ) -> Result<Option<DistributionInfo>, DeployError> {
        self.cdn.find_by_origin(origin_domain).await
    }
}

/// Ordered strategy chain; the first hit wins
pub struct DistributionResolver {
    strategies: Vec<Box<dyn ResolveStrategy>>,
}

impl DistributionResolver {
    pub fn new(cdn: Arc<dyn CdnService>, configured_id: Option<String>) -> Self {
        let mut strategies: Vec<Box<dyn ResolveStrategy>> = Vec::new();
        if let Some(distribution_id) = configured_id {
            strategies.push(Box::new(ConfiguredDistribution {
                cdn: cdn.clone(),
                distribution_id,
            }));
        }
        strategies.push(Box::new(OriginScan { cdn }));
        Self { strategies }
    }

    pub async fn resolve(
        &self,
        origin_domain: &str,
    ) -> Result<Option<DistributionInfo>, DeployError> {
        for strategy in &self.strategies {
            if let Some(info) = strategy.resolve(origin_domain).await? {
                debug!("Resolved distribution {} for origin {}", info.id, origin_domain);
                return Ok(Some(info));
            }
        }
        Ok(None)
    }
}
