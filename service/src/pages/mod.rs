//! Pages backend collaborator

pub mod http;
pub mod memory;

use async_trait::async_trait;

use crate::errors::DeployError;
use crate::models::page::{Page, PublishedUpdate};

/// Narrow view of the Pagepilot backend: read a page, write back its
/// published state
#[async_trait]
pub trait PageService: Send + Sync {
    /// Fetch a page by id; a missing page is a `NotFound` error
    async fn fetch_page(&self, page_id: &str) -> Result<Page, DeployError>;

    /// Record the publish outcome on the page
    async fn set_published(
        &self,
        page_id: &str,
        update: &PublishedUpdate,
    ) -> Result<(), DeployError>;
}
