//! In-memory page service for tests

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;

use crate::errors::DeployError;
use crate::models::page::{Page, PublishedUpdate};
use crate::pages::PageService;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[derive(Default)]
struct PageState {
    pages: HashMap<String, Page>,
    updates: Vec<(String, PublishedUpdate)>,
}

/// Page service over a fixed in-memory page set, recording write-backs
#[derive(Default)]
pub struct MemoryPageService {
    state: Mutex<PageState>,
}

impl MemoryPageService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_page(&self, page: Page) {
        lock(&self.state).pages.insert(page.id.clone(), page);
    }

    /// Published write-backs received so far, in order
    pub fn updates(&self) -> Vec<(String, PublishedUpdate)> {
        lock(&self.state).updates.clone()
    }
}

#[async_trait]
impl PageService for MemoryPageService {
    async fn fetch_page(&self, page_id: &str) -> Result<Page, DeployError> {
        lock(&self.state)
            .pages
            .get(page_id)
            .cloned()
            .ok_or_else(|| DeployError::NotFound(format!("page not found: {}", page_id)))
    }

    async fn set_published(
        &self,
        page_id: &str,
        update: &PublishedUpdate,
    ) -> Result<(), DeployError> {
        lock(&self.state)
            .updates
            .push((page_id.to_string(), update.clone()));
        Ok(())
    }
}
