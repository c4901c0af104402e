//! Per-page operation locks

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

use crate::errors::DeployError;

/// Hands out one in-process lock per page id.
///
/// Mutating operations hold their page's lock for the full call; a second
/// mutating request for the same page fails with `Conflict` instead of
/// waiting behind the first.
#[derive(Default)]
pub struct PageLocks {
    locks: Mutex<HashMap<String, Arc<AsyncMutex<()>>>>,
}

impl PageLocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn try_acquire(&self, page_id: &str) -> Result<OwnedMutexGuard<()>, DeployError> {
        let lock = {
            let mut locks = self
                .locks
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            locks.entry(page_id.to_string()).or_default().clone()
        };

        lock.try_lock_owned().map_err(|_| {
            DeployError::Conflict(format!(
                "another operation is in progress for page {}",
                page_id
            ))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_acquire_conflicts() {
        let locks = PageLocks::new();
        let _guard = locks.try_acquire("page-1").unwrap();

        let err = locks.try_acquire("page-1").unwrap_err();
        assert!(matches!(err, DeployError::Conflict(_)));
    }

    #[test]
    fn test_release_allows_reacquire() {
        let locks = PageLocks::new();
        let guard = locks.try_acquire("page-1").unwrap();
        drop(guard);

        assert!(locks.try_acquire("page-1").is_ok());
    }

    #[test]
    fn test_distinct_pages_do_not_interfere() {
        let locks = PageLocks::new();
        let _a = locks.try_acquire("page-a").unwrap();
        let _b = locks.try_acquire("page-b").unwrap();
    }
}
