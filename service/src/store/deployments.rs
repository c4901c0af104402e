//! File-backed deployment record store

use chrono::Utc;
use tracing::warn;

use crate::errors::DeployError;
use crate::filesys::dir::Dir;
use crate::filesys::file::File;
use crate::models::deployment::Deployment;

/// One JSON file per page id under the deployments directory
#[derive(Debug, Clone)]
pub struct DeploymentStore {
    dir: Dir,
}

impl DeploymentStore {
    pub fn new(dir: Dir) -> Self {
        Self { dir }
    }

    /// Load the record for a page, if one exists
    pub async fn load(&self, page_id: &str) -> Result<Option<Deployment>, DeployError> {
        let file = self.record_file(page_id)?;
        if !file.exists().await {
            return Ok(None);
        }
        let record = file.read_json::<Deployment>().await?;
        Ok(Some(record))
    }

    /// Persist the record atomically, bumping its updated_at
    pub async fn save(&self, record: &mut Deployment) -> Result<(), DeployError> {
        record.updated_at = Utc::now();
        let file = self.record_file(&record.page_id)?;
        file.write_json_atomic(record).await
    }

    /// Remove the record for a page
    pub async fn delete(&self, page_id: &str) -> Result<(), DeployError> {
        let file = self.record_file(page_id)?;
        file.delete().await
    }

    /// Load every record. Unreadable files are skipped with a warning so one
    /// corrupt record does not take down the listing.
    pub async fn list(&self) -> Result<Vec<Deployment>, DeployError> {
        if !self.dir.exists().await {
            return Ok(Vec::new());
        }

        let mut records = Vec::new();
        for path in self.dir.list_files().await? {
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            match File::new(&path).read_json::<Deployment>().await {
                Ok(record) => records.push(record),
                Err(e) => {
                    warn!("Skipping unreadable deployment record {:?}: {}", path, e);
                }
            }
        }

        records.sort_by(|a, b| a.page_id.cmp(&b.page_id));
        Ok(records)
    }

    fn record_file(&self, page_id: &str) -> Result<File, DeployError> {
        if !is_valid_page_id(page_id) {
            return Err(DeployError::ConfigError(format!(
                "invalid page id: {:?}",
                page_id
            )));
        }
        Ok(self.dir.file(&format!("{}.json", page_id)))
    }
}

/// Page ids become file names; restrict them to a safe charset
pub fn is_valid_page_id(page_id: &str) -> bool {
    !page_id.is_empty()
        && page_id.len() <= 128
        && page_id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_store() -> (tempfile::TempDir, DeploymentStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = DeploymentStore::new(Dir::new(dir.path().join("deployments")));
        (dir, store)
    }

    #[tokio::test]
    async fn test_save_load_roundtrip() {
        let (_guard, store) = temp_store();

        let mut record = Deployment::new("page-1", "owner-1");
        record.log_info("first line");
        store.save(&mut record).await.unwrap();

        let loaded = store.load("page-1").await.unwrap().unwrap();
        assert_eq!(loaded.page_id, "page-1");
        assert_eq!(loaded.owner_id, "owner-1");
        assert_eq!(loaded.log.len(), 1);
    }

    #[tokio::test]
    async fn test_load_missing_returns_none() {
        let (_guard, store) = temp_store();
        assert!(store.load("nope").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_delete_removes_record() {
        let (_guard, store) = temp_store();

        let mut record = Deployment::new("page-1", "owner-1");
        store.save(&mut record).await.unwrap();
        store.delete("page-1").await.unwrap();

        assert!(store.load("page-1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_list_returns_all_records() {
        let (_guard, store) = temp_store();

        for id in ["page-b", "page-a", "page-c"] {
            let mut record = Deployment::new(id, "owner-1");
            store.save(&mut record).await.unwrap();
        }

        let records = store.list().await.unwrap();
        let ids: Vec<&str> = records.iter().map(|r| r.page_id.as_str()).collect();
        assert_eq!(ids, vec!["page-a", "page-b", "page-c"]);
    }

    #[tokio::test]
    async fn test_rejects_path_traversal_ids() {
        let (_guard, store) = temp_store();
        assert!(store.load("../evil").await.is_err());
        assert!(store.load("a/b").await.is_err());
        assert!(store.load("").await.is_err());
    }

    #[test]
    fn test_page_id_charset() {
        assert!(is_valid_page_id("abc-DEF_123"));
        assert!(!is_valid_page_id("a.b"));
        assert!(!is_valid_page_id("a b"));
    }
}
