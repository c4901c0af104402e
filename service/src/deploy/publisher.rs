//! Storage publishing

use std::sync::Arc;

use tracing::{debug, info};

use crate::errors::DeployError;
use crate::providers::ObjectStore;

/// Content type every published document is served with
pub const DOCUMENT_CONTENT_TYPE: &str = "text/html";

/// Object-level cache lifetime. Kept short: the distribution is the real
/// cache boundary, and re-deploys must surface quickly once it is purged.
pub const DOCUMENT_CACHE_CONTROL: &str = "max-age=300";

/// Where a published document landed
#[derive(Debug, Clone)]
pub struct PublishedObject {
    pub bucket: String,
    pub object_key: String,
    pub url: String,

    /// Static-hosting hostname of the bucket, used as the CDN origin
    pub website_endpoint: String,
}

pub struct StoragePublisher {
    store: Arc<dyn ObjectStore>,
    bucket: String,
}

impl StoragePublisher {
    pub fn new(store: Arc<dyn ObjectStore>, bucket: String) -> Self {
        Self { store, bucket }
    }

    /// Write the document under `{target_path}/index.html`, creating the
    /// bucket on first use. Re-publishing the same path overwrites in place.
    pub async fn publish(
        &self,
        target_path: &str,
        document: &[u8],
    ) -> Result<PublishedObject, DeployError> {
        if !self.store.bucket_exists(&self.bucket).await? {
            info!("Creating site bucket {}", self.bucket);
            self.store.create_site_bucket(&self.bucket).await?;
        }

        let object_key = format!("{}/index.html", target_path);
        debug!("Uploading {} bytes to {}/{}", document.len(), self.bucket, object_key);

        self.store
            .put_object(
                &self.bucket,
                &object_key,
                document,
                DOCUMENT_CONTENT_TYPE,
                DOCUMENT_CACHE_CONTROL,
            )
            .await?;

        Ok(PublishedObject {
            bucket: self.bucket.clone(),
            url: self.store.object_url(&self.bucket, &object_key),
            website_endpoint: self.store.website_endpoint(&self.bucket),
            object_key,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::memory::MemoryObjectStore;

    #[tokio::test]
    async fn test_publish_creates_bucket_once() {
        let store = Arc::new(MemoryObjectStore::new());
        let publisher = StoragePublisher::new(store.clone(), "sites".to_string());

        publisher.publish("page-1", b"<html>").await.unwrap();
        publisher.publish("page-1", b"<html>v2").await.unwrap();

        assert_eq!(store.create_bucket_calls(), 1);
    }

    #[tokio::test]
    async fn test_publish_writes_index_under_path() {
        let store = Arc::new(MemoryObjectStore::new());
        let publisher = StoragePublisher::new(store.clone(), "sites".to_string());

        let published = publisher.publish("launch", b"<html>").await.unwrap();
        assert_eq!(published.object_key, "launch/index.html");
        assert_eq!(published.bucket, "sites");

        let object = store.object("sites", "launch/index.html").unwrap();
        assert_eq!(object.body, b"<html>");
        assert_eq!(object.content_type, "text/html");
        assert_eq!(object.cache_control, "max-age=300");
    }

    #[tokio::test]
    async fn test_republish_overwrites() {
        let store = Arc::new(MemoryObjectStore::new());
        let publisher = StoragePublisher::new(store.clone(), "sites".to_string());

        publisher.publish("page-1", b"v1").await.unwrap();
        publisher.publish("page-1", b"v2").await.unwrap();

        let object = store.object("sites", "page-1/index.html").unwrap();
        assert_eq!(object.body, b"v2");
    }
}
