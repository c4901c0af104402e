//! Content resolution.
//!
//! Prefers a prebuilt artifact from object storage; any fetch problem
//! falls back to synthesizing the document from the page content, so
//! resolution itself cannot fail a deploy.

use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, warn};

use crate::deploy::template;
use crate::models::page::Page;
use crate::providers::ObjectStore;
use crate::utils::sha256_hash;

/// The document a deploy will publish
pub struct ResolvedDocument {
    pub html: Vec<u8>,
    pub build_time_ms: u64,
    pub build_size_bytes: u64,
    pub digest: String,
    pub from_artifact: bool,
}

pub struct ContentResolver {
    store: Arc<dyn ObjectStore>,
    bucket: String,
    forms_api_origin: String,
}

impl ContentResolver {
    pub fn new(store: Arc<dyn ObjectStore>, bucket: String, forms_api_origin: String) -> Self {
        Self {
            store,
            bucket,
            forms_api_origin,
        }
    }

    pub async fn resolve(&self, page: &Page) -> ResolvedDocument {
        let started = Instant::now();

        if let Some(key) = &page.artifact_key {
            match self.store.get_object(&self.bucket, key).await {
                Ok(Some(body)) => {
                    debug!("Using prebuilt artifact {} ({} bytes)", key, body.len());
                    return ResolvedDocument {
                        digest: sha256_hash(&body),
                        build_size_bytes: body.len() as u64,
                        html: body,
                        build_time_ms: elapsed_ms(started),
                        from_artifact: true,
                    };
                }
                Ok(None) => {
                    warn!("Prebuilt artifact {} not found, generating document", key);
                }
                Err(err) => {
                    warn!(
                        "Prebuilt artifact {} fetch failed ({}), generating document",
                        key, err
                    );
                }
            }
        }

        let html = template::render_document(page, &self.forms_api_origin).into_bytes();
        ResolvedDocument {
            digest: sha256_hash(&html),
            build_size_bytes: html.len() as u64,
            html,
            build_time_ms: elapsed_ms(started),
            from_artifact: false,
        }
    }
}

fn elapsed_ms(started: Instant) -> u64 {
    started.elapsed().as_millis() as u64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::memory::MemoryObjectStore;
    use serde_json::json;

    fn page(artifact_key: Option<&str>) -> Page {
        Page {
            id: "page-1".to_string(),
            owner_id: "owner-1".to_string(),
            slug: None,
            title: None,
            artifact_key: artifact_key.map(String::from),
            content: json!({"headline": "Hi"}),
        }
    }

    fn resolver(store: Arc<MemoryObjectStore>) -> ContentResolver {
        ContentResolver::new(store, "sites".to_string(), "https://api.pagepilot.io".to_string())
    }

    #[tokio::test]
    async fn test_prefers_prebuilt_artifact() {
        let store = Arc::new(MemoryObjectStore::new());
        store.insert_object("sites", "artifacts/page-1.html", b"<html>built</html>", "text/html");

        let document = resolver(store).resolve(&page(Some("artifacts/page-1.html"))).await;
        assert!(document.from_artifact);
        assert_eq!(document.html, b"<html>built</html>");
        assert_eq!(document.build_size_bytes, 18);
        assert_eq!(document.digest.len(), 64);
    }

    #[tokio::test]
    async fn test_missing_artifact_falls_back_to_synthesis() {
        let store = Arc::new(MemoryObjectStore::new());

        let document = resolver(store).resolve(&page(Some("artifacts/nope.html"))).await;
        assert!(!document.from_artifact);
        let html = String::from_utf8(document.html).unwrap();
        assert!(html.contains("window.__PAGE_CONTENT__"));
    }

    #[tokio::test]
    async fn test_fetch_error_falls_back_to_synthesis() {
        let store = Arc::new(MemoryObjectStore::new());
        store.insert_object("sites", "artifacts/page-1.html", b"<html>built</html>", "text/html");
        store.fail_gets(true);

        let document = resolver(store).resolve(&page(Some("artifacts/page-1.html"))).await;
        assert!(!document.from_artifact);
    }

    #[tokio::test]
    async fn test_no_artifact_reference_synthesizes() {
        let store = Arc::new(MemoryObjectStore::new());

        let document = resolver(store).resolve(&page(None)).await;
        assert!(!document.from_artifact);
        assert_eq!(document.build_size_bytes, document.html.len() as u64);
    }
}
