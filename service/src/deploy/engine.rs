//! Deployment orchestration.
//!
//! One engine per process sequences every deploy: resolve content, publish
//! to storage, find or create the distribution, configure DNS, purge the
//! edge cache, then record the outcome and write the published state back
//! to the page. Progress is persisted after each step so a failed run
//! leaves behind exactly the partial state that makes the retry idempotent.

use std::sync::Arc;

use chrono::Utc;
use tracing::{info, warn};

use crate::deploy::content::ContentResolver;
use crate::deploy::distribution::DistributionResolver;
use crate::deploy::dns::DnsConfigurator;
use crate::deploy::fsm::{self, DeployEvent};
use crate::deploy::invalidation::CacheInvalidator;
use crate::deploy::locks::PageLocks;
use crate::deploy::publisher::StoragePublisher;
use crate::errors::DeployError;
use crate::models::deployment::{
    DeployOutcome, DeployRequest, Deployment, DeploymentInfo, DeploymentSummary,
};
use crate::models::page::{Page, PublishedUpdate};
use crate::pages::PageService;
use crate::providers::{CdnService, DistributionRequest, DnsService, InvalidationInfo, ObjectStore};
use crate::store::deployments::DeploymentStore;
use crate::store::settings::{PublishSettings, Settings};

pub struct DeployEngine {
    pages: Arc<dyn PageService>,
    cdn: Arc<dyn CdnService>,
    store: DeploymentStore,
    locks: PageLocks,
    content: ContentResolver,
    publisher: StoragePublisher,
    resolver: DistributionResolver,
    dns: DnsConfigurator,
    invalidator: CacheInvalidator,
    publish: PublishSettings,
}

impl DeployEngine {
    pub fn new(
        settings: &Settings,
        store: DeploymentStore,
        object_store: Arc<dyn ObjectStore>,
        cdn: Arc<dyn CdnService>,
        dns: Arc<dyn DnsService>,
        pages: Arc<dyn PageService>,
    ) -> Self {
        let publish = settings.publish.clone();
        Self {
            content: ContentResolver::new(
                object_store.clone(),
                publish.bucket.clone(),
                settings.forms.api_origin.clone(),
            ),
            publisher: StoragePublisher::new(object_store, publish.bucket.clone()),
            resolver: DistributionResolver::new(
                cdn.clone(),
                publish.wildcard_distribution_id.clone(),
            ),
            dns: DnsConfigurator::new(
                dns,
                publish.hosted_zone_id.clone(),
                publish.base_domain.clone(),
                publish.wildcard_dns,
            ),
            invalidator: CacheInvalidator::new(cdn.clone()),
            cdn,
            pages,
            store,
            locks: PageLocks::new(),
            publish,
        }
    }

    /// Run a full deploy for a page
    pub async fn deploy(
        &self,
        page_id: &str,
        request: DeployRequest,
    ) -> Result<DeployOutcome, DeployError> {
        let _guard = self.locks.try_acquire(page_id)?;

        // A page that does not exist never gets a record
        let page = self.pages.fetch_page(page_id).await?;

        let mut record = match self.store.load(page_id).await? {
            Some(record) => record,
            None => Deployment::new(page_id, &page.owner_id),
        };
        record.owner_id = page.owner_id.clone();

        apply_domain_selection(&mut record, &request);
        self.resolve_auto_subdomain(&page, &mut record);

        record.status = fsm::transition(record.status, DeployEvent::Deploy)?;
        record.log_info("Preparing HTML");
        self.store.save(&mut record).await?;

        info!(
            "Deploying page {} (custom_domain: {:?}, subdomain: {:?})",
            page_id, record.custom_domain, record.subdomain
        );

        match self.run_steps(&page, &mut record).await {
            Ok(()) => {
                record.status = fsm::transition(record.status, DeployEvent::DeploySucceeded)?;
                record.deploy_count += 1;
                record.last_error = None;
                self.store.save(&mut record).await?;
                info!("Deploy for page {} complete: {:?}", page_id, record.public_url);
                Ok(record.outcome())
            }
            Err(err) => {
                record.status = fsm::transition(record.status, DeployEvent::DeployFailed)?;
                record.error_count += 1;
                record.last_error = Some(err.to_string());
                record.log_error(err.to_string());
                self.store.save(&mut record).await?;
                warn!("Deploy for page {} failed: {}", page_id, err);
                Err(err)
            }
        }
    }

    /// Steps 2 through 8 of a deploy. Errors propagate uncaught; the
    /// caller converts them into the failed state.
    async fn run_steps(&self, page: &Page, record: &mut Deployment) -> Result<(), DeployError> {
        // Resolve the document
        let document = self.content.resolve(page).await;
        record.build_time_ms = Some(document.build_time_ms);
        record.build_size_bytes = Some(document.build_size_bytes);
        record.document_digest = Some(document.digest.clone());
        if document.from_artifact {
            record.log_info(format!(
                "Using prebuilt artifact ({} bytes)",
                document.build_size_bytes
            ));
        } else {
            record.log_info(format!(
                "Generated document ({} bytes)",
                document.build_size_bytes
            ));
        }
        self.store.save(record).await?;

        // Publish to storage
        let target_path = storage_path(page, record).to_string();
        let published = self.publisher.publish(&target_path, &document.html).await?;
        record.bucket = Some(published.bucket.clone());
        record.object_key = Some(published.object_key.clone());
        record.storage_url = Some(published.url.clone());
        record.log_info(format!("Uploaded {}", published.object_key));
        self.store.save(record).await?;

        // The hostname the page should be reachable on, if any
        let hostname = final_hostname(record, self.publish.base_domain.as_deref());

        // Find or create the distribution
        let distribution = match self.resolver.resolve(&published.website_endpoint).await? {
            Some(existing) => {
                record.log_info(format!("Using distribution {}", existing.id));
                existing
            }
            None => {
                if hostname.is_some() && self.publish.certificate_arn.is_none() {
                    return Err(DeployError::ConfigError(
                        "publish.certificate_arn must be configured to attach a custom hostname"
                            .to_string(),
                    ));
                }
                let request = DistributionRequest {
                    origin_domain: published.website_endpoint.clone(),
                    alias: hostname.clone(),
                    certificate_arn: if hostname.is_some() {
                        self.publish.certificate_arn.clone()
                    } else {
                        None
                    },
                    comment: format!("pagepilot page {}", page.id),
                    default_ttl_secs: self.publish.default_ttl_secs,
                    min_ttl_secs: self.publish.min_ttl_secs,
                    max_ttl_secs: self.publish.max_ttl_secs,
                };
                let created = self.cdn.create_distribution(&request).await?;
                if hostname.is_some() {
                    record.certificate_arn = self.publish.certificate_arn.clone();
                }
                record.log_info(format!("Created distribution {}", created.id));
                created
            }
        };
        record.distribution_id = Some(distribution.id.clone());
        record.distribution_hostname = Some(distribution.domain_name.clone());
        self.store.save(record).await?;

        // DNS, when a hostname is in play
        if let Some(hostname) = &hostname {
            let outcome = self
                .dns
                .ensure_alias(hostname, &distribution.domain_name)
                .await?;
            if outcome.skipped {
                record.log_info(format!("Wildcard DNS covers {}", hostname));
            } else {
                record.hosted_zone_id = outcome.hosted_zone_id.clone();
                record.log_info(format!(
                    "DNS alias {} -> {}",
                    hostname, distribution.domain_name
                ));
            }
            self.store.save(record).await?;
        }

        // Purge the edge cache
        let invalidation = self.invalidator.invalidate_all(&distribution.id).await?;
        record.log_info(format!(
            "Cache invalidation {} ({})",
            invalidation.id, invalidation.status
        ));
        self.store.save(record).await?;

        // Record the outcome and tell the backend
        record.last_deployed_at = Some(Utc::now());
        record.public_url = record.compute_public_url(self.publish.base_domain.as_deref());
        let update = PublishedUpdate {
            published: true,
            published_url: record.public_url.clone(),
            distribution_hostname: record.distribution_hostname.clone(),
            published_at: Utc::now(),
        };
        self.pages.set_published(&page.id, &update).await?;
        record.log_info(match &record.public_url {
            Some(url) => format!("Deploy complete: {}", url),
            None => "Deploy complete".to_string(),
        });

        Ok(())
    }

    /// Read-only projection of a deployment
    pub async fn get_info(&self, page_id: &str) -> Result<DeploymentInfo, DeployError> {
        let record = self.load_record(page_id).await?;
        Ok(record.info())
    }

    /// Summaries of every persisted deployment
    pub async fn list(&self) -> Result<Vec<DeploymentSummary>, DeployError> {
        let records = self.store.list().await?;
        Ok(records.iter().map(|record| record.summary()).collect())
    }

    /// Purge the edge cache for a deployed page
    pub async fn invalidate(&self, page_id: &str) -> Result<InvalidationInfo, DeployError> {
        let _guard = self.locks.try_acquire(page_id)?;

        let mut record = self.load_record(page_id).await?;
        let distribution_id = record.distribution_id.clone().ok_or_else(|| {
            DeployError::StateError(format!("page {} has no distribution to invalidate", page_id))
        })?;

        let invalidation = self.invalidator.invalidate_all(&distribution_id).await?;
        record.log_info(format!(
            "Cache invalidation {} ({})",
            invalidation.id, invalidation.status
        ));
        self.store.save(&mut record).await?;

        Ok(invalidation)
    }

    /// Remove a deployment: best-effort disable of its distribution, then
    /// delete the record and clear the page's published flag. Storage
    /// objects and DNS records are left in place.
    pub async fn teardown(&self, page_id: &str) -> Result<(), DeployError> {
        let _guard = self.locks.try_acquire(page_id)?;

        let record = self.load_record(page_id).await?;

        if let Some(distribution_id) = &record.distribution_id {
            match self.cdn.get_distribution(distribution_id).await {
                Ok(Some(distribution)) if distribution.enabled => {
                    if let Err(err) = self.cdn.disable_distribution(distribution_id).await {
                        warn!("Disabling distribution {} failed: {}", distribution_id, err);
                    }
                }
                Ok(_) => {}
                Err(err) => {
                    warn!("Looking up distribution {} failed: {}", distribution_id, err);
                }
            }
        }

        self.store.delete(page_id).await?;
        info!("Deployment for page {} removed", page_id);

        let update = PublishedUpdate {
            published: false,
            published_url: None,
            distribution_hostname: None,
            published_at: Utc::now(),
        };
        if let Err(err) = self.pages.set_published(page_id, &update).await {
            warn!("Unpublish write-back for page {} failed: {}", page_id, err);
        }

        Ok(())
    }

    fn resolve_auto_subdomain(&self, page: &Page, record: &mut Deployment) {
        if !self.publish.auto_subdomain || self.publish.base_domain.is_none() {
            return;
        }
        if record.subdomain.is_some() || record.custom_domain.is_some() {
            return;
        }
        let derived = derive_subdomain(page);
        record.log_info(format!("Assigned subdomain {}", derived));
        record.subdomain = Some(derived);
    }

    async fn load_record(&self, page_id: &str) -> Result<Deployment, DeployError> {
        self.store.load(page_id).await?.ok_or_else(|| {
            DeployError::NotFound(format!("no deployment for page {}", page_id))
        })
    }
}

/// Merge requested domains into the record. Provided values overwrite,
/// absent values keep the record's current selection, and a provided
/// empty string clears a previous value.
fn apply_domain_selection(record: &mut Deployment, request: &DeployRequest) {
    if let Some(domain) = &request.custom_domain {
        record.custom_domain = normalize_hostname(domain);
    }
    if let Some(subdomain) = &request.subdomain {
        record.subdomain = normalize_hostname(subdomain);
    }
    record.use_custom_domain = record.custom_domain.is_some();
}

/// Lowercase, trimmed, without a trailing dot. Empty becomes `None`.
fn normalize_hostname(raw: &str) -> Option<String> {
    let hostname = raw.trim().trim_end_matches('.').to_lowercase();
    if hostname.is_empty() {
        None
    } else {
        Some(hostname)
    }
}

/// Storage namespace for the page: its subdomain when one is set, else
/// the raw page id
fn storage_path<'a>(page: &'a Page, record: &'a Deployment) -> &'a str {
    record.subdomain.as_deref().unwrap_or(&page.id)
}

/// Hostname the page should answer on: the custom domain when selected,
/// else the subdomain under the base domain, else none
fn final_hostname(record: &Deployment, base_domain: Option<&str>) -> Option<String> {
    if record.use_custom_domain {
        if let Some(domain) = &record.custom_domain {
            return Some(domain.clone());
        }
    }
    match (&record.subdomain, base_domain) {
        (Some(subdomain), Some(base)) => Some(format!("{}.{}", subdomain, base)),
        _ => None,
    }
}

/// Slug when the page has one, else the first 8 characters of its id
fn derive_subdomain(page: &Page) -> String {
    match page.slug.as_deref() {
        Some(slug) if !slug.trim().is_empty() => slug.trim().to_lowercase(),
        _ => page.id.chars().take(8).collect::<String>().to_lowercase(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn page(id: &str, slug: Option<&str>) -> Page {
        Page {
            id: id.to_string(),
            owner_id: "owner-1".to_string(),
            slug: slug.map(String::from),
            title: None,
            artifact_key: None,
            content: json!({}),
        }
    }

    #[test]
    fn test_domain_merge_overwrites_and_keeps() {
        let mut record = Deployment::new("page-1", "owner-1");
        apply_domain_selection(
            &mut record,
            &DeployRequest {
                custom_domain: Some("Promo.Example.Com.".to_string()),
                subdomain: None,
            },
        );
        assert_eq!(record.custom_domain.as_deref(), Some("promo.example.com"));
        assert!(record.use_custom_domain);

        // A bare re-deploy keeps the previous selection
        apply_domain_selection(&mut record, &DeployRequest::default());
        assert_eq!(record.custom_domain.as_deref(), Some("promo.example.com"));
        assert!(record.use_custom_domain);
    }

    #[test]
    fn test_domain_merge_empty_string_clears() {
        let mut record = Deployment::new("page-1", "owner-1");
        record.custom_domain = Some("promo.example.com".to_string());
        record.use_custom_domain = true;

        apply_domain_selection(
            &mut record,
            &DeployRequest {
                custom_domain: Some("  ".to_string()),
                subdomain: None,
            },
        );
        assert!(record.custom_domain.is_none());
        assert!(!record.use_custom_domain);
    }

    #[test]
    fn test_storage_path_prefers_subdomain() {
        let page = page("page-1", None);
        let mut record = Deployment::new("page-1", "owner-1");
        assert_eq!(storage_path(&page, &record), "page-1");

        record.subdomain = Some("launch".to_string());
        assert_eq!(storage_path(&page, &record), "launch");
    }

    #[test]
    fn test_final_hostname_priority() {
        let mut record = Deployment::new("page-1", "owner-1");
        assert_eq!(final_hostname(&record, Some("pages.example.com")), None);

        record.subdomain = Some("launch".to_string());
        assert_eq!(
            final_hostname(&record, Some("pages.example.com")).as_deref(),
            Some("launch.pages.example.com")
        );
        // No base domain, no hostname to form
        assert_eq!(final_hostname(&record, None), None);

        record.custom_domain = Some("promo.example.org".to_string());
        record.use_custom_domain = true;
        assert_eq!(
            final_hostname(&record, Some("pages.example.com")).as_deref(),
            Some("promo.example.org")
        );
    }

    #[test]
    fn test_derive_subdomain_prefers_slug() {
        assert_eq!(derive_subdomain(&page("abcdef123456", Some("My-Launch"))), "my-launch");
        assert_eq!(derive_subdomain(&page("abcdef123456", None)), "abcdef12");
        assert_eq!(derive_subdomain(&page("abcdef123456", Some("  "))), "abcdef12");
    }
}
