//! DNS configuration for published hostnames

use std::sync::Arc;

use tracing::debug;

use crate::errors::DeployError;
use crate::providers::DnsService;

/// Result of ensuring a hostname resolves to the distribution
#[derive(Debug, Clone)]
pub struct DnsOutcome {
    pub hosted_zone_id: Option<String>,
    pub skipped: bool,
}

pub struct DnsConfigurator {
    dns: Arc<dyn DnsService>,
    hosted_zone_id: Option<String>,
    base_domain: Option<String>,
    wildcard_dns: bool,
}

impl DnsConfigurator {
    pub fn new(
        dns: Arc<dyn DnsService>,
        hosted_zone_id: Option<String>,
        base_domain: Option<String>,
        wildcard_dns: bool,
    ) -> Self {
        Self {
            dns,
            hosted_zone_id,
            base_domain,
            wildcard_dns,
        }
    }

    /// Whether an operator-provisioned `*.base_domain` record already
    /// resolves this hostname. Only first-level subdomains are covered.
    pub fn wildcard_covers(&self, hostname: &str) -> bool {
        if !self.wildcard_dns {
            return false;
        }
        let Some(base) = &self.base_domain else {
            return false;
        };
        let Some(label) = hostname.strip_suffix(&format!(".{}", base)) else {
            return false;
        };
        !label.is_empty() && !label.contains('.')
    }

    /// Point `hostname` at the distribution, unless wildcard DNS already
    /// covers it
    pub async fn ensure_alias(
        &self,
        hostname: &str,
        distribution_hostname: &str,
    ) -> Result<DnsOutcome, DeployError> {
        if self.wildcard_covers(hostname) {
            debug!("Wildcard DNS covers {}, skipping record", hostname);
            return Ok(DnsOutcome {
                hosted_zone_id: None,
                skipped: true,
            });
        }

        let zone = self.hosted_zone_id.as_ref().ok_or_else(|| {
            DeployError::ConfigError(
                "publish.hosted_zone_id must be configured to create DNS records".to_string(),
            )
        })?;

        self.dns
            .upsert_alias(zone, hostname, distribution_hostname)
            .await?;

        Ok(DnsOutcome {
            hosted_zone_id: Some(zone.clone()),
            skipped: false,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::memory::MemoryDns;

    fn configurator(
        dns: Arc<MemoryDns>,
        zone: Option<&str>,
        base: Option<&str>,
        wildcard: bool,
    ) -> DnsConfigurator {
        DnsConfigurator::new(
            dns,
            zone.map(String::from),
            base.map(String::from),
            wildcard,
        )
    }

    #[test]
    fn test_wildcard_covers_first_level_only() {
        let dns = Arc::new(MemoryDns::new());
        let configurator = configurator(dns, None, Some("pages.example.com"), true);

        assert!(configurator.wildcard_covers("launch.pages.example.com"));
        assert!(!configurator.wildcard_covers("a.b.pages.example.com"));
        assert!(!configurator.wildcard_covers("pages.example.com"));
        assert!(!configurator.wildcard_covers("elsewhere.example.com"));
    }

    #[test]
    fn test_wildcard_off_covers_nothing() {
        let dns = Arc::new(MemoryDns::new());
        let configurator = configurator(dns, None, Some("pages.example.com"), false);

        assert!(!configurator.wildcard_covers("launch.pages.example.com"));
    }

    #[tokio::test]
    async fn test_covered_hostname_skips_upsert() {
        let dns = Arc::new(MemoryDns::new());
        let configurator =
            configurator(dns.clone(), Some("Z123"), Some("pages.example.com"), true);

        let outcome = configurator
            .ensure_alias("launch.pages.example.com", "d1.cloudfront.test")
            .await
            .unwrap();

        assert!(outcome.skipped);
        assert_eq!(dns.upsert_calls(), 0);
    }

    #[tokio::test]
    async fn test_uncovered_hostname_upserts_record() {
        let dns = Arc::new(MemoryDns::new());
        let configurator =
            configurator(dns.clone(), Some("Z123"), Some("pages.example.com"), true);

        let outcome = configurator
            .ensure_alias("promo.example.org", "d1.cloudfront.test")
            .await
            .unwrap();

        assert!(!outcome.skipped);
        assert_eq!(outcome.hosted_zone_id.as_deref(), Some("Z123"));

        let records = dns.records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].record_name, "promo.example.org");
        assert_eq!(records[0].target, "d1.cloudfront.test");
    }

    #[tokio::test]
    async fn test_missing_zone_fails_before_any_call() {
        let dns = Arc::new(MemoryDns::new());
        let configurator = configurator(dns.clone(), None, None, false);

        let err = configurator
            .ensure_alias("promo.example.org", "d1.cloudfront.test")
            .await
            .unwrap_err();

        assert!(matches!(err, DeployError::ConfigError(_)));
        assert_eq!(dns.upsert_calls(), 0);
    }
}
