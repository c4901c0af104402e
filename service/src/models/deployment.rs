//! Deployment record models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

/// Maximum number of log entries kept on a deployment record
pub const MAX_LOG_ENTRIES: usize = 100;

/// Number of log lines returned in the info projection
pub const INFO_LOG_LINES: usize = 20;

/// Deployment lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeployState {
    /// No deploy has run yet
    Idle,

    /// Deploy in progress
    Deploying,

    /// Last deploy succeeded
    Deployed,

    /// Last deploy failed
    Failed,
}

/// Deploy request body
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DeployRequest {
    /// Fully qualified custom hostname to serve the page on
    #[serde(default)]
    pub custom_domain: Option<String>,

    /// Subdomain under the configured base domain
    #[serde(default)]
    pub subdomain: Option<String>,
}

/// Log entry on a deployment record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeploymentLogEntry {
    pub timestamp: DateTime<Utc>,

    /// Log level: 'info', 'warn', 'error'
    pub level: String,

    /// Log message
    pub message: String,
}

/// Persisted deployment record for a single page
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Deployment {
    /// Page this deployment belongs to
    pub page_id: String,

    /// Owner of the page
    pub owner_id: String,

    /// Current lifecycle state
    pub status: DeployState,

    /// Requested custom hostname, if any
    pub custom_domain: Option<String>,

    /// Subdomain under the base domain, if any
    pub subdomain: Option<String>,

    /// Whether the custom hostname is the authoritative address
    pub use_custom_domain: bool,

    /// Storage bucket the document was written to
    pub bucket: Option<String>,

    /// Object key of the published document
    pub object_key: Option<String>,

    /// Direct storage URL of the published document
    pub storage_url: Option<String>,

    /// CDN distribution id serving the page
    pub distribution_id: Option<String>,

    /// CDN distribution hostname
    pub distribution_hostname: Option<String>,

    /// Hosted zone the DNS alias was written to, if any
    pub hosted_zone_id: Option<String>,

    /// Certificate attached to the distribution, if any
    pub certificate_arn: Option<String>,

    /// Public URL computed at the end of the last successful deploy
    pub public_url: Option<String>,

    /// Number of successful deploys
    pub deploy_count: u64,

    /// Number of failed deploys
    pub error_count: u64,

    /// Message of the last failure, cleared on success
    pub last_error: Option<String>,

    /// Completion time of the last successful deploy
    pub last_deployed_at: Option<DateTime<Utc>>,

    /// Time spent resolving the document, in milliseconds
    pub build_time_ms: Option<u64>,

    /// Size of the published document in bytes
    pub build_size_bytes: Option<u64>,

    /// SHA256 of the published document
    pub document_digest: Option<String>,

    /// Capped per-deployment log
    pub log: Vec<DeploymentLogEntry>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Deployment {
    /// Create a fresh record in the idle state
    pub fn new(page_id: impl Into<String>, owner_id: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            page_id: page_id.into(),
            owner_id: owner_id.into(),
            status: DeployState::Idle,
            custom_domain: None,
            subdomain: None,
            use_custom_domain: false,
            bucket: None,
            object_key: None,
            storage_url: None,
            distribution_id: None,
            distribution_hostname: None,
            hosted_zone_id: None,
            certificate_arn: None,
            public_url: None,
            deploy_count: 0,
            error_count: 0,
            last_error: None,
            last_deployed_at: None,
            build_time_ms: None,
            build_size_bytes: None,
            document_digest: None,
            log: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Append a log entry, dropping the oldest entries past the cap.
    /// Every appended line is also emitted through the process log.
    pub fn push_log(&mut self, level: &str, message: impl Into<String>) {
        let message = message.into();
        match level {
            "error" => error!("Page {}: {}", self.page_id, message),
            "warn" => warn!("Page {}: {}", self.page_id, message),
            _ => info!("Page {}: {}", self.page_id, message),
        }
        self.log.push(DeploymentLogEntry {
            timestamp: Utc::now(),
            level: level.to_string(),
            message,
        });
        if self.log.len() > MAX_LOG_ENTRIES {
            let excess = self.log.len() - MAX_LOG_ENTRIES;
            self.log.drain(..excess);
        }
    }

    pub fn log_info(&mut self, message: impl Into<String>) {
        self.push_log("info", message);
    }

    pub fn log_warn(&mut self, message: impl Into<String>) {
        self.push_log("warn", message);
    }

    pub fn log_error(&mut self, message: impl Into<String>) {
        self.push_log("error", message);
    }

    /// Compute the public URL for the current domain selection.
    ///
    /// Priority: custom domain, then subdomain under the base domain, then
    /// the raw distribution hostname.
    pub fn compute_public_url(&self, base_domain: Option<&str>) -> Option<String> {
        if self.use_custom_domain {
            if let Some(domain) = &self.custom_domain {
                return Some(format!("https://{}", domain));
            }
        }
        if let (Some(subdomain), Some(base)) = (&self.subdomain, base_domain) {
            return Some(format!("https://{}.{}", subdomain, base));
        }
        self.distribution_hostname
            .as_ref()
            .map(|hostname| format!("https://{}", hostname))
    }

    /// Build the info projection with the tail of the log
    pub fn info(&self) -> DeploymentInfo {
        let log_tail = if self.log.len() > INFO_LOG_LINES {
            self.log[self.log.len() - INFO_LOG_LINES..].to_vec()
        } else {
            self.log.clone()
        };

        DeploymentInfo {
            page_id: self.page_id.clone(),
            status: self.status,
            url: self.public_url.clone(),
            custom_domain: self.custom_domain.clone(),
            subdomain: self.subdomain.clone(),
            use_custom_domain: self.use_custom_domain,
            distribution_id: self.distribution_id.clone(),
            distribution_hostname: self.distribution_hostname.clone(),
            deploy_count: self.deploy_count,
            error_count: self.error_count,
            last_error: self.last_error.clone(),
            last_deployed_at: self.last_deployed_at,
            build_time_ms: self.build_time_ms,
            build_size_bytes: self.build_size_bytes,
            updated_at: self.updated_at,
            log: log_tail,
        }
    }

    /// Build the list projection
    pub fn summary(&self) -> DeploymentSummary {
        DeploymentSummary {
            page_id: self.page_id.clone(),
            status: self.status,
            url: self.public_url.clone(),
            deploy_count: self.deploy_count,
            last_deployed_at: self.last_deployed_at,
            updated_at: self.updated_at,
        }
    }

    /// Build the deploy response
    pub fn outcome(&self) -> DeployOutcome {
        DeployOutcome {
            page_id: self.page_id.clone(),
            status: self.status,
            url: self.public_url.clone(),
            distribution_id: self.distribution_id.clone(),
            distribution_hostname: self.distribution_hostname.clone(),
            custom_domain: self.custom_domain.clone(),
            subdomain: self.subdomain.clone(),
            last_deployed_at: self.last_deployed_at,
        }
    }
}

/// Detailed projection returned for a single deployment
#[derive(Debug, Clone, Serialize)]
pub struct DeploymentInfo {
    pub page_id: String,
    pub status: DeployState,
    pub url: Option<String>,
    pub custom_domain: Option<String>,
    pub subdomain: Option<String>,
    pub use_custom_domain: bool,
    pub distribution_id: Option<String>,
    pub distribution_hostname: Option<String>,
    pub deploy_count: u64,
    pub error_count: u64,
    pub last_error: Option<String>,
    pub last_deployed_at: Option<DateTime<Utc>>,
    pub build_time_ms: Option<u64>,
    pub build_size_bytes: Option<u64>,
    pub updated_at: DateTime<Utc>,
    pub log: Vec<DeploymentLogEntry>,
}

/// Compact projection returned when listing deployments
#[derive(Debug, Clone, Serialize)]
pub struct DeploymentSummary {
    pub page_id: String,
    pub status: DeployState,
    pub url: Option<String>,
    pub deploy_count: u64,
    pub last_deployed_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}

/// Response returned by a deploy operation
#[derive(Debug, Clone, Serialize)]
pub struct DeployOutcome {
    pub page_id: String,
    pub status: DeployState,
    pub url: Option<String>,
    pub distribution_id: Option<String>,
    pub distribution_hostname: Option<String>,
    pub custom_domain: Option<String>,
    pub subdomain: Option<String>,
    pub last_deployed_at: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_capped_at_limit() {
        let mut record = Deployment::new("page-1", "owner-1");
        for i in 0..150 {
            record.log_info(format!("line {}", i));
        }

        assert_eq!(record.log.len(), MAX_LOG_ENTRIES);
        // Oldest entries are dropped first
        assert_eq!(record.log[0].message, "line 50");
        assert_eq!(record.log.last().unwrap().message, "line 149");
    }

    #[test]
    fn test_info_returns_log_tail() {
        let mut record = Deployment::new("page-1", "owner-1");
        for i in 0..30 {
            record.log_info(format!("line {}", i));
        }

        let info = record.info();
        assert_eq!(info.log.len(), INFO_LOG_LINES);
        assert_eq!(info.log[0].message, "line 10");
        assert_eq!(info.log.last().unwrap().message, "line 29");
    }

    #[test]
    fn test_public_url_prefers_custom_domain() {
        let mut record = Deployment::new("page-1", "owner-1");
        record.distribution_hostname = Some("d123.cloudfront.net".to_string());
        record.subdomain = Some("launch".to_string());
        record.custom_domain = Some("promo.example.com".to_string());
        record.use_custom_domain = true;

        assert_eq!(
            record.compute_public_url(Some("pages.example.com")),
            Some("https://promo.example.com".to_string())
        );
    }

    #[test]
    fn test_public_url_subdomain_over_distribution() {
        let mut record = Deployment::new("page-1", "owner-1");
        record.distribution_hostname = Some("d123.cloudfront.net".to_string());
        record.subdomain = Some("launch".to_string());

        assert_eq!(
            record.compute_public_url(Some("pages.example.com")),
            Some("https://launch.pages.example.com".to_string())
        );
    }

    #[test]
    fn test_public_url_falls_back_to_distribution() {
        let mut record = Deployment::new("page-1", "owner-1");
        record.distribution_hostname = Some("d123.cloudfront.net".to_string());
        // Subdomain without a base domain cannot form a URL
        record.subdomain = Some("launch".to_string());

        assert_eq!(
            record.compute_public_url(None),
            Some("https://d123.cloudfront.net".to_string())
        );
    }

    #[test]
    fn test_status_serializes_lowercase() {
        let json = serde_json::to_string(&DeployState::Deploying).unwrap();
        assert_eq!(json, "\"deploying\"");
    }
}
