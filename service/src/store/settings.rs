//! Settings file management

use serde::{Deserialize, Serialize};
use url::Url;

use crate::errors::DeployError;
use crate::logs::LogLevel;

/// Service settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Log level
    #[serde(default)]
    pub log_level: LogLevel,

    /// Emit JSON-formatted logs
    #[serde(default)]
    pub log_json: bool,

    /// Write rolling log files into the data directory
    #[serde(default)]
    pub log_to_file: bool,

    /// Local HTTP server configuration
    #[serde(default)]
    pub server: ServerSettings,

    /// Pagepilot backend configuration
    #[serde(default)]
    pub backend: BackendSettings,

    /// AWS client configuration
    #[serde(default)]
    pub aws: AwsSettings,

    /// Publishing configuration
    #[serde(default)]
    pub publish: PublishSettings,

    /// Form capture configuration
    #[serde(default)]
    pub forms: FormsSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            log_level: LogLevel::Info,
            log_json: false,
            log_to_file: false,
            server: ServerSettings::default(),
            backend: BackendSettings::default(),
            aws: AwsSettings::default(),
            publish: PublishSettings::default(),
            forms: FormsSettings::default(),
        }
    }
}

impl Settings {
    /// Validate cross-field constraints before the service starts
    pub fn validate(&self) -> Result<(), DeployError> {
        Url::parse(&self.backend.base_url)
            .map_err(|e| DeployError::ConfigError(format!("backend.base_url: {}", e)))?;
        Url::parse(&self.forms.api_origin)
            .map_err(|e| DeployError::ConfigError(format!("forms.api_origin: {}", e)))?;

        if self.publish.bucket.trim().is_empty() {
            return Err(DeployError::ConfigError(
                "publish.bucket must not be empty".to_string(),
            ));
        }

        if self.publish.min_ttl_secs > self.publish.default_ttl_secs
            || self.publish.default_ttl_secs > self.publish.max_ttl_secs
        {
            return Err(DeployError::ConfigError(format!(
                "publish TTLs must satisfy min <= default <= max, got {} / {} / {}",
                self.publish.min_ttl_secs,
                self.publish.default_ttl_secs,
                self.publish.max_ttl_secs
            )));
        }

        if self.publish.wildcard_dns && self.publish.base_domain.is_none() {
            return Err(DeployError::ConfigError(
                "publish.wildcard_dns requires publish.base_domain".to_string(),
            ));
        }

        if self.publish.auto_subdomain && self.publish.base_domain.is_none() {
            return Err(DeployError::ConfigError(
                "publish.auto_subdomain requires publish.base_domain".to_string(),
            ));
        }

        Ok(())
    }
}

/// Local HTTP server settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerSettings {
    /// Host to bind to
    #[serde(default = "default_server_host")]
    pub host: String,

    /// Port to listen on
    #[serde(default = "default_server_port")]
    pub port: u16,
}

fn default_server_host() -> String {
    "127.0.0.1".to_string()
}

fn default_server_port() -> u16 {
    8090
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: default_server_host(),
            port: default_server_port(),
        }
    }
}

/// Pagepilot backend settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendSettings {
    /// Base URL for the backend API
    #[serde(default = "default_backend_url")]
    pub base_url: String,

    /// Service token for internal endpoints
    #[serde(default)]
    pub api_token: String,
}

fn default_backend_url() -> String {
    "http://localhost:8000".to_string()
}

impl Default for BackendSettings {
    fn default() -> Self {
        Self {
            base_url: default_backend_url(),
            api_token: String::new(),
        }
    }
}

/// AWS client settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AwsSettings {
    /// Region used for S3 website endpoints and all clients
    #[serde(default = "default_aws_region")]
    pub region: String,

    /// Optional endpoint override for localstack-style development.
    /// When absent, the real AWS endpoints are used.
    #[serde(default)]
    pub endpoint_url: Option<String>,
}

fn default_aws_region() -> String {
    "us-east-1".to_string()
}

impl Default for AwsSettings {
    fn default() -> Self {
        Self {
            region: default_aws_region(),
            endpoint_url: None,
        }
    }
}

/// Publishing settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublishSettings {
    /// Bucket all pages are published into
    #[serde(default = "default_bucket")]
    pub bucket: String,

    /// Base domain for subdomain publishing
    #[serde(default)]
    pub base_domain: Option<String>,

    /// An operator-provisioned wildcard DNS record covers *.base_domain
    #[serde(default)]
    pub wildcard_dns: bool,

    /// Shared distribution to use instead of creating per-page ones
    #[serde(default)]
    pub wildcard_distribution_id: Option<String>,

    /// Hosted zone that receives DNS aliases
    #[serde(default)]
    pub hosted_zone_id: Option<String>,

    /// ACM certificate attached to distributions with custom hostnames
    #[serde(default)]
    pub certificate_arn: Option<String>,

    /// Default cache TTL for created distributions, in seconds
    #[serde(default = "default_ttl")]
    pub default_ttl_secs: i64,

    /// Minimum cache TTL for created distributions, in seconds
    #[serde(default)]
    pub min_ttl_secs: i64,

    /// Maximum cache TTL for created distributions, in seconds
    #[serde(default = "default_max_ttl")]
    pub max_ttl_secs: i64,

    /// Derive a subdomain from the page slug when the request names none
    #[serde(default)]
    pub auto_subdomain: bool,
}

fn default_bucket() -> String {
    "pagepilot-sites".to_string()
}

fn default_ttl() -> i64 {
    86_400
}

fn default_max_ttl() -> i64 {
    31_536_000
}

impl Default for PublishSettings {
    fn default() -> Self {
        Self {
            bucket: default_bucket(),
            base_domain: None,
            wildcard_dns: false,
            wildcard_distribution_id: None,
            hosted_zone_id: None,
            certificate_arn: None,
            default_ttl_secs: default_ttl(),
            min_ttl_secs: 0,
            max_ttl_secs: default_max_ttl(),
            auto_subdomain: false,
        }
    }
}

/// Form capture settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FormsSettings {
    /// Origin the published form runtime submits to
    #[serde(default = "default_forms_origin")]
    pub api_origin: String,
}

fn default_forms_origin() -> String {
    "http://localhost:8000".to_string()
}

impl Default for FormsSettings {
    fn default() -> Self {
        Self {
            api_origin: default_forms_origin(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_json_uses_defaults() {
        let settings: Settings = serde_json::from_str("{}").unwrap();
        assert_eq!(settings.server.port, 8090);
        assert_eq!(settings.publish.bucket, "pagepilot-sites");
        assert_eq!(settings.publish.default_ttl_secs, 86_400);
        assert!(!settings.publish.wildcard_dns);
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_ttl_order() {
        let mut settings = Settings::default();
        settings.publish.min_ttl_secs = 600;
        settings.publish.default_ttl_secs = 300;

        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_wildcard_without_base_domain() {
        let mut settings = Settings::default();
        settings.publish.wildcard_dns = true;

        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_bad_backend_url() {
        let mut settings = Settings::default();
        settings.backend.base_url = "not a url".to_string();

        assert!(settings.validate().is_err());
    }
}
