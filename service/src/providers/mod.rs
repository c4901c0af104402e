//! Provider seams for object storage, CDN, and DNS

pub mod cloudfront;
pub mod memory;
pub mod route53;
pub mod s3;

use async_trait::async_trait;

use crate::errors::DeployError;

/// Fixed hosted zone id CloudFront distributions are aliased through.
/// This value is global, not per-account.
pub const CLOUDFRONT_ALIAS_ZONE_ID: &str = "Z2FDTNDATAQYW2";

/// Object storage hosting the published documents
#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn bucket_exists(&self, bucket: &str) -> Result<bool, DeployError>;

    /// Create a bucket configured for public website hosting
    async fn create_site_bucket(&self, bucket: &str) -> Result<(), DeployError>;

    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        body: &[u8],
        content_type: &str,
        cache_control: &str,
    ) -> Result<(), DeployError>;

    /// Fetch an object; `None` when the key does not exist
    async fn get_object(&self, bucket: &str, key: &str) -> Result<Option<Vec<u8>>, DeployError>;

    /// Website endpoint hostname for a bucket, used as the CDN origin
    fn website_endpoint(&self, bucket: &str) -> String;

    /// Direct HTTPS URL of an object
    fn object_url(&self, bucket: &str, key: &str) -> String;
}

/// A CDN distribution as seen by the deploy pipeline
#[derive(Debug, Clone)]
pub struct DistributionInfo {
    pub id: String,
    pub domain_name: String,
    pub status: String,
    pub enabled: bool,
    pub origin_domains: Vec<String>,
    pub aliases: Vec<String>,
}

/// Parameters for creating a distribution
#[derive(Debug, Clone)]
pub struct DistributionRequest {
    /// Origin hostname, the bucket website endpoint
    pub origin_domain: String,

    /// Custom hostname to serve, when one is selected
    pub alias: Option<String>,

    /// Certificate for the alias; required whenever `alias` is set
    pub certificate_arn: Option<String>,

    pub comment: String,
    pub default_ttl_secs: i64,
    pub min_ttl_secs: i64,
    pub max_ttl_secs: i64,
}

/// A created cache invalidation
#[derive(Debug, Clone)]
pub struct InvalidationInfo {
    pub id: String,
    pub status: String,
}

/// CDN in front of the storage website endpoints
#[async_trait]
pub trait CdnService: Send + Sync {
    /// Find the distribution whose origins include the given domain
    async fn find_by_origin(
        &self,
        origin_domain: &str,
    ) -> Result<Option<DistributionInfo>, DeployError>;

    /// Fetch a distribution by id; `None` when it does not exist
    async fn get_distribution(&self, id: &str) -> Result<Option<DistributionInfo>, DeployError>;

    async fn create_distribution(
        &self,
        request: &DistributionRequest,
    ) -> Result<DistributionInfo, DeployError>;

    /// Disable a distribution so it can later be deleted out of band
    async fn disable_distribution(&self, id: &str) -> Result<(), DeployError>;

    async fn create_invalidation(
        &self,
        distribution_id: &str,
        paths: &[String],
    ) -> Result<InvalidationInfo, DeployError>;
}

/// DNS management for custom hostnames
#[async_trait]
pub trait DnsService: Send + Sync {
    /// Upsert an alias record pointing a hostname at a distribution
    async fn upsert_alias(
        &self,
        hosted_zone_id: &str,
        record_name: &str,
        distribution_hostname: &str,
    ) -> Result<(), DeployError>;
}
