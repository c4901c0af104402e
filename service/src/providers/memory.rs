//! In-memory providers backing tests and local development

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;

use crate::errors::DeployError;
use crate::providers::{
    CdnService, DistributionInfo, DistributionRequest, DnsService, InvalidationInfo, ObjectStore,
};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// An object as the fake store holds it
#[derive(Debug, Clone)]
pub struct StoredObject {
    pub body: Vec<u8>,
    pub content_type: String,
    pub cache_control: String,
}

#[derive(Default)]
struct ObjectStoreState {
    buckets: HashMap<String, HashMap<String, StoredObject>>,
    create_bucket_calls: usize,
    put_calls: usize,
    fail_puts: bool,
    fail_gets: bool,
}

/// Object store holding everything in process memory
#[derive(Default)]
pub struct MemoryObjectStore {
    state: Mutex<ObjectStoreState>,
}

impl MemoryObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed an object, creating the bucket if needed
    pub fn insert_object(&self, bucket: &str, key: &str, body: &[u8], content_type: &str) {
        let mut state = lock(&self.state);
        state.buckets.entry(bucket.to_string()).or_default().insert(
            key.to_string(),
            StoredObject {
                body: body.to_vec(),
                content_type: content_type.to_string(),
                cache_control: String::new(),
            },
        );
    }

    pub fn object(&self, bucket: &str, key: &str) -> Option<StoredObject> {
        let state = lock(&self.state);
        state.buckets.get(bucket).and_then(|objects| objects.get(key)).cloned()
    }

    pub fn create_bucket_calls(&self) -> usize {
        lock(&self.state).create_bucket_calls
    }

    pub fn put_calls(&self) -> usize {
        lock(&self.state).put_calls
    }

    pub fn fail_puts(&self, fail: bool) {
        lock(&self.state).fail_puts = fail;
    }

    pub fn fail_gets(&self, fail: bool) {
        lock(&self.state).fail_gets = fail;
    }
}

#[async_trait]
impl ObjectStore for MemoryObjectStore {
    async fn bucket_exists(&self, bucket: &str) -> Result<bool, DeployError> {
        Ok(lock(&self.state).buckets.contains_key(bucket))
    }

    async fn create_site_bucket(&self, bucket: &str) -> Result<(), DeployError> {
        let mut state = lock(&self.state);
        state.create_bucket_calls += 1;
        state.buckets.entry(bucket.to_string()).or_default();
        Ok(())
    }

    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        body: &[u8],
        content_type: &str,
        cache_control: &str,
    ) -> Result<(), DeployError> {
        let mut state = lock(&self.state);
        state.put_calls += 1;
        if state.fail_puts {
            return Err(DeployError::StorageError("injected put failure".to_string()));
        }
        let objects = state
            .buckets
            .get_mut(bucket)
            .ok_or_else(|| DeployError::StorageError(format!("no such bucket: {}", bucket)))?;
        objects.insert(
            key.to_string(),
            StoredObject {
                body: body.to_vec(),
                content_type: content_type.to_string(),
                cache_control: cache_control.to_string(),
            },
        );
        Ok(())
    }

    async fn get_object(&self, bucket: &str, key: &str) -> Result<Option<Vec<u8>>, DeployError> {
        let state = lock(&self.state);
        if state.fail_gets {
            return Err(DeployError::StorageError("injected get failure".to_string()));
        }
        Ok(state
            .buckets
            .get(bucket)
            .and_then(|objects| objects.get(key))
            .map(|object| object.body.clone()))
    }

    fn website_endpoint(&self, bucket: &str) -> String {
        format!("{}.s3-website.test", bucket)
    }

    fn object_url(&self, bucket: &str, key: &str) -> String {
        format!("https://{}.s3.test/{}", bucket, key)
    }
}

#[derive(Default)]
struct CdnState {
    distributions: Vec<DistributionInfo>,
    invalidations: Vec<(String, Vec<String>)>,
    sequence: usize,
    list_calls: usize,
    create_calls: usize,
    disable_calls: usize,
    invalidation_calls: usize,
    fail_creates: bool,
}

/// CDN fake tracking distributions in a vector
#[derive(Default)]
pub struct MemoryCdn {
    state: Mutex<CdnState>,
}

impl MemoryCdn {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a distribution, e.g. an operator-provisioned wildcard one
    pub fn add_distribution(&self, info: DistributionInfo) {
        lock(&self.state).distributions.push(info);
    }

    pub fn distribution(&self, id: &str) -> Option<DistributionInfo> {
        let state = lock(&self.state);
        state.distributions.iter().find(|d| d.id == id).cloned()
    }

    pub fn invalidations(&self) -> Vec<(String, Vec<String>)> {
        lock(&self.state).invalidations.clone()
    }

    pub fn list_calls(&self) -> usize {
        lock(&self.state).list_calls
    }

    pub fn create_calls(&self) -> usize {
        lock(&self.state).create_calls
    }

    pub fn disable_calls(&self) -> usize {
        lock(&self.state).disable_calls
    }

    pub fn invalidation_calls(&self) -> usize {
        lock(&self.state).invalidation_calls
    }

    pub fn fail_creates(&self, fail: bool) {
        lock(&self.state).fail_creates = fail;
    }
}

#[async_trait]
impl CdnService for MemoryCdn {
    async fn find_by_origin(
        &self,
        origin_domain: &str,
    ) -> Result<Option<DistributionInfo>, DeployError> {
        let mut state = lock(&self.state);
        state.list_calls += 1;
        Ok(state
            .distributions
            .iter()
            .find(|d| d.origin_domains.iter().any(|o| o == origin_domain))
            .cloned())
    }

    async fn get_distribution(&self, id: &str) -> Result<Option<DistributionInfo>, DeployError> {
        let state = lock(&self.state);
        Ok(state.distributions.iter().find(|d| d.id == id).cloned())
    }

    async fn create_distribution(
        &self,
        request: &DistributionRequest,
    ) -> Result<DistributionInfo, DeployError> {
        let mut state = lock(&self.state);
        state.create_calls += 1;
        if state.fail_creates {
            return Err(DeployError::CdnError("injected create failure".to_string()));
        }
        state.sequence += 1;
        let info = DistributionInfo {
            id: format!("E{:06}", state.sequence),
            domain_name: format!("d{:06}.cloudfront.test", state.sequence),
            status: "Deployed".to_string(),
            enabled: true,
            origin_domains: vec![request.origin_domain.clone()],
            aliases: request.alias.clone().into_iter().collect(),
        };
        state.distributions.push(info.clone());
        Ok(info)
    }

    async fn disable_distribution(&self, id: &str) -> Result<(), DeployError> {
        let mut state = lock(&self.state);
        state.disable_calls += 1;
        let distribution = state
            .distributions
            .iter_mut()
            .find(|d| d.id == id)
            .ok_or_else(|| DeployError::CdnError(format!("no such distribution: {}", id)))?;
        distribution.enabled = false;
        Ok(())
    }

    async fn create_invalidation(
        &self,
        distribution_id: &str,
        paths: &[String],
    ) -> Result<InvalidationInfo, DeployError> {
        let mut state = lock(&self.state);
        state.invalidation_calls += 1;
        state.sequence += 1;
        state
            .invalidations
            .push((distribution_id.to_string(), paths.to_vec()));
        Ok(InvalidationInfo {
            id: format!("I{:06}", state.sequence),
            status: "InProgress".to_string(),
        })
    }
}

/// One alias record as the fake zone holds it
#[derive(Debug, Clone, PartialEq)]
pub struct AliasRecord {
    pub hosted_zone_id: String,
    pub record_name: String,
    pub target: String,
}

#[derive(Default)]
struct DnsState {
    records: Vec<AliasRecord>,
    upsert_calls: usize,
    fail_upserts: bool,
}

/// DNS fake with upsert semantics
#[derive(Default)]
pub struct MemoryDns {
    state: Mutex<DnsState>,
}

impl MemoryDns {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<AliasRecord> {
        lock(&self.state).records.clone()
    }

    pub fn upsert_calls(&self) -> usize {
        lock(&self.state).upsert_calls
    }

    pub fn fail_upserts(&self, fail: bool) {
        lock(&self.state).fail_upserts = fail;
    }
}

#[async_trait]
impl DnsService for MemoryDns {
    async fn upsert_alias(
        &self,
        hosted_zone_id: &str,
        record_name: &str,
        distribution_hostname: &str,
    ) -> Result<(), DeployError> {
        let mut state = lock(&self.state);
        state.upsert_calls += 1;
        if state.fail_upserts {
            return Err(DeployError::DnsError("injected upsert failure".to_string()));
        }
        let record = AliasRecord {
            hosted_zone_id: hosted_zone_id.to_string(),
            record_name: record_name.to_string(),
            target: distribution_hostname.to_string(),
        };
        if let Some(existing) = state
            .records
            .iter_mut()
            .find(|r| r.hosted_zone_id == hosted_zone_id && r.record_name == record_name)
        {
            *existing = record;
        } else {
            state.records.push(record);
        }
        Ok(())
    }
}
