//! Route 53 DNS service

use async_trait::async_trait;
use aws_sdk_route53::types::{
    AliasTarget, Change, ChangeAction, ChangeBatch, ResourceRecordSet, RrType,
};
use tracing::info;

use crate::errors::DeployError;
use crate::providers::{DnsService, CLOUDFRONT_ALIAS_ZONE_ID};

/// DNS service backed by Route 53
pub struct Route53Dns {
    client: aws_sdk_route53::Client,
}

impl Route53Dns {
    pub fn new(client: aws_sdk_route53::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl DnsService for Route53Dns {
    async fn upsert_alias(
        &self,
        hosted_zone_id: &str,
        record_name: &str,
        distribution_hostname: &str,
    ) -> Result<(), DeployError> {
        // Alias records against CloudFront always use the fixed CloudFront
        // hosted zone id, not the caller's zone
        let alias_target = AliasTarget::builder()
            .hosted_zone_id(CLOUDFRONT_ALIAS_ZONE_ID)
            .dns_name(distribution_hostname)
            .evaluate_target_health(false)
            .build()
            .map_err(|e| DeployError::DnsError(e.to_string()))?;

        let record_set = ResourceRecordSet::builder()
            .name(record_name)
            .r#type(RrType::A)
            .alias_target(alias_target)
            .build()
            .map_err(|e| DeployError::DnsError(e.to_string()))?;

        let change = Change::builder()
            .action(ChangeAction::Upsert)
            .resource_record_set(record_set)
            .build()
            .map_err(|e| DeployError::DnsError(e.to_string()))?;

        let batch = ChangeBatch::builder()
            .changes(change)
            .build()
            .map_err(|e| DeployError::DnsError(e.to_string()))?;

        info!(
            "Upserting alias record {} -> {} in zone {}",
            record_name, distribution_hostname, hosted_zone_id
        );

        self.client
            .change_resource_record_sets()
            .hosted_zone_id(hosted_zone_id)
            .change_batch(batch)
            .send()
            .await
            .map_err(|e| {
                DeployError::DnsError(format!("upsert record {}: {}", record_name, e))
            })?;

        Ok(())
    }
}
