//! S3 object store

use async_trait::async_trait;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types::{
    BucketLocationConstraint, CreateBucketConfiguration, PublicAccessBlockConfiguration,
};
use tracing::{debug, info};

use crate::errors::DeployError;
use crate::providers::ObjectStore;

/// Object store backed by S3 static website hosting
pub struct S3ObjectStore {
    client: aws_sdk_s3::Client,
    region: String,
}

impl S3ObjectStore {
    pub fn new(client: aws_sdk_s3::Client, region: impl Into<String>) -> Self {
        Self {
            client,
            region: region.into(),
        }
    }

    fn public_read_policy(bucket: &str) -> String {
        serde_json::json!({
            "Version": "2012-10-17",
            "Statement": [{
                "Sid": "PublicReadGetObject",
                "Effect": "Allow",
                "Principal": "*",
                "Action": "s3:GetObject",
                "Resource": format!("arn:aws:s3:::{}/*", bucket),
            }]
        })
        .to_string()
    }
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    async fn bucket_exists(&self, bucket: &str) -> Result<bool, DeployError> {
        match self.client.head_bucket().bucket(bucket).send().await {
            Ok(_) => Ok(true),
            Err(err) => {
                let service_err = err.into_service_error();
                if service_err.is_not_found() {
                    Ok(false)
                } else {
                    Err(DeployError::StorageError(format!(
                        "head bucket {}: {}",
                        bucket, service_err
                    )))
                }
            }
        }
    }

    async fn create_site_bucket(&self, bucket: &str) -> Result<(), DeployError> {
        info!("Creating site bucket {}", bucket);

        let mut create = self.client.create_bucket().bucket(bucket);
        // us-east-1 rejects an explicit location constraint
        if self.region != "us-east-1" {
            let constraint = BucketLocationConstraint::from(self.region.as_str());
            create = create.create_bucket_configuration(
                CreateBucketConfiguration::builder()
                    .location_constraint(constraint)
                    .build(),
            );
        }
        create
            .send()
            .await
            .map_err(|e| DeployError::StorageError(format!("create bucket {}: {}", bucket, e)))?;

        // The account-level public access block would veto the policy below
        self.client
            .put_public_access_block()
            .bucket(bucket)
            .public_access_block_configuration(
                PublicAccessBlockConfiguration::builder()
                    .block_public_acls(false)
                    .ignore_public_acls(false)
                    .block_public_policy(false)
                    .restrict_public_buckets(false)
                    .build(),
            )
            .send()
            .await
            .map_err(|e| {
                DeployError::StorageError(format!("public access block {}: {}", bucket, e))
            })?;

        self.client
            .put_bucket_policy()
            .bucket(bucket)
            .policy(Self::public_read_policy(bucket))
            .send()
            .await
            .map_err(|e| DeployError::StorageError(format!("bucket policy {}: {}", bucket, e)))?;

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
        debug!("PUT s3://{}/{} ({} bytes)", bucket, key, body.len());

        self.client
            .put_object()
            .bucket(bucket)
            .key(key)
            .body(ByteStream::from(body.to_vec()))
            .content_type(content_type)
            .cache_control(cache_control)
            .send()
            .await
            .map_err(|e| DeployError::StorageError(format!("put s3://{}/{}: {}", bucket, key, e)))?;

        Ok(())
    }

    async fn get_object(&self, bucket: &str, key: &str) -> Result<Option<Vec<u8>>, DeployError> {
        match self.client.get_object().bucket(bucket).key(key).send().await {
            Ok(output) => {
                let data = output.body.collect().await.map_err(|e| {
                    DeployError::StorageError(format!("read s3://{}/{}: {}", bucket, key, e))
                })?;
                Ok(Some(data.into_bytes().to_vec()))
            }
            Err(err) => {
                let service_err = err.into_service_error();
                if service_err.is_no_such_key() {
                    Ok(None)
                } else {
                    Err(DeployError::StorageError(format!(
                        "get s3://{}/{}: {}",
                        bucket, key, service_err
                    )))
                }
            }
        }
    }

    fn website_endpoint(&self, bucket: &str) -> String {
        format!("{}.s3-website-{}.amazonaws.com", bucket, self.region)
    }

    fn object_url(&self, bucket: &str, key: &str) -> String {
        format!("https://{}.s3.{}.amazonaws.com/{}", bucket, self.region, key)
    }
}
