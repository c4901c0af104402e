//! CloudFront CDN service

use async_trait::async_trait;
use aws_sdk_cloudfront::types::{
    Aliases, AllowedMethods, CachedMethods, CookiePreference, CustomOriginConfig,
    DefaultCacheBehavior, Distribution, DistributionConfig, DistributionSummary, ForwardedValues,
    InvalidationBatch, ItemSelection, Method, Origin, OriginProtocolPolicy, Origins, Paths,
    SslSupportMethod, ViewerCertificate, ViewerProtocolPolicy,
};
use tracing::{debug, info};

use crate::errors::DeployError;
use crate::providers::{CdnService, DistributionInfo, DistributionRequest, InvalidationInfo};

const ORIGIN_ID: &str = "site-origin";

/// CDN service backed by CloudFront
pub struct CloudFrontCdn {
    client: aws_sdk_cloudfront::Client,
}

impl CloudFrontCdn {
    pub fn new(client: aws_sdk_cloudfront::Client) -> Self {
        Self { client }
    }

    fn build_config(request: &DistributionRequest) -> Result<DistributionConfig, DeployError> {
        let origin = Origin::builder()
            .id(ORIGIN_ID)
            .domain_name(&request.origin_domain)
            // Website endpoints only speak plain HTTP; viewers still get TLS
            // because the distribution terminates it
            .custom_origin_config(
                CustomOriginConfig::builder()
                    .http_port(80)
                    .https_port(443)
                    .origin_protocol_policy(OriginProtocolPolicy::HttpOnly)
                    .build()
                    .map_err(|e| DeployError::CdnError(e.to_string()))?,
            )
            .build()
            .map_err(|e| DeployError::CdnError(e.to_string()))?;

        let origins = Origins::builder()
            .quantity(1)
            .items(origin)
            .build()
            .map_err(|e| DeployError::CdnError(e.to_string()))?;

        let forwarded_values = ForwardedValues::builder()
            .query_string(false)
            .cookies(
                CookiePreference::builder()
                    .forward(ItemSelection::None)
                    .build()
                    .map_err(|e| DeployError::CdnError(e.to_string()))?,
            )
            .build()
            .map_err(|e| DeployError::CdnError(e.to_string()))?;

        let allowed_methods = AllowedMethods::builder()
            .quantity(2)
            .items(Method::Get)
            .items(Method::Head)
            .cached_methods(
                CachedMethods::builder()
                    .quantity(2)
                    .items(Method::Get)
                    .items(Method::Head)
                    .build()
                    .map_err(|e| DeployError::CdnError(e.to_string()))?,
            )
            .build()
            .map_err(|e| DeployError::CdnError(e.to_string()))?;

        let default_cache_behavior = DefaultCacheBehavior::builder()
            .target_origin_id(ORIGIN_ID)
            .viewer_protocol_policy(ViewerProtocolPolicy::RedirectToHttps)
            .allowed_methods(allowed_methods)
            .forwarded_values(forwarded_values)
            .compress(true)
            .min_ttl(request.min_ttl_secs)
            .default_ttl(request.default_ttl_secs)
            .max_ttl(request.max_ttl_secs)
            .build()
            .map_err(|e| DeployError::CdnError(e.to_string()))?;

        let viewer_certificate = match (&request.alias, &request.certificate_arn) {
            (Some(_), Some(arn)) => ViewerCertificate::builder()
                .acm_certificate_arn(arn)
                .ssl_support_method(SslSupportMethod::SniOnly)
                .build(),
            _ => ViewerCertificate::builder()
                .cloud_front_default_certificate(true)
                .build(),
        };

        let aliases = match &request.alias {
            Some(alias) => Some(
                Aliases::builder()
                    .quantity(1)
                    .items(alias)
                    .build()
                    .map_err(|e| DeployError::CdnError(e.to_string()))?,
            ),
            None => None,
        };

        DistributionConfig::builder()
            .caller_reference(uuid::Uuid::new_v4().to_string())
            .origins(origins)
            .default_cache_behavior(default_cache_behavior)
            .default_root_object("index.html")
            .comment(&request.comment)
            .enabled(true)
            .set_aliases(aliases)
            .viewer_certificate(viewer_certificate)
            .build()
            .map_err(|e| DeployError::CdnError(e.to_string()))
    }
}

fn summary_to_info(summary: &DistributionSummary) -> DistributionInfo {
    DistributionInfo {
        id: summary.id().to_string(),
        domain_name: summary.domain_name().to_string(),
        status: summary.status().to_string(),
        enabled: summary.enabled(),
        origin_domains: summary
            .origins()
            .map(|origins| {
                origins
                    .items()
                    .iter()
                    .map(|origin| origin.domain_name().to_string())
                    .collect()
            })
            .unwrap_or_default(),
        aliases: summary
            .aliases()
            .map(|aliases| aliases.items().to_vec())
            .unwrap_or_default(),
    }
}

fn distribution_to_info(distribution: &Distribution) -> DistributionInfo {
    let config = distribution.distribution_config();
    DistributionInfo {
        id: distribution.id().to_string(),
        domain_name: distribution.domain_name().to_string(),
        status: distribution.status().to_string(),
        enabled: config.map(|c| c.enabled()).unwrap_or(true),
        origin_domains: config
            .and_then(|c| c.origins())
            .map(|origins| {
                origins
                    .items()
                    .iter()
                    .map(|origin| origin.domain_name().to_string())
                    .collect()
            })
            .unwrap_or_default(),
        aliases: config
            .and_then(|c| c.aliases())
            .map(|aliases| aliases.items().to_vec())
            .unwrap_or_default(),
    }
}

#[async_trait]
impl CdnService for CloudFrontCdn {
    async fn find_by_origin(
        &self,
        origin_domain: &str,
    ) -> Result<Option<DistributionInfo>, DeployError> {
        let mut marker: Option<String> = None;

        loop {
            let mut request = self.client.list_distributions();
            if let Some(m) = &marker {
                request = request.marker(m);
            }

            let output = request
                .send()
                .await
                .map_err(|e| DeployError::CdnError(format!("list distributions: {}", e)))?;

            let Some(list) = output.distribution_list() else {
                return Ok(None);
            };

            for summary in list.items() {
                let info = summary_to_info(summary);
                if info.origin_domains.iter().any(|d| d == origin_domain) {
                    debug!("Found distribution {} for origin {}", info.id, origin_domain);
                    return Ok(Some(info));
                }
            }

            if !list.is_truncated() {
                return Ok(None);
            }
            marker = list.next_marker().map(|s| s.to_string());
            if marker.is_none() {
                return Ok(None);
            }
        }
    }

    async fn get_distribution(&self, id: &str) -> Result<Option<DistributionInfo>, DeployError> {
        match self.client.get_distribution().id(id).send().await {
            Ok(output) => Ok(output.distribution().map(distribution_to_info)),
            Err(err) => {
                let service_err = err.into_service_error();
                if service_err.is_no_such_distribution() {
                    Ok(None)
                } else {
                    Err(DeployError::CdnError(format!(
                        "get distribution {}: {}",
                        id, service_err
                    )))
                }
            }
        }
    }

    async fn create_distribution(
        &self,
        request: &DistributionRequest,
    ) -> Result<DistributionInfo, DeployError> {
        info!(
            "Creating distribution for origin {} (alias: {:?})",
            request.origin_domain, request.alias
        );

        let config = Self::build_config(request)?;

        let output = self
            .client
            .create_distribution()
            .distribution_config(config)
            .send()
            .await
            .map_err(|e| DeployError::CdnError(format!("create distribution: {}", e)))?;

        let distribution = output.distribution().ok_or_else(|| {
            DeployError::CdnError("create distribution returned no distribution".to_string())
        })?;

        Ok(distribution_to_info(distribution))
    }

    async fn disable_distribution(&self, id: &str) -> Result<(), DeployError> {
        let output = self
            .client
            .get_distribution_config()
            .id(id)
            .send()
            .await
            .map_err(|e| DeployError::CdnError(format!("get distribution config {}: {}", id, e)))?;

        let etag = output.e_tag().map(|s| s.to_string());
        let mut config = output.distribution_config.ok_or_else(|| {
            DeployError::CdnError(format!("distribution {} has no config", id))
        })?;

        if !config.enabled {
            return Ok(());
        }
        config.enabled = false;

        info!("Disabling distribution {}", id);
        self.client
            .update_distribution()
            .id(id)
            .set_if_match(etag)
            .distribution_config(config)
            .send()
            .await
            .map_err(|e| DeployError::CdnError(format!("disable distribution {}: {}", id, e)))?;

        Ok(())
    }

    async fn create_invalidation(
        &self,
        distribution_id: &str,
        paths: &[String],
    ) -> Result<InvalidationInfo, DeployError> {
        let path_items = Paths::builder()
            .quantity(paths.len() as i32)
            .set_items(Some(paths.to_vec()))
            .build()
            .map_err(|e| DeployError::CdnError(e.to_string()))?;

        let batch = InvalidationBatch::builder()
            .paths(path_items)
            .caller_reference(uuid::Uuid::new_v4().to_string())
            .build()
            .map_err(|e| DeployError::CdnError(e.to_string()))?;

        let output = self
            .client
            .create_invalidation()
            .distribution_id(distribution_id)
            .invalidation_batch(batch)
            .send()
            .await
            .map_err(|e| {
                DeployError::CdnError(format!("invalidate {}: {}", distribution_id, e))
            })?;

        let invalidation = output.invalidation().ok_or_else(|| {
            DeployError::CdnError("create invalidation returned no invalidation".to_string())
        })?;

        Ok(InvalidationInfo {
            id: invalidation.id().to_string(),
            status: invalidation.status().to_string(),
        })
    }
}
