//! Full deploy flow tests over in-memory providers

use std::sync::Arc;

use pagepilot_deploy::deploy::engine::DeployEngine;
use pagepilot_deploy::errors::DeployError;
use pagepilot_deploy::filesys::dir::Dir;
use pagepilot_deploy::models::deployment::{DeployRequest, DeployState};
use pagepilot_deploy::models::page::Page;
use pagepilot_deploy::pages::memory::MemoryPageService;
use pagepilot_deploy::pages::PageService;
use pagepilot_deploy::providers::memory::{MemoryCdn, MemoryDns, MemoryObjectStore};
use pagepilot_deploy::providers::{CdnService, DistributionInfo, DnsService, ObjectStore};
use pagepilot_deploy::store::deployments::DeploymentStore;
use pagepilot_deploy::store::settings::Settings;
use tempfile::TempDir;

struct Harness {
    engine: DeployEngine,
    objects: Arc<MemoryObjectStore>,
    cdn: Arc<MemoryCdn>,
    dns: Arc<MemoryDns>,
    pages: Arc<MemoryPageService>,
    data_dir: TempDir,
}

fn base_settings() -> Settings {
    let mut settings = Settings::default();
    settings.publish.bucket = "sites".to_string();
    settings.forms.api_origin = "https://api.pagepilot.test".to_string();
    settings
}

fn harness(settings: Settings) -> Harness {
    let data_dir = TempDir::new().unwrap();
    let objects = Arc::new(MemoryObjectStore::new());
    let cdn = Arc::new(MemoryCdn::new());
    let dns = Arc::new(MemoryDns::new());
    let pages = Arc::new(MemoryPageService::new());

    let store = DeploymentStore::new(Dir::new(data_dir.path().join("deployments")));
    let engine = DeployEngine::new(
        &settings,
        store,
        objects.clone() as Arc<dyn ObjectStore>,
        cdn.clone() as Arc<dyn CdnService>,
        dns.clone() as Arc<dyn DnsService>,
        pages.clone() as Arc<dyn PageService>,
    );

    Harness {
        engine,
        objects,
        cdn,
        dns,
        pages,
        data_dir,
    }
}

fn test_page(id: &str) -> Page {
    Page {
        id: id.to_string(),
        owner_id: "owner-1".to_string(),
        slug: Some("spring-launch".to_string()),
        title: Some("Spring Launch".to_string()),
        artifact_key: None,
        content: serde_json::json!({"blocks": [{"type": "hero", "text": "Hello"}]}),
    }
}

#[tokio::test]
async fn test_first_deploy_publishes_document() {
    let h = harness(base_settings());
    h.pages.add_page(test_page("page-1"));

    let outcome = h
        .engine
        .deploy("page-1", DeployRequest::default())
        .await
        .unwrap();

    assert_eq!(outcome.status, DeployState::Deployed);
    let distribution_id = outcome.distribution_id.clone().unwrap();

    // The document landed under the page's path with edge-friendly headers
    assert_eq!(h.objects.create_bucket_calls(), 1);
    let object = h.objects.object("sites", "page-1/index.html").unwrap();
    assert_eq!(object.content_type, "text/html");
    assert_eq!(object.cache_control, "max-age=300");
    let html = String::from_utf8(object.body).unwrap();
    assert!(html.contains("Spring Launch"));
    assert!(html.contains("/api/forms/submit"));

    // One distribution, one full purge, no DNS without a hostname
    assert_eq!(h.cdn.create_calls(), 1);
    assert_eq!(h.cdn.invalidations(), vec![(distribution_id, vec!["/*".to_string()])]);
    assert_eq!(h.dns.upsert_calls(), 0);

    // Without any domain the page is reachable on the distribution hostname
    let hostname = outcome.distribution_hostname.unwrap();
    assert_eq!(outcome.url, Some(format!("https://{}", hostname)));

    // The backend learned about the publish
    let updates = h.pages.updates();
    assert_eq!(updates.len(), 1);
    assert_eq!(updates[0].0, "page-1");
    assert!(updates[0].1.published);
    assert_eq!(updates[0].1.published_url, outcome.url);
}

#[tokio::test]
async fn test_redeploy_reuses_distribution() {
    let h = harness(base_settings());
    h.pages.add_page(test_page("page-1"));

    let first = h
        .engine
        .deploy("page-1", DeployRequest::default())
        .await
        .unwrap();
    let second = h
        .engine
        .deploy("page-1", DeployRequest::default())
        .await
        .unwrap();

    assert_eq!(second.distribution_id, first.distribution_id);
    assert_eq!(h.cdn.create_calls(), 1);
    // One origin scan per deploy; the second one found the distribution
    assert_eq!(h.cdn.list_calls(), 2);
    assert_eq!(h.objects.create_bucket_calls(), 1);
    assert_eq!(h.cdn.invalidation_calls(), 2);

    let info = h.engine.get_info("page-1").await.unwrap();
    assert_eq!(info.deploy_count, 2);
    assert_eq!(info.error_count, 0);
}

#[tokio::test]
async fn test_custom_domain_deploy_sets_alias_and_dns() {
    let mut settings = base_settings();
    settings.publish.certificate_arn =
        Some("arn:aws:acm:us-east-1:123456789012:certificate/abc".to_string());
    settings.publish.hosted_zone_id = Some("Z123".to_string());

    let h = harness(settings);
    h.pages.add_page(test_page("page-1"));

    let request = DeployRequest {
        custom_domain: Some("promo.example.com".to_string()),
        subdomain: None,
    };
    let outcome = h.engine.deploy("page-1", request).await.unwrap();

    assert_eq!(outcome.url, Some("https://promo.example.com".to_string()));

    let distribution = h.cdn.distribution(&outcome.distribution_id.unwrap()).unwrap();
    assert_eq!(distribution.aliases, vec!["promo.example.com".to_string()]);

    let records = h.dns.records();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].hosted_zone_id, "Z123");
    assert_eq!(records[0].record_name, "promo.example.com");
    assert_eq!(records[0].target, distribution.domain_name);
}

#[tokio::test]
async fn test_custom_domain_without_certificate_fails() {
    let h = harness(base_settings());
    h.pages.add_page(test_page("page-1"));

    let request = DeployRequest {
        custom_domain: Some("promo.example.com".to_string()),
        subdomain: None,
    };
    let err = h.engine.deploy("page-1", request).await.unwrap_err();
    assert!(matches!(err, DeployError::ConfigError(_)));

    // The failure landed on the record, after the upload already happened
    let info = h.engine.get_info("page-1").await.unwrap();
    assert_eq!(info.status, DeployState::Failed);
    assert_eq!(info.error_count, 1);
    assert!(info.last_error.unwrap().contains("certificate_arn"));
    assert!(h.objects.object("sites", "page-1/index.html").is_some());
    assert_eq!(h.cdn.create_calls(), 0);
}

#[tokio::test]
async fn test_wildcard_dns_skips_upserts() {
    let mut settings = base_settings();
    settings.publish.base_domain = Some("pages.example.com".to_string());
    settings.publish.wildcard_dns = true;
    settings.publish.certificate_arn =
        Some("arn:aws:acm:us-east-1:123456789012:certificate/abc".to_string());

    let h = harness(settings);
    h.pages.add_page(test_page("page-1"));

    let request = DeployRequest {
        custom_domain: None,
        subdomain: Some("demo".to_string()),
    };
    let outcome = h.engine.deploy("page-1", request).await.unwrap();

    assert_eq!(outcome.url, Some("https://demo.pages.example.com".to_string()));
    assert_eq!(h.dns.upsert_calls(), 0);

    // Subdomain pages are published under the subdomain path
    assert!(h.objects.object("sites", "demo/index.html").is_some());
}

#[tokio::test]
async fn test_bare_deploy_under_wildcard_base_domain() {
    let mut settings = base_settings();
    settings.publish.base_domain = Some("pages.example.com".to_string());
    settings.publish.wildcard_dns = true;

    let h = harness(settings);
    h.pages.add_page(test_page("page-1"));

    let outcome = h
        .engine
        .deploy("page-1", DeployRequest::default())
        .await
        .unwrap();

    // No domain requested: page-id path, no DNS, distribution hostname URL
    assert_eq!(outcome.status, DeployState::Deployed);
    assert_eq!(outcome.subdomain, None);
    assert!(h.objects.object("sites", "page-1/index.html").is_some());
    assert_eq!(h.dns.upsert_calls(), 0);

    let hostname = outcome.distribution_hostname.unwrap();
    assert_eq!(outcome.url, Some(format!("https://{}", hostname)));
}

#[tokio::test]
async fn test_configured_wildcard_distribution_short_circuits() {
    let mut settings = base_settings();
    settings.publish.wildcard_distribution_id = Some("EWILD".to_string());

    let h = harness(settings);
    h.cdn.add_distribution(DistributionInfo {
        id: "EWILD".to_string(),
        domain_name: "dwild.cloudfront.test".to_string(),
        status: "Deployed".to_string(),
        enabled: true,
        origin_domains: vec![],
        aliases: vec![],
    });
    h.pages.add_page(test_page("page-1"));

    let outcome = h
        .engine
        .deploy("page-1", DeployRequest::default())
        .await
        .unwrap();

    assert_eq!(outcome.distribution_id.as_deref(), Some("EWILD"));
    assert_eq!(h.cdn.create_calls(), 0);
    assert_eq!(h.cdn.list_calls(), 0);
}

#[tokio::test]
async fn test_prebuilt_artifact_is_published_verbatim() {
    let h = harness(base_settings());
    let mut page = test_page("page-1");
    page.artifact_key = Some("artifacts/page-1.html".to_string());
    h.pages.add_page(page);
    h.objects.insert_object(
        "sites",
        "artifacts/page-1.html",
        b"<html>prebuilt</html>",
        "text/html",
    );

    h.engine
        .deploy("page-1", DeployRequest::default())
        .await
        .unwrap();

    let object = h.objects.object("sites", "page-1/index.html").unwrap();
    assert_eq!(object.body, b"<html>prebuilt</html>");

    let info = h.engine.get_info("page-1").await.unwrap();
    assert_eq!(info.build_size_bytes, Some(21));
}

#[tokio::test]
async fn test_missing_artifact_falls_back_to_generated() {
    let h = harness(base_settings());
    let mut page = test_page("page-1");
    page.artifact_key = Some("artifacts/never-built.html".to_string());
    h.pages.add_page(page);

    h.engine
        .deploy("page-1", DeployRequest::default())
        .await
        .unwrap();

    let object = h.objects.object("sites", "page-1/index.html").unwrap();
    let html = String::from_utf8(object.body).unwrap();
    assert!(html.contains("__PAGE_CONTENT__"));
}

#[tokio::test]
async fn test_deploy_unknown_page_leaves_no_record() {
    let h = harness(base_settings());

    let err = h
        .engine
        .deploy("ghost", DeployRequest::default())
        .await
        .unwrap_err();
    assert!(matches!(err, DeployError::NotFound(_)));

    assert!(matches!(
        h.engine.get_info("ghost").await.unwrap_err(),
        DeployError::NotFound(_)
    ));
    assert!(h.engine.list().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_failed_create_recovers_on_retry() {
    let h = harness(base_settings());
    h.pages.add_page(test_page("page-1"));

    h.cdn.fail_creates(true);
    let err = h
        .engine
        .deploy("page-1", DeployRequest::default())
        .await
        .unwrap_err();
    assert!(matches!(err, DeployError::CdnError(_)));

    let info = h.engine.get_info("page-1").await.unwrap();
    assert_eq!(info.status, DeployState::Failed);
    assert_eq!(info.deploy_count, 0);
    assert_eq!(info.error_count, 1);

    h.cdn.fail_creates(false);
    let outcome = h
        .engine
        .deploy("page-1", DeployRequest::default())
        .await
        .unwrap();
    assert_eq!(outcome.status, DeployState::Deployed);

    let info = h.engine.get_info("page-1").await.unwrap();
    assert_eq!(info.deploy_count, 1);
    assert_eq!(info.error_count, 1);

    // The retry reused the bucket from the failed run
    assert_eq!(h.objects.create_bucket_calls(), 1);
}

#[tokio::test]
async fn test_dns_failure_keeps_distribution_for_retry() {
    let mut settings = base_settings();
    settings.publish.certificate_arn =
        Some("arn:aws:acm:us-east-1:123456789012:certificate/abc".to_string());
    settings.publish.hosted_zone_id = Some("Z123".to_string());

    let h = harness(settings);
    h.pages.add_page(test_page("page-1"));

    h.dns.fail_upserts(true);
    let request = DeployRequest {
        custom_domain: Some("promo.example.com".to_string()),
        subdomain: None,
    };
    let err = h.engine.deploy("page-1", request.clone()).await.unwrap_err();
    assert!(matches!(err, DeployError::DnsError(_)));

    let info = h.engine.get_info("page-1").await.unwrap();
    assert_eq!(info.status, DeployState::Failed);
    assert!(info.distribution_id.is_some());

    h.dns.fail_upserts(false);
    let outcome = h.engine.deploy("page-1", request).await.unwrap();
    assert_eq!(outcome.status, DeployState::Deployed);
    assert_eq!(h.cdn.create_calls(), 1);
    assert_eq!(h.dns.upsert_calls(), 2);
}

#[tokio::test]
async fn test_invalidate_deployed_page() {
    let h = harness(base_settings());
    h.pages.add_page(test_page("page-1"));

    let outcome = h
        .engine
        .deploy("page-1", DeployRequest::default())
        .await
        .unwrap();
    let invalidation = h.engine.invalidate("page-1").await.unwrap();
    assert!(!invalidation.id.is_empty());

    let invalidations = h.cdn.invalidations();
    assert_eq!(invalidations.len(), 2);
    assert_eq!(invalidations[1].0, outcome.distribution_id.unwrap());
    assert_eq!(invalidations[1].1, vec!["/*".to_string()]);
}

#[tokio::test]
async fn test_invalidate_without_distribution_is_a_state_error() {
    let h = harness(base_settings());
    h.pages.add_page(test_page("page-1"));

    // A failed first deploy leaves a record with no distribution
    h.cdn.fail_creates(true);
    h.engine
        .deploy("page-1", DeployRequest::default())
        .await
        .unwrap_err();

    let err = h.engine.invalidate("page-1").await.unwrap_err();
    assert!(matches!(err, DeployError::StateError(_)));

    // And no record at all is simply not found
    let err = h.engine.invalidate("page-2").await.unwrap_err();
    assert!(matches!(err, DeployError::NotFound(_)));
}

#[tokio::test]
async fn test_teardown_disables_and_removes() {
    let h = harness(base_settings());
    h.pages.add_page(test_page("page-1"));

    h.engine
        .deploy("page-1", DeployRequest::default())
        .await
        .unwrap();
    h.engine.teardown("page-1").await.unwrap();

    assert_eq!(h.cdn.disable_calls(), 1);
    assert!(matches!(
        h.engine.get_info("page-1").await.unwrap_err(),
        DeployError::NotFound(_)
    ));

    // Storage objects are left in place
    assert!(h.objects.object("sites", "page-1/index.html").is_some());

    // The backend learned about the unpublish
    let updates = h.pages.updates();
    let last = updates.last().unwrap();
    assert_eq!(last.0, "page-1");
    assert!(!last.1.published);
    assert_eq!(last.1.published_url, None);

    // Tearing down again is not found
    assert!(matches!(
        h.engine.teardown("page-1").await.unwrap_err(),
        DeployError::NotFound(_)
    ));
}

#[tokio::test]
async fn test_teardown_without_distribution_makes_no_cdn_calls() {
    let h = harness(base_settings());
    h.pages.add_page(test_page("page-1"));

    h.cdn.fail_creates(true);
    h.engine
        .deploy("page-1", DeployRequest::default())
        .await
        .unwrap_err();

    h.engine.teardown("page-1").await.unwrap();
    assert_eq!(h.cdn.disable_calls(), 0);
}

#[tokio::test]
async fn test_auto_subdomain_derives_from_slug() {
    let mut settings = base_settings();
    settings.publish.base_domain = Some("pages.example.com".to_string());
    settings.publish.wildcard_dns = true;
    settings.publish.auto_subdomain = true;
    settings.publish.certificate_arn =
        Some("arn:aws:acm:us-east-1:123456789012:certificate/abc".to_string());

    let h = harness(settings);
    h.pages.add_page(test_page("page-1"));

    let outcome = h
        .engine
        .deploy("page-1", DeployRequest::default())
        .await
        .unwrap();

    assert_eq!(outcome.subdomain.as_deref(), Some("spring-launch"));
    assert_eq!(
        outcome.url,
        Some("https://spring-launch.pages.example.com".to_string())
    );
}

#[tokio::test]
async fn test_stale_deploying_record_is_taken_over() {
    let h = harness(base_settings());
    h.pages.add_page(test_page("page-1"));

    h.engine
        .deploy("page-1", DeployRequest::default())
        .await
        .unwrap();

    // Simulate a crash mid-deploy: the record is stuck in deploying
    let store = DeploymentStore::new(Dir::new(h.data_dir.path().join("deployments")));
    let mut record = store.load("page-1").await.unwrap().unwrap();
    record.status = DeployState::Deploying;
    store.save(&mut record).await.unwrap();

    let outcome = h
        .engine
        .deploy("page-1", DeployRequest::default())
        .await
        .unwrap();
    assert_eq!(outcome.status, DeployState::Deployed);
}

#[tokio::test]
async fn test_list_returns_all_deployments() {
    let h = harness(base_settings());
    h.pages.add_page(test_page("page-a"));
    h.pages.add_page(test_page("page-b"));

    h.engine
        .deploy("page-a", DeployRequest::default())
        .await
        .unwrap();
    h.engine
        .deploy("page-b", DeployRequest::default())
        .await
        .unwrap();

    let summaries = h.engine.list().await.unwrap();
    let ids: Vec<&str> = summaries.iter().map(|s| s.page_id.as_str()).collect();
    assert_eq!(ids, vec!["page-a", "page-b"]);
    assert!(summaries.iter().all(|s| s.status == DeployState::Deployed));
}
