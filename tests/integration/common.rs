//! Shared fixtures for integration tests

use pagespeed_harvest::config::{HarvestConfig, QuotaSettings};
use pagespeed_harvest::crawler::Coordinator;
use pagespeed_harvest::output::{MemorySink, RunSummary};
use pagespeed_harvest::storage::SqliteQueueStore;
use pagespeed_harvest::HarvestError;
use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const API_KEY: &str = "test-key";
pub const INSIGHTS_PATH: &str = "/pagespeedonline/v5/runPagespeed";

/// A quota loose enough to never throttle a test
pub fn fast_quota() -> QuotaSettings {
    QuotaSettings {
        max_concurrent: 10,
        interval_ms: 1000,
        interval_cap: 1000,
        timeout_ms: 5000,
    }
}

/// Configuration pointing the insights client at the mock server
pub fn test_config(server: &MockServer, batch_size: usize) -> HarvestConfig {
    let mut config = HarvestConfig::default();
    config.insights.api_key = API_KEY.to_string();
    config.insights.endpoint = format!("{}{}", server.uri(), INSIGHTS_PATH);
    config.insights.quota = fast_quota();
    config.classifier = fast_quota();
    config.pipeline.batch_size = batch_size;
    config
}

/// Renders a `<urlset>` sitemap for paths on the mock server
pub fn urlset(server: &MockServer, paths: &[&str]) -> String {
    let mut xml = String::from(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<urlset xmlns="http://www.sitemaps.org/schemas/sitemap/0.9">"#,
    );
    for p in paths {
        xml.push_str(&format!("<url><loc>{}{}</loc></url>", server.uri(), p));
    }
    xml.push_str("</urlset>");
    xml
}

pub fn sitemap_url(server: &MockServer) -> String {
    format!("{}/sitemap.xml", server.uri())
}

pub async fn mount_sitemap(server: &MockServer, body: String) {
    Mock::given(method("GET"))
        .and(path("/sitemap.xml"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(body)
                .insert_header("content-type", "application/xml"),
        )
        .mount(server)
        .await;
}

pub async fn mount_head(server: &MockServer, page: &str, status: u16, content_type: Option<&str>) {
    let mut response = ResponseTemplate::new(status);
    if let Some(content_type) = content_type {
        response = response.insert_header("content-type", content_type);
    }

    Mock::given(method("HEAD"))
        .and(path(page))
        .respond_with(response)
        .mount(server)
        .await;
}

/// Mounts a catch-all insights endpoint answering with a minimal report
pub async fn mount_insights_ok(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path(INSIGHTS_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "lighthouseResult": { "lighthouseVersion": "9.6.8" }
        })))
        .mount(server)
        .await;
}

/// Mounts the standard four-page site:
/// two HTML pages, one PDF and one missing page
pub async fn mount_standard_site(server: &MockServer) {
    mount_sitemap(server, urlset(server, &["/", "/about", "/doc.pdf", "/missing"])).await;
    mount_head(server, "/", 200, Some("text/html; charset=utf-8")).await;
    mount_head(server, "/about", 200, Some("TEXT/HTML")).await;
    mount_head(server, "/doc.pdf", 200, Some("application/pdf")).await;
    mount_head(server, "/missing", 404, Some("text/html")).await;
}

/// Runs the pipeline once against a store and an in-memory sink
pub async fn run_pipeline(
    config: &HarvestConfig,
    store: &mut SqliteQueueStore,
    sink: &mut MemorySink,
    sitemap_url: &str,
) -> Result<RunSummary, HarvestError> {
    let mut coordinator = Coordinator::from_config(config, store, sink)?;
    coordinator.run(sitemap_url).await
}

/// Number of requests with the given method the server has seen
pub async fn request_count(server: &MockServer, http_method: &str) -> usize {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .filter(|r| r.method.to_string() == http_method)
        .count()
}
