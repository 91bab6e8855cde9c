//! URL classification probes
//!
//! Every sitemap URL is probed with a HEAD request (redirects not followed)
//! to learn its status and content type before any quota is spent on it.
//! A probe never fails: every outcome, including no response at all, is
//! reported as a `PageProbeResult`.

use crate::crawler::admission::{AdmissionConfig, AdmissionController, Admitted};
use reqwest::header::CONTENT_TYPE;
use reqwest::Client;
use std::time::Duration;

/// Status recorded when no response was received
pub const NO_RESPONSE_STATUS: i32 = -1;

/// Content type recorded when the response did not provide a usable one
pub const UNKNOWN_CONTENT_TYPE: &str = "unknown";

/// Outcome of probing a single URL
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageProbeResult {
    pub url: String,
    pub status: i32,
    pub content_type: String,
}

impl PageProbeResult {
    fn no_response(url: &str) -> Self {
        Self {
            url: url.to_string(),
            status: NO_RESPONSE_STATUS,
            content_type: UNKNOWN_CONTENT_TYPE.to_string(),
        }
    }

    /// True when the probe saw a 200 with an HTML content type
    pub fn is_html_page(&self) -> bool {
        self.status == 200 && is_html_content_type(&self.content_type)
    }
}

/// Permissive HTML check: the content type starts with `text/html`, any case
pub fn is_html_content_type(content_type: &str) -> bool {
    content_type
        .get(..9)
        .map(|prefix| prefix.eq_ignore_ascii_case("text/html"))
        .unwrap_or(false)
}

/// Default classifier quota: 5 in flight, 45 per second, 30 s per probe
pub fn default_classifier_quota() -> AdmissionConfig {
    AdmissionConfig {
        max_concurrent: 5,
        interval: Duration::from_millis(1000),
        interval_cap: 45,
        timeout: Duration::from_secs(30),
    }
}

/// Probes URLs for status and content type under its own quota
#[derive(Debug, Clone)]
pub struct UrlClassifier {
    client: Client,
    admission: AdmissionController,
}

impl UrlClassifier {
    /// Creates a classifier
    ///
    /// # Arguments
    ///
    /// * `client` - A client with redirects disabled (see `build_probe_client`)
    /// * `admission` - The quota this classifier runs under
    pub fn new(client: Client, admission: AdmissionController) -> Self {
        Self { client, admission }
    }

    /// Probes every URL and waits until all of them have resolved
    ///
    /// Callers must correlate results by `url`; no ordering is promised.
    pub async fn fetch(&self, urls: Vec<String>) -> Vec<PageProbeResult> {
        tracing::info!("Classifying {} URLs", urls.len());

        let results = self
            .admission
            .run_all(urls, |url| async move { self.probe(&url).await })
            .await;

        results
            .into_iter()
            .map(|(url, admitted)| match admitted {
                Admitted::Completed(result) => result,
                Admitted::TimedOut => {
                    tracing::error!("Probe timed out for {}", url);
                    PageProbeResult::no_response(&url)
                }
            })
            .collect()
    }

    /// Probes a single URL
    pub async fn probe(&self, url: &str) -> PageProbeResult {
        tracing::debug!("Fetching info for {}", url);

        let response = match self.client.head(url).send().await {
            Ok(response) => response,
            Err(e) => {
                tracing::error!("No response while probing {}: {}", url, e);
                return PageProbeResult::no_response(url);
            }
        };

        let status = response.status();

        if status.is_success() {
            let content_type = response
                .headers()
                .get(CONTENT_TYPE)
                .and_then(|v| v.to_str().ok())
                .unwrap_or(UNKNOWN_CONTENT_TYPE)
                .to_string();

            return PageProbeResult {
                url: url.to_string(),
                status: i32::from(status.as_u16()),
                content_type,
            };
        }

        if status.is_server_error() {
            tracing::error!("Server error {} while probing {}", status.as_u16(), url);
        }

        PageProbeResult {
            url: url.to_string(),
            status: i32::from(status.as_u16()),
            content_type: UNKNOWN_CONTENT_TYPE.to_string(),
        }
    }
}
