//! HTTP client construction
//!
//! Two flavours of client are used by the pipeline:
//! - a document client for the sitemap and the insights API, which follows redirects
//! - a probe client for classification HEAD requests, which never follows redirects

use reqwest::{redirect::Policy, Client};
use std::time::Duration;

/// User agent sent with every request: `pagespeed-harvest/<version>`
pub fn user_agent() -> String {
    format!("{}/{}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"))
}

/// Builds the client used for sitemap and insights API requests
///
/// # Arguments
///
/// * `request_timeout` - Total timeout for a single request
/// * `max_idle_per_host` - Keep-alive pool size per host
pub fn build_http_client(
    request_timeout: Duration,
    max_idle_per_host: usize,
) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(user_agent())
        .timeout(request_timeout)
        .connect_timeout(Duration::from_secs(10))
        .pool_max_idle_per_host(max_idle_per_host)
        .gzip(true)
        .brotli(true)
        .build()
}

/// Builds the client used for classification probes
///
/// Redirects are reported as-is so a 301/302 is classified by its own status.
pub fn build_probe_client(
    request_timeout: Duration,
    max_idle_per_host: usize,
) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(user_agent())
        .timeout(request_timeout)
        .connect_timeout(Duration::from_secs(10))
        .pool_max_idle_per_host(max_idle_per_host)
        .redirect(Policy::none())
        .build()
}
