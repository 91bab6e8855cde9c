//! PageSpeed Insights API client
//!
//! A pure protocol adapter: one call, one report. It neither retries nor
//! rate-limits; both belong to the caller.

use crate::config::InsightsSettings;
use crate::crawler::build_http_client;
use crate::state::Strategy;
use crate::{ConfigError, HarvestError, Result};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Default PageSpeed Insights endpoint
pub const DEFAULT_ENDPOINT: &str = "https://www.googleapis.com/pagespeedonline/v5/runPagespeed";

/// Lighthouse category to run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Category {
    Accessibility,
    BestPractices,
    Performance,
    Pwa,
    Seo,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Accessibility => "ACCESSIBILITY",
            Self::BestPractices => "BEST_PRACTICES",
            Self::Performance => "PERFORMANCE",
            Self::Pwa => "PWA",
            Self::Seo => "SEO",
        }
    }

    pub fn all() -> Vec<Self> {
        vec![
            Self::Accessibility,
            Self::BestPractices,
            Self::Performance,
            Self::Pwa,
            Self::Seo,
        ]
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Options for a single report request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchOptions {
    pub categories: Vec<Category>,
    pub strategy: Strategy,
}

impl FetchOptions {
    pub fn new(strategy: Strategy) -> Self {
        Self {
            categories: Category::all(),
            strategy,
        }
    }
}

/// Client for the PageSpeed Insights `runPagespeed` endpoint
#[derive(Debug, Clone)]
pub struct InsightsClient {
    client: Client,
    endpoint: String,
    api_key: String,
}

impl InsightsClient {
    /// Creates a client
    ///
    /// # Errors
    ///
    /// Returns `HarvestError::Config` when the API key is empty.
    pub fn new(client: Client, endpoint: impl Into<String>, api_key: impl Into<String>) -> Result<Self> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(ConfigError::Validation("API key is required".to_string()).into());
        }

        Ok(Self {
            client,
            endpoint: endpoint.into(),
            api_key,
        })
    }

    /// Builds the query string pairs; categories repeat the `category` key
    pub fn query_pairs<'a>(&'a self, url: &'a str, options: &FetchOptions) -> Vec<(&'static str, &'a str)> {
        let mut pairs = Vec::with_capacity(options.categories.len() + 3);
        pairs.push(("url", url));
        for category in &options.categories {
            pairs.push(("category", category.as_str()));
        }
        pairs.push(("strategy", options.strategy.as_str()));
        pairs.push(("key", self.api_key.as_str()));
        pairs
    }

    /// Fetches one report
    ///
    /// # Errors
    ///
    /// * `HarvestError::Upstream` - non-2xx response
    /// * `HarvestError::Transport` - no response, or the body could not be read
    /// * `HarvestError::Json` - the body was not JSON
    pub async fn fetch(&self, url: &str, options: &FetchOptions) -> Result<Value> {
        tracing::debug!("Requesting {} report for {}", options.strategy, url);

        let response = self
            .client
            .get(&self.endpoint)
            .query(&self.query_pairs(url, options))
            .send()
            .await
            .map_err(|source| HarvestError::Transport {
                url: url.to_string(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            tracing::warn!(
                "Status {} returned for {} and strategy {}",
                status.as_u16(),
                url,
                options.strategy
            );
            return Err(HarvestError::Upstream {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let body = response
            .bytes()
            .await
            .map_err(|source| HarvestError::Transport {
                url: url.to_string(),
                source,
            })?;

        Ok(serde_json::from_slice(&body)?)
    }
}

/// Fetches a single report outside of any session
///
/// Builds a one-off client from the insights settings: endpoint, API key,
/// categories and the quota's request timeout. Nothing is rate-limited or
/// stored.
pub async fn fetch_one_report(
    settings: &InsightsSettings,
    url: &str,
    strategy: Strategy,
) -> Result<Value> {
    let http = build_http_client(
        std::time::Duration::from_millis(settings.quota.timeout_ms),
        1,
    )
    .map_err(|source| HarvestError::Transport {
        url: settings.endpoint.clone(),
        source,
    })?;

    let client = InsightsClient::new(http, settings.endpoint.clone(), settings.api_key.clone())?;
    let options = FetchOptions {
        categories: settings.categories.clone(),
        strategy,
    };
    client.fetch(url, &options).await
}
