//! Quota-bound batch processing of insights requests
//!
//! `InsightsProcessor` fans a batch of queue items out to the insights API
//! under the API's documented quota and reports one outcome per item. A
//! failing item never aborts the batch.

use crate::crawler::admission::{AdmissionConfig, AdmissionController, Admitted};
use crate::insights::client::{Category, FetchOptions, InsightsClient};
use crate::storage::QueueItem;
use crate::HarvestError;
use serde_json::Value;
use std::time::Duration;

/// Default insights quota: 5 in flight, 400 per 100 s, 30 s per request
pub fn default_insights_quota() -> AdmissionConfig {
    AdmissionConfig {
        max_concurrent: 5,
        interval: Duration::from_secs(100),
        interval_cap: 400,
        timeout: Duration::from_secs(30),
    }
}

/// Per-item results of one batch
#[derive(Debug, Default)]
pub struct BatchOutcome {
    pub successes: Vec<(QueueItem, Value)>,
    pub failures: Vec<(QueueItem, HarvestError)>,
}

impl BatchOutcome {
    /// Number of items accounted for
    pub fn len(&self) -> usize {
        self.successes.len() + self.failures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Wraps an `InsightsClient` in its own admission controller
#[derive(Debug, Clone)]
pub struct InsightsProcessor {
    client: InsightsClient,
    admission: AdmissionController,
    categories: Vec<Category>,
}

impl InsightsProcessor {
    pub fn new(client: InsightsClient, admission: AdmissionController) -> Self {
        Self {
            client,
            admission,
            categories: Category::all(),
        }
    }

    /// Restricts the categories requested for every item
    pub fn with_categories(mut self, categories: Vec<Category>) -> Self {
        self.categories = categories;
        self
    }

    /// Processes a group of items and waits for every one to resolve
    ///
    /// The returned outcome holds exactly one entry per input item.
    pub async fn process_group(&self, items: Vec<QueueItem>) -> BatchOutcome {
        let results = self
            .admission
            .run_all(items, |item| async move {
                let options = FetchOptions {
                    categories: self.categories.clone(),
                    strategy: item.strategy,
                };
                self.client.fetch(&item.url, &options).await
            })
            .await;

        let mut outcome = BatchOutcome::default();
        for (item, admitted) in results {
            match admitted {
                Admitted::Completed(Ok(report)) => outcome.successes.push((item, report)),
                Admitted::Completed(Err(error)) => {
                    tracing::error!(
                        "Error fetching {} ({}): {}",
                        item.url,
                        item.strategy,
                        error
                    );
                    outcome.failures.push((item, error));
                }
                Admitted::TimedOut => {
                    tracing::error!("Timed out fetching {} ({})", item.url, item.strategy);
                    let error = HarvestError::Timeout {
                        url: item.url.clone(),
                    };
                    outcome.failures.push((item, error));
                }
            }
        }

        outcome
    }
}
