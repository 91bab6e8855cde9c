use crate::config::types::HarvestConfig;

/// Values given on the command line; `None` keeps the file or default value
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub api_key: Option<String>,
    pub batch_size: Option<usize>,
    pub queue_data_directory: Option<String>,

    /// Concurrency for both the classifier and the insights processor
    pub max_concurrent_requests: Option<usize>,

    /// Classifier cap per one-second window
    pub max_requests_per_second: Option<usize>,

    /// Per-request timeout (milliseconds) for both stages
    pub request_timeout_ms: Option<u64>,

    pub requeue_interrupted: Option<bool>,
    pub report_directory: Option<String>,
}

impl ConfigOverrides {
    /// Applies every present value over `config`
    ///
    /// The insights quota window is never overridden from the command line:
    /// it mirrors the API's published limit.
    pub fn apply(&self, config: &mut HarvestConfig) {
        if let Some(api_key) = &self.api_key {
            config.insights.api_key = api_key.clone();
        }

        if let Some(batch_size) = self.batch_size {
            config.pipeline.batch_size = batch_size;
        }

        if let Some(directory) = &self.queue_data_directory {
            config.output.queue_data_directory = directory.clone();
        }

        if let Some(max_concurrent) = self.max_concurrent_requests {
            config.classifier.max_concurrent = max_concurrent;
            config.insights.quota.max_concurrent = max_concurrent;
        }

        if let Some(per_second) = self.max_requests_per_second {
            config.classifier.interval_ms = 1000;
            config.classifier.interval_cap = per_second;
        }

        if let Some(timeout_ms) = self.request_timeout_ms {
            config.classifier.timeout_ms = timeout_ms;
            config.insights.quota.timeout_ms = timeout_ms;
        }

        if let Some(requeue) = self.requeue_interrupted {
            config.pipeline.requeue_interrupted = requeue;
        }

        if let Some(directory) = &self.report_directory {
            config.output.report_directory = Some(directory.clone());
        }
    }
}
