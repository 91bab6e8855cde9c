//! Pipeline coordinator - main harvest orchestration logic
//!
//! This module wires the stages of a run together:
//! - Recovering items an interrupted run left in PROCESSING
//! - Discovering URLs from the sitemap
//! - Dropping URLs the session already knows about
//! - Classifying the rest and triaging them into the queue or the ignore list
//! - Draining the queue batch by batch under the insights quota
//!
//! The store is the source of truth for resumption: a run restarted against
//! the same session database neither re-probes nor re-fetches known URLs.

use crate::config::HarvestConfig;
use crate::crawler::admission::AdmissionController;
use crate::crawler::classifier::{PageProbeResult, UrlClassifier};
use crate::crawler::http::{build_http_client, build_probe_client};
use crate::crawler::sitemap::SitemapReader;
use crate::insights::{InsightsClient, InsightsProcessor};
use crate::output::{ResultSink, RunSummary};
use crate::state::{ItemStatus, Strategy};
use crate::storage::{NewIgnoreEntry, NewQueueItem, QueueFilter, QueueStore};
use crate::{HarvestError, Result};
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

/// Pipeline behaviour knobs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineOptions {
    /// Strategies to enqueue for every eligible URL
    pub strategies: Vec<Strategy>,

    /// Queue items claimed per drain round
    pub batch_size: usize,

    /// Move PROCESSING items back to QUEUED before anything else
    pub requeue_interrupted: bool,
}

impl PipelineOptions {
    pub fn from_config(config: &HarvestConfig) -> Self {
        Self {
            strategies: config.insights.strategies.clone(),
            batch_size: config.pipeline.batch_size,
            requeue_interrupted: config.pipeline.requeue_interrupted,
        }
    }
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            strategies: Strategy::all(),
            batch_size: 20,
            requeue_interrupted: true,
        }
    }
}

/// Main pipeline coordinator structure
pub struct Coordinator<'a> {
    sitemap: SitemapReader,
    classifier: UrlClassifier,
    processor: InsightsProcessor,
    store: &'a mut dyn QueueStore,
    sink: &'a mut dyn ResultSink,
    options: PipelineOptions,
    shutdown: Arc<AtomicBool>,
}

impl<'a> Coordinator<'a> {
    /// Creates a new coordinator instance
    ///
    /// # Arguments
    ///
    /// * `sitemap` - Reader for the site's sitemap
    /// * `classifier` - Probe stage, with its own quota
    /// * `processor` - Insights stage, with its own quota
    /// * `store` - The session store; it stays open when the run ends
    /// * `sink` - Receives per-item outcomes and the final summary
    /// * `options` - Pipeline behaviour
    pub fn new(
        sitemap: SitemapReader,
        classifier: UrlClassifier,
        processor: InsightsProcessor,
        store: &'a mut dyn QueueStore,
        sink: &'a mut dyn ResultSink,
        options: PipelineOptions,
    ) -> Self {
        Self {
            sitemap,
            classifier,
            processor,
            store,
            sink,
            options,
            shutdown: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Builds every stage from a validated configuration
    ///
    /// The sitemap reader and the insights client share one redirect-following
    /// client; classification probes get their own client with redirects off.
    pub fn from_config(
        config: &HarvestConfig,
        store: &'a mut dyn QueueStore,
        sink: &'a mut dyn ResultSink,
    ) -> Result<Self> {
        let insights_quota = config.insights.quota.to_admission_config();
        let classifier_quota = config.classifier.to_admission_config();

        let document_client =
            build_http_client(insights_quota.timeout, insights_quota.max_concurrent).map_err(
                |source| HarvestError::Transport {
                    url: config.insights.endpoint.clone(),
                    source,
                },
            )?;
        let probe_client = build_probe_client(
            classifier_quota.timeout,
            classifier_quota.max_concurrent,
        )
        .map_err(|source| HarvestError::Transport {
            url: String::new(),
            source,
        })?;

        let client = InsightsClient::new(
            document_client.clone(),
            config.insights.endpoint.clone(),
            config.insights.api_key.clone(),
        )?;
        let processor = InsightsProcessor::new(client, AdmissionController::new(insights_quota))
            .with_categories(config.insights.categories.clone());
        let classifier =
            UrlClassifier::new(probe_client, AdmissionController::new(classifier_quota));

        Ok(Self::new(
            SitemapReader::new(document_client),
            classifier,
            processor,
            store,
            sink,
            PipelineOptions::from_config(config),
        ))
    }

    /// Uses an externally owned shutdown flag
    pub fn with_shutdown(mut self, shutdown: Arc<AtomicBool>) -> Self {
        self.shutdown = shutdown;
        self
    }

    /// Runs the whole pipeline against one sitemap
    ///
    /// On success the sink receives `on_end` with the returned summary. On
    /// failure it receives `on_fatal` and the store is left as it was at the
    /// point of failure.
    pub async fn run(&mut self, sitemap_url: &str) -> Result<RunSummary> {
        match self.execute(sitemap_url).await {
            Ok(summary) => {
                self.sink.on_end(&summary)?;
                Ok(summary)
            }
            Err(e) => {
                tracing::error!("Harvest failed: {}", e);
                if let Err(sink_error) = self.sink.on_fatal(&e) {
                    tracing::warn!("Result sink failed to record the error: {}", sink_error);
                }
                Err(e)
            }
        }
    }

    async fn execute(&mut self, sitemap_url: &str) -> Result<RunSummary> {
        let mut summary = RunSummary::default();
        self.sink.on_begin()?;

        if self.options.requeue_interrupted {
            self.recover()?;
        }

        let urls = match self.sitemap.fetch(sitemap_url).await {
            Ok(urls) => urls,
            Err(e) => {
                tracing::error!("Could not fetch sitemap {}", sitemap_url);
                return Err(e);
            }
        };
        summary.discovered = urls.len();
        tracing::info!("Sitemap lists {} URLs", urls.len());

        let candidates = self.unknown_urls(urls)?;
        summary.classified = candidates.len();
        tracing::info!("{} URLs are new to this session", candidates.len());

        let probes = self.classifier.fetch(candidates).await;
        let (ignored, enqueued) = self.triage(probes)?;
        summary.ignored = ignored;
        summary.enqueued = enqueued;
        tracing::info!("Ignored {} URLs, enqueued {} items", ignored, enqueued);

        self.drain(&mut summary).await?;

        tracing::info!(
            "Finished: {} processed, {} fetched, {} failed",
            summary.processed,
            summary.fetched,
            summary.failed
        );

        Ok(summary)
    }

    /// Returns items stranded in PROCESSING to the queue
    fn recover(&mut self) -> Result<()> {
        let moved = self
            .store
            .requeue_status(ItemStatus::Processing, ItemStatus::Queued)?;
        if moved > 0 {
            tracing::info!("Requeued {} items left in PROCESSING by an earlier run", moved);
        }
        Ok(())
    }

    /// Drops URLs already in the queue or on the ignore list
    ///
    /// Duplicates within the sitemap itself are collapsed too, keeping the
    /// first occurrence.
    fn unknown_urls(&self, urls: Vec<String>) -> Result<Vec<String>> {
        let mut known: HashSet<String> = self
            .store
            .all_items(&QueueFilter::all())?
            .into_iter()
            .map(|item| item.url)
            .collect();
        known.extend(self.store.ignore_entries(None)?.into_iter().map(|e| e.url));

        Ok(urls
            .into_iter()
            .filter(|url| known.insert(url.clone()))
            .collect())
    }

    /// Writes ignore entries and queue items for a set of probe results
    ///
    /// Returns the number of ignored URLs and the number of enqueued items.
    fn triage(&mut self, probes: Vec<PageProbeResult>) -> Result<(usize, usize)> {
        let (eligible, rejected): (Vec<_>, Vec<_>) =
            probes.into_iter().partition(PageProbeResult::is_html_page);

        let ignore_entries: Vec<NewIgnoreEntry> = rejected
            .into_iter()
            .map(|probe| {
                tracing::debug!(
                    "Ignoring {} (status {}, {})",
                    probe.url,
                    probe.status,
                    probe.content_type
                );
                NewIgnoreEntry {
                    url: probe.url,
                    http_status: probe.status,
                    content_type: probe.content_type,
                }
            })
            .collect();

        let items: Vec<NewQueueItem> = eligible
            .iter()
            .flat_map(|probe| {
                self.options
                    .strategies
                    .iter()
                    .map(move |strategy| NewQueueItem::new(probe.url.clone(), *strategy))
            })
            .collect();

        if !ignore_entries.is_empty() {
            self.store.add_ignore_entries(&ignore_entries)?;
        }
        if !items.is_empty() {
            self.store.enqueue(&items)?;
        }

        Ok((ignore_entries.len(), items.len()))
    }

    /// Processes QUEUED items batch by batch until none are left
    async fn drain(&mut self, summary: &mut RunSummary) -> Result<()> {
        let start_time = Instant::now();

        loop {
            if self.shutdown.load(Ordering::SeqCst) {
                tracing::info!(
                    "Shutdown requested, stopping after {} items",
                    summary.processed
                );
                summary.interrupted = true;
                break;
            }

            let batch = self
                .store
                .next_batch(ItemStatus::Queued, self.options.batch_size)?;
            if batch.is_empty() {
                break;
            }

            for item in &batch {
                self.store
                    .update_status(item.id, ItemStatus::Processing, None, None)?;
            }

            let outcome = self.processor.process_group(batch).await;
            let batch_len = outcome.len();

            // Every outcome is persisted before any is forwarded, so a failing
            // sink cannot strand fetched items in PROCESSING.
            let mut fetched = Vec::with_capacity(outcome.successes.len());
            for (mut item, report) in outcome.successes {
                self.store
                    .update_status(item.id, ItemStatus::Fetched, None, Some(&report))?;
                item.status = ItemStatus::Fetched;
                fetched.push((item, report));
            }

            let mut failed = Vec::with_capacity(outcome.failures.len());
            for (mut item, error) in outcome.failures {
                let message = error.to_string();
                self.store
                    .update_status(item.id, ItemStatus::Failed, Some(&message), None)?;
                item.status = ItemStatus::Failed;
                item.error_message = Some(message);
                failed.push((item, error));
            }

            summary.fetched += fetched.len();
            summary.failed += failed.len();

            for (item, report) in &fetched {
                self.sink.store_result(item, report)?;
            }
            for (item, error) in &failed {
                self.sink.store_error(item, error)?;
            }

            summary.processed += batch_len;

            let rate = summary.processed as f64 / start_time.elapsed().as_secs_f64().max(0.001);
            tracing::info!(
                "Processed {} items ({} total, {:.2} items/sec)",
                batch_len,
                summary.processed,
                rate
            );
        }

        Ok(())
    }
}
