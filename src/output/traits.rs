//! Result sink traits and types
//!
//! This module defines the capability interface through which the pipeline
//! hands its per-item outcomes and final summary to consumers.

use crate::storage::QueueItem;
use crate::HarvestError;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

/// Errors that can occur during output operations
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Failed to write output: {0}")]
    Write(String),
}

/// Result type for output operations
pub type OutputResult<T> = Result<T, OutputError>;

/// Counters describing one pipeline run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    /// URLs listed in the sitemap
    pub discovered: usize,

    /// URLs probed this run (sitemap minus already-known URLs)
    pub classified: usize,

    /// Probed URLs added to the ignore list
    pub ignored: usize,

    /// Queue items created this run
    pub enqueued: usize,

    /// Queue items that went through the insights API this run
    pub processed: usize,

    pub fetched: usize,
    pub failed: usize,

    /// True when the drain loop stopped on a shutdown request
    pub interrupted: bool,
}

/// Trait for result sinks
///
/// A sink sees one `on_begin`, then any number of `store_result` and
/// `store_error` calls, then exactly one of `on_end` or `on_fatal`.
pub trait ResultSink {
    /// Called once before the first batch is processed
    fn on_begin(&mut self) -> OutputResult<()>;

    /// Records a fetched report
    ///
    /// # Arguments
    ///
    /// * `item` - The queue item, already marked FETCHED
    /// * `report` - The opaque insights report
    fn store_result(&mut self, item: &QueueItem, report: &Value) -> OutputResult<()>;

    /// Records a failed fetch
    fn store_error(&mut self, item: &QueueItem, error: &HarvestError) -> OutputResult<()>;

    /// Called once when the run completes normally
    fn on_end(&mut self, summary: &RunSummary) -> OutputResult<()>;

    /// Called once when the run aborts
    fn on_fatal(&mut self, error: &HarvestError) -> OutputResult<()>;
}
