//! Result sink implementations
//!
//! - `JsonDirectorySink` writes one JSON file per fetched report plus a run summary
//! - `LoggingSink` only logs
//! - `MemorySink` keeps everything in memory, for tests and library callers

use crate::output::traits::{OutputError, OutputResult, ResultSink, RunSummary};
use crate::state::Strategy;
use crate::storage::QueueItem;
use crate::HarvestError;
use serde_json::{json, Value};
use std::fs;
use std::path::{Path, PathBuf};

/// Longest URL slug used in a report file name
const MAX_SLUG_LEN: usize = 120;

/// File name for a report: `<id>_<url slug>___<STRATEGY>.json`
pub fn report_file_name(id: i64, url: &str, strategy: Strategy) -> String {
    let stripped = url
        .strip_prefix("https://")
        .or_else(|| url.strip_prefix("http://"))
        .unwrap_or(url);

    let mut slug: String = stripped
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect();
    let trimmed_len = slug.trim_end_matches('_').len();
    slug.truncate(trimmed_len.min(MAX_SLUG_LEN));

    format!("{}_{}___{}.json", id, slug, strategy.as_str())
}

/// Writes every fetched report into a directory
pub struct JsonDirectorySink {
    directory: PathBuf,
    errors: Vec<Value>,
    written: usize,
}

impl JsonDirectorySink {
    /// Creates a sink writing into `directory`, which is created if missing
    pub fn new(directory: impl Into<PathBuf>) -> OutputResult<Self> {
        let directory = directory.into();
        fs::create_dir_all(&directory)?;

        Ok(Self {
            directory,
            errors: Vec::new(),
            written: 0,
        })
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// Number of report files written so far
    pub fn written(&self) -> usize {
        self.written
    }

    fn write_json(&self, file_name: &str, value: &Value) -> OutputResult<()> {
        let path = self.directory.join(file_name);
        let content = serde_json::to_string_pretty(value)?;
        fs::write(&path, content).map_err(|e| {
            OutputError::Write(format!("could not write {}: {}", path.display(), e))
        })
    }
}

impl ResultSink for JsonDirectorySink {
    fn on_begin(&mut self) -> OutputResult<()> {
        tracing::info!("Writing reports to {}", self.directory.display());
        Ok(())
    }

    fn store_result(&mut self, item: &QueueItem, report: &Value) -> OutputResult<()> {
        let file_name = report_file_name(item.id, &item.url, item.strategy);
        self.write_json(&file_name, report)?;
        self.written += 1;
        tracing::debug!("Wrote {}", file_name);
        Ok(())
    }

    fn store_error(&mut self, item: &QueueItem, error: &HarvestError) -> OutputResult<()> {
        self.errors.push(json!({
            "id": item.id,
            "url": item.url,
            "strategy": item.strategy,
            "error": error.to_string(),
        }));
        Ok(())
    }

    fn on_end(&mut self, summary: &RunSummary) -> OutputResult<()> {
        let value = json!({
            "status": "DONE",
            "summary": summary,
            "errors": self.errors,
        });
        self.write_json("run-summary.json", &value)
    }

    fn on_fatal(&mut self, error: &HarvestError) -> OutputResult<()> {
        let value = json!({
            "status": "FATAL",
            "error": error.to_string(),
            "errors": self.errors,
        });
        self.write_json("run-summary.json", &value)
    }
}

/// Sink that only logs outcomes
#[derive(Debug, Default)]
pub struct LoggingSink;

impl ResultSink for LoggingSink {
    fn on_begin(&mut self) -> OutputResult<()> {
        Ok(())
    }

    fn store_result(&mut self, item: &QueueItem, _report: &Value) -> OutputResult<()> {
        tracing::debug!("Fetched {} ({})", item.url, item.strategy);
        Ok(())
    }

    fn store_error(&mut self, item: &QueueItem, error: &HarvestError) -> OutputResult<()> {
        tracing::warn!("Failed {} ({}): {}", item.url, item.strategy, error);
        Ok(())
    }

    fn on_end(&mut self, summary: &RunSummary) -> OutputResult<()> {
        tracing::info!(
            "Run finished: {} processed, {} fetched, {} failed",
            summary.processed,
            summary.fetched,
            summary.failed
        );
        Ok(())
    }

    fn on_fatal(&mut self, error: &HarvestError) -> OutputResult<()> {
        tracing::error!("Run aborted: {}", error);
        Ok(())
    }
}

/// Sink that records every call in memory
#[derive(Debug, Default)]
pub struct MemorySink {
    pub began: bool,
    pub results: Vec<(QueueItem, Value)>,

    /// Failed items with the error rendered as text
    pub errors: Vec<(QueueItem, String)>,

    pub summary: Option<RunSummary>,
    pub fatal: Option<String>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ResultSink for MemorySink {
    fn on_begin(&mut self) -> OutputResult<()> {
        self.began = true;
        Ok(())
    }

    fn store_result(&mut self, item: &QueueItem, report: &Value) -> OutputResult<()> {
        self.results.push((item.clone(), report.clone()));
        Ok(())
    }

    fn store_error(&mut self, item: &QueueItem, error: &HarvestError) -> OutputResult<()> {
        self.errors.push((item.clone(), error.to_string()));
        Ok(())
    }

    fn on_end(&mut self, summary: &RunSummary) -> OutputResult<()> {
        self.summary = Some(summary.clone());
        Ok(())
    }

    fn on_fatal(&mut self, error: &HarvestError) -> OutputResult<()> {
        self.fatal = Some(error.to_string());
        Ok(())
    }
}
