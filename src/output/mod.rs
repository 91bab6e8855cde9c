//! Output module for run results and session statistics
//!
//! This module handles:
//! - Handing fetched reports and per-item failures to result sinks
//! - Exporting stored reports from a session database
//! - Reading and printing session statistics

mod sinks;
pub mod stats;
mod traits;

pub use sinks::{report_file_name, JsonDirectorySink, LoggingSink, MemorySink};
pub use stats::{load_statistics, print_statistics, QueueStatistics};
pub use traits::{OutputError, OutputResult, ResultSink, RunSummary};

use crate::state::ItemStatus;
use crate::storage::{QueueFilter, QueueStore};
use crate::Result;

/// Hands every FETCHED report in a session to a sink
///
/// # Arguments
///
/// * `store` - The session store to read
/// * `sink` - Receives one `store_result` per fetched item
///
/// # Returns
///
/// * `Ok(usize)` - Number of reports exported
/// * `Err(HarvestError)` - Failed to read the store or write a report
pub fn export_reports(store: &dyn QueueStore, sink: &mut dyn ResultSink) -> Result<usize> {
    let items = store.all_items(&QueueFilter::with_status(ItemStatus::Fetched).include_report())?;

    sink.on_begin()?;
    let mut exported = 0;
    for item in &items {
        match &item.report {
            Some(report) => {
                sink.store_result(item, report)?;
                exported += 1;
            }
            None => tracing::warn!("Item {} is FETCHED but has no report", item.id),
        }
    }

    sink.on_end(&RunSummary {
        fetched: exported,
        ..RunSummary::default()
    })?;

    Ok(exported)
}
