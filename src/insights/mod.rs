//! PageSpeed Insights access
//!
//! - `client`: one request per (url, strategy), no retries or throttling;
//!   also backs the single-report command
//! - `processor`: batch fan-out of queue items under the API quota

mod client;
mod processor;

pub use client::{fetch_one_report, Category, FetchOptions, InsightsClient, DEFAULT_ENDPOINT};
pub use processor::{default_insights_quota, BatchOutcome, InsightsProcessor};
