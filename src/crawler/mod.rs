//! Crawler module for discovery, classification and orchestration
//!
//! This module contains the core harvesting logic, including:
//! - HTTP client construction
//! - Sitemap fetching and parsing
//! - URL classification probes
//! - Admission control (concurrency, sliding window quota, timeouts)
//! - Overall pipeline coordination and shutdown signals

pub mod admission;
mod classifier;
mod coordinator;
mod http;
mod session;
mod shutdown;
mod sitemap;

pub use admission::{AdmissionConfig, AdmissionController, Admitted};
pub use classifier::{
    default_classifier_quota, is_html_content_type, PageProbeResult, UrlClassifier,
    NO_RESPONSE_STATUS, UNKNOWN_CONTENT_TYPE,
};
pub use coordinator::{Coordinator, PipelineOptions};
pub use http::{build_http_client, build_probe_client, user_agent};
pub use session::{expand_home, session_file_name, today_session_path};
pub use shutdown::listen_for_shutdown;
pub use sitemap::{parse_sitemap, SitemapReader};
