//! Integration tests for Pagespeed-Harvest
//!
//! These tests use wiremock to stand in for the site under test and for the
//! insights API, and drive the pipeline end-to-end.

mod common;
mod pipeline_tests;
