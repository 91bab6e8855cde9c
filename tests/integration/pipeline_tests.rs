//! End-to-end pipeline tests

use crate::common::*;
use pagespeed_harvest::crawler::Coordinator;
use pagespeed_harvest::output::{MemorySink, OutputError, OutputResult, ResultSink, RunSummary};
use pagespeed_harvest::storage::{
    NewQueueItem, QueueFilter, QueueItem, QueueStore, SqliteQueueStore,
};
use pagespeed_harvest::{HarvestError, ItemStatus, Strategy};
use serde_json::Value;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tempfile::TempDir;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Sink that refuses every report
#[derive(Default)]
struct RejectingSink {
    fatal: bool,
}

impl ResultSink for RejectingSink {
    fn on_begin(&mut self) -> OutputResult<()> {
        Ok(())
    }

    fn store_result(&mut self, _item: &QueueItem, _report: &Value) -> OutputResult<()> {
        Err(OutputError::Write("disk full".to_string()))
    }

    fn store_error(&mut self, _item: &QueueItem, _error: &HarvestError) -> OutputResult<()> {
        Err(OutputError::Write("disk full".to_string()))
    }

    fn on_end(&mut self, _summary: &RunSummary) -> OutputResult<()> {
        Ok(())
    }

    fn on_fatal(&mut self, _error: &HarvestError) -> OutputResult<()> {
        self.fatal = true;
        Ok(())
    }
}

/// Sink that raises the shutdown flag once the first report arrives
struct StoppingSink {
    shutdown: Arc<AtomicBool>,
    inner: MemorySink,
}

impl ResultSink for StoppingSink {
    fn on_begin(&mut self) -> OutputResult<()> {
        self.inner.on_begin()
    }

    fn store_result(&mut self, item: &QueueItem, report: &Value) -> OutputResult<()> {
        self.shutdown.store(true, Ordering::SeqCst);
        self.inner.store_result(item, report)
    }

    fn store_error(&mut self, item: &QueueItem, error: &HarvestError) -> OutputResult<()> {
        self.inner.store_error(item, error)
    }

    fn on_end(&mut self, summary: &RunSummary) -> OutputResult<()> {
        self.inner.on_end(summary)
    }

    fn on_fatal(&mut self, error: &HarvestError) -> OutputResult<()> {
        self.inner.on_fatal(error)
    }
}

fn count_with_status(store: &SqliteQueueStore, status: ItemStatus) -> usize {
    store.next_batch(status, 100).unwrap().len()
}

#[tokio::test]
async fn test_full_run_fetches_every_html_page() {
    let server = MockServer::start().await;
    mount_standard_site(&server).await;
    mount_insights_ok(&server).await;

    let config = test_config(&server, 3);
    let mut store = SqliteQueueStore::open_in_memory().unwrap();
    let mut sink = MemorySink::new();

    let summary = run_pipeline(&config, &mut store, &mut sink, &sitemap_url(&server))
        .await
        .unwrap();

    assert_eq!(summary.discovered, 4);
    assert_eq!(summary.classified, 4);
    assert_eq!(summary.ignored, 2);
    assert_eq!(summary.enqueued, 4);
    assert_eq!(summary.processed, 4);
    assert_eq!(summary.fetched, 4);
    assert_eq!(summary.failed, 0);
    assert!(!summary.interrupted);

    let items = store
        .all_items(&QueueFilter::all().include_report())
        .unwrap();
    assert_eq!(items.len(), 4);
    for item in &items {
        assert_eq!(item.status, ItemStatus::Fetched);
        assert!(item.error_message.is_none());
        assert_eq!(
            item.report.as_ref().unwrap()["lighthouseResult"]["lighthouseVersion"],
            "9.6.8"
        );
    }

    let home = format!("{}/", server.uri());
    let home_strategies: Vec<Strategy> = items
        .iter()
        .filter(|i| i.url == home)
        .map(|i| i.strategy)
        .collect();
    assert_eq!(home_strategies, vec![Strategy::Desktop, Strategy::Mobile]);

    let mut ignored = store.ignore_entries(None).unwrap();
    ignored.sort_by(|a, b| a.url.cmp(&b.url));
    assert_eq!(ignored.len(), 2);
    assert_eq!(ignored[0].url, format!("{}/doc.pdf", server.uri()));
    assert_eq!(ignored[0].http_status, 200);
    assert_eq!(ignored[0].content_type, "application/pdf");
    assert_eq!(ignored[1].url, format!("{}/missing", server.uri()));
    assert_eq!(ignored[1].http_status, 404);
    assert_eq!(ignored[1].content_type, "unknown");

    assert!(sink.began);
    assert_eq!(sink.results.len(), 4);
    assert!(sink
        .results
        .iter()
        .all(|(item, _)| item.status == ItemStatus::Fetched));
    assert_eq!(sink.summary.as_ref(), Some(&summary));
    assert!(sink.fatal.is_none());
}

#[tokio::test]
async fn test_rerun_is_idempotent() {
    let server = MockServer::start().await;
    mount_standard_site(&server).await;
    mount_insights_ok(&server).await;

    let config = test_config(&server, 20);
    let mut store = SqliteQueueStore::open_in_memory().unwrap();

    let mut first_sink = MemorySink::new();
    run_pipeline(&config, &mut store, &mut first_sink, &sitemap_url(&server))
        .await
        .unwrap();

    let mut second_sink = MemorySink::new();
    let second = run_pipeline(&config, &mut store, &mut second_sink, &sitemap_url(&server))
        .await
        .unwrap();

    assert_eq!(second.discovered, 4);
    assert_eq!(second.classified, 0);
    assert_eq!(second.ignored, 0);
    assert_eq!(second.enqueued, 0);
    assert_eq!(second.processed, 0);

    assert_eq!(store.all_items(&QueueFilter::all()).unwrap().len(), 4);
    assert_eq!(store.count_ignored().unwrap(), 2);

    // Each URL was probed exactly once and each item fetched exactly once
    assert_eq!(request_count(&server, "HEAD").await, 4);
    let insights_calls = server
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .filter(|r| r.url.path() == INSIGHTS_PATH)
        .count();
    assert_eq!(insights_calls, 4);
}

#[tokio::test]
async fn test_duplicate_sitemap_entries_enqueue_once() {
    let server = MockServer::start().await;
    mount_sitemap(&server, urlset(&server, &["/", "/", "/"])).await;
    mount_head(&server, "/", 200, Some("text/html")).await;
    mount_insights_ok(&server).await;

    let config = test_config(&server, 20);
    let mut store = SqliteQueueStore::open_in_memory().unwrap();
    let mut sink = MemorySink::new();

    let summary = run_pipeline(&config, &mut store, &mut sink, &sitemap_url(&server))
        .await
        .unwrap();

    assert_eq!(summary.discovered, 3);
    assert_eq!(summary.classified, 1);
    assert_eq!(summary.enqueued, 2);
}

#[tokio::test]
async fn test_failed_fetches_do_not_abort_the_batch() {
    let server = MockServer::start().await;
    mount_standard_site(&server).await;

    let about = format!("{}/about", server.uri());
    // Mounted first so it takes precedence over the catch-all
    Mock::given(method("GET"))
        .and(path(INSIGHTS_PATH))
        .and(query_param("url", about.as_str()))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;
    mount_insights_ok(&server).await;

    let config = test_config(&server, 20);
    let mut store = SqliteQueueStore::open_in_memory().unwrap();
    let mut sink = MemorySink::new();

    let summary = run_pipeline(&config, &mut store, &mut sink, &sitemap_url(&server))
        .await
        .unwrap();

    assert_eq!(summary.processed, 4);
    assert_eq!(summary.fetched, 2);
    assert_eq!(summary.failed, 2);

    let failed = store
        .all_items(&QueueFilter::with_status(ItemStatus::Failed).include_report())
        .unwrap();
    assert_eq!(failed.len(), 2);
    for item in &failed {
        assert_eq!(item.url, about);
        assert!(item.report.is_none());
        assert!(item.error_message.as_deref().unwrap().contains("500"));
    }

    assert_eq!(sink.errors.len(), 2);
    assert!(sink
        .errors
        .iter()
        .all(|(item, _)| item.status == ItemStatus::Failed && item.error_message.is_some()));
}

#[tokio::test]
async fn test_sitemap_index_is_fatal() {
    let server = MockServer::start().await;
    mount_sitemap(
        &server,
        format!(
            "<sitemapindex><sitemap><loc>{}/pages.xml</loc></sitemap></sitemapindex>",
            server.uri()
        ),
    )
    .await;

    let config = test_config(&server, 20);
    let mut store = SqliteQueueStore::open_in_memory().unwrap();
    let mut sink = MemorySink::new();

    let result = run_pipeline(&config, &mut store, &mut sink, &sitemap_url(&server)).await;

    assert!(matches!(result, Err(HarvestError::Format { .. })));
    assert!(sink.fatal.is_some());
    assert!(sink.summary.is_none());
    assert!(store.all_items(&QueueFilter::all()).unwrap().is_empty());
    assert_eq!(request_count(&server, "HEAD").await, 0);
}

#[tokio::test]
async fn test_missing_sitemap_is_fatal() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/sitemap.xml"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let config = test_config(&server, 20);
    let mut store = SqliteQueueStore::open_in_memory().unwrap();
    let mut sink = MemorySink::new();

    let result = run_pipeline(&config, &mut store, &mut sink, &sitemap_url(&server)).await;

    assert!(matches!(
        result,
        Err(HarvestError::Upstream { status: 404, .. })
    ));
    assert!(sink.fatal.is_some());
}

#[tokio::test]
async fn test_interrupted_items_are_requeued() {
    let server = MockServer::start().await;
    mount_sitemap(&server, urlset(&server, &[])).await;
    mount_insights_ok(&server).await;

    let url = format!("{}/stranded", server.uri());
    let mut store = SqliteQueueStore::open_in_memory().unwrap();
    store
        .enqueue(&[NewQueueItem::new(url.as_str(), Strategy::Desktop)])
        .unwrap();
    store
        .update_status(1, ItemStatus::Processing, None, None)
        .unwrap();

    let config = test_config(&server, 20);
    let mut sink = MemorySink::new();
    let summary = run_pipeline(&config, &mut store, &mut sink, &sitemap_url(&server))
        .await
        .unwrap();

    assert_eq!(summary.processed, 1);
    assert_eq!(summary.fetched, 1);
    let items = store.all_items(&QueueFilter::all()).unwrap();
    assert_eq!(items[0].status, ItemStatus::Fetched);
}

#[tokio::test]
async fn test_interrupted_items_left_alone_without_requeue() {
    let server = MockServer::start().await;
    mount_sitemap(&server, urlset(&server, &[])).await;
    mount_insights_ok(&server).await;

    let mut store = SqliteQueueStore::open_in_memory().unwrap();
    store
        .enqueue(&[NewQueueItem::new("https://example.org/", Strategy::Mobile)])
        .unwrap();
    store
        .update_status(1, ItemStatus::Processing, None, None)
        .unwrap();

    let mut config = test_config(&server, 20);
    config.pipeline.requeue_interrupted = false;
    let mut sink = MemorySink::new();
    let summary = run_pipeline(&config, &mut store, &mut sink, &sitemap_url(&server))
        .await
        .unwrap();

    assert_eq!(summary.processed, 0);
    let items = store.all_items(&QueueFilter::all()).unwrap();
    assert_eq!(items[0].status, ItemStatus::Processing);
}

#[tokio::test]
async fn test_shutdown_flag_stops_before_next_batch() {
    let server = MockServer::start().await;
    mount_standard_site(&server).await;
    mount_insights_ok(&server).await;

    let config = test_config(&server, 1);
    let mut store = SqliteQueueStore::open_in_memory().unwrap();
    let mut sink = MemorySink::new();
    let shutdown = Arc::new(AtomicBool::new(false));
    shutdown.store(true, Ordering::SeqCst);

    let summary = {
        let mut coordinator = Coordinator::from_config(&config, &mut store, &mut sink)
            .unwrap()
            .with_shutdown(Arc::clone(&shutdown));
        coordinator.run(&sitemap_url(&server)).await.unwrap()
    };

    assert!(summary.interrupted);
    assert_eq!(summary.enqueued, 4);
    assert_eq!(summary.processed, 0);
    assert_eq!(
        store
            .next_batch(ItemStatus::Queued, 100)
            .unwrap()
            .len(),
        4
    );
    assert_eq!(sink.summary.as_ref().map(|s| s.interrupted), Some(true));
}

#[tokio::test]
async fn test_session_survives_reopen() {
    let server = MockServer::start().await;
    mount_standard_site(&server).await;
    mount_insights_ok(&server).await;

    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("Psi-Report_2024-01-01.db");
    let config = test_config(&server, 20);

    {
        let mut store = SqliteQueueStore::open(&db_path).unwrap();
        let mut sink = MemorySink::new();
        run_pipeline(&config, &mut store, &mut sink, &sitemap_url(&server))
            .await
            .unwrap();
        store.close().unwrap();
    }

    let mut store = SqliteQueueStore::open(&db_path).unwrap();
    let mut sink = MemorySink::new();
    let summary = run_pipeline(&config, &mut store, &mut sink, &sitemap_url(&server))
        .await
        .unwrap();

    assert_eq!(summary.enqueued, 0);
    assert_eq!(summary.processed, 0);
    assert_eq!(
        store
            .count_by_status()
            .unwrap()
            .get(&ItemStatus::Fetched)
            .copied(),
        Some(4)
    );
}

#[tokio::test]
async fn test_sink_failure_leaves_no_item_processing() {
    let server = MockServer::start().await;
    mount_standard_site(&server).await;
    mount_insights_ok(&server).await;

    let config = test_config(&server, 2);
    let mut store = SqliteQueueStore::open_in_memory().unwrap();
    let mut sink = RejectingSink::default();

    let result = {
        let mut coordinator = Coordinator::from_config(&config, &mut store, &mut sink).unwrap();
        coordinator.run(&sitemap_url(&server)).await
    };

    assert!(matches!(result, Err(HarvestError::Output(_))));
    assert!(sink.fatal);
    assert_eq!(count_with_status(&store, ItemStatus::Processing), 0);
    assert_eq!(count_with_status(&store, ItemStatus::Fetched), 2);
    assert_eq!(count_with_status(&store, ItemStatus::Queued), 2);
}

#[tokio::test]
async fn test_shutdown_during_batch_stops_after_it() {
    let server = MockServer::start().await;
    mount_standard_site(&server).await;
    mount_insights_ok(&server).await;

    let config = test_config(&server, 1);
    let mut store = SqliteQueueStore::open_in_memory().unwrap();
    let shutdown = Arc::new(AtomicBool::new(false));
    let mut sink = StoppingSink {
        shutdown: Arc::clone(&shutdown),
        inner: MemorySink::new(),
    };

    let summary = {
        let mut coordinator = Coordinator::from_config(&config, &mut store, &mut sink)
            .unwrap()
            .with_shutdown(Arc::clone(&shutdown));
        coordinator.run(&sitemap_url(&server)).await.unwrap()
    };

    assert!(summary.interrupted);
    assert_eq!(summary.processed, 1);
    assert_eq!(summary.fetched, 1);
    assert_eq!(count_with_status(&store, ItemStatus::Fetched), 1);
    assert_eq!(count_with_status(&store, ItemStatus::Queued), 3);
    assert_eq!(count_with_status(&store, ItemStatus::Processing), 0);
    assert_eq!(sink.inner.results.len(), 1);
    assert_eq!(sink.inner.summary.as_ref(), Some(&summary));
}
