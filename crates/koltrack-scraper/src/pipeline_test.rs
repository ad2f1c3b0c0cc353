use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use koltrack_core::{AppConfig, Environment, PlatformKind};
use koltrack_queue::{JobSpec, QueueDefaults, ScrapeExecutor, ScrapeQueue};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

use crate::browser::Browser;
use crate::pipeline::{Pipeline, PipelineExecutor, ScrapeTarget};
use crate::testutil::StaticBrowser;
use crate::ScrapeError;

const TIKTOK_HTML: &str = r#"
    <html><body>
        <button data-e2e="modal-close-inner-button">close</button>
        <h1 data-e2e="user-title">@jane</h1>
        <strong data-e2e="followers-count">2.4M</strong>
        <strong data-e2e="following-count">105</strong>
        <strong data-e2e="likes-count">48.2M</strong>
        <div data-e2e="user-post-item"><strong>1.2M</strong></div>
    </body></html>
"#;

fn test_config() -> Arc<AppConfig> {
    Arc::new(AppConfig {
        database_url: "postgres://localhost/koltrack_test".to_owned(),
        env: Environment::Development,
        bind_addr: "127.0.0.1:0".parse().unwrap(),
        log_level: "debug".to_owned(),
        db_max_connections: 5,
        db_min_connections: 1,
        db_acquire_timeout_secs: 5,
        render_url: "http://localhost:3000".to_owned(),
        render_token: None,
        proxy: None,
        user_agents: vec!["test-agent/1.0".to_owned()],
        screenshot_dir: PathBuf::from("/tmp/koltrack-test-screenshots"),
        scrape_delay_min_ms: 0,
        scrape_delay_max_ms: 1,
        max_concurrent_scrapes: 2,
        retry_attempts: 3,
        backoff_base_secs: 5,
        nav_timeout_secs: 1,
        nav_attempts: 3,
        full_sweep_cron: "0 0 0 * * SUN".to_owned(),
        priority_sweep_cron: "0 0 2 * * *".to_owned(),
        health_sweep_cron: "0 0 * * * *".to_owned(),
        priority_sweep_limit: 50,
        stale_after_days: 14,
    })
}

fn target() -> ScrapeTarget {
    ScrapeTarget {
        platform_id: 7,
        kind: PlatformKind::Tiktok,
        target: "@jane".to_owned(),
    }
}

#[tokio::test(start_paused = true)]
async fn successful_run_extracts_and_closes_session() {
    let browser = Arc::new(StaticBrowser::new(TIKTOK_HTML));
    let pipeline = Pipeline::new(Arc::clone(&browser) as Arc<dyn Browser>, test_config());

    let profile = pipeline.run(&target()).await.unwrap();

    assert_eq!(profile.followers, 2_400_000);
    assert_eq!(browser.log.visits(), vec!["https://www.tiktok.com/@jane"]);
    assert_eq!(
        browser.log.dismissals(),
        vec!["[data-e2e=\"modal-close-inner-button\"]"],
        "the interstitial present in the document should be dismissed"
    );
    assert_eq!(browser.log.screenshot_count(), 0);
    assert!(browser.log.was_closed());
}

#[tokio::test(start_paused = true)]
async fn navigation_retries_then_succeeds() {
    let browser = Arc::new(StaticBrowser::failing_first(TIKTOK_HTML, 2));
    let pipeline = Pipeline::new(Arc::clone(&browser) as Arc<dyn Browser>, test_config());

    let profile = pipeline.run(&target()).await.unwrap();

    assert_eq!(profile.followers, 2_400_000);
    assert_eq!(browser.log.visits().len(), 3);
    assert_eq!(browser.log.screenshot_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn exhausted_navigation_fails_with_screenshot() {
    let browser = Arc::new(StaticBrowser::failing_first(TIKTOK_HTML, 5));
    let pipeline = Pipeline::new(Arc::clone(&browser) as Arc<dyn Browser>, test_config());

    let err = pipeline.run(&target()).await.unwrap_err();

    match err {
        ScrapeError::Navigation {
            attempts,
            timed_out,
            ..
        } => {
            assert_eq!(attempts, 3);
            assert!(timed_out);
        }
        other => panic!("expected navigation error, got {other:?}"),
    }
    assert_eq!(browser.log.visits().len(), 3);
    assert_eq!(browser.log.screenshot_count(), 1);
    assert!(browser.log.was_closed());
}

#[tokio::test(start_paused = true)]
async fn empty_document_is_an_extraction_failure() {
    let browser = Arc::new(StaticBrowser::new("<html><body></body></html>"));
    let pipeline = Pipeline::new(Arc::clone(&browser) as Arc<dyn Browser>, test_config());

    let err = pipeline.run(&target()).await.unwrap_err();

    assert!(matches!(err, ScrapeError::Extraction { .. }));
    assert_eq!(browser.log.screenshot_count(), 1);
    assert!(browser.log.was_closed());
}

/// A pool whose every acquire fails immediately (nothing listens on the
/// target port), standing in for an unavailable database.
fn unreachable_pool() -> PgPool {
    PgPoolOptions::new()
        .acquire_timeout(Duration::from_millis(250))
        .connect_lazy("postgres://koltrack@127.0.0.1:1/koltrack")
        .unwrap()
}

#[tokio::test]
async fn storage_failures_do_not_mask_a_successful_scrape() {
    let browser = Arc::new(StaticBrowser::new(TIKTOK_HTML));
    let pipeline = Pipeline::new(Arc::clone(&browser) as Arc<dyn Browser>, test_config());
    let executor = PipelineExecutor::new(pipeline, unreachable_pool());

    let queue = ScrapeQueue::new(QueueDefaults::default());
    queue.enqueue(JobSpec::new(7, "tiktok", "@jane")).unwrap();
    let job = queue.next_job().await;

    // Every write fails, yet the extraction succeeded, so the executor
    // must report success upstream rather than trigger a retry that
    // would re-scrape (and, with a healthy database, double-insert).
    executor.execute(&job).await.unwrap();
    assert!(browser.log.was_closed());
}
