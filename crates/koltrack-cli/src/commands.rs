//! Operator command implementations.
//!
//! `migrate` and `scrape` work against the database and rendering service
//! directly; `sweep` and `status` go through a running server so they act
//! on the live queue.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Subcommand;
use koltrack_queue::{JobSpec, Priority, QueueDefaults, ScrapeQueue};
use koltrack_scraper::{Pipeline, PipelineExecutor, RenderedBrowser};

#[derive(Debug, Subcommand)]
pub enum SweepKind {
    /// All platforms of active kols.
    Full,
    /// Top priority-flagged platforms.
    Priority,
    /// Every platform of one kol.
    Kol { kol_id: i64 },
}

pub async fn migrate() -> anyhow::Result<()> {
    let pool = koltrack_db::connect_pool_from_env()
        .await
        .context("failed to connect to database")?;
    koltrack_db::run_migrations(&pool).await?;
    println!("migrations up to date");
    Ok(())
}

/// Runs one scrape through the real pipeline and executor, with a
/// single-worker queue standing in for the server's pool.
pub async fn scrape(platform_id: i64) -> anyhow::Result<()> {
    let config = Arc::new(koltrack_core::load_app_config()?);
    let pool_config = koltrack_db::PoolConfig::from_app_config(&config);
    let pool = koltrack_db::connect_pool(&config.database_url, pool_config)
        .await
        .context("failed to connect to database")?;

    let platform = koltrack_db::platforms::get_platform(&pool, platform_id)
        .await
        .context("no such platform")?;
    let target = if platform.profile_url.is_empty() {
        platform.username.clone()
    } else {
        platform.profile_url.clone()
    };
    println!(
        "scraping {} ({}) -> {target}",
        platform.username, platform.platform_type
    );

    let queue = Arc::new(ScrapeQueue::new(QueueDefaults {
        max_attempts: 1,
        backoff_base: Duration::from_secs(config.backoff_base_secs),
    }));
    let browser = Arc::new(RenderedBrowser::new(
        &config.render_url,
        config.render_token.clone(),
    )?);
    let pipeline = Pipeline::new(browser, Arc::clone(&config));
    let executor = Arc::new(PipelineExecutor::new(pipeline, pool.clone()));
    let workers = koltrack_queue::spawn_workers(Arc::clone(&queue), executor, 1);

    queue.enqueue(
        JobSpec::new(platform.id, platform.platform_type.as_str(), target)
            .priority(Priority::HIGH),
    )?;

    loop {
        let counts = queue.status();
        if counts.completed > 0 || counts.failed > 0 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(250)).await;
    }
    for worker in workers {
        worker.abort();
    }

    let counts = queue.status();
    if counts.failed > 0 {
        let reason = queue
            .failed_jobs()
            .first()
            .map_or_else(|| "unknown".to_owned(), |f| f.error.clone());
        anyhow::bail!("scrape failed: {reason}");
    }
    let latest = koltrack_db::metrics::list_snapshots(&pool, platform_id, 1).await?;
    match latest.last() {
        Some(snapshot) => println!(
            "done: followers={} posts={} engagement={:.2}",
            snapshot.followers, snapshot.posts, snapshot.engagement_rate
        ),
        None => println!("done: no snapshot written (no follower count extracted)"),
    }
    Ok(())
}

pub async fn sweep(server: &str, which: &SweepKind) -> anyhow::Result<()> {
    let path = match which {
        SweepKind::Full => "/api/scheduler/trigger/full".to_owned(),
        SweepKind::Priority => "/api/scheduler/trigger/priority".to_owned(),
        SweepKind::Kol { kol_id } => format!("/api/scheduler/trigger/kol/{kol_id}"),
    };
    let body = post_json(server, &path).await?;
    let enqueued = body
        .pointer("/data/enqueued")
        .and_then(serde_json::Value::as_i64)
        .unwrap_or(0);
    println!("sweep triggered: {enqueued} jobs enqueued");
    Ok(())
}

pub async fn status(server: &str) -> anyhow::Result<()> {
    let url = format!("{}/api/stats", server.trim_end_matches('/'));
    let body: serde_json::Value = reqwest::get(&url)
        .await
        .with_context(|| format!("GET {url} failed; is the server running?"))?
        .error_for_status()?
        .json()
        .await?;

    let data = body.pointer("/data").cloned().unwrap_or_default();
    println!("{}", serde_json::to_string_pretty(&data)?);
    Ok(())
}

async fn post_json(server: &str, path: &str) -> anyhow::Result<serde_json::Value> {
    let url = format!("{}{path}", server.trim_end_matches('/'));
    let client = reqwest::Client::new();
    let body = client
        .post(&url)
        .send()
        .await
        .with_context(|| format!("POST {url} failed; is the server running?"))?
        .error_for_status()?
        .json()
        .await?;
    Ok(body)
}
