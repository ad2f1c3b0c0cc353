mod api;
mod middleware;
mod scheduler;

use std::sync::Arc;
use std::time::Duration;

use tracing_subscriber::EnvFilter;

use crate::api::{build_app, AppState};
use koltrack_queue::{QueueDefaults, ScrapeQueue};
use koltrack_scraper::{Pipeline, PipelineExecutor, RenderedBrowser};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = Arc::new(koltrack_core::load_app_config()?);
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let pool_config = koltrack_db::PoolConfig::from_app_config(&config);
    let pool = koltrack_db::connect_pool(&config.database_url, pool_config).await?;
    koltrack_db::run_migrations(&pool).await?;

    if let Err(e) = tokio::fs::create_dir_all(&config.screenshot_dir).await {
        tracing::warn!(dir = %config.screenshot_dir.display(), error = %e,
            "could not create screenshot directory; diagnostics disabled");
    }

    let queue = Arc::new(ScrapeQueue::new(QueueDefaults {
        max_attempts: config.retry_attempts,
        backoff_base: Duration::from_secs(config.backoff_base_secs),
    }));

    let browser = Arc::new(RenderedBrowser::new(
        &config.render_url,
        config.render_token.clone(),
    )?);
    let pipeline = Pipeline::new(browser, Arc::clone(&config));
    let executor = Arc::new(PipelineExecutor::new(pipeline, pool.clone()));
    let _workers = koltrack_queue::spawn_workers(
        Arc::clone(&queue),
        executor,
        config.max_concurrent_scrapes,
    );

    let sweeps = scheduler::Sweeps::new(pool.clone(), Arc::clone(&queue), Arc::clone(&config));
    let _scheduler = scheduler::build_scheduler(Arc::clone(&sweeps), &config).await?;

    let app = build_app(AppState {
        pool,
        queue,
        sweeps,
    });

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    tracing::info!(addr = %config.bind_addr, "koltrack server listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to listen for ctrl-c");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("received shutdown signal, starting graceful shutdown");
}
