//! Background sweep scheduler.
//!
//! Initialises a [`JobScheduler`] at server startup and registers the
//! recurring roster sweeps. The sweeps themselves live on the [`Sweeps`]
//! registry so the HTTP surface can trigger them manually and report
//! their state.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{DateTime, Utc};
use koltrack_core::AppConfig;
use koltrack_db::platforms;
use koltrack_db::PlatformRow;
use koltrack_queue::{JobSpec, Priority, ScrapeQueue};
use rand::Rng;
use serde::Serialize;
use sqlx::PgPool;
use tokio_cron_scheduler::{Job, JobScheduler, JobSchedulerError};

const FULL_SWEEP_JITTER: Duration = Duration::from_secs(60);
const PRIORITY_SWEEP_JITTER: Duration = Duration::from_secs(30);
const FAILED_RETRY_JITTER: Duration = Duration::from_secs(120);
const STALE_SWEEP_JITTER: Duration = Duration::from_secs(180);

/// Hours of history the hourly health sweep re-examines for failures.
const FAILED_LOOKBACK_HOURS: i64 = 24;

/// Per-rule bookkeeping: a firing flag and the last completed run.
#[derive(Debug, Default)]
struct RuleState {
    firing: AtomicBool,
    last_run: Mutex<Option<DateTime<Utc>>>,
}

impl RuleState {
    /// Flips idle → firing; false when the rule is already mid-run.
    fn begin(&self) -> bool {
        !self.firing.swap(true, Ordering::SeqCst)
    }

    fn finish(&self) {
        if let Ok(mut last_run) = self.last_run.lock() {
            *last_run = Some(Utc::now());
        }
        self.firing.store(false, Ordering::SeqCst);
    }

    fn snapshot(&self) -> SweepStatus {
        SweepStatus {
            running: self.firing.load(Ordering::SeqCst),
            last_run: self.last_run.lock().map(|l| *l).unwrap_or(None),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SweepStatus {
    pub running: bool,
    pub last_run: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SweepsStatus {
    pub full_roster: SweepStatus,
    pub priority: SweepStatus,
    pub health: SweepStatus,
}

/// Registry of the recurring sweeps. Cron firings and manual triggers both
/// go through the same run methods, so the firing guard covers both.
pub struct Sweeps {
    pool: PgPool,
    queue: Arc<ScrapeQueue>,
    config: Arc<AppConfig>,
    full_roster: RuleState,
    priority: RuleState,
    health: RuleState,
}

impl Sweeps {
    #[must_use]
    pub fn new(pool: PgPool, queue: Arc<ScrapeQueue>, config: Arc<AppConfig>) -> Arc<Self> {
        Arc::new(Self {
            pool,
            queue,
            config,
            full_roster: RuleState::default(),
            priority: RuleState::default(),
            health: RuleState::default(),
        })
    }

    #[must_use]
    pub fn status(&self) -> SweepsStatus {
        SweepsStatus {
            full_roster: self.full_roster.snapshot(),
            priority: self.priority.snapshot(),
            health: self.health.snapshot(),
        }
    }

    /// Enqueues every platform of every active kol at normal priority,
    /// spread over the jitter window. Returns the number enqueued.
    pub async fn run_full_sweep(&self) -> usize {
        if !self.full_roster.begin() {
            tracing::warn!("scheduler: full-roster sweep already running; skipping");
            return 0;
        }
        let enqueued = match platforms::list_active_platforms(&self.pool).await {
            Ok(rows) => {
                tracing::info!(count = rows.len(), "scheduler: full-roster sweep enumerated");
                self.enqueue_all(&rows, Priority::NORMAL, FULL_SWEEP_JITTER)
            }
            Err(e) => {
                tracing::error!(error = %e, "scheduler: full-roster sweep enumeration failed");
                0
            }
        };
        self.full_roster.finish();
        enqueued
    }

    /// Enqueues the top-N platforms of priority kols at high priority.
    pub async fn run_priority_sweep(&self) -> usize {
        if !self.priority.begin() {
            tracing::warn!("scheduler: priority sweep already running; skipping");
            return 0;
        }
        let limit = self.config.priority_sweep_limit;
        let enqueued = match platforms::list_priority_platforms(&self.pool, limit).await {
            Ok(rows) => {
                tracing::info!(count = rows.len(), limit, "scheduler: priority sweep enumerated");
                self.enqueue_all(&rows, Priority::HIGH, PRIORITY_SWEEP_JITTER)
            }
            Err(e) => {
                tracing::error!(error = %e, "scheduler: priority sweep enumeration failed");
                0
            }
        };
        self.priority.finish();
        enqueued
    }

    /// Re-enqueues recent failures at low priority and stale platforms at
    /// normal priority.
    pub async fn run_health_sweep(&self) -> usize {
        if !self.health.begin() {
            tracing::warn!("scheduler: health sweep already running; skipping");
            return 0;
        }
        let mut enqueued = 0;
        match platforms::list_failed_within(&self.pool, FAILED_LOOKBACK_HOURS).await {
            Ok(rows) => {
                enqueued += self.enqueue_all(&rows, Priority::LOW, FAILED_RETRY_JITTER);
            }
            Err(e) => {
                tracing::error!(error = %e, "scheduler: health sweep failed-platform enumeration failed");
            }
        }
        match platforms::list_stale_platforms(&self.pool, self.config.stale_after_days).await {
            Ok(rows) => {
                enqueued += self.enqueue_all(&rows, Priority::NORMAL, STALE_SWEEP_JITTER);
            }
            Err(e) => {
                tracing::error!(error = %e, "scheduler: health sweep stale-platform enumeration failed");
            }
        }
        tracing::info!(enqueued, "scheduler: health sweep complete");
        self.health.finish();
        enqueued
    }

    /// Enqueues every platform of one kol at high priority, no jitter.
    ///
    /// # Errors
    ///
    /// Returns [`koltrack_db::DbError`] when the kol's platforms cannot be
    /// enumerated (including `NotFound` for an unknown kol).
    pub async fn trigger_for_kol(&self, kol_id: i64) -> Result<usize, koltrack_db::DbError> {
        let rows = platforms::list_platforms_for_kol(&self.pool, kol_id).await?;
        Ok(self.enqueue_all(&rows, Priority::HIGH, Duration::ZERO))
    }

    /// Re-enqueues platforms that failed within the trailing window, at
    /// low priority with retry jitter.
    ///
    /// # Errors
    ///
    /// Returns [`koltrack_db::DbError`] if the enumeration fails.
    pub async fn retry_failed_since(&self, hours: i64) -> Result<usize, koltrack_db::DbError> {
        let rows = platforms::list_failed_within(&self.pool, hours).await?;
        Ok(self.enqueue_all(&rows, Priority::LOW, FAILED_RETRY_JITTER))
    }

    fn enqueue_all(&self, rows: &[PlatformRow], priority: Priority, max_jitter: Duration) -> usize {
        let mut enqueued = 0;
        for row in rows {
            let delay = jitter(max_jitter);
            let spec = JobSpec::new(row.id, row.platform_type.as_str(), scrape_target(row))
                .priority(priority)
                .delay(delay);
            match self.queue.enqueue(spec) {
                Ok(_) => enqueued += 1,
                Err(e) => {
                    tracing::warn!(
                        platform_id = row.id,
                        platform = %row.platform_type,
                        error = %e,
                        "scheduler: skipping unenqueueable platform"
                    );
                }
            }
        }
        enqueued
    }
}

/// Profile URL when the roster has one, otherwise the bare username.
fn scrape_target(row: &PlatformRow) -> String {
    if row.profile_url.is_empty() {
        row.username.clone()
    } else {
        row.profile_url.clone()
    }
}

fn jitter(max: Duration) -> Duration {
    if max.is_zero() {
        return Duration::ZERO;
    }
    let millis = rand::rng().random_range(0..=max.as_millis());
    Duration::from_millis(u64::try_from(millis).unwrap_or(u64::MAX))
}

/// Builds and starts the background sweep scheduler.
///
/// Registers the full-roster, priority, and health sweeps on their
/// configured crons and starts the scheduler. The returned handle must be
/// kept alive for the process lifetime — dropping it shuts down all jobs.
///
/// # Errors
///
/// Returns [`JobSchedulerError`] if the scheduler cannot be initialised,
/// a sweep cannot be registered, or the scheduler fails to start.
pub async fn build_scheduler(
    sweeps: Arc<Sweeps>,
    config: &AppConfig,
) -> Result<JobScheduler, JobSchedulerError> {
    let scheduler = JobScheduler::new().await?;

    register_sweep(&scheduler, &config.full_sweep_cron, "full-roster", {
        let sweeps = Arc::clone(&sweeps);
        move || {
            let sweeps = Arc::clone(&sweeps);
            async move {
                sweeps.run_full_sweep().await;
            }
        }
    })
    .await?;

    register_sweep(&scheduler, &config.priority_sweep_cron, "priority", {
        let sweeps = Arc::clone(&sweeps);
        move || {
            let sweeps = Arc::clone(&sweeps);
            async move {
                sweeps.run_priority_sweep().await;
            }
        }
    })
    .await?;

    register_sweep(&scheduler, &config.health_sweep_cron, "health", {
        let sweeps = Arc::clone(&sweeps);
        move || {
            let sweeps = Arc::clone(&sweeps);
            async move {
                sweeps.run_health_sweep().await;
            }
        }
    })
    .await?;

    scheduler.start().await?;
    Ok(scheduler)
}

async fn register_sweep<F, Fut>(
    scheduler: &JobScheduler,
    cron: &str,
    name: &'static str,
    run: F,
) -> Result<(), JobSchedulerError>
where
    F: Fn() -> Fut + Send + Sync + Clone + 'static,
    Fut: std::future::Future<Output = ()> + Send + 'static,
{
    let job = Job::new_async(cron, move |_uuid, _lock| {
        let run = run.clone();
        Box::pin(async move {
            tracing::info!(sweep = name, "scheduler: sweep firing");
            run().await;
            tracing::info!(sweep = name, "scheduler: sweep complete");
        })
    })?;
    scheduler.add(job).await?;
    tracing::info!(sweep = name, cron, "scheduler: registered sweep");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn jitter_stays_within_the_window() {
        for _ in 0..100 {
            let d = jitter(Duration::from_secs(60));
            assert!(d <= Duration::from_secs(60));
        }
        assert_eq!(jitter(Duration::ZERO), Duration::ZERO);
    }

    #[test]
    fn rule_state_guards_reentry() {
        let rule = RuleState::default();
        assert!(rule.begin());
        assert!(!rule.begin());
        assert!(rule.snapshot().running);
        rule.finish();
        let snapshot = rule.snapshot();
        assert!(!snapshot.running);
        assert!(snapshot.last_run.is_some());
        assert!(rule.begin());
    }

    #[test]
    fn target_prefers_profile_url() {
        let mut row = PlatformRow {
            id: 1,
            kol_id: 1,
            platform_type: "tiktok".to_owned(),
            username: "jane".to_owned(),
            profile_url: "https://www.tiktok.com/@jane".to_owned(),
            is_verified: false,
            last_scraped_at: None,
            scrape_status: "pending".to_owned(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        assert_eq!(scrape_target(&row), "https://www.tiktok.com/@jane");
        row.profile_url.clear();
        assert_eq!(scrape_target(&row), "jane");
    }
}
