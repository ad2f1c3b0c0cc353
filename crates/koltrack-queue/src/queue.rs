use std::str::FromStr;
use std::sync::Mutex;
use std::time::Duration;

use koltrack_core::PlatformKind;
use serde::Serialize;
use tokio::sync::Notify;
use tokio::time::Instant;

use crate::job::{JobId, JobSpec, ScrapeJob};
use crate::state::{FailedJob, QueueState};
use crate::QueueError;

/// Queue-wide defaults applied when a [`JobSpec`] does not override them.
#[derive(Debug, Clone, Copy)]
pub struct QueueDefaults {
    pub max_attempts: u32,
    pub backoff_base: Duration,
}

impl Default for QueueDefaults {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff_base: Duration::from_secs(5),
        }
    }
}

/// Aggregate queue counts, consistent with live state at the moment of the
/// call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct QueueCounts {
    pub waiting: usize,
    pub active: usize,
    pub completed: u64,
    pub failed: usize,
}

/// What the queue decided to do with a failed job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureDisposition {
    /// Re-enqueued with a backoff delay of the given duration.
    Retrying(Duration),
    /// Attempts exhausted; retained in the failed list.
    PermanentlyFailed,
}

/// The scrape job queue. Shared between the API surface, the scheduler,
/// and the worker pool via `Arc`.
pub struct ScrapeQueue {
    state: Mutex<QueueState>,
    notify: Notify,
    defaults: QueueDefaults,
}

impl ScrapeQueue {
    #[must_use]
    pub fn new(defaults: QueueDefaults) -> Self {
        Self {
            state: Mutex::new(QueueState::default()),
            notify: Notify::new(),
            defaults,
        }
    }

    /// Validates and enqueues a job, waking a worker.
    ///
    /// # Errors
    ///
    /// Returns [`QueueError::InvalidJob`] when the platform type is not
    /// recognized or the target identifier is empty.
    pub fn enqueue(&self, spec: JobSpec) -> Result<JobId, QueueError> {
        let platform_kind =
            PlatformKind::from_str(&spec.platform_type).map_err(|e| QueueError::InvalidJob {
                reason: e.to_string(),
            })?;
        if spec.target.trim().is_empty() {
            return Err(QueueError::InvalidJob {
                reason: format!("empty target for platform {}", spec.platform_id),
            });
        }

        let job_id = {
            let mut state = self.lock_state();
            let (id, seq) = state.allocate_ids();
            let job = ScrapeJob {
                id,
                platform_id: spec.platform_id,
                platform_kind,
                target: spec.target,
                priority: spec.priority,
                attempts: 0,
                max_attempts: spec.max_attempts.unwrap_or(self.defaults.max_attempts).max(1),
                remove_on_complete: spec.remove_on_complete,
                not_before: Instant::now() + spec.delay,
                seq,
            };
            tracing::debug!(
                job_id = id,
                platform_id = job.platform_id,
                platform = %job.platform_kind,
                priority = job.priority.0,
                delay_ms = spec.delay.as_millis() as u64,
                "queue: job enqueued"
            );
            state.push_waiting(job);
            id
        };
        self.notify.notify_waiters();
        Ok(job_id)
    }

    /// Waits for and claims the next dispatchable job.
    ///
    /// Suspends cooperatively while the queue is empty, paused, or every
    /// waiting job is delayed or blocked by the per-platform exclusion.
    pub async fn next_job(&self) -> ScrapeJob {
        loop {
            // Register for wakeups before inspecting state so an enqueue
            // between the check and the await is not missed.
            let notified = self.notify.notified();

            let wakeup = {
                let now = Instant::now();
                let mut state = self.lock_state();
                if let Some(job) = state.take_eligible(now) {
                    return job;
                }
                state.next_wakeup(now)
            };

            match wakeup {
                Some(at) => {
                    tokio::select! {
                        () = notified => {}
                        () = tokio::time::sleep_until(at) => {}
                    }
                }
                None => notified.await,
            }
        }
    }

    /// Records a successful resolution and releases the platform slot.
    /// Jobs that opted out of removal on completion are retained for
    /// inspection via [`ScrapeQueue::completed_jobs`].
    pub fn report_success(&self, job: &ScrapeJob) {
        {
            let mut state = self.lock_state();
            state.release(job);
            let retained = (!job.remove_on_complete).then(|| job.clone());
            state.record_completed(retained);
        }
        tracing::info!(job_id = job.id, platform_id = job.platform_id, "queue: job completed");
        self.notify.notify_waiters();
    }

    /// Records a failed resolution: re-enqueues with exponential backoff
    /// while attempts remain, otherwise retains the job as permanently
    /// failed. Either way the platform slot is released.
    pub fn report_failure(&self, mut job: ScrapeJob, error: String) -> FailureDisposition {
        let disposition = {
            let mut state = self.lock_state();
            state.release(&job);

            if job.attempts < job.max_attempts {
                // attempts is already incremented for the run that just
                // failed, so the first retry sleeps base * 2^0.
                let exponent = (job.attempts - 1).min(31);
                let backoff = self
                    .defaults
                    .backoff_base
                    .saturating_mul(1u32 << exponent);
                tracing::warn!(
                    job_id = job.id,
                    platform_id = job.platform_id,
                    attempt = job.attempts,
                    max_attempts = job.max_attempts,
                    backoff_secs = backoff.as_secs(),
                    error = %error,
                    "queue: job failed, retrying after backoff"
                );
                job.not_before = Instant::now() + backoff;
                state.push_waiting(job);
                FailureDisposition::Retrying(backoff)
            } else {
                tracing::error!(
                    job_id = job.id,
                    platform_id = job.platform_id,
                    attempts = job.attempts,
                    error = %error,
                    "queue: job permanently failed"
                );
                state.record_failed(job, error);
                FailureDisposition::PermanentlyFailed
            }
        };
        self.notify.notify_waiters();
        disposition
    }

    /// Live aggregate counts.
    #[must_use]
    pub fn status(&self) -> QueueCounts {
        let state = self.lock_state();
        QueueCounts {
            waiting: state.waiting_count(),
            active: state.active_count(),
            completed: state.completed_count(),
            failed: state.failed_count(),
        }
    }

    /// Stops dispatch of further jobs. In-flight work is unaffected.
    /// Idempotent.
    pub fn pause(&self) {
        self.lock_state().pause();
        tracing::info!("queue: paused");
    }

    /// Resumes dispatch from current queue contents. Idempotent.
    pub fn resume(&self) {
        self.lock_state().resume();
        tracing::info!("queue: resumed");
        self.notify.notify_waiters();
    }

    #[must_use]
    pub fn is_paused(&self) -> bool {
        self.lock_state().is_paused()
    }

    /// Discards all waiting jobs, returning how many were dropped.
    /// Dispatched jobs are not cancelled. A no-op on an empty queue.
    pub fn clear(&self) -> usize {
        let discarded = self.lock_state().clear_waiting();
        if discarded > 0 {
            tracing::info!(discarded, "queue: cleared waiting jobs");
        }
        discarded
    }

    /// Snapshot of permanently failed jobs retained for inspection.
    #[must_use]
    pub fn failed_jobs(&self) -> Vec<FailedJob> {
        self.lock_state().failed_jobs().to_vec()
    }

    /// Snapshot of completed jobs that were enqueued with
    /// `remove_on_complete` disabled.
    #[must_use]
    pub fn completed_jobs(&self) -> Vec<ScrapeJob> {
        self.lock_state().completed_jobs().to_vec()
    }

    fn lock_state(&self) -> std::sync::MutexGuard<'_, QueueState> {
        // The mutex only guards short bookkeeping sections; a poisoned
        // lock means a panic mid-update and nothing sane to recover.
        self.state.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

#[cfg(test)]
#[path = "queue_test.rs"]
mod queue_test;
