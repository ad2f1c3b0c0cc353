use std::time::Duration;

use koltrack_core::PlatformKind;
use tokio::time::Instant;

pub type JobId = u64;

/// Dispatch priority. Lower values dispatch first; ties break FIFO.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Priority(pub u8);

impl Priority {
    pub const HIGH: Priority = Priority(0);
    pub const NORMAL: Priority = Priority(1);
    pub const LOW: Priority = Priority(2);
}

/// Request to enqueue one scrape.
#[derive(Debug, Clone)]
pub struct JobSpec {
    pub platform_id: i64,
    /// Platform type tag as supplied by the caller; validated at enqueue.
    pub platform_type: String,
    /// Profile URL or username, whichever the platform extractor expects.
    pub target: String,
    pub priority: Priority,
    /// Minimum time before the job becomes eligible for dispatch.
    pub delay: Duration,
    /// Overrides the configured default when set.
    pub max_attempts: Option<u32>,
    pub remove_on_complete: bool,
}

impl JobSpec {
    #[must_use]
    pub fn new(platform_id: i64, platform_type: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            platform_id,
            platform_type: platform_type.into(),
            target: target.into(),
            priority: Priority::NORMAL,
            delay: Duration::ZERO,
            max_attempts: None,
            remove_on_complete: true,
        }
    }

    #[must_use]
    pub fn priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    #[must_use]
    pub fn delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    #[must_use]
    pub fn max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = Some(max_attempts);
        self
    }

    /// When disabled, the completed job stays visible via
    /// `ScrapeQueue::completed_jobs` instead of being dropped.
    #[must_use]
    pub fn remove_on_complete(mut self, remove_on_complete: bool) -> Self {
        self.remove_on_complete = remove_on_complete;
        self
    }
}

/// A queued unit of work. Ephemeral — jobs live only in queue bookkeeping.
#[derive(Debug, Clone)]
pub struct ScrapeJob {
    pub id: JobId,
    pub platform_id: i64,
    pub platform_kind: PlatformKind,
    pub target: String,
    pub priority: Priority,
    /// Executions so far. Incremented at dispatch, so inside the executor
    /// it counts the current attempt.
    pub attempts: u32,
    pub max_attempts: u32,
    pub remove_on_complete: bool,
    /// Earliest dispatch time (enqueue delay or retry backoff).
    pub(crate) not_before: Instant,
    /// Monotonic insertion order for FIFO tie-break within a priority tier.
    pub(crate) seq: u64,
}
