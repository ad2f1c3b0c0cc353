//! In-process scrape job queue.
//!
//! A priority queue with a bounded worker pool, exponential-backoff retry
//! bookkeeping, and per-platform mutual exclusion: at most one job per
//! platform is ever in flight, because the extraction pipeline mutates the
//! platform's scrape status fields.

mod job;
mod queue;
mod state;
mod worker;

use thiserror::Error;

pub use job::{JobId, JobSpec, Priority, ScrapeJob};
pub use queue::{QueueCounts, QueueDefaults, ScrapeQueue};
pub use state::FailedJob;
pub use worker::{spawn_workers, ScrapeExecutor};

#[derive(Debug, Error)]
pub enum QueueError {
    #[error("invalid job: {reason}")]
    InvalidJob { reason: String },
}
