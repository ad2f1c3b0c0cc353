//! Owned queue bookkeeping.
//!
//! All mutable queue state lives in this one struct behind the queue's
//! mutex, with accessor methods instead of ambient counters, so it can be
//! exercised directly in tests.

use std::collections::HashMap;

use tokio::time::Instant;

use crate::job::{JobId, ScrapeJob};

/// A permanently failed job, retained for operator inspection.
#[derive(Debug, Clone)]
pub struct FailedJob {
    pub job: ScrapeJob,
    pub error: String,
}

#[derive(Debug, Default)]
pub(crate) struct QueueState {
    waiting: Vec<ScrapeJob>,
    /// platform_id → job id currently in flight for that platform.
    active: HashMap<i64, JobId>,
    completed: u64,
    /// Completed jobs whose spec opted out of removal on completion.
    retained: Vec<ScrapeJob>,
    failed: Vec<FailedJob>,
    paused: bool,
    next_job_id: JobId,
    next_seq: u64,
}

impl QueueState {
    pub(crate) fn allocate_ids(&mut self) -> (JobId, u64) {
        self.next_job_id += 1;
        self.next_seq += 1;
        (self.next_job_id, self.next_seq)
    }

    pub(crate) fn push_waiting(&mut self, job: ScrapeJob) {
        self.waiting.push(job);
    }

    /// Selects and removes the next dispatchable job: lowest priority value
    /// first, FIFO within a tier, delay elapsed, and no in-flight job on
    /// the same platform. Jobs blocked by the platform exclusion stay
    /// waiting at their original priority.
    pub(crate) fn take_eligible(&mut self, now: Instant) -> Option<ScrapeJob> {
        if self.paused {
            return None;
        }

        let mut best: Option<usize> = None;
        for (idx, job) in self.waiting.iter().enumerate() {
            if job.not_before > now || self.active.contains_key(&job.platform_id) {
                continue;
            }
            match best {
                None => best = Some(idx),
                Some(b) => {
                    let current = &self.waiting[b];
                    if (job.priority, job.seq) < (current.priority, current.seq) {
                        best = Some(idx);
                    }
                }
            }
        }

        let idx = best?;
        let mut job = self.waiting.remove(idx);
        job.attempts += 1;
        self.active.insert(job.platform_id, job.id);
        Some(job)
    }

    /// Earliest future eligibility time among waiting jobs, used to bound
    /// worker sleeps when nothing is dispatchable right now.
    pub(crate) fn next_wakeup(&self, now: Instant) -> Option<Instant> {
        if self.paused {
            return None;
        }
        self.waiting
            .iter()
            .filter(|job| job.not_before > now)
            .map(|job| job.not_before)
            .min()
    }

    /// Releases the platform slot held by a dispatched job.
    pub(crate) fn release(&mut self, job: &ScrapeJob) {
        self.active.remove(&job.platform_id);
    }

    pub(crate) fn record_completed(&mut self, retained: Option<ScrapeJob>) {
        self.completed += 1;
        if let Some(job) = retained {
            self.retained.push(job);
        }
    }

    pub(crate) fn record_failed(&mut self, job: ScrapeJob, error: String) {
        self.failed.push(FailedJob { job, error });
    }

    pub(crate) fn pause(&mut self) {
        self.paused = true;
    }

    pub(crate) fn resume(&mut self) {
        self.paused = false;
    }

    pub(crate) fn is_paused(&self) -> bool {
        self.paused
    }

    /// Discards all waiting jobs; in-flight jobs are untouched.
    pub(crate) fn clear_waiting(&mut self) -> usize {
        let discarded = self.waiting.len();
        self.waiting.clear();
        discarded
    }

    pub(crate) fn waiting_count(&self) -> usize {
        self.waiting.len()
    }

    pub(crate) fn active_count(&self) -> usize {
        self.active.len()
    }

    pub(crate) fn completed_count(&self) -> u64 {
        self.completed
    }

    pub(crate) fn failed_count(&self) -> usize {
        self.failed.len()
    }

    pub(crate) fn failed_jobs(&self) -> &[FailedJob] {
        &self.failed
    }

    pub(crate) fn completed_jobs(&self) -> &[ScrapeJob] {
        &self.retained
    }
}
