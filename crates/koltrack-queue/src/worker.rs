//! Bounded worker pool driving jobs through an injected executor.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::task::JoinHandle;

use crate::job::ScrapeJob;
use crate::queue::ScrapeQueue;

/// The capability a worker applies to each claimed job.
///
/// The production implementation runs the full extraction pipeline and
/// owns the platform status transitions (pending at start, success/failed
/// at resolution) and all persistence; tests inject recording stubs.
#[async_trait]
pub trait ScrapeExecutor: Send + Sync + 'static {
    async fn execute(&self, job: &ScrapeJob) -> anyhow::Result<()>;
}

/// Spawns `count` workers, each running claimed jobs to completion before
/// taking the next. Workers suspend cooperatively while the queue has
/// nothing dispatchable.
///
/// The returned handles live for the process lifetime; aborting them stops
/// dispatch but cannot interrupt an executor mid-run.
pub fn spawn_workers(
    queue: Arc<ScrapeQueue>,
    executor: Arc<dyn ScrapeExecutor>,
    count: usize,
) -> Vec<JoinHandle<()>> {
    (0..count)
        .map(|worker_id| {
            let queue = Arc::clone(&queue);
            let executor = Arc::clone(&executor);
            tokio::spawn(async move {
                tracing::debug!(worker_id, "queue: worker started");
                loop {
                    let job = queue.next_job().await;
                    tracing::info!(
                        worker_id,
                        job_id = job.id,
                        platform_id = job.platform_id,
                        platform = %job.platform_kind,
                        attempt = job.attempts,
                        "queue: dispatching job"
                    );
                    match executor.execute(&job).await {
                        Ok(()) => queue.report_success(&job),
                        Err(e) => {
                            queue.report_failure(job, e.to_string());
                        }
                    }
                }
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use super::*;
    use crate::job::{JobSpec, Priority};
    use crate::queue::QueueDefaults;

    /// Executor that records peak concurrency and completes after a pause.
    struct SlowExecutor {
        running: AtomicUsize,
        peak: AtomicUsize,
        total: AtomicUsize,
    }

    #[async_trait]
    impl ScrapeExecutor for SlowExecutor {
        async fn execute(&self, _job: &ScrapeJob) -> anyhow::Result<()> {
            let now = self.running.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(20)).await;
            self.running.fetch_sub(1, Ordering::SeqCst);
            self.total.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    #[tokio::test]
    async fn pool_never_exceeds_worker_count() {
        let queue = Arc::new(ScrapeQueue::new(QueueDefaults::default()));
        let executor = Arc::new(SlowExecutor {
            running: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
            total: AtomicUsize::new(0),
        });

        for platform_id in 1..=6 {
            queue
                .enqueue(
                    JobSpec::new(platform_id, "youtube", format!("channel-{platform_id}"))
                        .priority(Priority::NORMAL),
                )
                .unwrap();
        }

        let handles = spawn_workers(Arc::clone(&queue), executor.clone(), 2);

        // Wait for all six jobs to finish.
        for _ in 0..100 {
            if queue.status().completed == 6 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }

        assert_eq!(queue.status().completed, 6);
        assert_eq!(executor.total.load(Ordering::SeqCst), 6);
        assert!(
            executor.peak.load(Ordering::SeqCst) <= 2,
            "concurrency ceiling exceeded"
        );
        for handle in handles {
            handle.abort();
        }
    }
}
