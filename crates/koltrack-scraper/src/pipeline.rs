//! The scrape pipeline and its queue-facing executor.
//!
//! One scrape flows through init, navigate, stabilize, extract, persist,
//! cleanup. The session is always closed, a diagnostic screenshot is
//! captured best-effort on failure, and an attempt record is written for
//! every execution whatever the outcome.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use koltrack_core::{AppConfig, PlatformKind, ScrapeOutcome, ScrapeStatus};
use koltrack_db::metrics::{self, NewMetricSnapshot};
use koltrack_db::platforms;
use koltrack_db::scrape_attempts::{self, NewScrapeAttempt};
use koltrack_queue::{ScrapeExecutor, ScrapeJob};
use sqlx::PgPool;

use crate::browser::{Browser, BrowserSession};
use crate::error::ScrapeError;
use crate::extract::PlatformExtractor;
use crate::stealth;
use crate::types::ExtractedProfile;

/// What one pipeline run scrapes.
#[derive(Debug, Clone)]
pub struct ScrapeTarget {
    pub platform_id: i64,
    pub kind: PlatformKind,
    /// Profile URL or bare handle; the extractor normalizes it.
    pub target: String,
}

/// Drives one scrape end to end against an injected [`Browser`].
pub struct Pipeline {
    browser: Arc<dyn Browser>,
    config: Arc<AppConfig>,
}

impl Pipeline {
    #[must_use]
    pub fn new(browser: Arc<dyn Browser>, config: Arc<AppConfig>) -> Self {
        Self { browser, config }
    }

    /// Runs the full pipeline for `target`.
    ///
    /// # Errors
    ///
    /// Returns the stage error: [`ScrapeError::Init`] when no session can
    /// be acquired, [`ScrapeError::Navigation`] once the retry budget is
    /// spent, [`ScrapeError::Extraction`] on a structurally empty page.
    pub async fn run(&self, target: &ScrapeTarget) -> Result<ExtractedProfile, ScrapeError> {
        let extractor = PlatformExtractor::for_kind(target.kind);
        let url = extractor.profile_url(&target.target);

        let session_config = stealth::session_config(&self.config);
        let mut session = self.browser.new_session(session_config).await?;

        let result = self.drive(session.as_mut(), extractor, &url, target).await;
        if result.is_err() {
            self.capture_failure(session.as_mut(), target).await;
        }
        session.close().await;
        result
    }

    async fn drive(
        &self,
        session: &mut dyn BrowserSession,
        extractor: PlatformExtractor,
        url: &str,
        target: &ScrapeTarget,
    ) -> Result<ExtractedProfile, ScrapeError> {
        self.navigate_with_retry(session, url).await?;
        stealth::dismiss_interstitials(session, extractor.interstitial_selectors()).await;
        stealth::simulate_human(session).await;
        extractor.extract(session, &target.target).await
    }

    /// Retries navigation up to the configured attempt budget, pausing a
    /// randomized scrape delay between attempts.
    async fn navigate_with_retry(
        &self,
        session: &mut dyn BrowserSession,
        url: &str,
    ) -> Result<(), ScrapeError> {
        let timeout = Duration::from_secs(self.config.nav_timeout_secs);
        let attempts = self.config.nav_attempts.max(1);
        let mut timed_out = false;
        for attempt in 1..=attempts {
            match session.navigate(url, timeout).await {
                Ok(()) => return Ok(()),
                Err(err) => {
                    if let ScrapeError::Navigation { timed_out: t, .. } = &err {
                        timed_out = *t;
                    }
                    tracing::warn!(url, attempt, error = %err, "navigation attempt failed");
                    if attempt < attempts {
                        stealth::random_delay(
                            self.config.scrape_delay_min_ms,
                            self.config.scrape_delay_max_ms,
                        )
                        .await;
                    }
                }
            }
        }
        Err(ScrapeError::Navigation {
            url: url.to_owned(),
            attempts,
            timed_out,
        })
    }

    async fn capture_failure(&self, session: &mut dyn BrowserSession, target: &ScrapeTarget) {
        let filename = format!(
            "{}-{}-{}.png",
            target.kind.as_str(),
            target.platform_id,
            chrono::Utc::now().timestamp_millis()
        );
        let path = self.config.screenshot_dir.join(filename);
        if let Err(err) = session.screenshot(&path).await {
            tracing::warn!(error = %err, "failed to capture diagnostic screenshot");
        }
    }
}

/// Connects the pipeline to the queue's worker pool: marks the platform,
/// runs the scrape, persists the snapshot and the attempt record, and
/// resolves the platform's scrape status.
///
/// Storage writes are logged on failure but never change the result
/// reported to the queue: the upstream outcome reflects the scrape alone,
/// so a database hiccup cannot turn a successful extraction into a retry
/// (and a duplicate snapshot).
pub struct PipelineExecutor {
    pipeline: Pipeline,
    pool: PgPool,
}

impl PipelineExecutor {
    #[must_use]
    pub fn new(pipeline: Pipeline, pool: PgPool) -> Self {
        Self { pipeline, pool }
    }

    /// Attempt records are audit data; a failed insert is logged rather
    /// than allowed to fail the scrape it describes.
    async fn record_attempt(
        &self,
        job: &ScrapeJob,
        status: ScrapeOutcome,
        error_message: Option<String>,
        duration_ms: i64,
    ) {
        let attempt = NewScrapeAttempt {
            platform_id: Some(job.platform_id),
            platform: job.platform_kind.as_str().to_owned(),
            status,
            error_message,
            duration_ms: Some(duration_ms),
            metadata: serde_json::json!({
                "target": job.target,
                "queue_attempt": job.attempts,
            }),
        };
        if let Err(err) = scrape_attempts::insert_attempt(&self.pool, &attempt).await {
            tracing::error!(
                platform_id = job.platform_id,
                error = %err,
                "failed to record scrape attempt"
            );
        }
    }

    async fn store_snapshot(&self, job: &ScrapeJob, profile: &ExtractedProfile) {
        let snapshot = NewMetricSnapshot {
            platform_id: job.platform_id,
            followers: profile.followers,
            following: profile.following,
            posts: profile.posts,
            likes: profile.likes,
            engagement_rate: profile.engagement_rate,
            avg_views: profile.avg_views,
            avg_likes: profile.avg_likes,
            avg_comments: profile.avg_comments,
            avg_shares: profile.avg_shares,
            additional_metrics: profile.metadata_value(),
        };
        if let Err(err) = metrics::insert_snapshot(&self.pool, &snapshot).await {
            tracing::error!(
                platform_id = job.platform_id,
                error = %err,
                "failed to store metric snapshot"
            );
        }
    }

    async fn resolve_platform(&self, job: &ScrapeJob, status: ScrapeStatus) {
        if let Err(err) = platforms::mark_scrape_resolved(&self.pool, job.platform_id, status).await
        {
            tracing::error!(
                platform_id = job.platform_id,
                error = %err,
                "failed to resolve platform scrape status"
            );
        }
    }
}

#[async_trait]
impl ScrapeExecutor for PipelineExecutor {
    async fn execute(&self, job: &ScrapeJob) -> anyhow::Result<()> {
        let started = std::time::Instant::now();
        if let Err(err) = platforms::mark_scrape_started(&self.pool, job.platform_id).await {
            tracing::warn!(
                platform_id = job.platform_id,
                error = %err,
                "failed to mark scrape started"
            );
        }

        let target = ScrapeTarget {
            platform_id: job.platform_id,
            kind: job.platform_kind,
            target: job.target.clone(),
        };
        let result = self.pipeline.run(&target).await;
        let duration_ms = i64::try_from(started.elapsed().as_millis()).unwrap_or(i64::MAX);

        match result {
            Ok(profile) => {
                if profile.has_followers() {
                    self.store_snapshot(job, &profile).await;
                } else {
                    tracing::warn!(
                        platform_id = job.platform_id,
                        platform = job.platform_kind.as_str(),
                        "extraction found no follower count; snapshot skipped"
                    );
                }
                self.record_attempt(job, ScrapeOutcome::Success, None, duration_ms)
                    .await;
                self.resolve_platform(job, ScrapeStatus::Success).await;
                tracing::info!(
                    platform_id = job.platform_id,
                    platform = job.platform_kind.as_str(),
                    followers = profile.followers,
                    duration_ms,
                    "scrape succeeded"
                );
                Ok(())
            }
            Err(err) => {
                let outcome = match &err {
                    ScrapeError::Navigation { timed_out: true, .. } => ScrapeOutcome::Timeout,
                    _ => ScrapeOutcome::Failed,
                };
                self.record_attempt(job, outcome, Some(err.to_string()), duration_ms)
                    .await;
                self.resolve_platform(job, ScrapeStatus::Failed).await;
                Err(err.into())
            }
        }
    }
}

#[cfg(test)]
#[path = "pipeline_test.rs"]
mod pipeline_test;
