//! The append-only scrape audit trail.
//!
//! An attempt row is written for every extraction run, success or failure,
//! independently of whether a metric snapshot was produced. The metadata
//! bag carries the raw extracted fields, which is the main tool for
//! diagnosing selector drift after platform markup changes.

use chrono::{DateTime, Utc};
use koltrack_core::ScrapeOutcome;
use sqlx::PgPool;

use crate::DbError;

/// A row from the `scrape_attempts` table.
#[derive(Debug, Clone, sqlx::FromRow, serde::Serialize)]
pub struct ScrapeAttemptRow {
    pub id: i64,
    pub platform_id: Option<i64>,
    pub platform: String,
    pub status: String,
    pub error_message: Option<String>,
    pub duration_ms: Option<i64>,
    pub metadata: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

/// An attempt record to insert.
#[derive(Debug, Clone)]
pub struct NewScrapeAttempt {
    pub platform_id: Option<i64>,
    pub platform: String,
    pub status: ScrapeOutcome,
    pub error_message: Option<String>,
    pub duration_ms: Option<i64>,
    pub metadata: serde_json::Value,
}

/// Filter for browsing the audit trail.
#[derive(Debug, Clone, Default)]
pub struct AttemptFilter {
    pub status: Option<String>,
    pub platform: Option<String>,
    /// Only attempts created within the trailing window, when set.
    pub since_hours: Option<i64>,
    pub limit: i64,
    pub offset: i64,
}

const ATTEMPT_COLUMNS: &str =
    "id, platform_id, platform, status, error_message, duration_ms, metadata, created_at";

/// Inserts one attempt record and returns its id.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the insert fails.
pub async fn insert_attempt(pool: &PgPool, attempt: &NewScrapeAttempt) -> Result<i64, DbError> {
    let (id,): (i64,) = sqlx::query_as(
        "INSERT INTO scrape_attempts (platform_id, platform, status, error_message, \
                                      duration_ms, metadata) \
         VALUES ($1, $2, $3, $4, $5, $6) \
         RETURNING id",
    )
    .bind(attempt.platform_id)
    .bind(&attempt.platform)
    .bind(attempt.status.as_str())
    .bind(&attempt.error_message)
    .bind(attempt.duration_ms)
    .bind(&attempt.metadata)
    .fetch_one(pool)
    .await?;
    Ok(id)
}

/// Lists attempts newest-first under the given filter, returning the page
/// and the total matching count.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] on query failure.
pub async fn list_attempts(
    pool: &PgPool,
    filter: &AttemptFilter,
) -> Result<(Vec<ScrapeAttemptRow>, i64), DbError> {
    // All filter arms bind the same positional parameters: NULL disables
    // the corresponding predicate.
    let where_clause = "WHERE ($1::text IS NULL OR status = $1) \
                        AND ($2::text IS NULL OR platform = $2) \
                        AND ($3::bigint IS NULL \
                             OR created_at >= NOW() - make_interval(hours => $3))";

    let rows = sqlx::query_as::<_, ScrapeAttemptRow>(&format!(
        "SELECT {ATTEMPT_COLUMNS} FROM scrape_attempts {where_clause} \
         ORDER BY created_at DESC \
         LIMIT $4 OFFSET $5"
    ))
    .bind(&filter.status)
    .bind(&filter.platform)
    .bind(filter.since_hours)
    .bind(filter.limit)
    .bind(filter.offset)
    .fetch_all(pool)
    .await?;

    let (total,): (i64,) = sqlx::query_as(&format!(
        "SELECT COUNT(*) FROM scrape_attempts {where_clause}"
    ))
    .bind(&filter.status)
    .bind(&filter.platform)
    .bind(filter.since_hours)
    .fetch_one(pool)
    .await?;

    Ok((rows, total))
}

/// Counts attempts with the given outcome in the trailing `hours`, for the
/// admin stats endpoint.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] on query failure.
pub async fn count_attempts_since(
    pool: &PgPool,
    hours: i64,
    status: ScrapeOutcome,
) -> Result<i64, DbError> {
    let (count,): (i64,) = sqlx::query_as(
        "SELECT COUNT(*) FROM scrape_attempts \
         WHERE status = $1 AND created_at >= NOW() - make_interval(hours => $2)",
    )
    .bind(status.as_str())
    .bind(hours)
    .fetch_one(pool)
    .await?;
    Ok(count)
}
