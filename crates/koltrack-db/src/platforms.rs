//! Queries over the `platforms` table.
//!
//! Besides target enumeration for the scheduler sweeps, this module owns
//! the two status mutations the orchestration core performs: marking a
//! scrape started (status → pending) and resolved (status → success/failed).

use chrono::{DateTime, Utc};
use koltrack_core::ScrapeStatus;
use sqlx::PgPool;

use crate::DbError;

/// A row from the `platforms` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct PlatformRow {
    pub id: i64,
    pub kol_id: i64,
    pub platform_type: String,
    pub username: String,
    pub profile_url: String,
    pub is_verified: bool,
    pub last_scraped_at: Option<DateTime<Utc>>,
    pub scrape_status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

const PLATFORM_COLUMNS: &str =
    "p.id, p.kol_id, p.platform_type, p.username, p.profile_url, p.is_verified, \
     p.last_scraped_at, p.scrape_status, p.created_at, p.updated_at";

/// Fetches a single platform by id.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if no such row exists, [`DbError::Sqlx`]
/// on query failure.
pub async fn get_platform(pool: &PgPool, id: i64) -> Result<PlatformRow, DbError> {
    sqlx::query_as::<_, PlatformRow>(&format!(
        "SELECT {PLATFORM_COLUMNS} FROM platforms p WHERE p.id = $1"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or(DbError::NotFound)
}

/// Lists every platform belonging to an active KOL, for the full-roster sweep.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] on query failure.
pub async fn list_active_platforms(pool: &PgPool) -> Result<Vec<PlatformRow>, DbError> {
    let rows = sqlx::query_as::<_, PlatformRow>(&format!(
        "SELECT {PLATFORM_COLUMNS} FROM platforms p \
         JOIN kols k ON k.id = p.kol_id \
         WHERE k.is_active \
         ORDER BY p.id"
    ))
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

/// Lists platforms of active, priority-flagged KOLs, newest KOLs first,
/// capped at `limit`. Used by the daily priority sweep.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] on query failure.
pub async fn list_priority_platforms(
    pool: &PgPool,
    limit: i64,
) -> Result<Vec<PlatformRow>, DbError> {
    let rows = sqlx::query_as::<_, PlatformRow>(&format!(
        "SELECT {PLATFORM_COLUMNS} FROM platforms p \
         JOIN kols k ON k.id = p.kol_id \
         WHERE k.is_active AND k.is_priority \
         ORDER BY p.id \
         LIMIT $1"
    ))
    .bind(limit)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

/// Lists platforms whose last scrape failed within the trailing `hours`.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] on query failure.
pub async fn list_failed_within(pool: &PgPool, hours: i64) -> Result<Vec<PlatformRow>, DbError> {
    let rows = sqlx::query_as::<_, PlatformRow>(&format!(
        "SELECT {PLATFORM_COLUMNS} FROM platforms p \
         WHERE p.scrape_status = 'failed' \
           AND p.last_scraped_at >= NOW() - make_interval(hours => $1) \
         ORDER BY p.id"
    ))
    .bind(hours)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

/// Lists platforms of active KOLs never scraped, or not scraped in the
/// last `days`. Used by the hourly health sweep's staleness pass.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] on query failure.
pub async fn list_stale_platforms(pool: &PgPool, days: i64) -> Result<Vec<PlatformRow>, DbError> {
    let rows = sqlx::query_as::<_, PlatformRow>(&format!(
        "SELECT {PLATFORM_COLUMNS} FROM platforms p \
         JOIN kols k ON k.id = p.kol_id \
         WHERE k.is_active \
           AND (p.last_scraped_at IS NULL \
                OR p.last_scraped_at < NOW() - make_interval(days => $1)) \
         ORDER BY p.id"
    ))
    .bind(days)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

/// Lists all platforms of one KOL, for manual per-KOL triggers.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] on query failure.
pub async fn list_platforms_for_kol(
    pool: &PgPool,
    kol_id: i64,
) -> Result<Vec<PlatformRow>, DbError> {
    let rows = sqlx::query_as::<_, PlatformRow>(&format!(
        "SELECT {PLATFORM_COLUMNS} FROM platforms p WHERE p.kol_id = $1 ORDER BY p.id"
    ))
    .bind(kol_id)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

/// Marks a scrape as in flight: status → `pending`, `last_scraped_at` → now.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if the platform does not exist,
/// [`DbError::Sqlx`] on query failure.
pub async fn mark_scrape_started(pool: &PgPool, id: i64) -> Result<(), DbError> {
    let result = sqlx::query(
        "UPDATE platforms \
         SET scrape_status = 'pending', last_scraped_at = NOW(), updated_at = NOW() \
         WHERE id = $1",
    )
    .bind(id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::NotFound);
    }
    Ok(())
}

/// Records the resolution of a scrape: status → `success` or `failed`.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if the platform does not exist,
/// [`DbError::Sqlx`] on query failure.
pub async fn mark_scrape_resolved(
    pool: &PgPool,
    id: i64,
    status: ScrapeStatus,
) -> Result<(), DbError> {
    let result = sqlx::query(
        "UPDATE platforms SET scrape_status = $1, updated_at = NOW() WHERE id = $2",
    )
    .bind(status.as_str())
    .bind(id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::NotFound);
    }
    Ok(())
}

/// Counts all platforms, for the admin stats endpoint.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] on query failure.
pub async fn count_platforms(pool: &PgPool) -> Result<i64, DbError> {
    let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM platforms")
        .fetch_one(pool)
        .await?;
    Ok(count)
}
