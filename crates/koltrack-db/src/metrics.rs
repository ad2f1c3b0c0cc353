//! Append-only metric snapshots and the trend-window query.

use chrono::{DateTime, Utc};
use koltrack_core::trend::FollowerPoint;
use sqlx::PgPool;

use crate::DbError;

/// A row from the `metrics` table.
#[derive(Debug, Clone, sqlx::FromRow, serde::Serialize)]
pub struct MetricRow {
    pub id: i64,
    pub platform_id: i64,
    pub followers: i64,
    pub following: i64,
    pub posts: i64,
    pub likes: i64,
    pub engagement_rate: f64,
    pub avg_views: i64,
    pub avg_likes: i64,
    pub avg_comments: i64,
    pub avg_shares: i64,
    pub additional_metrics: serde_json::Value,
    pub captured_at: DateTime<Utc>,
}

/// A snapshot to insert. `captured_at` is assigned by the database.
#[derive(Debug, Clone, Default)]
pub struct NewMetricSnapshot {
    pub platform_id: i64,
    pub followers: i64,
    pub following: i64,
    pub posts: i64,
    pub likes: i64,
    pub engagement_rate: f64,
    pub avg_views: i64,
    pub avg_likes: i64,
    pub avg_comments: i64,
    pub avg_shares: i64,
    pub additional_metrics: serde_json::Value,
}

const METRIC_COLUMNS: &str = "id, platform_id, followers, following, posts, likes, \
                              engagement_rate, avg_views, avg_likes, avg_comments, \
                              avg_shares, additional_metrics, captured_at";

/// Inserts one metric snapshot and returns its id.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the insert fails.
pub async fn insert_snapshot(pool: &PgPool, snapshot: &NewMetricSnapshot) -> Result<i64, DbError> {
    let (id,): (i64,) = sqlx::query_as(
        "INSERT INTO metrics (platform_id, followers, following, posts, likes, \
                              engagement_rate, avg_views, avg_likes, avg_comments, \
                              avg_shares, additional_metrics) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11) \
         RETURNING id",
    )
    .bind(snapshot.platform_id)
    .bind(snapshot.followers)
    .bind(snapshot.following)
    .bind(snapshot.posts)
    .bind(snapshot.likes)
    .bind(snapshot.engagement_rate)
    .bind(snapshot.avg_views)
    .bind(snapshot.avg_likes)
    .bind(snapshot.avg_comments)
    .bind(snapshot.avg_shares)
    .bind(&snapshot.additional_metrics)
    .fetch_one(pool)
    .await?;
    Ok(id)
}

/// Lists snapshots for a platform within the trailing `days` window,
/// ordered by capture time ascending.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] on query failure.
pub async fn list_snapshots(
    pool: &PgPool,
    platform_id: i64,
    days: i64,
) -> Result<Vec<MetricRow>, DbError> {
    let rows = sqlx::query_as::<_, MetricRow>(&format!(
        "SELECT {METRIC_COLUMNS} FROM metrics \
         WHERE platform_id = $1 \
           AND captured_at >= NOW() - make_interval(days => $2) \
         ORDER BY captured_at"
    ))
    .bind(platform_id)
    .bind(days)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

/// Follower measurements for all platforms of active KOLs in the trailing
/// seven days, ordered by capture time. Feeds
/// [`koltrack_core::trend::rank_by_weekly_growth`].
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] on query failure.
pub async fn weekly_follower_series(pool: &PgPool) -> Result<Vec<FollowerPoint>, DbError> {
    #[derive(sqlx::FromRow)]
    struct SeriesRow {
        kol_id: i64,
        kol_name: String,
        platform_id: i64,
        followers: i64,
        captured_at: DateTime<Utc>,
    }

    let rows = sqlx::query_as::<_, SeriesRow>(
        "SELECT k.id AS kol_id, k.name AS kol_name, m.platform_id, \
                m.followers, m.captured_at \
         FROM metrics m \
         JOIN platforms p ON p.id = m.platform_id \
         JOIN kols k ON k.id = p.kol_id \
         WHERE k.is_active \
           AND m.captured_at >= NOW() - INTERVAL '7 days' \
         ORDER BY k.id, m.platform_id, m.captured_at",
    )
    .fetch_all(pool)
    .await?;

    Ok(rows
        .into_iter()
        .map(|r| FollowerPoint {
            kol_id: r.kol_id,
            kol_name: r.kol_name,
            platform_id: r.platform_id,
            followers: r.followers,
            captured_at: r.captured_at,
        })
        .collect())
}

/// Counts all snapshots, for the admin stats endpoint.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] on query failure.
pub async fn count_snapshots(pool: &PgPool) -> Result<i64, DbError> {
    let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM metrics")
        .fetch_one(pool)
        .await?;
    Ok(count)
}
