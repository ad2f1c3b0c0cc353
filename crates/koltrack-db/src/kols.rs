//! Read-only queries over the `kols` roster.
//!
//! KOL records are created and edited by the external CRUD surface; the
//! orchestration core only reads them to enumerate scrape targets.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::DbError;

/// A row from the `kols` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct KolRow {
    pub id: i64,
    pub name: String,
    pub category: Option<String>,
    pub bio: Option<String>,
    pub avatar_url: Option<String>,
    pub is_active: bool,
    /// Explicit priority flag; the daily priority sweep filters on this
    /// rather than on free-form metadata.
    pub is_priority: bool,
    pub tags: serde_json::Value,
    pub metadata: serde_json::Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

const KOL_COLUMNS: &str = "id, name, category, bio, avatar_url, is_active, is_priority, \
                           tags, metadata, created_at, updated_at";

/// Fetches a single KOL by id.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if no such row exists, [`DbError::Sqlx`]
/// on query failure.
pub async fn get_kol(pool: &PgPool, id: i64) -> Result<KolRow, DbError> {
    sqlx::query_as::<_, KolRow>(&format!("SELECT {KOL_COLUMNS} FROM kols WHERE id = $1"))
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or(DbError::NotFound)
}

/// Lists all active KOLs.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] on query failure.
pub async fn list_active_kols(pool: &PgPool) -> Result<Vec<KolRow>, DbError> {
    let rows = sqlx::query_as::<_, KolRow>(&format!(
        "SELECT {KOL_COLUMNS} FROM kols WHERE is_active ORDER BY id"
    ))
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

/// Counts all KOLs, for the admin stats endpoint.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] on query failure.
pub async fn count_kols(pool: &PgPool) -> Result<i64, DbError> {
    let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM kols")
        .fetch_one(pool)
        .await?;
    Ok(count)
}
