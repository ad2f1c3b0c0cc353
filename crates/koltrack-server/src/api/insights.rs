//! Read-only insight endpoints: metric history, weekly trending, the
//! attempt audit log, and roster stats.

use axum::extract::{Path, Query, State};
use axum::response::IntoResponse;
use axum::{Extension, Json};
use koltrack_core::trend;
use koltrack_core::ScrapeOutcome;
use koltrack_db::{kols, metrics, platforms, scrape_attempts, AttemptFilter};
use serde::{Deserialize, Serialize};

use crate::middleware::RequestId;

use super::{map_db_error, normalize_limit, ApiError, ApiResponse, AppState, ResponseMeta};

#[derive(Debug, Deserialize)]
pub(super) struct MetricsQuery {
    days: Option<i64>,
}

#[derive(Debug, Serialize)]
pub(super) struct PlatformMetricsData {
    platform_id: i64,
    days: i64,
    snapshots: Vec<koltrack_db::MetricRow>,
}

pub(super) async fn platform_metrics(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(platform_id): Path<i64>,
    Query(query): Query<MetricsQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let days = query.days.unwrap_or(30).clamp(1, 365);

    // Distinguishes an unknown platform from one with no snapshots.
    platforms::get_platform(&state.pool, platform_id)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    let snapshots = metrics::list_snapshots(&state.pool, platform_id, days)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    Ok(Json(ApiResponse {
        data: PlatformMetricsData {
            platform_id,
            days,
            snapshots,
        },
        meta: ResponseMeta::new(req_id.0),
    }))
}

#[derive(Debug, Deserialize)]
pub(super) struct TrendingQuery {
    limit: Option<i64>,
}

pub(super) async fn trending_week(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(query): Query<TrendingQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let limit = usize::try_from(normalize_limit(query.limit)).unwrap_or(50);

    let points = metrics::weekly_follower_series(&state.pool)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;
    let ranked = trend::rank_by_weekly_growth(&points, limit);

    Ok(Json(ApiResponse {
        data: ranked,
        meta: ResponseMeta::new(req_id.0),
    }))
}

#[derive(Debug, Deserialize)]
pub(super) struct AttemptsQuery {
    status: Option<String>,
    platform: Option<String>,
    hours: Option<i64>,
    page: Option<i64>,
    limit: Option<i64>,
}

#[derive(Debug, Serialize)]
pub(super) struct AttemptsData {
    attempts: Vec<koltrack_db::ScrapeAttemptRow>,
    total: i64,
    page: i64,
    limit: i64,
}

pub(super) async fn list_attempts(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(query): Query<AttemptsQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let limit = normalize_limit(query.limit);
    let page = query.page.unwrap_or(1).max(1);

    let filter = AttemptFilter {
        status: query.status,
        platform: query.platform,
        since_hours: query.hours,
        limit,
        offset: (page - 1) * limit,
    };
    let (attempts, total) = scrape_attempts::list_attempts(&state.pool, &filter)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    Ok(Json(ApiResponse {
        data: AttemptsData {
            attempts,
            total,
            page,
            limit,
        },
        meta: ResponseMeta::new(req_id.0),
    }))
}

#[derive(Debug, Serialize)]
pub(super) struct StatsData {
    kols: i64,
    platforms: i64,
    snapshots: i64,
    attempts_succeeded_24h: i64,
    attempts_failed_24h: i64,
    queue: koltrack_queue::QueueCounts,
    scheduler: crate::scheduler::SweepsStatus,
}

pub(super) async fn stats(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> Result<impl IntoResponse, ApiError> {
    let map_err = |e: &koltrack_db::DbError| map_db_error(req_id.0.clone(), e);

    let kols = kols::count_kols(&state.pool).await.map_err(|e| map_err(&e))?;
    let platforms = platforms::count_platforms(&state.pool)
        .await
        .map_err(|e| map_err(&e))?;
    let snapshots = metrics::count_snapshots(&state.pool)
        .await
        .map_err(|e| map_err(&e))?;
    let attempts_succeeded_24h =
        scrape_attempts::count_attempts_since(&state.pool, 24, ScrapeOutcome::Success)
            .await
            .map_err(|e| map_err(&e))?;
    let attempts_failed_24h =
        scrape_attempts::count_attempts_since(&state.pool, 24, ScrapeOutcome::Failed)
            .await
            .map_err(|e| map_err(&e))?;

    Ok(Json(ApiResponse {
        data: StatsData {
            kols,
            platforms,
            snapshots,
            attempts_succeeded_24h,
            attempts_failed_24h,
            queue: state.queue.status(),
            scheduler: state.sweeps.status(),
        },
        meta: ResponseMeta::new(req_id.0),
    }))
}
