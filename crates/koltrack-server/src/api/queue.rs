//! Queue control endpoints.

use std::time::Duration;

use axum::extract::{Query, State};
use axum::response::IntoResponse;
use axum::{Extension, Json};
use koltrack_queue::{JobSpec, Priority};
use serde::{Deserialize, Serialize};

use crate::middleware::RequestId;

use super::{map_db_error, ApiError, ApiResponse, AppState, ResponseMeta};

#[derive(Debug, Serialize)]
pub(super) struct QueueStatusData {
    paused: bool,
    #[serde(flatten)]
    counts: koltrack_queue::QueueCounts,
}

pub(super) async fn queue_status(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> impl IntoResponse {
    Json(ApiResponse {
        data: QueueStatusData {
            paused: state.queue.is_paused(),
            counts: state.queue.status(),
        },
        meta: ResponseMeta::new(req_id.0),
    })
}

#[derive(Debug, Serialize)]
pub(super) struct PausedData {
    paused: bool,
}

pub(super) async fn pause_queue(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> impl IntoResponse {
    state.queue.pause();
    Json(ApiResponse {
        data: PausedData { paused: true },
        meta: ResponseMeta::new(req_id.0),
    })
}

pub(super) async fn resume_queue(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> impl IntoResponse {
    state.queue.resume();
    Json(ApiResponse {
        data: PausedData { paused: false },
        meta: ResponseMeta::new(req_id.0),
    })
}

#[derive(Debug, Serialize)]
pub(super) struct ClearedData {
    cleared: usize,
}

pub(super) async fn clear_queue(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> impl IntoResponse {
    let cleared = state.queue.clear();
    tracing::info!(cleared, "queue cleared via API");
    Json(ApiResponse {
        data: ClearedData { cleared },
        meta: ResponseMeta::new(req_id.0),
    })
}

#[derive(Debug, Deserialize)]
pub(super) struct EnqueueBody {
    platform_id: i64,
    /// 0 = high, 1 = normal, 2 = low. Defaults to normal.
    priority: Option<u8>,
    delay_secs: Option<u64>,
}

#[derive(Debug, Serialize)]
pub(super) struct EnqueuedData {
    job_id: koltrack_queue::JobId,
    platform_id: i64,
}

pub(super) async fn enqueue_job(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Json(body): Json<EnqueueBody>,
) -> Result<impl IntoResponse, ApiError> {
    let platform = koltrack_db::platforms::get_platform(&state.pool, body.platform_id)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    let target = if platform.profile_url.is_empty() {
        platform.username.clone()
    } else {
        platform.profile_url.clone()
    };
    let spec = JobSpec::new(platform.id, platform.platform_type.as_str(), target)
        .priority(Priority(body.priority.unwrap_or(1)))
        .delay(Duration::from_secs(body.delay_secs.unwrap_or(0)));

    let job_id = state
        .queue
        .enqueue(spec)
        .map_err(|e| ApiError::new(req_id.0.clone(), "validation_error", e.to_string()))?;

    Ok(Json(ApiResponse {
        data: EnqueuedData {
            job_id,
            platform_id: platform.id,
        },
        meta: ResponseMeta::new(req_id.0),
    }))
}

#[derive(Debug, Deserialize)]
pub(super) struct RetryFailedQuery {
    hours: Option<i64>,
}

#[derive(Debug, Serialize)]
pub(super) struct RetriedData {
    enqueued: usize,
    hours: i64,
}

pub(super) async fn retry_failed(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(query): Query<RetryFailedQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let hours = query.hours.unwrap_or(24);
    if !(1..=24 * 30).contains(&hours) {
        return Err(ApiError::new(
            req_id.0,
            "validation_error",
            "hours must be between 1 and 720",
        ));
    }

    let enqueued = state
        .sweeps
        .retry_failed_since(hours)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    Ok(Json(ApiResponse {
        data: RetriedData { enqueued, hours },
        meta: ResponseMeta::new(req_id.0),
    }))
}
