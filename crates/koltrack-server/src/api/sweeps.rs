//! Manual sweep triggers and scheduler status.

use axum::extract::{Path, State};
use axum::response::IntoResponse;
use axum::{Extension, Json};
use serde::Serialize;

use crate::middleware::RequestId;

use super::{map_db_error, ApiError, ApiResponse, AppState, ResponseMeta};

pub(super) async fn scheduler_status(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> impl IntoResponse {
    Json(ApiResponse {
        data: state.sweeps.status(),
        meta: ResponseMeta::new(req_id.0),
    })
}

#[derive(Debug, Serialize)]
pub(super) struct TriggeredData {
    sweep: &'static str,
    enqueued: usize,
}

pub(super) async fn trigger_full(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> impl IntoResponse {
    let enqueued = state.sweeps.run_full_sweep().await;
    Json(ApiResponse {
        data: TriggeredData {
            sweep: "full-roster",
            enqueued,
        },
        meta: ResponseMeta::new(req_id.0),
    })
}

pub(super) async fn trigger_priority(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> impl IntoResponse {
    let enqueued = state.sweeps.run_priority_sweep().await;
    Json(ApiResponse {
        data: TriggeredData {
            sweep: "priority",
            enqueued,
        },
        meta: ResponseMeta::new(req_id.0),
    })
}

#[derive(Debug, Serialize)]
pub(super) struct KolTriggeredData {
    kol_id: i64,
    enqueued: usize,
}

pub(super) async fn trigger_kol(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(kol_id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let enqueued = state
        .sweeps
        .trigger_for_kol(kol_id)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    Ok(Json(ApiResponse {
        data: KolTriggeredData { kol_id, enqueued },
        meta: ResponseMeta::new(req_id.0),
    }))
}
