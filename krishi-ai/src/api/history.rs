//! Scan history and statistics

use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::db::{ScanStats, StoredScan};
use crate::{ApiError, ApiResult, AppState};

pub const DEFAULT_HISTORY_LIMIT: u32 = 20;
pub const MAX_HISTORY_LIMIT: u32 = 100;

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    pub limit: Option<u32>,
}

#[derive(Debug, Serialize)]
pub struct HistoryResponse {
    pub total: usize,
    pub scans: Vec<StoredScan>,
}

/// GET /history?limit=N
pub async fn get_history(
    State(state): State<AppState>,
    Query(query): Query<HistoryQuery>,
) -> ApiResult<Json<HistoryResponse>> {
    let limit = query.limit.unwrap_or(DEFAULT_HISTORY_LIMIT);
    if limit == 0 || limit > MAX_HISTORY_LIMIT {
        return Err(ApiError::BadRequest(format!(
            "limit must be between 1 and {}",
            MAX_HISTORY_LIMIT
        )));
    }

    let scans = state.recorder.recent_scans(limit).await?;
    Ok(Json(HistoryResponse {
        total: scans.len(),
        scans,
    }))
}

/// GET /stats
pub async fn get_stats(State(state): State<AppState>) -> ApiResult<Json<ScanStats>> {
    Ok(Json(state.recorder.disease_stats().await?))
}

pub fn history_routes() -> Router<AppState> {
    Router::new()
        .route("/history", get(get_history))
        .route("/stats", get(get_stats))
}
