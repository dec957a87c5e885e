//! Snapshot reload endpoint

use axum::{extract::State, Json};
use chrono::{DateTime, Utc};
use serde::Serialize;

use super::ApiError;
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct ReloadResponse {
    pub status: String,
    pub merged_records: usize,
    pub loaded_at: DateTime<Utc>,
}

/// POST /api/reload
///
/// Re-fetches every source and swaps in the new snapshot. Source failures
/// degrade to empty tables; a failed merge keeps the previous snapshot and
/// answers 500.
pub async fn reload(State(state): State<AppState>) -> Result<Json<ReloadResponse>, ApiError> {
    let dashboard = state
        .reload()
        .await
        .map_err(|e| ApiError::Reload(e.to_string()))?;

    Ok(Json(ReloadResponse {
        status: "ok".to_string(),
        merged_records: dashboard.records().len(),
        loaded_at: dashboard.loaded_at(),
    }))
}
