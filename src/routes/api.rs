//! JSON API endpoints
//!
//! - GET /api/v1/health - Health check
//! - GET /api/v1/lookup/:checksum - Stored name for a content checksum
//! - GET /api/v1/stats - Index size
//!
//! Lookup and stats take the store lock, which an upload holds across its
//! write, so both run on the blocking pool.

use axum::{
    extract::{Path, State},
    routing::get,
    Json, Router,
};
use serde::Serialize;

use crate::error::{AppError, Result};
use crate::state::AppState;
use crate::storage::Fingerprint;

use super::health::health_check;

#[derive(Serialize)]
pub struct LookupResponse {
    pub checksum: Fingerprint,
    pub filename: String,
}

#[derive(Serialize)]
pub struct StatsResponse {
    pub files: usize,
    pub storage_dir: String,
}

/// Create the API router
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/health", get(health_check))
        .route("/lookup/:checksum", get(lookup))
        .route("/stats", get(stats))
}

async fn lookup(
    State(state): State<AppState>,
    Path(checksum): Path<String>,
) -> Result<Json<LookupResponse>> {
    let fingerprint: Fingerprint = checksum
        .parse()
        .map_err(|e: crate::storage::FingerprintParseError| AppError::BadRequest(e.to_string()))?;

    let filename = on_store(state, move |state| state.store().lookup(&fingerprint))
        .await?
        .ok_or_else(|| AppError::NotFound(format!("No file with checksum {}", fingerprint)))?;

    Ok(Json(LookupResponse {
        checksum: fingerprint,
        filename,
    }))
}

async fn stats(State(state): State<AppState>) -> Result<Json<StatsResponse>> {
    let files = on_store(state.clone(), |state| state.store().len()).await?;

    Ok(Json(StatsResponse {
        files,
        storage_dir: state.store().root().display().to_string(),
    }))
}

async fn on_store<T, F>(state: AppState, f: F) -> Result<T>
where
    F: FnOnce(&AppState) -> T + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(move || f(&state))
        .await
        .map_err(|e| AppError::Internal(format!("Store task failed: {}", e)))
}
