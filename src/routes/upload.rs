//! Upload Routes
//!
//! Endpoints:
//! - POST /upload - Store a file sent as multipart field `file`
//!
//! Content type and size are checked here; deduplication and naming happen in
//! the dedup store.

use axum::{
    extract::{multipart::MultipartError, DefaultBodyLimit, Multipart, State},
    http::StatusCode,
    routing::post,
    Json, Router,
};
use serde::Serialize;

use crate::error::{AppError, Result};
use crate::state::AppState;
use crate::storage::{StoreOutcome, StoreResult};

/// Room for multipart boundaries and part headers on top of the file itself
const MULTIPART_OVERHEAD: usize = 64 * 1024;

/// Upload response
#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub message: String,
    pub filename: String,
    pub checksum: String,
}

impl From<&StoreResult> for UploadResponse {
    fn from(result: &StoreResult) -> Self {
        let message = match result.outcome {
            StoreOutcome::AlreadyExists => "File with the same content already exists",
            StoreOutcome::Stored if result.is_renamed() => "File with this name already exists",
            StoreOutcome::Stored => "File uploaded successfully",
        };

        Self {
            message: message.to_string(),
            filename: result.final_name.clone(),
            checksum: result.fingerprint.to_hex(),
        }
    }
}

/// Create the upload router
pub fn router(max_upload_size: u64) -> Router<AppState> {
    let body_limit = usize::try_from(max_upload_size)
        .unwrap_or(usize::MAX)
        .saturating_add(MULTIPART_OVERHEAD);

    Router::new()
        .route("/upload", post(upload_file))
        .route("/upload/", post(upload_file))
        .layer(DefaultBodyLimit::max(body_limit))
}

/// POST /upload
async fn upload_file(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>> {
    let upload_config = &state.config().upload;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| read_error(e, upload_config.max_size))?
    {
        if field.name() != Some("file") {
            continue;
        }

        let content_type = field.content_type().unwrap_or("").to_string();
        let raw_name = field.file_name().unwrap_or("").to_string();

        if !content_type.starts_with(&upload_config.allowed_content_prefix) {
            tracing::warn!(
                file_name = %raw_name,
                content_type = %content_type,
                "Rejected upload with disallowed content type"
            );
            return Err(AppError::UnsupportedMediaType("File is not an image".to_string()));
        }

        let data = field.bytes().await.map_err(|e| {
            tracing::warn!(file_name = %raw_name, "Failed to read upload body: {}", e);
            read_error(e, upload_config.max_size)
        })?;
        if data.len() as u64 > upload_config.max_size {
            tracing::warn!(
                file_name = %raw_name,
                size = data.len(),
                max = upload_config.max_size,
                "Rejected oversized upload"
            );
            return Err(too_large(upload_config.max_size));
        }

        let requested_name = sanitize_file_name(&raw_name)
            .ok_or_else(|| AppError::BadRequest(format!("Invalid file name: {:?}", raw_name)))?;

        let size = data.len();
        let store_state = state.clone();
        let result = tokio::task::spawn_blocking(move || {
            store_state.store().store(&data, &requested_name)
        })
        .await
        .map_err(|e| AppError::Internal(format!("Store task failed: {}", e)))??;

        tracing::info!(
            file_name = %raw_name,
            final_name = %result.final_name,
            checksum = %result.fingerprint,
            outcome = ?result.outcome,
            size = size,
            "Upload processed"
        );

        return Ok(Json(UploadResponse::from(&result)));
    }

    tracing::warn!("No file field found in multipart upload");
    Err(AppError::BadRequest(
        "No file provided. Use field name 'file'".to_string(),
    ))
}

const MB: u64 = 1024 * 1024;

fn too_large(max_size: u64) -> AppError {
    let limit = if max_size >= MB && max_size % MB == 0 {
        format!("{} MB", max_size / MB)
    } else {
        format!("{} bytes", max_size)
    };
    AppError::PayloadTooLarge(format!("File size exceeds {}", limit))
}

/// Bodies cut off by the router's body limit report the same error as the
/// explicit size check.
fn read_error(e: MultipartError, max_size: u64) -> AppError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        too_large(max_size)
    } else {
        e.into()
    }
}

/// Reduce a client-supplied file name to its final path component.
///
/// Browsers may send full client paths; only the last segment is kept.
/// Returns `None` when nothing usable remains.
fn sanitize_file_name(raw: &str) -> Option<String> {
    let name = raw.rsplit(['/', '\\']).next().unwrap_or("").trim();

    if name.is_empty() || name == "." || name == ".." || name.contains('\0') {
        None
    } else {
        Some(name.to_string())
    }
}
