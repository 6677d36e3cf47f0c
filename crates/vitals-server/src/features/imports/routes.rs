//! Import routes
//!
//! `POST /upload` starts an import; clients then poll `GET /api/import-status` and clear a
//! finished status with `POST /api/ack-status`.

use axum::{
    extract::{DefaultBodyLimit, Multipart, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::json;
use std::sync::Arc;
use tracing::{info, warn};
use vitals_common::types::ImportStatus;

use super::upload::{store_field, UploadArchiveCommand, UploadError};
use crate::{error::AppResult, ingest::ImportRunner};

pub fn imports_routes(max_upload_bytes: usize) -> Router<Arc<ImportRunner>> {
    Router::new()
        .route(
            "/upload",
            post(upload_archive).layer(DefaultBodyLimit::max(max_upload_bytes)),
        )
        .route("/api/import-status", get(import_status))
        .route("/api/ack-status", post(acknowledge_status))
}

/// POST /upload (multipart field `file`)
#[tracing::instrument(skip(runner, multipart))]
async fn upload_archive(
    State(runner): State<Arc<ImportRunner>>,
    mut multipart: Multipart,
) -> AppResult<Response> {
    // Cheap rejection before the body is read; `start_import` makes the binding decision
    if runner.status().is_running() {
        return Err(UploadError::ImportInProgress.into());
    }

    let upload_dir = runner.config().upload_dir.clone();
    tokio::fs::create_dir_all(&upload_dir).await?;

    let mut stored = None;
    while let Some(field) = multipart.next_field().await.map_err(UploadError::from)? {
        if field.name() != Some("file") {
            continue;
        }
        let command = UploadArchiveCommand {
            filename: field.file_name().unwrap_or_default().to_string(),
        };
        let name = command.validate()?;
        stored = Some(store_field(field, &upload_dir, &name).await?);
        break;
    }
    let stored = stored.ok_or(UploadError::MissingFile)?;

    if !runner.start_import(stored.path.clone()) {
        if let Err(e) = tokio::fs::remove_file(&stored.path).await {
            warn!(path = %stored.path.display(), error = %e, "Failed to remove rejected upload");
        }
        return Err(UploadError::ImportInProgress.into());
    }

    info!(path = %stored.path.display(), bytes = stored.bytes, "Upload accepted, import started");
    Ok((StatusCode::ACCEPTED, Json(json!({ "accepted": true }))).into_response())
}

/// GET /api/import-status
async fn import_status(State(runner): State<Arc<ImportRunner>>) -> Json<ImportStatus> {
    Json(runner.status().snapshot())
}

/// POST /api/ack-status
async fn acknowledge_status(State(runner): State<Arc<ImportRunner>>) -> Json<serde_json::Value> {
    runner.status().acknowledge();
    Json(json!({ "success": true }))
}
