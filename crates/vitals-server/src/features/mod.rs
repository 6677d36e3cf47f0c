//! Feature modules implementing the Vitals API
//!
//! - **imports**: archive upload, import status and acknowledgment
//! - **health_data**: read-side queries over the imported time series
//!
//! Each feature owns its routes; query slices follow the `Query` + `validate` + `handle`
//! shape.

pub mod health_data;
pub mod imports;

use axum::{extract::State, http::StatusCode, response::IntoResponse, routing::get, Json, Router};
use serde_json::json;
use sqlx::SqlitePool;
use std::sync::Arc;

use crate::{db, ingest::ImportRunner};

/// Shared state for all feature routes
#[derive(Clone)]
pub struct FeatureState {
    /// SQLite connection pool for read queries
    pub db: SqlitePool,
    /// The single import runner; owns the import status
    pub runner: Arc<ImportRunner>,
}

/// Creates the application router with every feature mounted
pub fn router(state: FeatureState) -> Router<()> {
    let max_upload_bytes = state.runner.config().max_upload_bytes;

    Router::new()
        .route("/health", get(health_check))
        .with_state(state.db.clone())
        .merge(health_data::health_data_routes().with_state(state.db))
        .merge(imports::imports_routes(max_upload_bytes).with_state(state.runner))
}

/// Database connectivity check
async fn health_check(State(db): State<SqlitePool>) -> impl IntoResponse {
    match db::ping(&db).await {
        Ok(()) => (
            StatusCode::OK,
            Json(json!({ "status": "healthy", "database": "connected" })),
        ),
        Err(e) => {
            tracing::error!(error = ?e, "Database health check failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({ "status": "unhealthy", "database": "disconnected" })),
            )
        }
    }
}
