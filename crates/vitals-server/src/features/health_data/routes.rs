//! Health data routes

use axum::{
    extract::{rejection::QueryRejection, Query, State},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use sqlx::SqlitePool;

use super::queries::{
    series, sleep, summary, SeriesError, SeriesQuery, SleepError, SleepQuery, SummaryError,
    SummaryQuery,
};
use crate::error::{AppError, AppResult};

pub fn health_data_routes() -> Router<SqlitePool> {
    Router::new()
        .route("/api/data", get(get_series))
        .route("/api/sleep", get(get_sleep))
        .route("/api/summary", get(get_summary))
}

/// GET /api/data?type=HKQuantityTypeIdentifierStepCount&days=30&aggregate=sum
async fn get_series(
    State(db): State<SqlitePool>,
    query: Result<Query<SeriesQuery>, QueryRejection>,
) -> AppResult<Response> {
    let Query(query) = query?;
    let points = series::handle(db, query).await?;
    Ok(Json(points).into_response())
}

/// GET /api/sleep?days=30
async fn get_sleep(
    State(db): State<SqlitePool>,
    query: Result<Query<SleepQuery>, QueryRejection>,
) -> AppResult<Response> {
    let Query(query) = query?;
    let response = sleep::handle(db, query).await?;
    Ok(Json(response).into_response())
}

/// GET /api/summary?days=90
async fn get_summary(
    State(db): State<SqlitePool>,
    query: Result<Query<SummaryQuery>, QueryRejection>,
) -> AppResult<Response> {
    let Query(query) = query?;
    let response = summary::handle(db, query).await?;
    Ok(Json(response).into_response())
}

impl From<SeriesError> for AppError {
    fn from(err: SeriesError) -> Self {
        match err {
            SeriesError::Database(e) => AppError::Database(e),
            other => AppError::BadRequest(other.to_string()),
        }
    }
}

impl From<SleepError> for AppError {
    fn from(err: SleepError) -> Self {
        match err {
            SleepError::Database(e) => AppError::Database(e),
            other => AppError::BadRequest(other.to_string()),
        }
    }
}

impl From<SummaryError> for AppError {
    fn from(err: SummaryError) -> Self {
        match err {
            SummaryError::Database(e) => AppError::Database(e),
            other => AppError::BadRequest(other.to_string()),
        }
    }
}
