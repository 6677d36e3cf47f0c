//! Headline figures for the dashboard

use serde::{Deserialize, Serialize};
use sqlx::{Sqlite, SqlitePool};

use super::{window_is_valid, window_start, ASLEEP_STAGES, DAY_EXPR};
use crate::ingest::MeasurementKind;

fn default_days() -> i64 {
    90
}

/// Query for `GET /api/summary`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SummaryQuery {
    #[serde(default = "default_days")]
    pub days: i64,
}

/// Each figure is `null` when the window holds no matching rows
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SummaryResponse {
    pub lowest_rhr: Option<f64>,
    pub highest_rhr: Option<f64>,
    /// Average of daily step totals
    pub avg_steps: Option<f64>,
    pub highest_hrv: Option<f64>,
    /// Average of daily Deep + Core + REM minutes
    pub avg_sleep_minutes: Option<f64>,
}

#[derive(Debug, thiserror::Error)]
pub enum SummaryError {
    #[error("'days' must be between 0 and 36500")]
    InvalidDays,
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

async fn extreme(
    pool: &SqlitePool,
    func: &str,
    kind: MeasurementKind,
    since: &str,
) -> Result<Option<f64>, sqlx::Error> {
    let sql = format!(
        "SELECT {func}(record_value) FROM health_data WHERE record_type = ? AND start_date >= ?"
    );
    sqlx::query_scalar::<Sqlite, Option<f64>>(&sql)
        .bind(kind.as_str())
        .bind(since)
        .fetch_one(pool)
        .await
}

/// Average over days of the per-day sum of `types`
async fn average_daily_total(
    pool: &SqlitePool,
    types: &[&str],
    since: &str,
) -> Result<Option<f64>, sqlx::Error> {
    let placeholders = vec!["?"; types.len()].join(", ");
    let sql = format!(
        "SELECT AVG(daily_total) FROM (\
             SELECT SUM(record_value) AS daily_total FROM health_data \
             WHERE record_type IN ({placeholders}) AND start_date >= ? \
             GROUP BY {DAY_EXPR})"
    );

    let mut query = sqlx::query_scalar::<Sqlite, Option<f64>>(&sql);
    for record_type in types {
        query = query.bind(*record_type);
    }
    query.bind(since).fetch_one(pool).await
}

#[tracing::instrument(skip(pool))]
pub async fn handle(pool: SqlitePool, query: SummaryQuery) -> Result<SummaryResponse, SummaryError> {
    if !window_is_valid(query.days) {
        return Err(SummaryError::InvalidDays);
    }
    let since = window_start(query.days);

    Ok(SummaryResponse {
        lowest_rhr: extreme(&pool, "MIN", MeasurementKind::RestingHeartRate, &since).await?,
        highest_rhr: extreme(&pool, "MAX", MeasurementKind::RestingHeartRate, &since).await?,
        avg_steps: average_daily_total(&pool, &[MeasurementKind::StepCount.as_str()], &since)
            .await?,
        highest_hrv: extreme(&pool, "MAX", MeasurementKind::HeartRateVariabilitySdnn, &since)
            .await?,
        avg_sleep_minutes: average_daily_total(&pool, &ASLEEP_STAGES, &since).await?,
    })
}
