//! Time series query
//!
//! Raw points for one measurement type, or per-day sums/averages.

use serde::{Deserialize, Serialize};
use sqlx::{Sqlite, SqlitePool};

use super::{window_is_valid, window_start, DAY_EXPR};

fn default_days() -> i64 {
    30
}

/// Per-day aggregation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Aggregate {
    Sum,
    Avg,
}

impl Aggregate {
    fn sql_function(&self) -> &'static str {
        match self {
            Aggregate::Sum => "SUM",
            Aggregate::Avg => "AVG",
        }
    }
}

/// Query for `GET /api/data`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeriesQuery {
    #[serde(rename = "type")]
    pub record_type: Option<String>,
    #[serde(default = "default_days")]
    pub days: i64,
    pub aggregate: Option<Aggregate>,
}

/// One point of the series; `start_date` is a day (`YYYY-MM-DD`) when aggregated
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct SeriesPoint {
    pub start_date: String,
    pub record_value: f64,
}

#[derive(Debug, thiserror::Error)]
pub enum SeriesError {
    #[error("Missing 'type' parameter")]
    MissingType,
    #[error("'days' must be between 0 and 36500")]
    InvalidDays,
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl SeriesQuery {
    pub fn validate(&self) -> Result<&str, SeriesError> {
        if !window_is_valid(self.days) {
            return Err(SeriesError::InvalidDays);
        }
        self.record_type
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or(SeriesError::MissingType)
    }
}

#[tracing::instrument(skip(pool))]
pub async fn handle(pool: SqlitePool, query: SeriesQuery) -> Result<Vec<SeriesPoint>, SeriesError> {
    let record_type = query.validate()?;
    let since = window_start(query.days);

    let sql = match query.aggregate {
        Some(aggregate) => format!(
            "SELECT {day} AS start_date, {func}(record_value) AS record_value \
             FROM health_data WHERE record_type = ? AND start_date >= ? \
             GROUP BY {day} ORDER BY start_date",
            day = DAY_EXPR,
            func = aggregate.sql_function(),
        ),
        None => "SELECT start_date, record_value FROM health_data \
                 WHERE record_type = ? AND start_date >= ? ORDER BY start_date"
            .to_string(),
    };

    let points = sqlx::query_as::<Sqlite, SeriesPoint>(&sql)
        .bind(record_type)
        .bind(&since)
        .fetch_all(&pool)
        .await?;

    Ok(points)
}
