//! Nightly sleep stage totals

use serde::{Deserialize, Serialize};
use sqlx::{Sqlite, SqlitePool};
use std::collections::{BTreeMap, BTreeSet};

use super::{window_is_valid, window_start, DAY_EXPR, SLEEP_STAGES};

fn default_days() -> i64 {
    30
}

/// Query for `GET /api/sleep`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SleepQuery {
    #[serde(default = "default_days")]
    pub days: i64,
}

/// Minutes per stage per day. Every stage key is present even without data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SleepResponse {
    /// Days with any sleep data, ascending
    pub labels: Vec<String>,
    pub stages: BTreeMap<String, BTreeMap<String, f64>>,
}

#[derive(Debug, thiserror::Error)]
pub enum SleepError {
    #[error("'days' must be between 0 and 36500")]
    InvalidDays,
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

#[derive(sqlx::FromRow)]
struct StageTotal {
    sleep_date: String,
    record_type: String,
    total_minutes: f64,
}

#[tracing::instrument(skip(pool))]
pub async fn handle(pool: SqlitePool, query: SleepQuery) -> Result<SleepResponse, SleepError> {
    if !window_is_valid(query.days) {
        return Err(SleepError::InvalidDays);
    }

    let sql = format!(
        "SELECT {day} AS sleep_date, record_type, SUM(record_value) AS total_minutes \
         FROM health_data WHERE record_type IN (?, ?, ?, ?) AND start_date >= ? \
         GROUP BY sleep_date, record_type ORDER BY sleep_date",
        day = DAY_EXPR
    );

    let mut rows = sqlx::query_as::<Sqlite, StageTotal>(&sql);
    for stage in SLEEP_STAGES {
        rows = rows.bind(stage);
    }
    let rows = rows.bind(window_start(query.days)).fetch_all(&pool).await?;

    let mut stages: BTreeMap<String, BTreeMap<String, f64>> = SLEEP_STAGES
        .iter()
        .map(|stage| (stage.to_string(), BTreeMap::new()))
        .collect();
    let mut labels = BTreeSet::new();

    for row in rows {
        if let Some(days) = stages.get_mut(&row.record_type) {
            days.insert(row.sleep_date.clone(), row.total_minutes);
            labels.insert(row.sleep_date);
        }
    }

    Ok(SleepResponse {
        labels: labels.into_iter().collect(),
        stages,
    })
}
