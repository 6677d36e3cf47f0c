//! `health_data` table management

use sqlx::SqlitePool;
use tracing::info;

const CREATE_TABLE: &str = r#"
    CREATE TABLE IF NOT EXISTS health_data (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        record_type TEXT NOT NULL,
        unit TEXT,
        record_value REAL NOT NULL,
        start_date TEXT NOT NULL
    )
"#;

const CREATE_INDEX: &str =
    "CREATE INDEX IF NOT EXISTS idx_type_date ON health_data (record_type, start_date)";

/// Create the table and index when missing. Existing rows are kept.
pub async fn ensure_schema(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    sqlx::query(CREATE_TABLE).execute(pool).await?;
    sqlx::query(CREATE_INDEX).execute(pool).await?;
    Ok(())
}

/// Drop and recreate the table in one transaction, discarding every previous row.
pub async fn reset_schema(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    let mut tx = pool.begin().await?;
    sqlx::query("DROP TABLE IF EXISTS health_data")
        .execute(&mut *tx)
        .await?;
    sqlx::query(CREATE_TABLE).execute(&mut *tx).await?;
    sqlx::query(CREATE_INDEX).execute(&mut *tx).await?;
    tx.commit().await?;

    info!("Recreated health_data table");
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use sqlx::sqlite::SqlitePoolOptions;

    async fn memory_pool() -> SqlitePool {
        SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap()
    }

    async fn row_count(pool: &SqlitePool) -> i64 {
        sqlx::query_scalar("SELECT COUNT(*) FROM health_data")
            .fetch_one(pool)
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_ensure_schema_is_idempotent() {
        let pool = memory_pool().await;
        ensure_schema(&pool).await.unwrap();
        sqlx::query(
            "INSERT INTO health_data (record_type, record_value, start_date) VALUES ('x', 1.0, 'd')",
        )
        .execute(&pool)
        .await
        .unwrap();

        ensure_schema(&pool).await.unwrap();
        assert_eq!(row_count(&pool).await, 1);
    }

    #[tokio::test]
    async fn test_reset_discards_rows() {
        let pool = memory_pool().await;
        ensure_schema(&pool).await.unwrap();
        sqlx::query(
            "INSERT INTO health_data (record_type, record_value, start_date) VALUES ('x', 1.0, 'd')",
        )
        .execute(&pool)
        .await
        .unwrap();

        reset_schema(&pool).await.unwrap();
        assert_eq!(row_count(&pool).await, 0);

        let index: Option<String> = sqlx::query_scalar(
            "SELECT name FROM sqlite_master WHERE type = 'index' AND name = 'idx_type_date'",
        )
        .fetch_optional(&pool)
        .await
        .unwrap();
        assert_eq!(index.as_deref(), Some("idx_type_date"));
    }
}
