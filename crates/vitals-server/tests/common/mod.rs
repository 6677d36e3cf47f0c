//! Shared helpers for vitals-server integration tests
#![allow(dead_code, clippy::unwrap_used, clippy::expect_used)]

use sqlx::SqlitePool;
use std::{
    fs::File,
    io::{Cursor, Write},
    path::{Path, PathBuf},
    sync::Arc,
};
use tempfile::TempDir;
use vitals_server::{
    config::{DatabaseConfig, ImportConfig},
    db,
    ingest::{schema::ensure_schema, ImportRunner},
};
use zip::{write::SimpleFileOptions, ZipWriter};

/// A temporary upload directory and file-backed database
pub struct TestEnv {
    pub dir: TempDir,
    pub pool: SqlitePool,
}

impl TestEnv {
    pub async fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("uploads")).unwrap();

        let pool = db::connect(&DatabaseConfig {
            url: format!("sqlite://{}", dir.path().join("health.db").display()),
            max_connections: 4,
            connect_timeout_secs: 5,
        })
        .await
        .unwrap();
        ensure_schema(&pool).await.unwrap();

        Self { dir, pool }
    }

    pub fn upload_dir(&self) -> PathBuf {
        self.dir.path().join("uploads")
    }

    pub fn import_config(&self, batch_size: usize) -> ImportConfig {
        ImportConfig {
            upload_dir: self.upload_dir(),
            batch_size,
            ..ImportConfig::default()
        }
    }

    pub fn runner(&self, batch_size: usize) -> Arc<ImportRunner> {
        Arc::new(ImportRunner::new(self.pool.clone(), self.import_config(batch_size)))
    }

    /// Write a zip into the upload directory and return its path
    pub fn archive(&self, name: &str, entries: &[(&str, &str)]) -> PathBuf {
        let path = self.upload_dir().join(name);
        std::fs::write(&path, zip_bytes(entries)).unwrap();
        path
    }

    pub async fn row_count(&self) -> i64 {
        sqlx::query_scalar("SELECT COUNT(*) FROM health_data")
            .fetch_one(&self.pool)
            .await
            .unwrap()
    }

    /// Files and directories left in the upload directory
    pub fn leftovers(&self) -> Vec<String> {
        list_dir(&self.upload_dir())
    }
}

pub fn list_dir(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

pub fn zip_bytes(entries: &[(&str, &str)]) -> Vec<u8> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    for (name, body) in entries {
        writer.start_file(*name, SimpleFileOptions::default()).unwrap();
        writer.write_all(body.as_bytes()).unwrap();
    }
    writer.finish().unwrap().into_inner()
}

pub fn write_zip(path: &Path, entries: &[(&str, &str)]) {
    File::create(path).unwrap().write_all(&zip_bytes(entries)).unwrap();
}

pub fn export_xml(elements: &[String]) -> String {
    format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<HealthData locale=\"en_US\">\n{}\n</HealthData>\n",
        elements.join("\n")
    )
}

pub fn quantity(kind: &str, value: &str, start: &str) -> String {
    format!(
        r#"<Record type="HKQuantityTypeIdentifier{kind}" sourceName="Watch" unit="count" value="{value}" startDate="{start}" endDate="{start}"/>"#
    )
}

pub fn steps(value: &str, start: &str) -> String {
    quantity("StepCount", value, start)
}

pub fn sleep(stage: &str, start: &str, end: &str) -> String {
    format!(
        r#"<Record type="HKCategoryTypeIdentifierSleepAnalysis" sourceName="Watch" value="HKCategoryValueSleepAnalysis{stage}" startDate="{start}" endDate="{end}"/>"#
    )
}

pub fn workout(start: &str, energy_kcal: Option<&str>) -> String {
    let energy = energy_kcal
        .map(|v| format!(r#"<TotalEnergyBurned value="{v}" unit="kcal"/>"#))
        .unwrap_or_default();
    format!(
        r#"<Workout workoutActivityType="HKWorkoutActivityTypeWalking" startDate="{start}" endDate="{start}"><MetadataEntry key="HKIndoorWorkout" value="0"/>{energy}</Workout>"#
    )
}
