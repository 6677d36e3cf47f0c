//! Vitals Import - one-shot command line import of a health export archive

use anyhow::{Context, Result};
use clap::Parser;
use std::{path::PathBuf, sync::Arc};
use tracing::{error, info, Level};
use uuid::Uuid;
use vitals_common::{
    logging::{init_logging, LogConfig},
    types::ImportPhase,
};
use vitals_server::{
    config::{DatabaseConfig, ImportConfig, DEFAULT_DATABASE_URL, DEFAULT_UPLOAD_DIR},
    db, ingest,
};

#[derive(Parser, Debug)]
#[command(name = "vitals-import")]
#[command(author, version, about = "Import a health export archive into SQLite")]
struct Cli {
    /// Zip archive containing export.xml
    archive: PathBuf,

    /// Database URL
    #[arg(short, long, env = "DATABASE_URL", default_value = DEFAULT_DATABASE_URL)]
    database: String,

    /// Scratch directory for the archive copy and the extracted file
    #[arg(short, long, env = "IMPORT_UPLOAD_DIR", default_value = DEFAULT_UPLOAD_DIR)]
    work_dir: PathBuf,

    /// Records committed per transaction
    #[arg(short, long, env = "IMPORT_BATCH_SIZE", default_value_t = 5000)]
    batch_size: usize,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    let log_config = LogConfig::builder()
        .level(level)
        .log_file_prefix("vitals-import")
        .filter_directives("sqlx=warn")
        .build()
        .with_env_overrides()?;
    let _log_guard = init_logging(&log_config)?;

    anyhow::ensure!(cli.batch_size > 0, "--batch-size must be greater than 0");

    tokio::fs::create_dir_all(&cli.work_dir)
        .await
        .with_context(|| format!("Failed to create work directory {}", cli.work_dir.display()))?;

    // The runner deletes the archive it is given, so it works on a copy
    let file_name = cli
        .archive
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("archive.zip");
    let working_copy = cli.work_dir.join(format!("{}-{}", Uuid::new_v4(), file_name));
    tokio::fs::copy(&cli.archive, &working_copy)
        .await
        .with_context(|| format!("Failed to read archive {}", cli.archive.display()))?;

    let pool = db::connect(&DatabaseConfig {
        url: cli.database.clone(),
        max_connections: 2,
        connect_timeout_secs: 10,
    })
    .await
    .with_context(|| format!("Failed to open database {}", cli.database))?;

    let config = ImportConfig {
        upload_dir: cli.work_dir.clone(),
        batch_size: cli.batch_size,
        ..ImportConfig::default()
    };
    let runner = Arc::new(ingest::ImportRunner::new(pool.clone(), config));

    info!(archive = %cli.archive.display(), database = %cli.database, "Importing");
    if !runner.start_import(working_copy) {
        anyhow::bail!("An import is already running");
    }
    runner.wait().await;
    pool.close().await;

    let status = runner.status().snapshot();
    match status.phase {
        ImportPhase::Complete => {
            info!("{}", status.message);
            Ok(())
        }
        _ => {
            error!("{}", status.message);
            anyhow::bail!("Import failed")
        }
    }
}
