//! Single-flight import job runner
//!
//! Accepts an uploaded archive, claims the status slot and runs the whole pipeline in one
//! background task: extraction, table reset, streaming parse and batched writes. The parser
//! runs on a blocking thread and hands outcomes to the async writer over a bounded channel.

use sqlx::SqlitePool;
use std::{
    path::PathBuf,
    sync::{Arc, Mutex, PoisonError},
    time::Instant,
};
use tokio::{sync::mpsc, task::JoinHandle};
use tracing::{error, info, instrument, warn};

use super::{
    archive::extract_data_file,
    cleanup::ImportWorkspace,
    error::{ImportError, Result},
    models::ElementOutcome,
    parser::RecordParser,
    schema::reset_schema,
    status::ImportStatusTracker,
    writer::BatchWriter,
};
use crate::config::ImportConfig;

pub const EXTRACTING_MESSAGE: &str = "Extracting zip file...";
pub const PREPARING_MESSAGE: &str = "Preparing database...";

/// Outcomes buffered between the parser thread and the writer
const CHANNEL_CAPACITY: usize = 1024;

/// Totals of a finished import
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportReport {
    pub records: u64,
    pub dropped: u64,
    pub batches: usize,
}

/// Runs at most one import at a time and owns the status it reports through
pub struct ImportRunner {
    pool: SqlitePool,
    config: ImportConfig,
    status: Arc<ImportStatusTracker>,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl ImportRunner {
    pub fn new(pool: SqlitePool, config: ImportConfig) -> Self {
        Self {
            pool,
            config,
            status: Arc::new(ImportStatusTracker::new()),
            handle: Mutex::new(None),
        }
    }

    pub fn status(&self) -> &Arc<ImportStatusTracker> {
        &self.status
    }

    pub fn config(&self) -> &ImportConfig {
        &self.config
    }

    /// Start importing `archive` in the background.
    ///
    /// Returns `false` without touching anything when an import is already running. On
    /// success the archive belongs to the job and is deleted when it ends.
    pub fn start_import(self: &Arc<Self>, archive: PathBuf) -> bool {
        if !self.status.try_begin(EXTRACTING_MESSAGE) {
            warn!(archive = %archive.display(), "Import already running, rejecting upload");
            return false;
        }

        let runner = Arc::clone(self);
        let handle = tokio::spawn(async move { runner.run(archive).await });
        *self.handle.lock().unwrap_or_else(PoisonError::into_inner) = Some(handle);
        true
    }

    /// Wait for the most recently started job, if any
    pub async fn wait(&self) {
        let handle = self
            .handle
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();

        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                error!(error = %e, "Import task aborted");
                self.status.fail(&ImportError::Task(e));
            }
        }
    }

    #[instrument(name = "import", skip(self, archive), fields(archive = %archive.display()))]
    async fn run(self: Arc<Self>, archive: PathBuf) {
        let started = Instant::now();
        info!("Import started");

        // Cleanup has finished before the terminal status frees the slot
        match self.execute(archive).await {
            Ok(report) => {
                info!(
                    records = report.records,
                    dropped = report.dropped,
                    batches = report.batches,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "Import complete"
                );
                self.status.complete(report.records, report.dropped);
            }
            Err(e) => {
                error!(error = %e, "Import failed");
                self.status.fail(&e);
            }
        }
    }

    async fn execute(&self, archive: PathBuf) -> Result<ImportReport> {
        let mut workspace = ImportWorkspace::new(&self.config.upload_dir, archive);

        let archive_path = workspace.archive().to_path_buf();
        let work_dir = workspace.base_dir().to_path_buf();
        let data_file_name = self.config.data_file_name.clone();
        let extracted = tokio::task::spawn_blocking(move || {
            extract_data_file(&archive_path, &work_dir, &data_file_name)
        })
        .await??;
        workspace.set_extracted(extracted.clone());

        self.status.update_message(PREPARING_MESSAGE);
        reset_schema(&self.pool).await?;

        self.load_records(extracted).await
    }

    /// Stream the extracted file through the parser into the batch writer
    async fn load_records(&self, path: PathBuf) -> Result<ImportReport> {
        let (tx, mut rx) = mpsc::channel::<ElementOutcome>(CHANNEL_CAPACITY);

        let parser = tokio::task::spawn_blocking(move || -> Result<()> {
            for outcome in RecordParser::open(&path)? {
                // A closed channel means the writer gave up; its error is reported instead
                if tx.blocking_send(outcome?).is_err() {
                    break;
                }
            }
            Ok(())
        });

        let mut writer = BatchWriter::new(&self.pool, self.config.batch_size, self.status.as_ref());
        let mut dropped = 0u64;
        let mut write_result = Ok(());

        while let Some(outcome) = rx.recv().await {
            match outcome {
                ElementOutcome::Accepted(record) => {
                    if let Err(e) = writer.push(record).await {
                        write_result = Err(e);
                        break;
                    }
                }
                ElementOutcome::Dropped(_) => dropped += 1,
            }
        }
        drop(rx);

        let parsed = parser.await;
        write_result?;
        // A parse failure skips the final flush; batches already committed stay
        parsed??;

        let summary = writer.finish().await?;
        Ok(ImportReport {
            records: summary.records,
            dropped,
            batches: summary.batches,
        })
    }
}
