//! Batched, transactional persistence of normalized records

use sqlx::{QueryBuilder, Sqlite, SqlitePool};
use tracing::debug;

use super::{error::Result, models::NormalizedRecord};

/// Rows per multi-row INSERT statement inside a batch transaction
const INSERT_CHUNK_ROWS: usize = 500;

/// Receives progress after every committed batch
pub trait ProgressSink: Send + Sync {
    fn batch_committed(&self, batch_len: usize, total: u64);
}

/// Totals reported once the stream is exhausted
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WriteSummary {
    pub records: u64,
    pub batches: usize,
}

/// Buffers records and commits them `batch_size` at a time.
///
/// Each flush is a single transaction, so a failure leaves earlier batches committed and
/// the failing batch absent.
pub struct BatchWriter<'a> {
    pool: &'a SqlitePool,
    sink: &'a dyn ProgressSink,
    batch_size: usize,
    buffer: Vec<NormalizedRecord>,
    summary: WriteSummary,
}

impl<'a> BatchWriter<'a> {
    pub fn new(pool: &'a SqlitePool, batch_size: usize, sink: &'a dyn ProgressSink) -> Self {
        let batch_size = batch_size.max(1);
        Self {
            pool,
            sink,
            batch_size,
            buffer: Vec::with_capacity(batch_size),
            summary: WriteSummary::default(),
        }
    }

    pub async fn push(&mut self, record: NormalizedRecord) -> Result<()> {
        self.buffer.push(record);
        if self.buffer.len() >= self.batch_size {
            self.flush().await?;
        }
        Ok(())
    }

    /// Commit whatever remains and return the totals
    pub async fn finish(mut self) -> Result<WriteSummary> {
        if !self.buffer.is_empty() {
            self.flush().await?;
        }
        Ok(self.summary)
    }

    async fn flush(&mut self) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        for chunk in self.buffer.chunks(INSERT_CHUNK_ROWS) {
            let mut query_builder: QueryBuilder<Sqlite> = QueryBuilder::new(
                "INSERT INTO health_data (record_type, unit, record_value, start_date) ",
            );
            query_builder.push_values(chunk, |mut b, record| {
                b.push_bind(record.record_type.as_str())
                    .push_bind(record.unit.as_deref())
                    .push_bind(record.value)
                    .push_bind(record.start_date_text());
            });
            query_builder.build().execute(&mut *tx).await?;
        }

        tx.commit().await?;

        let batch_len = self.buffer.len();
        self.buffer.clear();
        self.summary.records += batch_len as u64;
        self.summary.batches += 1;

        debug!(
            batch = self.summary.batches,
            batch_len,
            total = self.summary.records,
            "Committed batch"
        );
        self.sink.batch_committed(batch_len, self.summary.records);
        Ok(())
    }
}
