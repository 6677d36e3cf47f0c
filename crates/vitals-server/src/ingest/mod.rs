//! Health export ingestion
//!
//! Pipeline stages, leaves first:
//!
//! - [`archive`]: locate and extract the data file from the uploaded zip
//! - [`parser`]: streaming XML traversal yielding one [`ElementOutcome`] per candidate
//! - [`writer`]: batched transactional inserts into `health_data`
//! - [`status`]: the shared import status polled by clients
//! - [`runner`]: the single-flight background job tying the stages together

pub mod archive;
pub mod cleanup;
pub mod error;
pub mod models;
pub mod parser;
pub mod runner;
pub mod schema;
pub mod status;
pub mod writer;

pub use error::{DropReason, ImportError};
pub use models::{ElementOutcome, MeasurementKind, NormalizedRecord};
pub use parser::RecordParser;
pub use runner::{ImportReport, ImportRunner};
pub use status::ImportStatusTracker;
pub use writer::{BatchWriter, ProgressSink, WriteSummary};
