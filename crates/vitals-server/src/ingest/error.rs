//! Import error types
//!
//! [`ImportError`] aborts a job and becomes the `error` status message. [`DropReason`]
//! describes why a single candidate element was skipped; it never aborts the job.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, ImportError>;

/// Fatal import failure
#[derive(Error, Debug)]
pub enum ImportError {
    #[error("{name} not found in the zip archive.")]
    DataFileNotFound { name: String },

    #[error("Invalid zip archive: {0}")]
    Archive(#[from] zip::result::ZipError),

    #[error("Malformed XML at byte {position}: {source}")]
    Xml {
        position: u64,
        #[source]
        source: quick_xml::Error,
    },

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Import task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// Why a candidate element produced no record
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DropReason {
    #[error("missing attribute '{0}'")]
    MissingAttribute(&'static str),

    #[error("non-numeric value '{0}'")]
    InvalidValue(String),

    #[error("malformed timestamp '{0}'")]
    InvalidTimestamp(String),
}
