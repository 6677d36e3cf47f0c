//! Upload validation and storage
//!
//! Archives are streamed to disk chunk by chunk under a UUID-prefixed name, so a large
//! upload never sits in memory and a rejected upload can never overwrite the archive of the
//! import in flight.

use axum::extract::multipart::{Field, MultipartError};
use std::path::{Path, PathBuf};
use tokio::{fs, io::AsyncWriteExt};
use uuid::Uuid;

use crate::error::AppError;

/// Longest file name kept from the client, after sanitizing
const MAX_FILENAME_LEN: usize = 200;

#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    #[error("No file part in the request")]
    MissingFile,
    #[error("No file selected")]
    EmptyFilename,
    #[error("Only .zip archives are accepted")]
    UnsupportedExtension,
    #[error("An import is already in progress. Please wait.")]
    ImportInProgress,
    #[error("Failed to read upload: {0}")]
    Multipart(#[from] MultipartError),
    #[error("Failed to store upload: {0}")]
    Io(#[from] std::io::Error),
}

impl From<UploadError> for AppError {
    fn from(err: UploadError) -> Self {
        match err {
            e @ UploadError::ImportInProgress => AppError::Conflict(e.to_string()),
            UploadError::Multipart(e) => {
                if e.status() == axum::http::StatusCode::PAYLOAD_TOO_LARGE {
                    AppError::PayloadTooLarge(e.body_text())
                } else {
                    AppError::BadRequest(e.body_text())
                }
            }
            UploadError::Io(e) => AppError::Io(e),
            other => AppError::BadRequest(other.to_string()),
        }
    }
}

/// An archive written to the upload directory
#[derive(Debug, Clone)]
pub struct StoredUpload {
    pub path: PathBuf,
    pub bytes: u64,
}

/// Validated upload request
#[derive(Debug, Clone)]
pub struct UploadArchiveCommand {
    pub filename: String,
}

impl UploadArchiveCommand {
    /// Returns the sanitized file name to store under
    pub fn validate(&self) -> Result<String, UploadError> {
        if self.filename.trim().is_empty() {
            return Err(UploadError::EmptyFilename);
        }
        if !has_zip_extension(&self.filename) {
            return Err(UploadError::UnsupportedExtension);
        }
        sanitize_filename(&self.filename).ok_or(UploadError::EmptyFilename)
    }
}

pub fn has_zip_extension(filename: &str) -> bool {
    filename
        .rsplit_once('.')
        .is_some_and(|(_, ext)| ext.eq_ignore_ascii_case("zip"))
}

/// Reduce a client-supplied name to a safe single path component.
///
/// Directory parts are discarded and anything outside `[A-Za-z0-9._-]` becomes `_`.
/// Returns `None` when nothing usable remains.
pub fn sanitize_filename(filename: &str) -> Option<String> {
    let base = filename.rsplit(['/', '\\']).next().unwrap_or_default();
    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();
    let cleaned = cleaned.trim_start_matches('.');

    if cleaned.is_empty() || cleaned.chars().all(|c| c == '_' || c == '.') {
        return None;
    }

    let keep = cleaned.len().min(MAX_FILENAME_LEN);
    Some(cleaned[cleaned.len() - keep..].to_string())
}

/// Stream one multipart field into `<dir>/<uuid>-<name>`. A partial file is removed on
/// failure.
pub async fn store_field(
    mut field: Field<'_>,
    dir: &Path,
    name: &str,
) -> Result<StoredUpload, UploadError> {
    let path = dir.join(format!("{}-{}", Uuid::new_v4(), name));
    let mut file = fs::File::create(&path).await?;

    let mut bytes = 0u64;
    let result = async {
        while let Some(chunk) = field.chunk().await? {
            file.write_all(&chunk).await?;
            bytes += chunk.len() as u64;
        }
        file.flush().await?;
        Ok::<(), UploadError>(())
    }
    .await;

    if let Err(e) = result {
        drop(file);
        if let Err(remove_err) = fs::remove_file(&path).await {
            tracing::warn!(path = %path.display(), error = %remove_err, "Failed to remove partial upload");
        }
        return Err(e);
    }

    Ok(StoredUpload { path, bytes })
}
