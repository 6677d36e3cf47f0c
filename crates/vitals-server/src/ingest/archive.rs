//! Data file extraction from uploaded zip archives

use std::{
    fs::{self, File},
    io,
    path::{Path, PathBuf},
};
use tracing::{debug, info, warn};
use zip::ZipArchive;

use super::error::{ImportError, Result};

/// Extract the first entry whose name contains `data_file_name` into `work_dir`.
///
/// The entry keeps its relative path, so `apple_health_export/export.xml` lands in
/// `<work_dir>/apple_health_export/export.xml`. Directory entries and entries whose path
/// would escape `work_dir` are never matched. Blocking; run it off the async runtime.
pub fn extract_data_file(
    archive_path: &Path,
    work_dir: &Path,
    data_file_name: &str,
) -> Result<PathBuf> {
    let file = File::open(archive_path)?;
    let mut archive = ZipArchive::new(file)?;

    let mut found = None;
    for i in 0..archive.len() {
        let entry = archive.by_index(i)?;
        if entry.is_dir() || !entry.name().contains(data_file_name) {
            continue;
        }
        match entry.enclosed_name() {
            Some(relative) => {
                found = Some((i, relative.to_path_buf()));
                break;
            }
            None => debug!(entry = entry.name(), "Skipping archive entry with unsafe path"),
        }
    }

    let (index, relative) = found.ok_or_else(|| ImportError::DataFileNotFound {
        name: data_file_name.to_string(),
    })?;

    let target = work_dir.join(&relative);
    let created_dir = first_missing_dir(work_dir, target.parent());

    let bytes = match write_entry(&mut archive, index, &target) {
        Ok(bytes) => bytes,
        Err(e) => {
            discard(&target, created_dir.as_deref());
            return Err(e);
        }
    };

    info!(entry = %relative.display(), bytes, "Extracted data file");

    Ok(target)
}

fn write_entry(archive: &mut ZipArchive<File>, index: usize, target: &Path) -> Result<u64> {
    if let Some(parent) = target.parent() {
        fs::create_dir_all(parent)?;
    }
    let mut entry = archive.by_index(index)?;
    let mut out = File::create(target)?;
    Ok(io::copy(&mut entry, &mut out)?)
}

/// Shallowest directory between `work_dir` and `dir` that does not exist yet
fn first_missing_dir(work_dir: &Path, dir: Option<&Path>) -> Option<PathBuf> {
    dir?.ancestors()
        .take_while(|d| *d != work_dir && d.starts_with(work_dir))
        .filter(|d| !d.exists())
        .last()
        .map(Path::to_path_buf)
}

/// Remove a failed extraction along with any directories it created
fn discard(target: &Path, created_dir: Option<&Path>) {
    if let Err(e) = fs::remove_file(target) {
        if e.kind() != io::ErrorKind::NotFound {
            warn!(path = %target.display(), error = %e, "Failed to remove partial extraction");
        }
    }
    if let Some(dir) = created_dir {
        if let Err(e) = fs::remove_dir_all(dir) {
            warn!(path = %dir.display(), error = %e, "Failed to remove extraction directory");
        }
    }
}
