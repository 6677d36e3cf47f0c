//! Best-effort removal of an import's temporary files

use std::{
    fs, io,
    path::{Path, PathBuf},
};
use tracing::{debug, warn};

/// Files owned by one import attempt, removed when the guard drops.
///
/// Removal failures are logged and never propagated.
#[derive(Debug)]
pub struct ImportWorkspace {
    base_dir: PathBuf,
    archive: PathBuf,
    extracted: Option<PathBuf>,
}

impl ImportWorkspace {
    pub fn new(base_dir: impl Into<PathBuf>, archive: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
            archive: archive.into(),
            extracted: None,
        }
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    pub fn archive(&self) -> &Path {
        &self.archive
    }

    pub fn set_extracted(&mut self, path: PathBuf) {
        self.extracted = Some(path);
    }

    /// Remove now-empty directories between `file` and the base directory
    fn prune_parents(&self, file: &Path) {
        let mut dir = file.parent();
        while let Some(current) = dir {
            if current == self.base_dir || !current.starts_with(&self.base_dir) {
                break;
            }
            match fs::remove_dir(current) {
                Ok(()) => debug!(path = %current.display(), "Removed extraction directory"),
                Err(e) => {
                    warn!(path = %current.display(), error = %e, "Failed to remove directory");
                    break;
                }
            }
            dir = current.parent();
        }
    }
}

fn remove_file(path: &Path) -> bool {
    match fs::remove_file(path) {
        Ok(()) => {
            debug!(path = %path.display(), "Removed file");
            true
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => true,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Failed to remove file");
            false
        }
    }
}

impl Drop for ImportWorkspace {
    fn drop(&mut self) {
        remove_file(&self.archive);
        if let Some(extracted) = self.extracted.take() {
            if remove_file(&extracted) {
                self.prune_parents(&extracted);
            }
        }
    }
}
