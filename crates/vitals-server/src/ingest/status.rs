//! Process-wide import status shared by the job and polling clients

use chrono::Local;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::{debug, info};
use vitals_common::types::{ImportPhase, ImportStatus};

use super::writer::ProgressSink;

/// Thread-safe holder of the single [`ImportStatus`].
///
/// Locks are held only for a clone or an assignment, so readers never wait on import work.
#[derive(Debug, Default)]
pub struct ImportStatusTracker {
    inner: RwLock<ImportStatus>,
}

impl ImportStatusTracker {
    pub fn new() -> Self {
        Self::default()
    }

    // Every write is a single assignment, so a poisoned lock still holds a whole status
    fn read(&self) -> RwLockReadGuard<'_, ImportStatus> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, ImportStatus> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn snapshot(&self) -> ImportStatus {
        self.read().clone()
    }

    pub fn phase(&self) -> ImportPhase {
        self.read().phase
    }

    pub fn is_running(&self) -> bool {
        self.phase() == ImportPhase::Running
    }

    /// Move to `running` unless an import is already running.
    ///
    /// The check and the transition happen under one write lock; `false` means another
    /// import holds the slot.
    pub fn try_begin(&self, message: &str) -> bool {
        let mut status = self.write();
        if status.phase == ImportPhase::Running {
            return false;
        }
        *status = ImportStatus::new(ImportPhase::Running, message);
        true
    }

    /// Replace the progress message; ignored unless running
    pub fn update_message(&self, message: impl Into<String>) {
        let mut status = self.write();
        if status.phase == ImportPhase::Running {
            status.message = message.into();
        }
    }

    pub fn complete(&self, records: u64, dropped: u64) {
        let message = format!(
            "Import complete! Processed {} records ({} skipped). Last updated: {}",
            format_count(records),
            format_count(dropped),
            Local::now().format("%Y-%m-%d %H:%M:%S")
        );
        self.finish(ImportPhase::Complete, message);
    }

    pub fn fail(&self, error: &dyn std::fmt::Display) {
        self.finish(ImportPhase::Error, format!("An error occurred: {}", error));
    }

    fn finish(&self, phase: ImportPhase, message: String) {
        let mut status = self.write();
        if status.phase != ImportPhase::Running {
            debug!(current = %status.phase, target = %phase, "Ignoring terminal transition");
            return;
        }
        *status = ImportStatus::new(phase, message);
    }

    /// Clear a terminal status back to idle. Returns whether anything changed.
    pub fn acknowledge(&self) -> bool {
        let mut status = self.write();
        if !status.phase.is_terminal() {
            return false;
        }
        info!(previous = %status.phase, "Import status acknowledged");
        *status = ImportStatus::idle();
        true
    }
}

impl ProgressSink for ImportStatusTracker {
    fn batch_committed(&self, _batch_len: usize, total: u64) {
        self.update_message(format!("Importing... Processed {} records.", format_count(total)));
    }
}

/// `1234567` -> `"1,234,567"`
pub fn format_count(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}
