//! Import status types shared between the importer and its clients

use serde::{Deserialize, Serialize};

use crate::error::VitalsError;

/// Message shown while no import has been started or after acknowledgment.
pub const IDLE_MESSAGE: &str = "Awaiting new data upload.";

/// Phase of the import status machine.
///
/// Legal transitions: `Idle|Complete|Error -> Running`, `Running -> Complete|Error`,
/// and `Complete|Error -> Idle` on acknowledgment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ImportPhase {
    #[default]
    Idle,
    Running,
    Complete,
    Error,
}

impl ImportPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            ImportPhase::Idle => "idle",
            ImportPhase::Running => "running",
            ImportPhase::Complete => "complete",
            ImportPhase::Error => "error",
        }
    }

    /// Whether the phase is terminal (awaiting acknowledgment)
    pub fn is_terminal(&self) -> bool {
        matches!(self, ImportPhase::Complete | ImportPhase::Error)
    }
}

impl std::fmt::Display for ImportPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ImportPhase {
    type Err = VitalsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "idle" => Ok(ImportPhase::Idle),
            "running" => Ok(ImportPhase::Running),
            "complete" => Ok(ImportPhase::Complete),
            "error" => Ok(ImportPhase::Error),
            other => Err(VitalsError::InvalidPhase(other.to_string())),
        }
    }
}

/// Snapshot of the import status as seen by polling clients.
///
/// Serialized as `{"status": "<phase>", "message": "..."}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportStatus {
    #[serde(rename = "status")]
    pub phase: ImportPhase,
    pub message: String,
}

impl ImportStatus {
    /// Status at process start
    pub fn idle() -> Self {
        Self {
            phase: ImportPhase::Idle,
            message: IDLE_MESSAGE.to_string(),
        }
    }

    pub fn new(phase: ImportPhase, message: impl Into<String>) -> Self {
        Self {
            phase,
            message: message.into(),
        }
    }
}

impl Default for ImportStatus {
    fn default() -> Self {
        Self::idle()
    }
}
