//! Error types shared across the Vitals crates

use thiserror::Error;

/// Errors raised by the shared types
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum VitalsError {
    #[error("Invalid import phase: {0}")]
    InvalidPhase(String),
}
