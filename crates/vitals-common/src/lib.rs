//! Vitals Common Library
#![deny(clippy::unwrap_used, clippy::expect_used)]
//!
//! Shared types, logging setup, and error handling for the Vitals workspace.
//!
//! - **Error Handling**: [`VitalsError`] for invalid shared values
//! - **Logging**: tracing subscriber initialization driven by [`logging::LogConfig`]
//! - **Types**: import phase/status values exchanged between the importer and its clients
//!
//! # Example
//!
//! ```no_run
//! use vitals_common::logging::{init_logging, LogConfig};
//! use vitals_common::types::ImportStatus;
//!
//! fn main() -> anyhow::Result<()> {
//!     let _guard = init_logging(&LogConfig::from_env()?)?;
//!     let status = ImportStatus::idle();
//!     tracing::info!(phase = %status.phase, "Importer ready");
//!     Ok(())
//! }
//! ```

pub mod error;
pub mod logging;
pub mod types;

// Re-export commonly used types
pub use error::VitalsError;
