//! Vitals Server Library
#![deny(clippy::unwrap_used, clippy::expect_used)]
//!
//! Imports Apple Health style exports into SQLite and serves the imported time series.
//!
//! - **Ingest**: zip extraction, streaming XML parsing, batched transactional writes and the
//!   single-flight import job with its polled status
//! - **Features**: axum routes for uploads, import status and the read-side queries
//! - **Configuration**: environment-based configuration loaded through `dotenvy`
//! - **Middleware**: CORS and request tracing
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use vitals_server::{config::Config, db, ingest::ImportRunner};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load()?;
//!     let pool = db::connect(&config.database).await?;
//!     let runner = Arc::new(ImportRunner::new(pool, config.import.clone()));
//!
//!     if runner.start_import("uploads/export.zip".into()) {
//!         runner.wait().await;
//!     }
//!     println!("{:?}", runner.status().snapshot());
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod db;
pub mod error;
pub mod features;
pub mod ingest;
pub mod middleware;

pub use error::{AppError, AppResult};
