//! Imports feature module
//!
//! Archive upload, import status polling and status acknowledgment.

pub mod routes;
pub mod upload;

pub use routes::imports_routes;
