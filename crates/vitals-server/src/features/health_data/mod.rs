//! Health data feature module
//!
//! Read-only JSON endpoints over the imported `health_data` table.

pub mod queries;
pub mod routes;

pub use routes::health_data_routes;
