//! API Layer - HTTP Surface
//!
//! Axum router and handlers for the chat and market endpoints, plus
//! the error-to-JSON mapping every failure path goes through.

pub mod error;
pub mod routes;

pub use error::ApiError;
pub use routes::{router, ApiState};
