//! Airtable Adapter - Table-store REST Layer
//!
//! Implements the `MarketStore` port against the Airtable REST API.
//! Handles auth, rate limiting, retries, pagination, filter-formula
//! construction, and batch row mutations.
//!
//! Sub-modules:
//! - `client`: HTTP client with rate limiting and retries
//! - `store`: `MarketStore` implementation and formula building
//! - `types`: API request/response type definitions

pub mod client;
pub mod store;
pub mod types;

pub use client::{AirtableClient, AirtableClientConfig, AirtableCredentials};
pub use store::AirtableStore;
