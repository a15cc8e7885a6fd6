//! Use Cases Layer - Application Business Logic
//!
//! Orchestrates domain logic with port interfaces to implement
//! the product's core workflows. Each use case is a self-contained
//! business operation.
//!
//! Use cases:
//! - `SyncOrchestrator`: chain → enrichment → table-store upsert
//! - `SourceBackedExplainer`: resolution reasons from cited sources
//! - `ChatAssistant`: bounded tool-calling loop over the table store

pub mod chat;
pub mod explainer;
pub mod sync;
