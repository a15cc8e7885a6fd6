//! Ports Layer - Hexagonal Architecture Boundaries
//!
//! Defines the interfaces (traits) that the usecases layer requires from
//! the outside world. Adapters implement these traits.
//!
//! Port categories:
//! - `MarketSource`: chain-side market discovery
//! - `MarketStore`: table-store rows (list/query/batch writes)
//! - `enrichment`: metadata documents, source excerpts, resolution reasons
//! - `ChatModel`: hosted LLM completions, tool calling, streaming

pub mod chat_model;
pub mod enrichment;
pub mod market_source;
pub mod market_store;
