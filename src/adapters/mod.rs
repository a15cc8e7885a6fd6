//! Adapters Layer - Hexagonal Architecture Outer Ring
//!
//! Implements the port traits defined in `crate::ports` with concrete
//! external dependencies (HTTP clients, blockchain RPC, hosted LLM).
//! Each sub-module groups adapters by infrastructure concern.
//!
//! Adapter categories:
//! - `airtable`: table-store REST client and row mapping
//! - `chain`: market contract interaction via alloy-rs
//! - `content`: metadata and resolution-source HTTP fetches
//! - `llm`: OpenAI-compatible chat-completions client
//! - `metrics`: Prometheus metrics export

pub mod airtable;
pub mod chain;
pub mod content;
pub mod llm;
pub mod metrics;
