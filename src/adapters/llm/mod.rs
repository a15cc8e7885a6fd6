//! LLM Adapter - OpenAI-compatible Chat Completions
//!
//! Implements the `ChatModel` port against a hosted chat-completions
//! API. Handles tool schemas, tool-choice control, and SSE streaming.
//!
//! Sub-modules:
//! - `client`: HTTP client and SSE relay
//! - `types`: wire request/response type definitions

pub mod client;
pub mod types;

pub use client::OpenAiClient;
