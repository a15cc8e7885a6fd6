//! Configuration Module - TOML-based Service Configuration
//!
//! Loads and validates configuration from `config.toml`. Endpoints,
//! contract addresses, rate limits, and model names are all externalized
//! here - nothing is hardcoded in the domain layer. Secrets (Airtable and
//! LLM API keys) are NOT part of the file; adapters read them from the
//! process environment at startup.

pub mod loader;

use serde::Deserialize;

/// Top-level configuration.
///
/// Loaded from `config.toml` at startup. All fields are validated
/// before either binary begins operation.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
  /// Service identity and HTTP surface.
  pub service: ServiceConfig,
  /// Chain RPC endpoint and market contract.
  pub chain: ChainConfig,
  /// Table store endpoint and request policy.
  pub store: StoreConfig,
  /// Hosted LLM endpoints and model names.
  pub llm: LlmConfig,
  /// Metadata / resolution-source fetch limits.
  pub enrichment: EnrichmentConfig,
  /// Chat assistant behavior.
  pub chat: ChatConfig,
}

/// Service identity configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceConfig {
  /// Human-readable service name.
  pub name: String,
  /// Log level (trace, debug, info, warn, error).
  #[serde(default = "default_log_level")]
  pub log_level: String,
  /// Bind address for the HTTP API.
  #[serde(default = "default_bind_address")]
  pub bind_address: String,
  /// Base URL for market pages referenced by quick actions.
  #[serde(default = "default_market_page_base_url")]
  pub market_page_base_url: String,
  /// Hours after which the last sync is reported as stale.
  #[serde(default = "default_stale_after_hours")]
  pub stale_after_hours: f64,
}

/// Chain RPC configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ChainConfig {
  /// JSON-RPC endpoint URL.
  pub rpc_url: String,
  /// Market contract address (hex).
  pub contract_address: String,
  /// Block-range width per log query. Must stay under the node's
  /// log-query limit (100k blocks on the XO testnet).
  #[serde(default = "default_chunk_size")]
  pub chunk_size: u64,
  /// Expected chain id; connection fails fast on a mismatch when set.
  pub expected_chain_id: Option<u64>,
  /// RPC request budget per second (chunk queries + detail reads).
  #[serde(default = "default_chain_rps")]
  pub requests_per_second: u32,
}

/// Table store (Airtable REST) configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
  /// REST base URL.
  #[serde(default = "default_store_base_url")]
  pub base_url: String,
  /// Request budget per second (Airtable allows 5 rps per base).
  #[serde(default = "default_store_rps")]
  pub requests_per_second: u32,
  /// Request timeout in seconds.
  #[serde(default = "default_store_timeout")]
  pub timeout_seconds: u64,
  /// Maximum retries on 429/5xx responses.
  #[serde(default = "default_max_retries")]
  pub max_retries: u32,
  /// Base delay between retries (exponential backoff), milliseconds.
  #[serde(default = "default_retry_base_delay_ms")]
  pub retry_base_delay_ms: u64,
}

/// Hosted LLM configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LlmConfig {
  /// Chat-completions base URL (OpenAI-compatible).
  #[serde(default = "default_llm_base_url")]
  pub base_url: String,
  /// Model used by the chat assistant's tool-calling loop.
  #[serde(default = "default_chat_model")]
  pub chat_model: String,
  /// Model used for one-shot completions (resolution explanations).
  #[serde(default = "default_completion_model")]
  pub completion_model: String,
}

/// Enrichment fetch limits.
#[derive(Debug, Clone, Deserialize)]
pub struct EnrichmentConfig {
  /// Metadata GET timeout, seconds.
  #[serde(default = "default_metadata_timeout")]
  pub metadata_timeout_seconds: u64,
  /// Resolution-source GET timeout, seconds.
  #[serde(default = "default_source_timeout")]
  pub source_timeout_seconds: u64,
  /// Maximum resolution sources fetched per market.
  #[serde(default = "default_max_sources")]
  pub max_sources: usize,
  /// Per-source excerpt cap, bytes.
  #[serde(default = "default_max_source_bytes")]
  pub max_source_bytes: usize,
  /// Sampling temperature for the explanation completion.
  #[serde(default = "default_explainer_temperature")]
  pub explainer_temperature: f32,
  /// Token cap for the explanation completion.
  #[serde(default = "default_explainer_max_tokens")]
  pub explainer_max_tokens: u32,
}

/// Chat assistant configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ChatConfig {
  /// Tool-call rounds allowed before the model is forced to answer.
  #[serde(default = "default_max_tool_rounds")]
  pub max_tool_rounds: usize,
  /// Default row limit for market search tools and GET /markets.
  #[serde(default = "default_search_limit")]
  pub default_search_limit: usize,
}

// Default value functions for serde

fn default_log_level() -> String {
  "info".to_string()
}

fn default_bind_address() -> String {
  "0.0.0.0:8787".to_string()
}

fn default_market_page_base_url() -> String {
  "https://alpha.xo.market".to_string()
}

fn default_stale_after_hours() -> f64 {
  24.0
}

fn default_chunk_size() -> u64 {
  90_000
}

fn default_chain_rps() -> u32 {
  4
}

fn default_store_base_url() -> String {
  "https://api.airtable.com/v0".to_string()
}

fn default_store_rps() -> u32 {
  5
}

fn default_store_timeout() -> u64 {
  30
}

fn default_max_retries() -> u32 {
  3
}

fn default_retry_base_delay_ms() -> u64 {
  200
}

fn default_llm_base_url() -> String {
  "https://api.openai.com/v1".to_string()
}

fn default_chat_model() -> String {
  "gpt-5-mini".to_string()
}

fn default_completion_model() -> String {
  "gpt-4o-mini".to_string()
}

fn default_metadata_timeout() -> u64 {
  10
}

fn default_source_timeout() -> u64 {
  15
}

fn default_max_sources() -> usize {
  3
}

fn default_max_source_bytes() -> usize {
  5_000
}

fn default_explainer_temperature() -> f32 {
  0.1
}

fn default_explainer_max_tokens() -> u32 {
  200
}

fn default_max_tool_rounds() -> usize {
  1
}

fn default_search_limit() -> usize {
  10
}
