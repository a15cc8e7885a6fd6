//! Configuration Loader - File Loading and Validation
//!
//! Handles loading `config.toml`, validating all parameters,
//! and providing clear error messages for misconfiguration.

use std::path::Path;

use anyhow::{Context, Result};
use tracing::info;

use super::AppConfig;

/// Load and validate configuration from a TOML file.
///
/// # Errors
/// Returns detailed error if:
/// - File doesn't exist or can't be read
/// - TOML parsing fails
/// - Validation rules are violated
pub fn load_config(path: &str) -> Result<AppConfig> {
  let path = Path::new(path);

  let content = std::fs::read_to_string(path)
    .with_context(|| format!("Failed to read config file: {}", path.display()))?;

  let config: AppConfig = toml::from_str(&content)
    .with_context(|| "Failed to parse config.toml")?;

  validate_config(&config)?;

  info!(
    service = %config.service.name,
    chunk_size = config.chain.chunk_size,
    chat_model = %config.llm.chat_model,
    "Configuration loaded successfully"
  );

  Ok(config)
}

/// Validate all configuration parameters.
fn validate_config(config: &AppConfig) -> Result<()> {
  // Service validation
  anyhow::ensure!(
    !config.service.name.is_empty(),
    "service.name must not be empty"
  );
  anyhow::ensure!(
    !config.service.bind_address.is_empty(),
    "service.bind_address must not be empty"
  );
  anyhow::ensure!(
    config.service.stale_after_hours > 0.0,
    "service.stale_after_hours must be positive, got {}",
    config.service.stale_after_hours
  );

  // Chain validation
  anyhow::ensure!(
    !config.chain.rpc_url.is_empty(),
    "chain.rpc_url must not be empty"
  );
  anyhow::ensure!(
    !config.chain.contract_address.is_empty(),
    "chain.contract_address must not be empty"
  );
  anyhow::ensure!(
    config.chain.chunk_size > 0 && config.chain.chunk_size < 100_000,
    "chain.chunk_size must be in (0, 100000), got {}",
    config.chain.chunk_size
  );
  anyhow::ensure!(
    config.chain.requests_per_second > 0,
    "chain.requests_per_second must be positive"
  );

  // Store validation
  anyhow::ensure!(
    !config.store.base_url.is_empty(),
    "store.base_url must not be empty"
  );
  anyhow::ensure!(
    config.store.requests_per_second > 0,
    "store.requests_per_second must be positive"
  );

  // Enrichment validation
  anyhow::ensure!(
    config.enrichment.max_sources > 0,
    "enrichment.max_sources must be positive"
  );
  anyhow::ensure!(
    config.enrichment.max_source_bytes > 0,
    "enrichment.max_source_bytes must be positive"
  );
  anyhow::ensure!(
    (0.0..=2.0).contains(&config.enrichment.explainer_temperature),
    "enrichment.explainer_temperature must be in [0, 2], got {}",
    config.enrichment.explainer_temperature
  );

  // Chat validation
  anyhow::ensure!(
    config.chat.max_tool_rounds >= 1 && config.chat.max_tool_rounds <= 4,
    "chat.max_tool_rounds must be in [1, 4], got {}",
    config.chat.max_tool_rounds
  );
  anyhow::ensure!(
    config.chat.default_search_limit >= 1 && config.chat.default_search_limit <= 100,
    "chat.default_search_limit must be in [1, 100], got {}",
    config.chat.default_search_limit
  );

  Ok(())
}
