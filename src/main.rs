//! XO Market Sync Bot — API Server Entry Point
//!
//! Initializes configuration, logging, the table-store client, and the
//! LLM client, then serves the chat/market HTTP API until SIGINT.
//!
//! Wiring sequence:
//! 1. Load config.toml + validate
//! 2. Init tracing (JSON structured logging)
//! 3. Load store credentials from env (AIRTABLE_API_KEY, AIRTABLE_BASE_ID,
//!    AIRTABLE_TABLE_NAME) and the LLM key (OPENAI_API_KEY)
//! 4. Create AirtableStore (HTTP + auth + retry + rate limit)
//! 5. Create OpenAiClient (ChatModel port)
//! 6. Create ChatAssistant (bounded tool-calling loop)
//! 7. Serve the axum router until SIGINT → graceful shutdown

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: tikv_jemallocator::Jemalloc = tikv_jemallocator::Jemalloc;

use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::signal;
use tracing::info;

mod adapters;
mod api;
mod config;
mod domain;
mod ports;
mod usecases;

use adapters::airtable::{AirtableClient, AirtableCredentials, AirtableStore};
use adapters::llm::OpenAiClient;
use adapters::metrics::MetricsRegistry;
use api::{router, ApiState};
use ports::chat_model::ChatModel;
use ports::market_store::MarketStore;
use usecases::chat::ChatAssistant;

#[tokio::main]
async fn main() -> Result<()> {
    // ── 1. Load configuration from config.toml ──────────────
    let config = config::loader::load_config("config.toml")
        .context("Failed to load configuration")?;

    // ── 2. Initialize structured JSON logging ───────────────
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| {
                    tracing_subscriber::EnvFilter::new(&config.service.log_level)
                }),
        )
        .json()
        .init();

    info!(
        name = %config.service.name,
        version = env!("CARGO_PKG_VERSION"),
        bind = %config.service.bind_address,
        chat_model = %config.llm.chat_model,
        "Starting API server"
    );

    // ── 3. Table store client (creds from env) ──────────────
    let creds = AirtableCredentials::from_env()
        .context("Failed to load Airtable credentials from env")?;
    let client = AirtableClient::new(creds, (&config.store).into())
        .context("Failed to create Airtable client")?;
    let store: Arc<dyn MarketStore> =
        Arc::new(AirtableStore::new(client, config.chat.default_search_limit));

    // ── 4. LLM client (key from env) ────────────────────────
    let model: Arc<dyn ChatModel> = Arc::new(
        OpenAiClient::from_env(&config.llm).context("Failed to create LLM client")?,
    );

    // ── 5. Chat assistant ───────────────────────────────────
    let assistant = Arc::new(ChatAssistant::new(
        model,
        Arc::clone(&store),
        config.service.market_page_base_url.clone(),
        &config.chat,
    ));

    // ── 6. Metrics registry ─────────────────────────────────
    let metrics = Arc::new(MetricsRegistry::new().context("Failed to register metrics")?);

    // ── 7. Serve until SIGINT ───────────────────────────────
    let state = ApiState {
        assistant,
        store,
        metrics,
        service_name: config.service.name.clone(),
        stale_after_hours: config.service.stale_after_hours,
    };

    let listener = tokio::net::TcpListener::bind(&config.service.bind_address)
        .await
        .with_context(|| format!("Failed to bind {}", config.service.bind_address))?;

    info!(address = %config.service.bind_address, "API server listening");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(async {
            let _ = signal::ctrl_c().await;
            info!("SIGINT received, shutting down");
        })
        .await?;

    info!("Shutdown complete");
    Ok(())
}
