//! Sync Job Entry Point
//!
//! One-shot run: read every market from the chain, enrich with metadata
//! and resolution reasons, upsert the table store, stamp the sync time.
//! Exits non-zero when the run fails; enrichment failures only cost the
//! affected columns.

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{error, info};

use xomarket_sync_bot::adapters::airtable::{
    AirtableClient, AirtableCredentials, AirtableStore,
};
use xomarket_sync_bot::adapters::chain::{ChainMarketReader, RpcProvider};
use xomarket_sync_bot::adapters::content::WebContentFetcher;
use xomarket_sync_bot::adapters::llm::OpenAiClient;
use xomarket_sync_bot::config;
use xomarket_sync_bot::ports::chat_model::ChatModel;
use xomarket_sync_bot::ports::enrichment::{MetadataFetch, ResolutionExplain, SourceReader};
use xomarket_sync_bot::ports::market_source::MarketSource;
use xomarket_sync_bot::ports::market_store::MarketStore;
use xomarket_sync_bot::usecases::explainer::SourceBackedExplainer;
use xomarket_sync_bot::usecases::sync::SyncOrchestrator;

#[tokio::main]
async fn main() -> Result<()> {
    let config = config::loader::load_config("config.toml")
        .context("Failed to load configuration")?;

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
        contract = %config.chain.contract_address,
        "Starting sync run"
    );

    // Chain reader over a validated RPC connection.
    let provider = RpcProvider::connect(&config.chain)
        .await
        .context("Failed to connect to chain RPC")?;
    let source: Arc<dyn MarketSource> =
        Arc::new(ChainMarketReader::new(provider.inner(), &config.chain)?);

    // Table store (creds from env).
    let creds = AirtableCredentials::from_env()
        .context("Failed to load Airtable credentials from env")?;
    let client = AirtableClient::new(creds, (&config.store).into())
        .context("Failed to create Airtable client")?;
    let store: Arc<dyn MarketStore> =
        Arc::new(AirtableStore::new(client, config.chat.default_search_limit));

    // Enrichment: metadata fetcher + source-backed explainer.
    let fetcher = Arc::new(WebContentFetcher::new(&config.enrichment)?);
    let metadata: Arc<dyn MetadataFetch> = fetcher.clone();
    let reader: Arc<dyn SourceReader> = fetcher;

    let model: Arc<dyn ChatModel> = Arc::new(
        OpenAiClient::from_env(&config.llm).context("Failed to create LLM client")?,
    );
    let explainer: Arc<dyn ResolutionExplain> = Arc::new(SourceBackedExplainer::new(
        model,
        reader,
        &config.enrichment,
    ));

    let orchestrator = SyncOrchestrator::new(source, store, metadata, explainer);

    match orchestrator.run().await {
        Ok(report) => {
            info!(
                markets = report.markets,
                created = report.created,
                updated = report.updated,
                deleted = report.deleted,
                unchanged = report.unchanged,
                "Done"
            );
            Ok(())
        }
        Err(e) => {
            error!(error = %e, "Sync failed");
            std::process::exit(1);
        }
    }
}
