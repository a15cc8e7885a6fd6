//! Market Source Port - Chain-side Market Discovery
//!
//! The sync job's view of the blockchain: one call that returns every
//! market the contract has ever created, with current on-chain state.
//! Partial results are the norm — individual chunk or detail failures
//! are absorbed by the adapter, never surfaced as a batch failure.

use async_trait::async_trait;

use crate::domain::ChainMarket;

/// Trait for market discovery providers.
#[async_trait]
pub trait MarketSource: Send + Sync + 'static {
    /// Fetch all markets from creation events plus per-market detail reads.
    ///
    /// Failed block-range chunks and failed detail reads are skipped and
    /// logged; only a total failure (e.g. the head-block query) errors.
    async fn fetch_markets(&self) -> anyhow::Result<Vec<ChainMarket>>;

    /// Check if the upstream RPC connection is healthy.
    async fn is_healthy(&self) -> bool;
}
