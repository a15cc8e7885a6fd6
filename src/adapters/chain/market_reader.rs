//! Chain Market Reader - Creation-event Sweep + Detail Reads
//!
//! Implements the `MarketSource` port against the market contract.
//! Creation events are queried from block 0 to the current head in
//! bounded block-range chunks (the node rejects log queries wider than
//! 100k blocks); each event is then enriched with a `getExtendedMarket`
//! read call for current state.
//!
//! Error policy: partial results are acceptable. A failed chunk query or
//! detail read is logged and skipped — a single bad market must never
//! abort the whole sweep.

use std::num::NonZeroU32;
use std::sync::Arc;

use alloy::primitives::utils::format_ether;
use alloy::primitives::{Address, Bytes, U256};
use alloy::providers::Provider;
use alloy::rpc::types::{Filter, TransactionRequest};
use alloy::sol;
use alloy::sol_types::{SolCall, SolEvent};
use anyhow::{Context, Result};
use async_trait::async_trait;
use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use tracing::{debug, info, instrument, warn};

use crate::config::ChainConfig;
use crate::domain::{ChainMarket, MarketStatus};
use crate::ports::market_source::MarketSource;

sol! {
    /// Current on-chain state of one market.
    struct MarketState {
        uint8 status;
        address resolver;
        uint32 winningOutcome;
        uint64 createdAt;
        uint64 expiresAt;
        uint64 resolvedAt;
        uint64 pausedAt;
        uint256 collateralAmount;
    }

    /// Wrapper returned by the detail read.
    struct ExtendedMarket {
        MarketState market;
    }

    /// Emitted once per market at creation.
    event MarketCreated(
        uint256 indexed marketId,
        address indexed creator,
        uint64 expiresAt,
        uint32 outcomeCount,
        string metaDataURI
    );

    function getExtendedMarket(uint256 marketId) external view returns (ExtendedMarket memory);
}

/// One decoded creation event, before the detail read.
struct CreatedEvent {
    market_id: U256,
    creator: Address,
    expires_at: u64,
    outcome_count: u32,
    metadata_uri: String,
    block_number: u64,
}

/// Reads markets from the chain via chunked event sweeps.
pub struct ChainMarketReader {
    /// Shared RPC provider (type-erased).
    provider: Arc<dyn Provider + Send + Sync>,
    /// Market contract address.
    address: Address,
    /// Block-range width per log query.
    chunk_size: u64,
    /// Token bucket over all RPC calls (chunk queries + detail reads).
    throttle: DefaultDirectRateLimiter,
}

impl ChainMarketReader {
    /// Create a reader over a connected provider.
    pub fn new(provider: Arc<dyn Provider + Send + Sync>, config: &ChainConfig) -> Result<Self> {
        let address: Address = config
            .contract_address
            .parse()
            .context("Invalid contract address")?;

        let rps = NonZeroU32::new(config.requests_per_second)
            .context("chain.requests_per_second must be nonzero")?;

        Ok(Self {
            provider,
            address,
            chunk_size: config.chunk_size,
            throttle: RateLimiter::direct(Quota::per_second(rps)),
        })
    }

    /// Sweep creation events from block 0 to `head`.
    ///
    /// Chunks that fail to query are skipped, not retried; the sweep
    /// returns whatever the healthy chunks produced.
    async fn fetch_creation_events(&self, head: u64) -> Vec<CreatedEvent> {
        let mut events = Vec::new();

        for (from, to) in chunk_ranges(head, self.chunk_size) {
            self.throttle.until_ready().await;

            let filter = Filter::new()
                .address(self.address)
                .event_signature(MarketCreated::SIGNATURE_HASH)
                .from_block(from)
                .to_block(to);

            match self.provider.get_logs(&filter).await {
                Ok(logs) => {
                    for log in logs {
                        let block_number = log.block_number.unwrap_or_default();
                        match log.log_decode::<MarketCreated>() {
                            Ok(decoded) => {
                                let data = decoded.inner.data;
                                events.push(CreatedEvent {
                                    market_id: data.marketId,
                                    creator: data.creator,
                                    expires_at: data.expiresAt,
                                    outcome_count: data.outcomeCount,
                                    metadata_uri: data.metaDataURI,
                                    block_number,
                                });
                            }
                            Err(e) => debug!(error = %e, "Skipping undecodable log"),
                        }
                    }
                }
                Err(e) => {
                    warn!(from, to, error = %e, "Chunk query failed, skipping range");
                }
            }
        }

        events
    }

    /// Read current on-chain state for one market.
    async fn fetch_details(&self, market_id: U256) -> Result<MarketState> {
        let call = getExtendedMarketCall { marketId: market_id };
        let calldata = Bytes::from(call.abi_encode());

        let tx = TransactionRequest::default()
            .to(self.address)
            .input(calldata.into());

        let raw = self
            .provider
            .call(&tx)
            .await
            .context("getExtendedMarket call failed")?;

        let decoded = getExtendedMarketCall::abi_decode_returns(&raw, true)
            .context("Failed to decode getExtendedMarket return")?;

        Ok(decoded._0.market)
    }
}

#[async_trait]
impl MarketSource for ChainMarketReader {
    #[instrument(skip_all)]
    async fn fetch_markets(&self) -> Result<Vec<ChainMarket>> {
        let head = self
            .provider
            .get_block_number()
            .await
            .context("Failed to query head block")?;

        let events = self.fetch_creation_events(head).await;
        info!(head, events = events.len(), "Creation-event sweep complete");

        let mut markets = Vec::with_capacity(events.len());

        for event in events {
            self.throttle.until_ready().await;

            match self.fetch_details(event.market_id).await {
                Ok(state) => {
                    let collateral_amount = format_ether(state.collateralAmount)
                        .parse::<f64>()
                        .unwrap_or_default();

                    markets.push(ChainMarket {
                        market_id: event.market_id.to_string(),
                        creator: event.creator.to_string(),
                        resolver: state.resolver.to_string(),
                        status: MarketStatus::from_raw(state.status),
                        winning_outcome: state.winningOutcome,
                        outcome_count: event.outcome_count,
                        collateral_amount,
                        metadata_uri: event.metadata_uri,
                        block_number: event.block_number,
                        created_at: state.createdAt,
                        expires_at: state.expiresAt.max(event.expires_at),
                        resolved_at: state.resolvedAt,
                        paused_at: state.pausedAt,
                    });
                }
                Err(e) => {
                    warn!(
                        market_id = %event.market_id,
                        error = %e,
                        "Dropping market: detail read failed"
                    );
                }
            }
        }

        Ok(markets)
    }

    async fn is_healthy(&self) -> bool {
        self.provider.get_block_number().await.is_ok()
    }
}

/// Split `[0, head]` into log-query ranges of at most `chunk_size` blocks.
///
/// Mirrors the node-facing contract: ranges are `[i*size, (i+1)*size - 1]`
/// with the final range clamped to `head`. A head inside the first chunk
/// yields a single `[0, head]` query.
pub fn chunk_ranges(head: u64, chunk_size: u64) -> Vec<(u64, u64)> {
    if head <= chunk_size {
        return vec![(0, head)];
    }

    let mut ranges = Vec::new();
    let mut from = 0;
    while from <= head {
        ranges.push((from, (from + chunk_size - 1).min(head)));
        from += chunk_size;
    }
    ranges
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_chunk_when_range_fits() {
        assert_eq!(chunk_ranges(50_000, 90_000), vec![(0, 50_000)]);
        assert_eq!(chunk_ranges(90_000, 90_000), vec![(0, 90_000)]);
    }

    #[test]
    fn test_three_chunks_with_clamped_tail() {
        assert_eq!(
            chunk_ranges(200_000, 90_000),
            vec![(0, 89_999), (90_000, 179_999), (180_000, 200_000)]
        );
    }

    #[test]
    fn test_exact_multiple_keeps_head_in_last_chunk() {
        assert_eq!(
            chunk_ranges(180_000, 90_000),
            vec![(0, 89_999), (90_000, 179_999), (180_000, 180_000)]
        );
    }

    #[test]
    fn test_created_event_signature_is_stable() {
        // Sweep filters key off this hash; a silent ABI change would
        // make every sweep come back empty.
        assert_eq!(
            MarketCreated::SIGNATURE,
            "MarketCreated(uint256,address,uint64,uint32,string)"
        );
    }
}
