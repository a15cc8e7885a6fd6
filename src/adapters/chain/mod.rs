//! Chain Adapters - Market Contract Interaction Layer
//!
//! Provides on-chain access via alloy-rs 0.9 for:
//! - RPC provider management with startup validation
//! - Creation-event sweeps in bounded block-range chunks
//! - Per-market detail reads (`getExtendedMarket`)

pub mod market_reader;
pub mod provider;

pub use market_reader::ChainMarketReader;
pub use provider::RpcProvider;
