//! Core market domain types.
//!
//! A `ChainMarket` is the chain-derived view of one prediction market:
//! the creation event fields plus the current on-chain state from the
//! detail read. Enrichment (metadata, resolution reason) stays outside
//! this type; it is merged at the row level by the sync orchestrator.

use chrono::DateTime;
use serde::{Deserialize, Serialize};

/// Market identifier — the contract's uint256 id, string-encoded.
pub type MarketId = String;

/// Lifecycle status of a market, mapped from the contract's u8.
///
/// Stored downstream as its uppercase name so chat-tool filters like
/// `status = "RESOLVED"` match what the sync job wrote.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MarketStatus {
    Pending,
    Active,
    Resolved,
    Paused,
    /// Raw value the mapping doesn't know about (forward compatibility).
    Unknown(u8),
}

impl MarketStatus {
    /// Map the on-chain status byte.
    pub fn from_raw(raw: u8) -> Self {
        match raw {
            0 => Self::Pending,
            1 => Self::Active,
            2 => Self::Resolved,
            3 => Self::Paused,
            other => Self::Unknown(other),
        }
    }
}

impl std::fmt::Display for MarketStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => write!(f, "PENDING"),
            Self::Active => write!(f, "ACTIVE"),
            Self::Resolved => write!(f, "RESOLVED"),
            Self::Paused => write!(f, "PAUSED"),
            Self::Unknown(raw) => write!(f, "UNKNOWN_{raw}"),
        }
    }
}

/// One market as reconstructed from the creation event plus the
/// `getExtendedMarket` detail read.
///
/// Lifecycle timestamps are unix seconds; 0 means unset. Collateral is
/// already converted to a decimal amount at the adapter boundary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChainMarket {
    /// Unique market id (string-encoded integer).
    pub market_id: MarketId,
    /// Creator account address.
    pub creator: String,
    /// Resolver account address.
    pub resolver: String,
    /// Current lifecycle status.
    pub status: MarketStatus,
    /// Winning outcome index (meaningful once resolved).
    pub winning_outcome: u32,
    /// Number of outcomes.
    pub outcome_count: u32,
    /// Collateral in decimal units.
    pub collateral_amount: f64,
    /// External metadata pointer; may be empty or a sentinel.
    pub metadata_uri: String,
    /// Block the creation event was emitted in.
    pub block_number: u64,
    /// Creation timestamp (unix seconds, 0 = unset).
    pub created_at: u64,
    /// Expiry timestamp (unix seconds, 0 = unset).
    pub expires_at: u64,
    /// Resolution timestamp (unix seconds, 0 = unset).
    pub resolved_at: u64,
    /// Pause timestamp (unix seconds, 0 = unset).
    pub paused_at: u64,
}

impl ChainMarket {
    /// Calendar-date columns derived from the lifecycle timestamps.
    ///
    /// Only strictly-positive timestamps produce a column; a timestamp
    /// of 0 emits nothing. Dates are UTC, `YYYY-MM-DD`.
    pub fn date_fields(&self) -> Vec<(&'static str, String)> {
        [
            ("Created Date", self.created_at),
            ("Expires Date", self.expires_at),
            ("Resolved Date", self.resolved_at),
            ("Paused Date", self.paused_at),
        ]
        .into_iter()
        .filter(|(_, ts)| *ts > 0)
        .filter_map(|(name, ts)| {
            let date = DateTime::from_timestamp(ts as i64, 0)?;
            Some((name, date.date_naive().format("%Y-%m-%d").to_string()))
        })
        .collect()
    }

    /// Whether the market has resolved on-chain.
    pub fn is_resolved(&self) -> bool {
        self.resolved_at > 0
    }
}
