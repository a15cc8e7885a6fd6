//! Market Store Port - Table-store Row Interface
//!
//! The external table store holds one row per market plus a single
//! `last_synced_at` sentinel value. The sync orchestrator is the sole
//! writer; the chat service reads only. Batch mutations take at most
//! [`MAX_BATCH_ROWS`] rows per call — chunking to that limit is the
//! caller's job.

use async_trait::async_trait;
use serde::Deserialize;

/// Store-imposed cap on rows per create/update/delete call.
pub const MAX_BATCH_ROWS: usize = 10;

/// A row's named columns, as loose JSON values.
pub type Fields = serde_json::Map<String, serde_json::Value>;

/// One stored row: the store-assigned record id plus its columns.
#[derive(Debug, Clone, Default)]
pub struct StoredRow {
    /// Store-assigned record id (not the market id).
    pub id: String,
    /// Column name → value.
    pub fields: Fields,
}

impl StoredRow {
    /// The row's `Market ID` column, if present.
    pub fn market_id(&self) -> Option<&str> {
        self.fields.get("Market ID").and_then(|v| v.as_str())
    }

    /// A string column by name.
    pub fn text(&self, column: &str) -> Option<&str> {
        self.fields.get(column).and_then(|v| v.as_str())
    }
}

/// Filters for market queries (chat tools and `GET /markets`).
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct MarketFilters {
    /// Exact status name (e.g. `ACTIVE`).
    pub status: Option<String>,
    /// Exact category.
    pub category: Option<String>,
    /// Substring searched in titles and descriptions.
    pub search: Option<String>,
    /// Maximum rows to return.
    pub limit: Option<usize>,
}

/// Trait for the external table store.
#[async_trait]
pub trait MarketStore: Send + Sync + 'static {
    /// List every row in the table (paginated internally).
    async fn list_all(&self) -> anyhow::Result<Vec<StoredRow>>;

    /// Query market rows with filters, newest first.
    async fn query_markets(&self, filters: &MarketFilters) -> anyhow::Result<Vec<StoredRow>>;

    /// Look up a single market row by its `Market ID` column.
    async fn find_market(&self, market_id: &str) -> anyhow::Result<Option<StoredRow>>;

    /// Create up to [`MAX_BATCH_ROWS`] rows.
    async fn create_batch(&self, rows: &[Fields]) -> anyhow::Result<()>;

    /// Update up to [`MAX_BATCH_ROWS`] rows by record id.
    async fn update_batch(&self, updates: &[(String, Fields)]) -> anyhow::Result<()>;

    /// Delete up to [`MAX_BATCH_ROWS`] rows by record id.
    async fn delete_batch(&self, record_ids: &[String]) -> anyhow::Result<()>;

    /// Overwrite the `last_synced_at` sentinel on one row.
    async fn write_sync_stamp(&self, record_id: &str, iso_timestamp: &str) -> anyhow::Result<()>;

    /// Read the `last_synced_at` sentinel, wherever it lives.
    async fn last_synced_at(&self) -> anyhow::Result<Option<String>>;

    /// Check if the store is reachable and authorized.
    async fn is_healthy(&self) -> bool;
}
