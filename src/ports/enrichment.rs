//! Enrichment Ports - Metadata, Source Excerpts, Resolution Reasons
//!
//! Everything here is best-effort: a fetch that fails, times out, or
//! returns garbage yields `None`, never an error. Markets are written
//! with whatever enrichment could be gathered.

use async_trait::async_trait;

use crate::domain::MarketMetadata;

/// Trait for metadata document retrieval.
#[async_trait]
pub trait MetadataFetch: Send + Sync + 'static {
    /// Fetch and parse the document behind a market's metadata URI.
    ///
    /// `None` for empty/sentinel URIs, transport failures, timeouts,
    /// and non-JSON bodies alike.
    async fn fetch_metadata(&self, uri: &str) -> Option<MarketMetadata>;
}

/// Trait for resolution-source content retrieval.
#[async_trait]
pub trait SourceReader: Send + Sync + 'static {
    /// Fetch a bounded excerpt of the page behind a resolution source.
    ///
    /// The excerpt is capped to the adapter's configured byte budget;
    /// failures and empty bodies yield `None`.
    async fn fetch_excerpt(&self, url: &str) -> Option<String>;
}

/// Trait for producing a resolution explanation.
#[async_trait]
pub trait ResolutionExplain: Send + Sync + 'static {
    /// Explain why a market resolved, based on its cited sources.
    ///
    /// `None` when there are no sources, no source yielded content, or
    /// the summarizer failed — the market row simply omits the column.
    async fn explain<'a>(
        &self,
        market_id: &str,
        sources: &[String],
        title: Option<&'a str>,
    ) -> Option<String>;
}
