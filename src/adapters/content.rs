//! Web Content Fetcher - Metadata and Resolution-source Retrieval
//!
//! Best-effort HTTP GETs with fixed per-call timeouts. Metadata bodies
//! must parse as JSON; resolution sources are arbitrary pages truncated
//! to a byte budget. Every failure mode — transport error, timeout,
//! non-2xx, bad body — degrades to `None`. No retries, no cache.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use tracing::debug;

use crate::config::EnrichmentConfig;
use crate::domain::MarketMetadata;
use crate::ports::enrichment::{MetadataFetch, SourceReader};

/// URI sentinel some markets carry instead of a real pointer.
const URI_SENTINEL: &str = "N/A";

/// HTTP fetcher for metadata documents and source excerpts.
pub struct WebContentFetcher {
    http: Client,
    metadata_timeout: Duration,
    source_timeout: Duration,
    max_excerpt_bytes: usize,
}

impl WebContentFetcher {
    pub fn new(config: &EnrichmentConfig) -> Result<Self> {
        let http = Client::builder()
            .pool_max_idle_per_host(5)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            http,
            metadata_timeout: Duration::from_secs(config.metadata_timeout_seconds),
            source_timeout: Duration::from_secs(config.source_timeout_seconds),
            max_excerpt_bytes: config.max_source_bytes,
        })
    }
}

#[async_trait]
impl MetadataFetch for WebContentFetcher {
    async fn fetch_metadata(&self, uri: &str) -> Option<MarketMetadata> {
        if uri.is_empty() || uri == URI_SENTINEL {
            return None;
        }

        let response = match self
            .http
            .get(uri)
            .timeout(self.metadata_timeout)
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                debug!(uri, error = %e, "Metadata fetch failed");
                return None;
            }
        };

        if !response.status().is_success() {
            debug!(uri, status = %response.status(), "Metadata fetch non-2xx");
            return None;
        }

        match response.json::<MarketMetadata>().await {
            Ok(metadata) => Some(metadata),
            Err(e) => {
                debug!(uri, error = %e, "Metadata body was not valid JSON");
                None
            }
        }
    }
}

#[async_trait]
impl SourceReader for WebContentFetcher {
    async fn fetch_excerpt(&self, url: &str) -> Option<String> {
        let response = match self.http.get(url).timeout(self.source_timeout).send().await {
            Ok(response) => response,
            Err(e) => {
                debug!(url, error = %e, "Source fetch failed");
                return None;
            }
        };

        if !response.status().is_success() {
            debug!(url, status = %response.status(), "Source fetch non-2xx");
            return None;
        }

        let body = match response.text().await {
            Ok(body) => body,
            Err(e) => {
                debug!(url, error = %e, "Source body read failed");
                return None;
            }
        };

        let excerpt = truncate_to_bytes(body, self.max_excerpt_bytes);
        (!excerpt.is_empty()).then_some(excerpt)
    }
}

/// Truncate to at most `max_bytes`, respecting char boundaries.
fn truncate_to_bytes(mut text: String, max_bytes: usize) -> String {
    if text.len() <= max_bytes {
        return text;
    }

    let mut cut = max_bytes;
    while !text.is_char_boundary(cut) {
        cut -= 1;
    }
    text.truncate(cut);
    text
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_text_untouched() {
        assert_eq!(truncate_to_bytes("hello".to_string(), 5_000), "hello");
    }

    #[test]
    fn test_truncates_to_budget() {
        let long = "x".repeat(6_000);
        assert_eq!(truncate_to_bytes(long, 5_000).len(), 5_000);
    }

    #[test]
    fn test_respects_char_boundaries() {
        // 'é' is two bytes; a cut through it must back off.
        let text = format!("{}é", "a".repeat(4_999));
        let truncated = truncate_to_bytes(text, 5_000);
        assert_eq!(truncated.len(), 4_999);
        assert!(truncated.chars().all(|c| c == 'a'));
    }
}
