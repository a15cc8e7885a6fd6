//! Market metadata document.
//!
//! The shape of the JSON document a market's `metaDataURI` points at.
//! Every field is optional — metadata is best-effort enrichment and a
//! partially-filled document is still useful.

use serde::{Deserialize, Serialize};

/// Parsed metadata document for one market.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MarketMetadata {
    /// Human-readable market title.
    pub title: Option<String>,
    /// Long-form description.
    pub description: Option<String>,
    /// Category label (e.g. "Sports", "Crypto").
    pub category: Option<String>,
    /// Free-form tags.
    #[serde(default)]
    pub tags: Vec<String>,
    /// Cover image URL.
    pub image_url: Option<String>,
    /// Resolution rules.
    pub rules: Option<MarketRules>,
    /// URLs cited as resolution evidence.
    #[serde(default)]
    pub resolution_sources: Vec<String>,
    /// Outcome definitions.
    #[serde(default)]
    pub outcomes: Vec<MetadataOutcome>,
}

/// Rules block inside the metadata document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MarketRules {
    pub description: Option<String>,
}

/// One outcome definition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetadataOutcome {
    pub id: u32,
    pub title: String,
}

impl MarketMetadata {
    /// Render outcomes as the store's `id: title` comma-joined column.
    pub fn outcomes_column(&self) -> Option<String> {
        if self.outcomes.is_empty() {
            return None;
        }
        Some(
            self.outcomes
                .iter()
                .map(|o| format!("{}: {}", o.id, o.title))
                .collect::<Vec<_>>()
                .join(", "),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_document() {
        let json = r#"{
            "title": "Will BTC close above 100k on Dec 31?",
            "description": "Resolves YES if the daily close exceeds $100,000.",
            "category": "Crypto",
            "tags": ["btc", "price"],
            "image_url": "https://cdn.xo.market/btc.png",
            "rules": {"description": "Coinbase daily close, UTC."},
            "resolution_sources": ["https://www.coinbase.com/price/bitcoin"],
            "outcomes": [{"id": 1, "title": "Yes"}, {"id": 2, "title": "No"}]
        }"#;

        let meta: MarketMetadata = serde_json::from_str(json).unwrap();
        assert_eq!(meta.title.as_deref(), Some("Will BTC close above 100k on Dec 31?"));
        assert_eq!(meta.tags, vec!["btc", "price"]);
        assert_eq!(meta.resolution_sources.len(), 1);
        assert_eq!(meta.rules.as_ref().unwrap().description.as_deref(), Some("Coinbase daily close, UTC."));
        assert_eq!(meta.outcomes_column().as_deref(), Some("1: Yes, 2: No"));
    }

    #[test]
    fn test_parse_sparse_document() {
        let meta: MarketMetadata = serde_json::from_str(r#"{"title": "Minimal"}"#).unwrap();
        assert_eq!(meta.title.as_deref(), Some("Minimal"));
        assert!(meta.tags.is_empty());
        assert!(meta.outcomes_column().is_none());
    }

    #[test]
    fn test_unknown_fields_ignored() {
        let meta: MarketMetadata =
            serde_json::from_str(r#"{"title": "X", "unexpected": {"deep": true}}"#).unwrap();
        assert_eq!(meta.title.as_deref(), Some("X"));
    }
}
