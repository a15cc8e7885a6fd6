//! Resolution Explainer - Why Did This Market Resolve?
//!
//! Fetches a market's cited resolution sources (capped count, capped
//! excerpt length) and asks the completion model for a short factual
//! explanation. Every failure path degrades to `None` — a market row
//! without an explanation is normal.
//!
//! Cost controls: no sources → no fetch, no LLM call; zero fetched
//! content → no LLM call.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::config::EnrichmentConfig;
use crate::ports::chat_model::{ChatModel, CompletionOptions};
use crate::ports::enrichment::{ResolutionExplain, SourceReader};

/// Explains market resolutions from source excerpts.
pub struct SourceBackedExplainer {
    model: Arc<dyn ChatModel>,
    reader: Arc<dyn SourceReader>,
    /// Sources fetched per market, at most.
    max_sources: usize,
    opts: CompletionOptions,
}

impl SourceBackedExplainer {
    pub fn new(
        model: Arc<dyn ChatModel>,
        reader: Arc<dyn SourceReader>,
        config: &EnrichmentConfig,
    ) -> Self {
        Self {
            model,
            reader,
            max_sources: config.max_sources,
            opts: CompletionOptions {
                temperature: config.explainer_temperature,
                max_tokens: config.explainer_max_tokens,
            },
        }
    }
}

#[async_trait]
impl ResolutionExplain for SourceBackedExplainer {
    async fn explain<'a>(
        &self,
        market_id: &str,
        sources: &[String],
        title: Option<&'a str>,
    ) -> Option<String> {
        if sources.is_empty() {
            debug!(market_id, "No resolution sources for market");
            return None;
        }

        let mut context = String::new();
        for source in sources.iter().take(self.max_sources) {
            match self.reader.fetch_excerpt(source).await {
                Some(excerpt) => {
                    context.push_str(&format!("Source: {source}\nContent: {excerpt}\n\n"));
                }
                None => debug!(market_id, source, "Could not fetch source"),
            }
        }

        if context.trim().is_empty() {
            debug!(market_id, "No source yielded content, skipping summarizer");
            return None;
        }

        let prompt = build_explanation_prompt(market_id, title, &context);

        match self.model.complete(&prompt, self.opts).await {
            Ok(text) => {
                let trimmed = text.trim();
                (!trimmed.is_empty()).then(|| trimmed.to_string())
            }
            Err(e) => {
                warn!(market_id, error = %e, "Could not fetch resolution reason");
                None
            }
        }
    }
}

/// Build the summarization prompt for one market.
pub fn build_explanation_prompt(market_id: &str, title: Option<&str>, context: &str) -> String {
    format!(
        "Based on the following sources and market information, provide a concise \
         explanation (2-3 sentences max) of why this prediction market was resolved:\n\n\
         Market Title: {}\n\
         Market ID: {market_id}\n\n\
         Sources:\n{context}\n\
         Provide a clear, factual reason for the market resolution based on the \
         evidence from the sources.",
        title.unwrap_or("Unknown")
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompt_embeds_market_and_sources() {
        let prompt = build_explanation_prompt(
            "42",
            Some("Will it rain?"),
            "Source: https://example.com\nContent: It rained.\n\n",
        );

        assert!(prompt.contains("Market Title: Will it rain?"));
        assert!(prompt.contains("Market ID: 42"));
        assert!(prompt.contains("Content: It rained."));
        assert!(prompt.contains("2-3 sentences max"));
    }

    #[test]
    fn test_prompt_without_title_uses_placeholder() {
        let prompt = build_explanation_prompt("7", None, "Source: x\nContent: y\n\n");
        assert!(prompt.contains("Market Title: Unknown"));
    }
}
