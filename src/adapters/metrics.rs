//! Prometheus Metrics Registry - API Observability
//!
//! Registers and exposes Prometheus metrics for the chat/market API.
//! Rendered at `GET /metrics` by the router.

use anyhow::Result;
use prometheus::{Encoder, IntCounter, IntCounterVec, Opts, Registry, TextEncoder};

/// Centralized Prometheus metrics for the API server.
///
/// All metrics follow the naming convention `xomarket_bot_*`.
pub struct MetricsRegistry {
    /// Prometheus registry.
    registry: Registry,
    /// HTTP requests by endpoint (chat, chat_stream, markets, ...).
    pub http_requests: IntCounterVec,
    /// Quick actions attached to chat responses.
    pub quick_actions_emitted: IntCounter,
}

impl MetricsRegistry {
    /// Create and register all Prometheus metrics.
    pub fn new() -> Result<Self> {
        let registry = Registry::new();

        let http_requests = IntCounterVec::new(
            Opts::new("xomarket_bot_http_requests_total", "API requests"),
            &["endpoint"],
        )?;

        let quick_actions_emitted = IntCounter::new(
            "xomarket_bot_quick_actions_total",
            "Quick actions attached to chat responses",
        )?;

        registry.register(Box::new(http_requests.clone()))?;
        registry.register(Box::new(quick_actions_emitted.clone()))?;

        Ok(Self {
            registry,
            http_requests,
            quick_actions_emitted,
        })
    }

    /// Count one request against an endpoint label.
    pub fn count_request(&self, endpoint: &str) {
        self.http_requests.with_label_values(&[endpoint]).inc();
    }

    /// Render the registry in Prometheus text exposition format.
    pub fn render(&self) -> String {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        if encoder.encode(&self.registry.gather(), &mut buffer).is_err() {
            return String::new();
        }
        String::from_utf8(buffer).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_register_and_render() {
        let metrics = MetricsRegistry::new().unwrap();
        metrics.count_request("chat");
        metrics.quick_actions_emitted.inc();

        let rendered = metrics.render();
        assert!(rendered.contains("xomarket_bot_http_requests_total"));
        assert!(rendered.contains("xomarket_bot_quick_actions_total"));
    }
}
