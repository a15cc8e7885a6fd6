//! Integration Tests - Sync, Enrichment, and Chat Workflows
//!
//! Tests the interaction between usecases, ports, and mock adapters.
//! Uses mockall for trait mocking and tokio::test for async tests.

use std::sync::Arc;

use mockall::mock;
use serde_json::json;

use xomarket_sync_bot::config::{ChatConfig, EnrichmentConfig};
use xomarket_sync_bot::domain::{ChainMarket, MarketMetadata, MarketStatus};
use xomarket_sync_bot::ports::chat_model::{
    ChatMessage, CompletionOptions, Role, TextStream, ToolCall, ToolChoice, ToolSpec,
};
use xomarket_sync_bot::ports::market_store::{Fields, MarketFilters, StoredRow};
use xomarket_sync_bot::usecases::chat::ChatAssistant;
use xomarket_sync_bot::usecases::explainer::SourceBackedExplainer;
use xomarket_sync_bot::usecases::sync::SyncOrchestrator;

// ---- Mock Definitions ----

mock! {
    pub Source {}

    #[async_trait::async_trait]
    impl xomarket_sync_bot::ports::market_source::MarketSource for Source {
        async fn fetch_markets(&self) -> anyhow::Result<Vec<ChainMarket>>;
        async fn is_healthy(&self) -> bool;
    }
}

mock! {
    pub Store {}

    #[async_trait::async_trait]
    impl xomarket_sync_bot::ports::market_store::MarketStore for Store {
        async fn list_all(&self) -> anyhow::Result<Vec<StoredRow>>;
        async fn query_markets(&self, filters: &MarketFilters) -> anyhow::Result<Vec<StoredRow>>;
        async fn find_market(&self, market_id: &str) -> anyhow::Result<Option<StoredRow>>;
        async fn create_batch(&self, rows: &[Fields]) -> anyhow::Result<()>;
        async fn update_batch(&self, updates: &[(String, Fields)]) -> anyhow::Result<()>;
        async fn delete_batch(&self, record_ids: &[String]) -> anyhow::Result<()>;
        async fn write_sync_stamp(&self, record_id: &str, iso_timestamp: &str) -> anyhow::Result<()>;
        async fn last_synced_at(&self) -> anyhow::Result<Option<String>>;
        async fn is_healthy(&self) -> bool;
    }
}

mock! {
    pub Metadata {}

    #[async_trait::async_trait]
    impl xomarket_sync_bot::ports::enrichment::MetadataFetch for Metadata {
        async fn fetch_metadata(&self, uri: &str) -> Option<MarketMetadata>;
    }
}

mock! {
    pub Reader {}

    #[async_trait::async_trait]
    impl xomarket_sync_bot::ports::enrichment::SourceReader for Reader {
        async fn fetch_excerpt(&self, url: &str) -> Option<String>;
    }
}

mock! {
    pub Explainer {}

    #[async_trait::async_trait]
    impl xomarket_sync_bot::ports::enrichment::ResolutionExplain for Explainer {
        async fn explain<'a>(
            &self,
            market_id: &str,
            sources: &[String],
            title: Option<&'a str>,
        ) -> Option<String>;
    }
}

mock! {
    pub Model {}

    #[async_trait::async_trait]
    impl xomarket_sync_bot::ports::chat_model::ChatModel for Model {
        async fn complete(
            &self,
            prompt: &str,
            opts: CompletionOptions,
        ) -> anyhow::Result<String>;

        async fn chat(
            &self,
            messages: &[ChatMessage],
            tools: &[ToolSpec],
            choice: ToolChoice,
        ) -> anyhow::Result<ChatMessage>;

        async fn chat_stream(
            &self,
            messages: &[ChatMessage],
            tools: &[ToolSpec],
            choice: ToolChoice,
        ) -> anyhow::Result<TextStream>;
    }
}

// ---- Helpers ----

fn market(id: u32, resolved_at: u64) -> ChainMarket {
    ChainMarket {
        market_id: id.to_string(),
        creator: "0x1111111111111111111111111111111111111111".to_string(),
        resolver: "0x2222222222222222222222222222222222222222".to_string(),
        status: if resolved_at > 0 {
            MarketStatus::Resolved
        } else {
            MarketStatus::Active
        },
        winning_outcome: 0,
        outcome_count: 2,
        collateral_amount: 10.0,
        metadata_uri: String::new(),
        block_number: 1_000 + u64::from(id),
        created_at: 1_700_000_000,
        expires_at: 1_702_000_000,
        resolved_at,
        paused_at: 0,
    }
}

fn stored_row(record_id: &str, market_id: &str) -> StoredRow {
    let mut fields = Fields::new();
    fields.insert("Market ID".to_string(), json!(market_id));
    StoredRow {
        id: record_id.to_string(),
        fields,
    }
}

fn assistant_text(content: &str) -> ChatMessage {
    ChatMessage {
        role: Role::Assistant,
        content: Some(content.to_string()),
        tool_calls: Vec::new(),
        tool_call_id: None,
    }
}

fn assistant_tool_call(name: &str, arguments: &str) -> ChatMessage {
    ChatMessage {
        role: Role::Assistant,
        content: None,
        tool_calls: vec![ToolCall {
            id: "call_1".to_string(),
            name: name.to_string(),
            arguments: arguments.to_string(),
        }],
        tool_call_id: None,
    }
}

fn enrichment_config() -> EnrichmentConfig {
    EnrichmentConfig {
        metadata_timeout_seconds: 10,
        source_timeout_seconds: 15,
        max_sources: 3,
        max_source_bytes: 5_000,
        explainer_temperature: 0.1,
        explainer_max_tokens: 200,
    }
}

fn chat_config() -> ChatConfig {
    ChatConfig {
        max_tool_rounds: 1,
        default_search_limit: 10,
    }
}

const PAGE_BASE: &str = "https://alpha.xo.market";

// ---- Sync Orchestrator ----

#[tokio::test]
async fn test_fresh_sync_batches_creates_by_ten() {
    let mut source = MockSource::new();
    source
        .expect_fetch_markets()
        .returning(|| Ok((0..25).map(|i| market(i, 0)).collect()));

    let mut store = MockStore::new();
    // Once before planning, once for the sync stamp.
    store.expect_list_all().times(2).returning(|| Ok(Vec::new()));

    let mut seq = mockall::Sequence::new();
    for expected in [10usize, 10, 5] {
        store
            .expect_create_batch()
            .times(1)
            .withf(move |rows| rows.len() == expected)
            .in_sequence(&mut seq)
            .returning(|_| Ok(()));
    }
    store.expect_update_batch().times(0);
    store.expect_delete_batch().times(0);

    let mut metadata = MockMetadata::new();
    metadata.expect_fetch_metadata().returning(|_| None);

    let mut explainer = MockExplainer::new();
    explainer.expect_explain().times(0);

    let orchestrator = SyncOrchestrator::new(
        Arc::new(source),
        Arc::new(store),
        Arc::new(metadata),
        Arc::new(explainer),
    );

    let report = orchestrator.run().await.unwrap();
    assert_eq!(report.markets, 25);
    assert_eq!(report.created, 25);
    assert_eq!(report.updated, 0);
    assert_eq!(report.deleted, 0);
}

#[tokio::test]
async fn test_sync_deletes_vanished_rows_in_batches() {
    let mut source = MockSource::new();
    source.expect_fetch_markets().returning(|| Ok(Vec::new()));

    let mut store = MockStore::new();
    store
        .expect_list_all()
        .times(1)
        .returning(|| Ok((0..12).map(|i| stored_row(&format!("rec{i}"), &i.to_string())).collect()));

    let mut seq = mockall::Sequence::new();
    for expected in [10usize, 2] {
        store
            .expect_delete_batch()
            .times(1)
            .withf(move |ids| ids.len() == expected)
            .in_sequence(&mut seq)
            .returning(|_| Ok(()));
    }
    store.expect_create_batch().times(0);
    store.expect_update_batch().times(0);
    // No markets on chain: the stamp pass is skipped entirely.
    store.expect_write_sync_stamp().times(0);

    let metadata = MockMetadata::new();
    let explainer = MockExplainer::new();

    let orchestrator = SyncOrchestrator::new(
        Arc::new(source),
        Arc::new(store),
        Arc::new(metadata),
        Arc::new(explainer),
    );

    let report = orchestrator.run().await.unwrap();
    assert_eq!(report.deleted, 12);
    assert_eq!(report.created, 0);
}

#[tokio::test]
async fn test_unresolved_market_never_asks_explainer() {
    let mut source = MockSource::new();
    source
        .expect_fetch_markets()
        .returning(|| Ok(vec![market(7, 0)]));

    let mut store = MockStore::new();
    store.expect_list_all().returning(|| Ok(Vec::new()));
    store.expect_create_batch().returning(|_| Ok(()));

    // Metadata carries sources, but resolvedAt == 0 must still gate the call.
    let mut metadata = MockMetadata::new();
    metadata.expect_fetch_metadata().returning(|_| {
        Some(MarketMetadata {
            title: Some("Open market".to_string()),
            resolution_sources: vec!["https://example.com/evidence".to_string()],
            ..Default::default()
        })
    });

    let mut explainer = MockExplainer::new();
    explainer.expect_explain().times(0);

    let orchestrator = SyncOrchestrator::new(
        Arc::new(source),
        Arc::new(store),
        Arc::new(metadata),
        Arc::new(explainer),
    );

    orchestrator.run().await.unwrap();
}

#[tokio::test]
async fn test_resolved_market_without_metadata_keeps_base_fields() {
    let mut source = MockSource::new();
    source
        .expect_fetch_markets()
        .returning(|| Ok(vec![market(9, 1_701_000_000)]));

    let mut store = MockStore::new();
    store.expect_list_all().returning(|| Ok(Vec::new()));
    store
        .expect_create_batch()
        .times(1)
        .withf(|rows| {
            let fields = &rows[0];
            fields.get("Market ID") == Some(&json!("9"))
                && fields.get("Status") == Some(&json!("RESOLVED"))
                && fields.contains_key("Created Date")
                && fields.contains_key("Resolved Date")
                && !fields.contains_key("Paused Date")
                && !fields.contains_key("Title")
                && !fields.contains_key("reason_it_was_resolved")
        })
        .returning(|_| Ok(()));

    let mut metadata = MockMetadata::new();
    metadata.expect_fetch_metadata().returning(|_| None);

    // Resolved but no metadata: the explainer sees zero sources and
    // declines, so the reason column never materializes.
    let mut explainer = MockExplainer::new();
    explainer
        .expect_explain()
        .times(1)
        .withf(|_, sources, _| sources.is_empty())
        .returning(|_, _, _| None);

    let orchestrator = SyncOrchestrator::new(
        Arc::new(source),
        Arc::new(store),
        Arc::new(metadata),
        Arc::new(explainer),
    );

    orchestrator.run().await.unwrap();
}

#[tokio::test]
async fn test_store_failure_aborts_the_run() {
    let mut source = MockSource::new();
    source
        .expect_fetch_markets()
        .returning(|| Ok(vec![market(1, 0)]));

    let mut store = MockStore::new();
    store
        .expect_list_all()
        .returning(|| Err(anyhow::anyhow!("401 unauthorized")));

    let metadata = MockMetadata::new();
    let explainer = MockExplainer::new();

    let orchestrator = SyncOrchestrator::new(
        Arc::new(source),
        Arc::new(store),
        Arc::new(metadata),
        Arc::new(explainer),
    );

    let error = orchestrator.run().await.unwrap_err();
    assert!(error.to_string().contains("existing rows"));
}

// ---- Resolution Explainer ----

#[tokio::test]
async fn test_explainer_noop_without_sources() {
    let reader = MockReader::new();
    let mut model = MockModel::new();
    model.expect_complete().times(0);

    let explainer =
        SourceBackedExplainer::new(Arc::new(model), Arc::new(reader), &enrichment_config());

    assert_eq!(explainer_call(&explainer, &[]).await, None);
}

#[tokio::test]
async fn test_explainer_skips_model_when_no_source_yields_content() {
    let mut reader = MockReader::new();
    reader.expect_fetch_excerpt().times(2).returning(|_| None);

    let mut model = MockModel::new();
    model.expect_complete().times(0);

    let explainer =
        SourceBackedExplainer::new(Arc::new(model), Arc::new(reader), &enrichment_config());

    let sources = vec![
        "https://a.example".to_string(),
        "https://b.example".to_string(),
    ];
    assert_eq!(explainer_call(&explainer, &sources).await, None);
}

#[tokio::test]
async fn test_explainer_caps_fetched_sources_at_three() {
    let mut reader = MockReader::new();
    reader
        .expect_fetch_excerpt()
        .times(3)
        .returning(|_| Some("evidence".to_string()));

    let mut model = MockModel::new();
    model
        .expect_complete()
        .times(1)
        .returning(|_, _| Ok("  The market resolved YES per the cited evidence.  ".to_string()));

    let explainer =
        SourceBackedExplainer::new(Arc::new(model), Arc::new(reader), &enrichment_config());

    let sources: Vec<String> = (0..5).map(|i| format!("https://src{i}.example")).collect();
    let reason = explainer_call(&explainer, &sources).await;

    assert_eq!(
        reason.as_deref(),
        Some("The market resolved YES per the cited evidence.")
    );
}

#[tokio::test]
async fn test_explainer_prompt_embeds_sources_and_model_failure_degrades() {
    let mut reader = MockReader::new();
    reader
        .expect_fetch_excerpt()
        .returning(|_| Some("The event happened on June 1.".to_string()));

    let mut model = MockModel::new();
    model
        .expect_complete()
        .times(1)
        .withf(|prompt, opts| {
            prompt.contains("Market ID: 42")
                && prompt.contains("https://news.example")
                && prompt.contains("The event happened on June 1.")
                && (opts.temperature - 0.1).abs() < f32::EPSILON
        })
        .returning(|_, _| Err(anyhow::anyhow!("model unavailable")));

    let explainer =
        SourceBackedExplainer::new(Arc::new(model), Arc::new(reader), &enrichment_config());

    let sources = vec!["https://news.example".to_string()];
    assert_eq!(explainer_call(&explainer, &sources).await, None);
}

async fn explainer_call(explainer: &SourceBackedExplainer, sources: &[String]) -> Option<String> {
    use xomarket_sync_bot::ports::enrichment::ResolutionExplain;
    explainer.explain("42", sources, Some("Test market")).await
}

// ---- Chat Assistant ----

#[tokio::test]
async fn test_quick_actions_are_independent_of_model_output() {
    let mut model = MockModel::new();
    model
        .expect_chat()
        .times(1)
        .returning(|_, _, _| Ok(assistant_text("I could not find that market.")));

    let store = MockStore::new();

    let assistant = ChatAssistant::new(
        Arc::new(model),
        Arc::new(store),
        PAGE_BASE.to_string(),
        &chat_config(),
    );

    let outcome = assistant.respond("has market 42 resolved?").await.unwrap();

    assert_eq!(outcome.response, "I could not find that market.");
    assert_eq!(outcome.quick_actions.len(), 1);
    assert_eq!(outcome.quick_actions[0].market_id, "42");
    assert!(outcome.quick_actions[0].market_url.ends_with("/markets/42"));
}

#[tokio::test]
async fn test_one_tool_round_then_forced_final_answer() {
    let mut model = MockModel::new();

    // Round 1: the model asks for a search.
    model
        .expect_chat()
        .times(1)
        .withf(|_, _, choice| *choice == ToolChoice::Auto)
        .returning(|_, _, _| {
            Ok(assistant_tool_call("search_markets", r#"{"search":"42"}"#))
        });

    // Round 2: tools are disallowed; a misbehaving tool-call reply must
    // not trigger another round.
    model
        .expect_chat()
        .times(1)
        .withf(|messages, _, choice| {
            *choice == ToolChoice::None
                && messages
                    .iter()
                    .any(|m| m.role == Role::Tool && m.content.as_deref().is_some_and(|c| c.contains("count")))
        })
        .returning(|_, _, _| Ok(assistant_tool_call("search_markets", "{}")));

    let mut store = MockStore::new();
    store
        .expect_query_markets()
        .times(1)
        .withf(|filters| filters.search.as_deref() == Some("42"))
        .returning(|_| Ok(Vec::new()));

    let assistant = ChatAssistant::new(
        Arc::new(model),
        Arc::new(store),
        PAGE_BASE.to_string(),
        &chat_config(),
    );

    let outcome = assistant.respond("tell me about market 42").await.unwrap();
    assert_eq!(outcome.response, "No response generated");
}

#[tokio::test]
async fn test_store_errors_reach_the_model_as_error_json() {
    let mut model = MockModel::new();

    model
        .expect_chat()
        .times(1)
        .withf(|_, _, choice| *choice == ToolChoice::Auto)
        .returning(|_, _, _| Ok(assistant_tool_call("search_markets", "{}")));

    model
        .expect_chat()
        .times(1)
        .withf(|messages, _, _| {
            messages.iter().any(|m| {
                m.role == Role::Tool
                    && m.content.as_deref().is_some_and(|c| c.contains("store down"))
            })
        })
        .returning(|_, _, _| Ok(assistant_text("The data source is unavailable right now.")));

    let mut store = MockStore::new();
    store
        .expect_query_markets()
        .returning(|_| Err(anyhow::anyhow!("store down")));

    let assistant = ChatAssistant::new(
        Arc::new(model),
        Arc::new(store),
        PAGE_BASE.to_string(),
        &chat_config(),
    );

    let outcome = assistant.respond("any markets about btc?").await.unwrap();
    assert_eq!(outcome.response, "The data source is unavailable right now.");
}

#[tokio::test]
async fn test_model_failure_propagates_from_respond() {
    let mut model = MockModel::new();
    model
        .expect_chat()
        .returning(|_, _, _| Err(anyhow::anyhow!("429 too many requests")));

    let store = MockStore::new();

    let assistant = ChatAssistant::new(
        Arc::new(model),
        Arc::new(store),
        PAGE_BASE.to_string(),
        &chat_config(),
    );

    assert!(assistant.respond("hello").await.is_err());
}

// ---- API Error Shapes ----

#[test]
fn test_unknown_market_maps_to_404_error_json() {
    use axum::response::IntoResponse;
    use xomarket_sync_bot::api::ApiError;

    let response = ApiError::MarketNotFound("42".to_string()).into_response();
    assert_eq!(response.status(), axum::http::StatusCode::NOT_FOUND);

    let response = ApiError::EmptyMessage.into_response();
    assert_eq!(response.status(), axum::http::StatusCode::BAD_REQUEST);
}
