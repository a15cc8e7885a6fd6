//! API Routes - Chat and Market Endpoints
//!
//! Endpoints:
//! - `POST /chat` — one assistant turn, JSON response with quick actions
//! - `POST /chat/stream` — same turn, chunked plain-text token stream
//! - `GET /markets` — filtered market listing
//! - `GET /markets/:id` — one market, 404 when unknown
//! - `GET /sync-status` — last sync stamp + staleness verdict
//! - `GET /metrics` — Prometheus exposition
//! - `GET /`, `GET /health` — banner and liveness

use std::sync::Arc;

use axum::body::{Body, Bytes};
use axum::extract::{Path, Query, State};
use axum::http::header;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{DateTime, SecondsFormat, Utc};
use futures_util::StreamExt;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::adapters::metrics::MetricsRegistry;
use crate::domain::QuickAction;
use crate::ports::market_store::{MarketFilters, MarketStore};
use crate::usecases::chat::{market_detail, market_summary, ChatAssistant};

use super::error::ApiError;

/// Shared handler state.
#[derive(Clone)]
pub struct ApiState {
    pub assistant: Arc<ChatAssistant>,
    pub store: Arc<dyn MarketStore>,
    pub metrics: Arc<MetricsRegistry>,
    pub service_name: String,
    /// Hours after which the last sync counts as stale.
    pub stale_after_hours: f64,
}

/// Build the API router.
pub fn router(state: ApiState) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .route("/chat", post(chat))
        .route("/chat/stream", post(chat_stream))
        .route("/markets", get(markets))
        .route("/markets/:id", get(market_by_id))
        .route("/sync-status", get(sync_status))
        .route("/metrics", get(metrics))
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Request/response types
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub response: String,
    pub timestamp: String,
    #[serde(rename = "quickActions", skip_serializing_if = "Option::is_none")]
    pub quick_actions: Option<Vec<QuickAction>>,
}

#[derive(Debug, Serialize)]
pub struct SyncStatusResponse {
    #[serde(rename = "lastSyncedAt")]
    pub last_synced_at: Option<String>,
    #[serde(rename = "isStale")]
    pub is_stale: bool,
    #[serde(rename = "hoursAgo")]
    pub hours_ago: Option<f64>,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

async fn root(State(state): State<ApiState>) -> Json<serde_json::Value> {
    Json(json!({
        "message": format!("{} API", state.service_name),
        "status": "running",
        "timestamp": now_iso(),
    }))
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

async fn chat(
    State(state): State<ApiState>,
    Json(request): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, ApiError> {
    if request.message.trim().is_empty() {
        return Err(ApiError::EmptyMessage);
    }

    state.metrics.count_request("chat");

    let outcome = state.assistant.respond(&request.message).await?;
    state
        .metrics
        .quick_actions_emitted
        .inc_by(outcome.quick_actions.len() as u64);

    Ok(Json(ChatResponse {
        response: outcome.response,
        timestamp: now_iso(),
        quick_actions: (!outcome.quick_actions.is_empty()).then_some(outcome.quick_actions),
    }))
}

async fn chat_stream(
    State(state): State<ApiState>,
    Json(request): Json<ChatRequest>,
) -> Result<Response, ApiError> {
    if request.message.trim().is_empty() {
        return Err(ApiError::EmptyMessage);
    }

    state.metrics.count_request("chat_stream");

    let stream = state.assistant.respond_stream(&request.message).await?;

    let body = Body::from_stream(
        stream.map(|chunk| chunk.map(Bytes::from).map_err(axum::BoxError::from)),
    );

    Ok((
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        body,
    )
        .into_response())
}

async fn markets(
    State(state): State<ApiState>,
    Query(mut filters): Query<MarketFilters>,
) -> Result<Json<serde_json::Value>, ApiError> {
    state.metrics.count_request("markets");
    filters.limit = filters.limit.map(|limit| limit.clamp(1, 100));

    let rows = state.store.query_markets(&filters).await?;
    let summaries: Vec<serde_json::Value> = rows.iter().map(market_summary).collect();

    Ok(Json(json!({
        "markets": summaries,
        "count": summaries.len(),
    })))
}

async fn market_by_id(
    State(state): State<ApiState>,
    Path(market_id): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError> {
    state.metrics.count_request("market_detail");

    match state.store.find_market(&market_id).await? {
        Some(row) => Ok(Json(json!({ "market": market_detail(&row) }))),
        None => Err(ApiError::MarketNotFound(market_id)),
    }
}

async fn sync_status(
    State(state): State<ApiState>,
) -> Result<Json<SyncStatusResponse>, ApiError> {
    state.metrics.count_request("sync_status");

    let stamp = state.store.last_synced_at().await?;

    let hours_ago = stamp
        .as_deref()
        .and_then(|raw| DateTime::parse_from_rfc3339(raw).ok())
        .map(|parsed| {
            let elapsed = Utc::now().signed_duration_since(parsed.with_timezone(&Utc));
            (elapsed.num_seconds() as f64 / 3600.0 * 100.0).round() / 100.0
        });

    // Never synced (or an unparsable stamp) counts as stale.
    let is_stale = hours_ago.is_none_or(|hours| hours > state.stale_after_hours);

    Ok(Json(SyncStatusResponse {
        last_synced_at: stamp,
        is_stale,
        hours_ago,
    }))
}

async fn metrics(State(state): State<ApiState>) -> Response {
    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
        .into_response()
}

fn now_iso() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}
