//! Chat Assistant - Bounded Tool-calling Loop
//!
//! One stateless conversational turn: the user's message goes to the
//! model with a fixed system prompt and a four-tool catalog; any tool
//! calls run against the table store; the model's follow-up answer is
//! returned together with deterministically derived quick actions.
//!
//! The loop is an explicit state machine (`AwaitingModel` →
//! `ExecutingTools` → `Done`) bounded by `max_tool_rounds`; once the
//! budget is spent the model is called with tools disallowed, which
//! forces a final text answer instead of open-ended recursion.

use std::sync::Arc;

use anyhow::Result;
use serde_json::{json, Value};
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::config::ChatConfig;
use crate::domain::{detect_market_ids, QuickAction};
use crate::ports::chat_model::{
    ChatMessage, ChatModel, TextStream, ToolCall, ToolChoice, ToolSpec,
};
use crate::ports::market_store::{MarketFilters, MarketStore, StoredRow};

/// Fallback answer when the model returns empty content.
const EMPTY_RESPONSE_FALLBACK: &str = "No response generated";

/// One finished chat turn.
#[derive(Debug, Clone)]
pub struct ChatOutcome {
    /// The model's final text answer.
    pub response: String,
    /// Quick actions derived from the user's message, model-independent.
    pub quick_actions: Vec<QuickAction>,
}

/// Phases of one chat turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TurnPhase {
    /// Waiting for the model's next message.
    AwaitingModel,
    /// Running the tool calls the model just requested.
    ExecutingTools,
    /// Final answer produced.
    Done,
}

/// Stateless chat assistant over the market table.
pub struct ChatAssistant {
    model: Arc<dyn ChatModel>,
    store: Arc<dyn MarketStore>,
    /// Base URL for quick-action market pages.
    page_base_url: String,
    /// Tool rounds allowed before the model must answer.
    max_tool_rounds: usize,
    /// Row cap for search tools without an explicit limit.
    default_search_limit: usize,
}

impl ChatAssistant {
    pub fn new(
        model: Arc<dyn ChatModel>,
        store: Arc<dyn MarketStore>,
        page_base_url: String,
        config: &ChatConfig,
    ) -> Self {
        Self {
            model,
            store,
            page_base_url,
            max_tool_rounds: config.max_tool_rounds,
            default_search_limit: config.default_search_limit,
        }
    }

    /// Answer one user message.
    pub async fn respond(&self, user_message: &str) -> Result<ChatOutcome> {
        let detected = detect_market_ids(user_message);
        let quick_actions: Vec<QuickAction> = detected
            .iter()
            .map(|id| QuickAction::show_market(id, &self.page_base_url))
            .collect();

        let tools = tool_catalog();
        let mut messages = vec![
            ChatMessage::system(system_prompt(&detected)),
            ChatMessage::user(user_message),
        ];

        let mut phase = TurnPhase::AwaitingModel;
        let mut rounds = 0;
        let mut response = String::new();

        while phase != TurnPhase::Done {
            match phase {
                TurnPhase::AwaitingModel => {
                    let choice = if rounds < self.max_tool_rounds {
                        ToolChoice::Auto
                    } else {
                        ToolChoice::None
                    };

                    let turn = self.model.chat(&messages, &tools, choice).await?;

                    if turn.wants_tools() && rounds < self.max_tool_rounds {
                        messages.push(turn);
                        phase = TurnPhase::ExecutingTools;
                    } else {
                        response = turn
                            .content
                            .filter(|text| !text.trim().is_empty())
                            .unwrap_or_else(|| EMPTY_RESPONSE_FALLBACK.to_string());
                        phase = TurnPhase::Done;
                    }
                }
                TurnPhase::ExecutingTools => {
                    let calls = messages
                        .last()
                        .map(|message| message.tool_calls.clone())
                        .unwrap_or_default();

                    for call in calls {
                        let result = self.execute_tool(&call).await;
                        messages.push(ChatMessage::tool_result(call.id, result.to_string()));
                    }

                    rounds += 1;
                    phase = TurnPhase::AwaitingModel;
                }
                TurnPhase::Done => {}
            }
        }

        Ok(ChatOutcome {
            response,
            quick_actions,
        })
    }

    /// Answer one user message as a text-chunk stream.
    ///
    /// Tool rounds resolve through regular calls first; the final
    /// answer is then streamed with tools disallowed. A turn that needs
    /// no tools streams the already-produced answer as one chunk.
    pub async fn respond_stream(&self, user_message: &str) -> Result<TextStream> {
        let detected = detect_market_ids(user_message);
        let tools = tool_catalog();
        let mut messages = vec![
            ChatMessage::system(system_prompt(&detected)),
            ChatMessage::user(user_message),
        ];

        let mut rounds = 0;
        while rounds < self.max_tool_rounds {
            let turn = self.model.chat(&messages, &tools, ToolChoice::Auto).await?;

            if !turn.wants_tools() {
                // No tools wanted: relay the answer we already have.
                let content = turn
                    .content
                    .filter(|text| !text.trim().is_empty())
                    .unwrap_or_else(|| EMPTY_RESPONSE_FALLBACK.to_string());

                let (tx, rx) = mpsc::channel(1);
                let _ = tx.send(Ok(content)).await;
                return Ok(TextStream::new(rx));
            }

            let calls = turn.tool_calls.clone();
            messages.push(turn);

            for call in calls {
                let result = self.execute_tool(&call).await;
                messages.push(ChatMessage::tool_result(call.id, result.to_string()));
            }

            rounds += 1;
        }

        // Tool results are in; stream the forced final answer.
        self.model
            .chat_stream(&messages, &tools, ToolChoice::None)
            .await
    }

    /// Execute one tool call against the store.
    ///
    /// Never fails: store errors come back as `{"error": message}` so
    /// the model can report them instead of the request dying.
    async fn execute_tool(&self, call: &ToolCall) -> Value {
        let args: Value = serde_json::from_str(&call.arguments).unwrap_or_else(|e| {
            debug!(tool = %call.name, error = %e, "Unparsable tool arguments");
            json!({})
        });

        match call.name.as_str() {
            "search_markets" => {
                let filters = MarketFilters {
                    status: args["status"].as_str().map(str::to_string),
                    category: args["category"].as_str().map(str::to_string),
                    search: args["search"].as_str().map(str::to_string),
                    limit: Some(
                        args["limit"]
                            .as_u64()
                            .map_or(self.default_search_limit, |n| n as usize),
                    ),
                };

                match self.store.query_markets(&filters).await {
                    Ok(rows) => {
                        let markets: Vec<Value> = rows.iter().map(market_summary).collect();
                        json!({ "markets": markets, "count": markets.len() })
                    }
                    Err(e) => tool_error(&call.name, &e),
                }
            }
            "get_market_details" => {
                let Some(market_id) = args["marketId"].as_str() else {
                    return json!({ "error": "marketId is required" });
                };

                match self.store.find_market(market_id).await {
                    Ok(Some(row)) => json!({ "market": market_detail(&row) }),
                    Ok(None) => {
                        json!({ "error": format!("Market with ID {market_id} not found") })
                    }
                    Err(e) => tool_error(&call.name, &e),
                }
            }
            "list_market_titles" => match self.store.list_all().await {
                Ok(rows) => {
                    let titles: Vec<Value> = rows
                        .iter()
                        .filter_map(|row| {
                            row.market_id().map(|id| {
                                json!({
                                    "marketId": id,
                                    "title": row.text("Title").unwrap_or("No title"),
                                })
                            })
                        })
                        .collect();
                    json!({ "titles": titles, "count": titles.len() })
                }
                Err(e) => tool_error(&call.name, &e),
            },
            "get_resolution_reason" => {
                let Some(market_id) = args["marketId"].as_str() else {
                    return json!({ "error": "marketId is required" });
                };

                match self.store.find_market(market_id).await {
                    Ok(Some(row)) => match row.text("reason_it_was_resolved") {
                        Some(reason) => json!({ "marketId": market_id, "reason": reason }),
                        None => json!({
                            "error": format!("No resolution reason recorded for market {market_id}")
                        }),
                    },
                    Ok(None) => {
                        json!({ "error": format!("Market with ID {market_id} not found") })
                    }
                    Err(e) => tool_error(&call.name, &e),
                }
            }
            other => json!({ "error": format!("Unknown tool: {other}") }),
        }
    }
}

fn tool_error(tool: &str, error: &anyhow::Error) -> Value {
    warn!(tool, error = %error, "Tool execution failed");
    json!({ "error": error.to_string() })
}

/// The fixed system prompt, with detected market ids called out.
fn system_prompt(detected_ids: &[String]) -> String {
    let id_hint = if detected_ids.is_empty() {
        String::new()
    } else {
        format!(" (detected in this message: {})", detected_ids.join(", "))
    };

    format!(
        "You are a helpful assistant that provides information about prediction markets.\n\n\
         CRITICAL RULE: When users ask about ANY market, you MUST ALWAYS call the \
         search_markets function first with a search parameter before giving any response.\n\n\
         For questions like \"Has Market X resolved?\":\n\
         1. IMMEDIATELY call search_markets with search: \"Market X\" (and also try search: \"X\" if the first search fails)\n\
         2. NEVER respond without searching first\n\
         3. If you find markets, provide the status directly\n\
         4. Only say you can't find anything AFTER you've actually searched\n\n\
         SPECIAL: If a specific Market ID is detected in the user message{id_hint}, \
         prioritize using get_market_details with that exact ID.\n\n\
         You MUST use tools for every market-related question. Do not give responses \
         without searching first."
    )
}

/// The fixed tool catalog offered to the model.
fn tool_catalog() -> Vec<ToolSpec> {
    vec![
        ToolSpec {
            name: "search_markets".to_string(),
            description: "Get prediction markets. Can filter by status, category, \
                          or search in titles/descriptions."
                .to_string(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "status": {
                        "type": "string",
                        "description": "Filter by market status: PENDING, ACTIVE, RESOLVED, PAUSED",
                    },
                    "category": {
                        "type": "string",
                        "description": "Filter by market category",
                    },
                    "search": {
                        "type": "string",
                        "description": "Search term to find in market titles or descriptions",
                    },
                    "limit": {
                        "type": "number",
                        "description": "Maximum number of markets to return (default: 10)",
                    },
                },
                "required": [],
            }),
        },
        ToolSpec {
            name: "get_market_details".to_string(),
            description: "Get detailed information about a specific market by its ID."
                .to_string(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "marketId": {
                        "type": "string",
                        "description": "The Market ID to get details for",
                    },
                },
                "required": ["marketId"],
            }),
        },
        ToolSpec {
            name: "list_market_titles".to_string(),
            description: "List the titles of all known markets with their IDs.".to_string(),
            parameters: json!({
                "type": "object",
                "properties": {},
                "required": [],
            }),
        },
        ToolSpec {
            name: "get_resolution_reason".to_string(),
            description: "Get the recorded explanation of why a resolved market \
                          resolved the way it did."
                .to_string(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "marketId": {
                        "type": "string",
                        "description": "The Market ID to get the resolution reason for",
                    },
                },
                "required": ["marketId"],
            }),
        },
    ]
}

/// Compact row view for search results and `GET /markets`.
pub fn market_summary(row: &StoredRow) -> Value {
    json!({
        "marketId": row.fields.get("Market ID"),
        "title": row.text("Title").unwrap_or("No title"),
        "description": row.text("Description").unwrap_or("No description"),
        "status": row.fields.get("Status"),
        "category": row.text("Category").unwrap_or("Uncategorized"),
        "creator": row.fields.get("Creator"),
        "collateralAmount": row.fields.get("Collateral Amount"),
        "createdDate": row.fields.get("Created Date"),
        "expiresDate": row.fields.get("Expires Date"),
        "resolvedDate": row.fields.get("Resolved Date"),
        "outcomes": row.fields.get("Outcomes"),
        "tags": row.fields.get("Tags"),
    })
}

/// Full row view for `get_market_details` and `GET /markets/:id`.
pub fn market_detail(row: &StoredRow) -> Value {
    json!({
        "marketId": row.fields.get("Market ID"),
        "title": row.fields.get("Title"),
        "description": row.fields.get("Description"),
        "status": row.fields.get("Status"),
        "category": row.fields.get("Category"),
        "creator": row.fields.get("Creator"),
        "resolver": row.fields.get("Resolver"),
        "collateralAmount": row.fields.get("Collateral Amount"),
        "outcomeCount": row.fields.get("Outcome Count"),
        "createdDate": row.fields.get("Created Date"),
        "expiresDate": row.fields.get("Expires Date"),
        "resolvedDate": row.fields.get("Resolved Date"),
        "pausedDate": row.fields.get("Paused Date"),
        "outcomes": row.fields.get("Outcomes"),
        "tags": row.fields.get("Tags"),
        "imageUrl": row.fields.get("Image URL"),
        "rulesDescription": row.fields.get("Rules Description"),
        "resolutionSources": row.fields.get("Resolution Sources"),
        "metadataUri": row.fields.get("Metadata URI"),
        "blockNumber": row.fields.get("Block Number"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_system_prompt_mentions_detected_ids() {
        let prompt = system_prompt(&["42".to_string(), "7".to_string()]);
        assert!(prompt.contains("detected in this message: 42, 7"));

        let bare = system_prompt(&[]);
        assert!(!bare.contains("detected in this message"));
        assert!(bare.contains("search_markets"));
    }

    #[test]
    fn test_tool_catalog_shape() {
        let tools = tool_catalog();
        let names: Vec<&str> = tools.iter().map(|t| t.name.as_str()).collect();

        assert_eq!(
            names,
            vec![
                "search_markets",
                "get_market_details",
                "list_market_titles",
                "get_resolution_reason"
            ]
        );
        assert_eq!(tools[1].parameters["required"][0], "marketId");
    }

    #[test]
    fn test_market_summary_defaults() {
        let row = StoredRow::default();
        let summary = market_summary(&row);

        assert_eq!(summary["title"], "No title");
        assert_eq!(summary["category"], "Uncategorized");
        assert_eq!(summary["marketId"], Value::Null);
    }
}
