//! Chat-completions Wire Types
//!
//! Request/response shapes for the hosted LLM API, plus conversions
//! from the provider-neutral port types.

use serde::{Deserialize, Serialize};

use crate::ports::chat_model::{ChatMessage, Role, ToolCall, ToolSpec};

/// Chat-completions request body.
#[derive(Debug, Serialize)]
pub struct ChatCompletionRequest {
  pub model: String,
  pub messages: Vec<WireMessage>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub tools: Option<Vec<WireTool>>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub tool_choice: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub temperature: Option<f32>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub max_tokens: Option<u32>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub stream: Option<bool>,
}

/// One message on the wire.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WireMessage {
  pub role: String,
  #[serde(default)]
  pub content: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub tool_calls: Option<Vec<WireToolCall>>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub tool_call_id: Option<String>,
}

/// One tool invocation on the wire.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WireToolCall {
  pub id: String,
  #[serde(rename = "type")]
  pub kind: String,
  pub function: WireFunctionCall,
}

/// Function name + raw JSON arguments.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WireFunctionCall {
  pub name: String,
  pub arguments: String,
}

/// One tool definition on the wire.
#[derive(Debug, Clone, Serialize)]
pub struct WireTool {
  #[serde(rename = "type")]
  pub kind: String,
  pub function: WireFunctionDef,
}

/// Function schema offered to the model.
#[derive(Debug, Clone, Serialize)]
pub struct WireFunctionDef {
  pub name: String,
  pub description: String,
  pub parameters: serde_json::Value,
}

/// Chat-completions response body.
#[derive(Debug, Deserialize)]
pub struct ChatCompletionResponse {
  pub choices: Vec<Choice>,
}

/// One completion choice.
#[derive(Debug, Deserialize)]
pub struct Choice {
  pub message: WireMessage,
}

/// One SSE chunk of a streamed completion.
#[derive(Debug, Deserialize)]
pub struct StreamChunk {
  #[serde(default)]
  pub choices: Vec<StreamChoice>,
}

/// One choice inside a stream chunk.
#[derive(Debug, Deserialize)]
pub struct StreamChoice {
  pub delta: StreamDelta,
}

/// Incremental content delta.
#[derive(Debug, Default, Deserialize)]
pub struct StreamDelta {
  #[serde(default)]
  pub content: Option<String>,
}

fn role_name(role: Role) -> &'static str {
  match role {
    Role::System => "system",
    Role::User => "user",
    Role::Assistant => "assistant",
    Role::Tool => "tool",
  }
}

fn parse_role(role: &str) -> Role {
  match role {
    "system" => Role::System,
    "user" => Role::User,
    "tool" => Role::Tool,
    _ => Role::Assistant,
  }
}

impl From<&ChatMessage> for WireMessage {
  fn from(message: &ChatMessage) -> Self {
    let tool_calls = (!message.tool_calls.is_empty()).then(|| {
      message
        .tool_calls
        .iter()
        .map(|call| WireToolCall {
          id: call.id.clone(),
          kind: "function".to_string(),
          function: WireFunctionCall {
            name: call.name.clone(),
            arguments: call.arguments.clone(),
          },
        })
        .collect()
    });

    Self {
      role: role_name(message.role).to_string(),
      content: message.content.clone(),
      tool_calls,
      tool_call_id: message.tool_call_id.clone(),
    }
  }
}

impl From<WireMessage> for ChatMessage {
  fn from(message: WireMessage) -> Self {
    let tool_calls = message
      .tool_calls
      .unwrap_or_default()
      .into_iter()
      .map(|call| ToolCall {
        id: call.id,
        name: call.function.name,
        arguments: call.function.arguments,
      })
      .collect();

    Self {
      role: parse_role(&message.role),
      content: message.content,
      tool_calls,
      tool_call_id: message.tool_call_id,
    }
  }
}

impl From<&ToolSpec> for WireTool {
  fn from(spec: &ToolSpec) -> Self {
    Self {
      kind: "function".to_string(),
      function: WireFunctionDef {
        name: spec.name.clone(),
        description: spec.description.clone(),
        parameters: spec.parameters.clone(),
      },
    }
  }
}
