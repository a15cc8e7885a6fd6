//! Chat Model Port - Hosted LLM Interface
//!
//! Provider-neutral view of a chat-completions API with optional tool
//! calling and token streaming. The adapter owns the wire format; the
//! usecases layer only sees these types.

use std::pin::Pin;
use std::task::{Context, Poll};

use async_trait::async_trait;
use futures_util::Stream;
use tokio::sync::mpsc;

/// Message author role.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    System,
    User,
    Assistant,
    Tool,
}

/// One conversation message.
#[derive(Debug, Clone)]
pub struct ChatMessage {
    pub role: Role,
    /// Text content; assistant turns that only call tools carry `None`.
    pub content: Option<String>,
    /// Tool invocations requested by an assistant turn.
    pub tool_calls: Vec<ToolCall>,
    /// For `Role::Tool` messages: the call this result answers.
    pub tool_call_id: Option<String>,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: Some(content.into()),
            tool_calls: Vec::new(),
            tool_call_id: None,
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: Some(content.into()),
            tool_calls: Vec::new(),
            tool_call_id: None,
        }
    }

    pub fn tool_result(call_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: Role::Tool,
            content: Some(content.into()),
            tool_calls: Vec::new(),
            tool_call_id: Some(call_id.into()),
        }
    }

    /// Whether this turn requests at least one tool invocation.
    pub fn wants_tools(&self) -> bool {
        !self.tool_calls.is_empty()
    }
}

/// A tool invocation requested by the model.
#[derive(Debug, Clone)]
pub struct ToolCall {
    /// Provider-assigned call id, echoed back with the result.
    pub id: String,
    /// Tool name from the catalog.
    pub name: String,
    /// JSON-encoded arguments, exactly as the model produced them.
    pub arguments: String,
}

/// One callable tool offered to the model.
#[derive(Debug, Clone)]
pub struct ToolSpec {
    pub name: String,
    pub description: String,
    /// JSON Schema for the arguments object.
    pub parameters: serde_json::Value,
}

/// Tool-selection policy for one model call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolChoice {
    /// The model decides whether to call tools.
    Auto,
    /// Tool calls are disallowed; the model must answer in text.
    None,
}

/// Sampling options for one-shot completions.
#[derive(Debug, Clone, Copy)]
pub struct CompletionOptions {
    pub temperature: f32,
    pub max_tokens: u32,
}

/// Stream of text chunks from a streaming model call.
///
/// Backed by a channel the adapter's relay task feeds; dropping the
/// stream drops the receiver and lets the relay wind down.
pub struct TextStream {
    rx: mpsc::Receiver<anyhow::Result<String>>,
}

impl TextStream {
    pub fn new(rx: mpsc::Receiver<anyhow::Result<String>>) -> Self {
        Self { rx }
    }
}

impl Stream for TextStream {
    type Item = anyhow::Result<String>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.rx.poll_recv(cx)
    }
}

/// Trait for hosted chat-completion models.
#[async_trait]
pub trait ChatModel: Send + Sync + 'static {
    /// One-shot prompt → text completion.
    async fn complete(&self, prompt: &str, opts: CompletionOptions) -> anyhow::Result<String>;

    /// One conversational turn, with tools on offer.
    async fn chat(
        &self,
        messages: &[ChatMessage],
        tools: &[ToolSpec],
        choice: ToolChoice,
    ) -> anyhow::Result<ChatMessage>;

    /// One conversational turn, streamed as text chunks.
    ///
    /// Only meaningful with `ToolChoice::None`; callers resolve tool
    /// rounds with [`ChatModel::chat`] first.
    async fn chat_stream(
        &self,
        messages: &[ChatMessage],
        tools: &[ToolSpec],
        choice: ToolChoice,
    ) -> anyhow::Result<TextStream>;
}
