//! Hosted LLM Client - Chat Completions over HTTP
//!
//! Implements the `ChatModel` port against an OpenAI-compatible
//! endpoint. The API key comes from `OPENAI_API_KEY`; endpoints and
//! model names come from config. LLM calls carry no client timeout and
//! are never retried — callers either degrade (enrichment) or surface
//! the error (chat API).

use anyhow::{Context, Result};
use async_trait::async_trait;
use futures_util::StreamExt;
use reqwest::Client;
use tokio::sync::mpsc;
use tracing::debug;

use crate::config::LlmConfig;
use crate::ports::chat_model::{
  ChatMessage, ChatModel, CompletionOptions, TextStream, ToolChoice, ToolSpec,
};

use super::types::{
  ChatCompletionRequest, ChatCompletionResponse, StreamChunk, WireMessage, WireTool,
};

/// Chat-completions client for one provider endpoint.
pub struct OpenAiClient {
  http: Client,
  base_url: String,
  api_key: String,
  chat_model: String,
  completion_model: String,
}

impl OpenAiClient {
  /// Build a client from config, reading the key from `OPENAI_API_KEY`.
  pub fn from_env(config: &LlmConfig) -> Result<Self> {
    let api_key =
      std::env::var("OPENAI_API_KEY").context("OPENAI_API_KEY not set")?;

    // No .timeout(): model calls are allowed to run long.
    let http = Client::builder()
      .build()
      .context("Failed to build HTTP client")?;

    Ok(Self {
      http,
      base_url: config.base_url.trim_end_matches('/').to_string(),
      api_key,
      chat_model: config.chat_model.clone(),
      completion_model: config.completion_model.clone(),
    })
  }

  fn endpoint(&self) -> String {
    format!("{}/chat/completions", self.base_url)
  }

  fn choice_name(choice: ToolChoice) -> &'static str {
    match choice {
      ToolChoice::Auto => "auto",
      ToolChoice::None => "none",
    }
  }

  /// Send a non-streaming request and parse the first choice.
  async fn send(&self, request: &ChatCompletionRequest) -> Result<WireMessage> {
    let response = self
      .http
      .post(self.endpoint())
      .bearer_auth(&self.api_key)
      .json(request)
      .send()
      .await
      .context("Chat-completions request failed")?;

    let status = response.status();
    if !status.is_success() {
      let body = response.text().await.unwrap_or_default();
      anyhow::bail!("Chat-completions error {status}: {body}");
    }

    let parsed: ChatCompletionResponse = response
      .json()
      .await
      .context("Failed to parse chat-completions response")?;

    parsed
      .choices
      .into_iter()
      .next()
      .map(|choice| choice.message)
      .context("Chat-completions response had no choices")
  }
}

#[async_trait]
impl ChatModel for OpenAiClient {
  async fn complete(&self, prompt: &str, opts: CompletionOptions) -> Result<String> {
    let request = ChatCompletionRequest {
      model: self.completion_model.clone(),
      messages: vec![WireMessage {
        role: "user".to_string(),
        content: Some(prompt.to_string()),
        tool_calls: None,
        tool_call_id: None,
      }],
      tools: None,
      tool_choice: None,
      temperature: Some(opts.temperature),
      max_tokens: Some(opts.max_tokens),
      stream: None,
    };

    let message = self.send(&request).await?;
    Ok(message.content.unwrap_or_default())
  }

  async fn chat(
    &self,
    messages: &[ChatMessage],
    tools: &[ToolSpec],
    choice: ToolChoice,
  ) -> Result<ChatMessage> {
    let request = ChatCompletionRequest {
      model: self.chat_model.clone(),
      messages: messages.iter().map(WireMessage::from).collect(),
      tools: (!tools.is_empty()).then(|| tools.iter().map(WireTool::from).collect()),
      tool_choice: (!tools.is_empty())
        .then(|| Self::choice_name(choice).to_string()),
      temperature: None,
      max_tokens: None,
      stream: None,
    };

    let message = self.send(&request).await?;
    Ok(message.into())
  }

  async fn chat_stream(
    &self,
    messages: &[ChatMessage],
    tools: &[ToolSpec],
    choice: ToolChoice,
  ) -> Result<TextStream> {
    let request = ChatCompletionRequest {
      model: self.chat_model.clone(),
      messages: messages.iter().map(WireMessage::from).collect(),
      tools: (!tools.is_empty()).then(|| tools.iter().map(WireTool::from).collect()),
      tool_choice: (!tools.is_empty())
        .then(|| Self::choice_name(choice).to_string()),
      temperature: None,
      max_tokens: None,
      stream: Some(true),
    };

    let response = self
      .http
      .post(self.endpoint())
      .bearer_auth(&self.api_key)
      .json(&request)
      .send()
      .await
      .context("Chat-completions stream request failed")?;

    let status = response.status();
    if !status.is_success() {
      let body = response.text().await.unwrap_or_default();
      anyhow::bail!("Chat-completions error {status}: {body}");
    }

    let (tx, rx) = mpsc::channel::<Result<String>>(32);

    // Relay task: SSE lines in, content deltas out. A dropped receiver
    // ends the relay on the next send.
    tokio::spawn(async move {
      let mut bytes = response.bytes_stream();
      let mut buffer = String::new();

      while let Some(chunk) = bytes.next().await {
        let chunk = match chunk {
          Ok(chunk) => chunk,
          Err(e) => {
            let _ = tx
              .send(Err(anyhow::Error::new(e).context("Stream read failed")))
              .await;
            return;
          }
        };

        buffer.push_str(&String::from_utf8_lossy(&chunk));

        while let Some(newline) = buffer.find('\n') {
          let line: String = buffer.drain(..=newline).collect();
          let line = line.trim();

          let Some(payload) = line.strip_prefix("data:") else {
            continue;
          };
          let payload = payload.trim();

          if payload == "[DONE]" {
            return;
          }

          match serde_json::from_str::<StreamChunk>(payload) {
            Ok(parsed) => {
              let delta = parsed
                .choices
                .into_iter()
                .next()
                .and_then(|choice| choice.delta.content);
              if let Some(content) = delta {
                if tx.send(Ok(content)).await.is_err() {
                  return;
                }
              }
            }
            Err(e) => debug!(error = %e, "Skipping unparsable stream line"),
          }
        }
      }
    });

    Ok(TextStream::new(rx))
  }
}
