//! Text completion for retrieval answers.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// OpenAI chat completions endpoint.
pub const OPENAI_CHAT_COMPLETIONS_URL: &str = "https://api.openai.com/v1/chat/completions";

/// Default completion model.
pub const DEFAULT_COMPLETION_MODEL: &str = "gpt-4o-mini";

#[derive(Debug, Error)]
pub enum CompletionError {
    #[error("Completion request failed: {0}")]
    Request(String),

    #[error("Completion API error ({status}): {body}")]
    Status { status: u16, body: String },

    #[error("Invalid completion response: {0}")]
    InvalidResponse(String),

    #[error("Completion returned no text")]
    EmptyResponse,
}

/// One system + user exchange.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    pub system: String,
    pub user: String,
    pub max_tokens: u32,
    pub temperature: f32,
}

/// Single-shot text completion.
#[async_trait]
pub trait CompletionClient: Send + Sync {
    async fn complete(&self, request: CompletionRequest) -> Result<String, CompletionError>;
}

/// Settings for [`OpenAICompletionClient`].
#[derive(Debug, Clone)]
pub struct CompletionConfig {
    pub url: String,
    pub model: String,
    pub api_key: String,
}

impl Default for CompletionConfig {
    fn default() -> Self {
        Self {
            url: OPENAI_CHAT_COMPLETIONS_URL.to_string(),
            model: DEFAULT_COMPLETION_MODEL.to_string(),
            api_key: String::new(),
        }
    }
}

impl Drop for CompletionConfig {
    fn drop(&mut self) {
        use zeroize::Zeroize;

        self.api_key.zeroize();
    }
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
    max_tokens: u32,
    temperature: f32,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Deserialize)]
struct ChatChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Chat completions over the OpenAI HTTP API.
pub struct OpenAICompletionClient {
    client: Client,
    config: CompletionConfig,
}

impl OpenAICompletionClient {
    pub fn new(client: Client, config: CompletionConfig) -> Self {
        Self { client, config }
    }
}

#[async_trait]
impl CompletionClient for OpenAICompletionClient {
    async fn complete(&self, request: CompletionRequest) -> Result<String, CompletionError> {
        let body = ChatRequest {
            model: &self.config.model,
            messages: [
                ChatMessage {
                    role: "system",
                    content: &request.system,
                },
                ChatMessage {
                    role: "user",
                    content: &request.user,
                },
            ],
            max_tokens: request.max_tokens,
            temperature: request.temperature,
        };

        let response = self
            .client
            .post(&self.config.url)
            .header("Authorization", format!("Bearer {}", self.config.api_key))
            .json(&body)
            .send()
            .await
            .map_err(|e| CompletionError::Request(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(CompletionError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| CompletionError::InvalidResponse(e.to_string()))?;

        let text = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .map(|content| content.trim().to_string())
            .unwrap_or_default();

        if text.is_empty() {
            return Err(CompletionError::EmptyResponse);
        }
        Ok(text)
    }
}
