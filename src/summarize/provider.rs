//! LLM provider handles
//!
//! Two wire formats are supported: Anthropic (primary) and OpenAI
//! (fallback). The provider is selected once per run from configuration
//! and passed into the engine explicitly; nothing consults ambient state
//! per call. Authentication failures surface as [`LlmError::Auth`] and
//! abort the stage.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::info;

use crate::config::LlmConfig;
use crate::utils::error::LlmError;

const ANTHROPIC_API_URL: &str = "https://api.anthropic.com/v1/messages";
const ANTHROPIC_VERSION: &str = "2023-06-01";
const OPENAI_API_URL: &str = "https://api.openai.com/v1/chat/completions";

/// A single-completion LLM backend
#[async_trait]
pub trait Provider: Send + Sync {
    /// Model identifier recorded on summarized items
    fn model_id(&self) -> &str;

    /// One completion call with a system prompt and a user message
    async fn complete(&self, system: &str, user: &str) -> Result<String, LlmError>;
}

impl std::fmt::Debug for dyn Provider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Provider")
            .field("model_id", &self.model_id())
            .finish()
    }
}

/// Select the provider for this run: primary if its credential is
/// configured, otherwise the fallback, never both
pub fn select_provider(
    config: &LlmConfig,
    timeout: Duration,
    max_output_tokens: u32,
) -> Result<Box<dyn Provider>, LlmError> {
    if let Some(key) = &config.anthropic_api_key {
        info!(model = %config.anthropic_model, "Using Anthropic provider");
        return Ok(Box::new(AnthropicProvider::new(
            key.clone(),
            config.anthropic_model.clone(),
            timeout,
            max_output_tokens,
        )?));
    }

    if let Some(key) = &config.openai_api_key {
        info!(model = %config.openai_model, "Using OpenAI provider");
        return Ok(Box::new(OpenAiProvider::new(
            key.clone(),
            config.openai_model.clone(),
            timeout,
            max_output_tokens,
        )?));
    }

    Err(LlmError::NoCredentials)
}

fn classify_status(status: reqwest::StatusCode) -> LlmError {
    match status.as_u16() {
        401 | 403 => LlmError::Auth,
        code => LlmError::Status(code),
    }
}

fn build_client(timeout: Duration) -> Result<Client, LlmError> {
    Ok(Client::builder().timeout(timeout).build()?)
}

// ----------------------------------------------------------------------
// Anthropic
// ----------------------------------------------------------------------

#[derive(Debug, Serialize)]
struct AnthropicRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    system: &'a str,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Debug, Deserialize)]
struct AnthropicResponse {
    content: Vec<AnthropicContent>,
}

#[derive(Debug, Deserialize)]
struct AnthropicContent {
    #[serde(default)]
    text: String,
}

/// Anthropic Messages API provider
pub struct AnthropicProvider {
    client: Client,
    api_key: String,
    model: String,
    max_tokens: u32,
    endpoint: String,
}

impl AnthropicProvider {
    pub fn new(
        api_key: String,
        model: String,
        timeout: Duration,
        max_tokens: u32,
    ) -> Result<Self, LlmError> {
        Ok(Self {
            client: build_client(timeout)?,
            api_key,
            model,
            max_tokens,
            endpoint: ANTHROPIC_API_URL.to_string(),
        })
    }

    /// Override the endpoint (for testing against a mock server)
    pub fn with_endpoint(mut self, endpoint: &str) -> Self {
        self.endpoint = endpoint.to_string();
        self
    }
}

#[async_trait]
impl Provider for AnthropicProvider {
    fn model_id(&self) -> &str {
        &self.model
    }

    async fn complete(&self, system: &str, user: &str) -> Result<String, LlmError> {
        let request = AnthropicRequest {
            model: &self.model,
            max_tokens: self.max_tokens,
            system,
            messages: vec![ChatMessage {
                role: "user",
                content: user,
            }],
        };

        let response = self
            .client
            .post(&self.endpoint)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(classify_status(status));
        }

        let parsed: AnthropicResponse = response.json().await?;
        let text = parsed
            .content
            .into_iter()
            .map(|block| block.text)
            .collect::<String>();

        if text.trim().is_empty() {
            return Err(LlmError::EmptyCompletion);
        }
        Ok(text)
    }
}

// ----------------------------------------------------------------------
// OpenAI
// ----------------------------------------------------------------------

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct OpenAiRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Debug, Deserialize)]
struct OpenAiResponse {
    choices: Vec<OpenAiChoice>,
}

#[derive(Debug, Deserialize)]
struct OpenAiChoice {
    message: OpenAiMessage,
}

#[derive(Debug, Deserialize)]
struct OpenAiMessage {
    #[serde(default)]
    content: String,
}

/// OpenAI Chat Completions API provider
pub struct OpenAiProvider {
    client: Client,
    api_key: String,
    model: String,
    max_tokens: u32,
    endpoint: String,
}

impl OpenAiProvider {
    pub fn new(
        api_key: String,
        model: String,
        timeout: Duration,
        max_tokens: u32,
    ) -> Result<Self, LlmError> {
        Ok(Self {
            client: build_client(timeout)?,
            api_key,
            model,
            max_tokens,
            endpoint: OPENAI_API_URL.to_string(),
        })
    }

    /// Override the endpoint (for testing against a mock server)
    pub fn with_endpoint(mut self, endpoint: &str) -> Self {
        self.endpoint = endpoint.to_string();
        self
    }
}

#[async_trait]
impl Provider for OpenAiProvider {
    fn model_id(&self) -> &str {
        &self.model
    }

    async fn complete(&self, system: &str, user: &str) -> Result<String, LlmError> {
        let request = OpenAiRequest {
            model: &self.model,
            max_tokens: self.max_tokens,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: system,
                },
                ChatMessage {
                    role: "user",
                    content: user,
                },
            ],
        };

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(classify_status(status));
        }

        let parsed: OpenAiResponse = response.json().await?;
        let text = parsed
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .unwrap_or_default();

        if text.trim().is_empty() {
            return Err(LlmError::EmptyCompletion);
        }
        Ok(text)
    }
}
