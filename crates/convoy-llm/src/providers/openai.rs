//! OpenAI-compatible provider implementation
//!
//! This module implements the LLMProvider trait for the chat completions API.
//! See: https://platform.openai.com/docs/api-reference/chat
//!
//! The same wire format is spoken by Azure OpenAI deployments and by most local
//! servers (llama.cpp, vLLM, LM Studio); Azure only differs in URL layout and
//! authentication header, selected through [`ApiFlavor`].
//!
//! # Example
//!
//! ```no_run
//! use convoy_core::Message;
//! use convoy_llm::{CompletionRequest, LLMProvider};
//! use convoy_llm::providers::{OpenAIConfig, OpenAIProvider};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = OpenAIConfig::new("sk-...").with_api_base("http://localhost:1234/v1");
//!     let provider = OpenAIProvider::with_config(config)?;
//!
//!     let request = CompletionRequest::builder("gpt-4o")
//!         .add_message(Message::user("Hello!"))
//!         .build();
//!
//!     let response = provider.complete(request).await?;
//!     println!("{}", response.message.content);
//!     Ok(())
//! }
//! ```

use crate::{CompletionRequest, CompletionResponse, LLMError, LLMProvider, Result, StopReason, TokenUsage};
use async_trait::async_trait;
use convoy_core::{Message, Role};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, instrument};

/// Default API base URL
pub const DEFAULT_OPENAI_API_BASE: &str = "https://api.openai.com/v1";
const DEFAULT_TIMEOUT_SECS: u64 = 120;
const DEFAULT_AZURE_API_VERSION: &str = "2024-02-01";

/// URL layout and authentication scheme of the endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ApiFlavor {
    /// `{base}/chat/completions` with a bearer token
    #[default]
    OpenAI,
    /// `{base}/openai/deployments/{model}/chat/completions` with an `api-key` header
    Azure,
}

impl ApiFlavor {
    /// Map a configured `api_type` value; anything that is not Azure speaks OpenAI
    pub fn from_api_type(api_type: Option<&str>) -> Self {
        match api_type.map(str::to_ascii_lowercase).as_deref() {
            Some("azure") => ApiFlavor::Azure,
            _ => ApiFlavor::OpenAI,
        }
    }
}

/// Configuration for the OpenAI-compatible provider
#[derive(Debug, Clone)]
pub struct OpenAIConfig {
    /// API key for authentication
    pub api_key: String,

    /// Base URL of the API
    pub api_base: String,

    /// Request timeout in seconds (default: 120)
    pub timeout_secs: u64,

    /// URL layout and authentication scheme
    pub flavor: ApiFlavor,

    /// API version query parameter, used by Azure
    pub api_version: Option<String>,
}

impl OpenAIConfig {
    /// Create a new config with the given API key and default settings
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            api_base: DEFAULT_OPENAI_API_BASE.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            flavor: ApiFlavor::OpenAI,
            api_version: None,
        }
    }

    /// Set custom API base URL
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into().trim_end_matches('/').to_string();
        self
    }

    /// Set request timeout in seconds
    pub fn with_timeout(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }

    /// Set the URL layout and authentication scheme
    pub fn with_flavor(mut self, flavor: ApiFlavor) -> Self {
        self.flavor = flavor;
        self
    }

    /// Set the API version
    pub fn with_api_version(mut self, api_version: impl Into<String>) -> Self {
        self.api_version = Some(api_version.into());
        self
    }

    /// Chat completions endpoint for `model`
    pub fn endpoint(&self, model: &str) -> String {
        match self.flavor {
            ApiFlavor::OpenAI => format!("{}/chat/completions", self.api_base),
            ApiFlavor::Azure => format!(
                "{}/openai/deployments/{}/chat/completions?api-version={}",
                self.api_base,
                model,
                self.api_version.as_deref().unwrap_or(DEFAULT_AZURE_API_VERSION)
            ),
        }
    }
}

impl Default for OpenAIConfig {
    fn default() -> Self {
        Self::new(String::new())
    }
}

/// OpenAI-compatible chat completions provider
pub struct OpenAIProvider {
    client: Client,
    config: OpenAIConfig,
}

impl OpenAIProvider {
    /// Create a new provider with custom configuration
    pub fn with_config(config: OpenAIConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self { client, config })
    }

    /// Create a new provider with an API key and default settings
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        Self::with_config(OpenAIConfig::new(api_key))
    }

    /// Get the current configuration
    pub fn config(&self) -> &OpenAIConfig {
        &self.config
    }
}

#[async_trait]
impl LLMProvider for OpenAIProvider {
    #[instrument(skip(self, request), fields(model = %request.model, api_base = %self.config.api_base))]
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse> {
        let endpoint = self.config.endpoint(&request.model);
        debug!("Sending chat completion request to {}", endpoint);

        let body = OpenAIRequest {
            model: request.model.clone(),
            messages: build_openai_messages(request.system, &request.messages),
            max_tokens: request.max_tokens,
            temperature: request.temperature,
            stop: request.stop_sequences,
        };

        let builder = self.client.post(endpoint).json(&body);
        let builder = match self.config.flavor {
            ApiFlavor::OpenAI => builder.bearer_auth(&self.config.api_key),
            ApiFlavor::Azure => builder.header("api-key", &self.config.api_key),
        };
        let response = builder.send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await?;

            return Err(match status.as_u16() {
                401 => LLMError::AuthenticationFailed,
                429 => LLMError::RateLimitExceeded(error_text),
                400 => LLMError::InvalidRequest(error_text),
                404 => LLMError::ModelNotFound(request.model),
                _ => LLMError::RequestFailed(format!("HTTP {status}: {error_text}")),
            });
        }

        let parsed: OpenAIResponse = response.json().await.map_err(|e| {
            LLMError::UnexpectedResponse(format!("Failed to parse response: {e}"))
        })?;

        let choice = parsed
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| LLMError::UnexpectedResponse("No choices in response".to_string()))?;

        debug!(
            "Received response - finish_reason: {:?}, tokens: {}/{}",
            choice.finish_reason, parsed.usage.prompt_tokens, parsed.usage.completion_tokens
        );

        Ok(CompletionResponse {
            message: Message::assistant(choice.message.content.unwrap_or_default()),
            stop_reason: map_stop_reason(choice.finish_reason.as_deref()),
            usage: TokenUsage {
                input_tokens: parsed.usage.prompt_tokens,
                output_tokens: parsed.usage.completion_tokens,
            },
        })
    }

    fn name(&self) -> &str {
        match self.config.flavor {
            ApiFlavor::OpenAI => "openai",
            ApiFlavor::Azure => "azure",
        }
    }
}

// ============================================================================
// Wire types
// ============================================================================

#[derive(Debug, Serialize)]
struct OpenAIRequest {
    model: String,
    messages: Vec<OpenAIMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    stop: Option<Vec<String>>,
}

#[derive(Debug, Serialize, PartialEq)]
struct OpenAIMessage {
    role: &'static str,
    content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OpenAIResponse {
    choices: Vec<OpenAIChoice>,
    #[serde(default)]
    usage: OpenAIUsage,
}

#[derive(Debug, Deserialize)]
struct OpenAIChoice {
    message: OpenAIResponseMessage,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OpenAIResponseMessage {
    content: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct OpenAIUsage {
    #[serde(default)]
    prompt_tokens: usize,
    #[serde(default)]
    completion_tokens: usize,
}

// ============================================================================
// Conversion functions
// ============================================================================

/// System prompt first, then the conversation
fn build_openai_messages(system: Option<String>, messages: &[Message]) -> Vec<OpenAIMessage> {
    let mut result = Vec::with_capacity(messages.len() + 1);

    if let Some(sys) = system {
        result.push(OpenAIMessage {
            role: "system",
            content: sys,
            name: None,
        });
    }

    result.extend(messages.iter().map(convert_message));
    result
}

fn convert_message(msg: &Message) -> OpenAIMessage {
    // Function output has no tool_call_id to attach to, so it goes back as user text.
    let role = match msg.role {
        Role::Assistant => "assistant",
        Role::System => "system",
        Role::User | Role::Function => "user",
    };

    OpenAIMessage {
        role,
        content: msg.content.clone(),
        name: msg.name.as_deref().and_then(wire_name),
    }
}

/// The API only accepts `[A-Za-z0-9_-]{1,64}` as participant names
fn wire_name(name: &str) -> Option<String> {
    let cleaned: String = name
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' { c } else { '_' })
        .take(64)
        .collect();
    (!cleaned.is_empty()).then_some(cleaned)
}

fn map_stop_reason(reason: Option<&str>) -> StopReason {
    match reason {
        Some("length") => StopReason::MaxTokens,
        Some("content_filter") => StopReason::ContentFilter,
        Some("stop_sequence") => StopReason::StopSequence,
        _ => StopReason::EndTurn,
    }
}
