//! Turn generation
//!
//! Agents never talk to a model directly. They hand a [`GenerationRequest`]
//! to a [`ReplyGenerator`]; [`LlmReplyGenerator`] is the implementation backed
//! by the OpenAI-compatible provider in `convoy-llm`.

use crate::config::{LlmConfig, ModelEntry};
use async_trait::async_trait;
use convoy_core::{Error, Message, Result};
use convoy_llm::providers::{ApiFlavor, OpenAIConfig, OpenAIProvider};
use convoy_llm::{CompletionRequest, LLMError, LLMProvider};
use std::env;
use std::sync::Arc;
use tracing::{debug, instrument, warn};

/// Environment variable holding the fallback API key
pub const DEFAULT_API_KEY_ENV: &str = "OPENAI_API_KEY";

/// Everything needed to produce one turn
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    /// Name of the agent asking
    pub agent: String,

    /// System prompt of that agent
    pub system_message: Option<String>,

    /// Conversation so far, from the agent's point of view
    pub messages: Vec<Message>,

    /// Model settings of that agent
    pub llm_config: LlmConfig,
}

/// Produces the text of the next turn
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ReplyGenerator: Send + Sync {
    /// Generate a reply; `Ok(None)` means the model had nothing to say
    async fn generate(&self, request: GenerationRequest) -> Result<Option<String>>;
}

/// Reply generator calling chat completion endpoints
///
/// Every entry of the request's `config_list` is tried in order until one
/// succeeds. Entries without an inline key use the key found in the configured
/// environment variable.
pub struct LlmReplyGenerator {
    provider: Option<Arc<dyn LLMProvider>>,
    api_key_env: String,
}

impl LlmReplyGenerator {
    /// Generator building an OpenAI-compatible provider per model entry
    pub fn new() -> Self {
        Self {
            provider: None,
            api_key_env: DEFAULT_API_KEY_ENV.to_string(),
        }
    }

    /// Generator sending every request to `provider`
    pub fn with_provider(provider: Arc<dyn LLMProvider>) -> Self {
        Self {
            provider: Some(provider),
            api_key_env: DEFAULT_API_KEY_ENV.to_string(),
        }
    }

    /// Read the fallback key from `var` instead of `OPENAI_API_KEY`
    pub fn with_api_key_env(mut self, var: impl Into<String>) -> Self {
        self.api_key_env = var.into();
        self
    }

    fn provider_for(&self, entry: &ModelEntry, llm: &LlmConfig) -> convoy_llm::Result<Arc<dyn LLMProvider>> {
        if let Some(provider) = &self.provider {
            return Ok(Arc::clone(provider));
        }

        let api_key = entry
            .api_key
            .clone()
            .filter(|key| !key.is_empty())
            .or_else(|| env::var(&self.api_key_env).ok().filter(|key| !key.is_empty()))
            .ok_or_else(|| {
                LLMError::ConfigurationError(format!(
                    "no api_key for model '{}' and {} is not set",
                    entry.model, self.api_key_env
                ))
            })?;

        let mut config = OpenAIConfig::new(api_key)
            .with_flavor(ApiFlavor::from_api_type(entry.api_type.as_deref()));
        if let Some(base_url) = &entry.base_url {
            config = config.with_api_base(base_url);
        }
        if let Some(version) = &entry.api_version {
            config = config.with_api_version(version);
        }
        if let Some(timeout) = llm.timeout {
            config = config.with_timeout(timeout);
        }

        Ok(Arc::new(OpenAIProvider::with_config(config)?))
    }
}

impl Default for LlmReplyGenerator {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ReplyGenerator for LlmReplyGenerator {
    #[instrument(skip(self, request), fields(agent = %request.agent, messages = request.messages.len()))]
    async fn generate(&self, request: GenerationRequest) -> Result<Option<String>> {
        let entries = if request.llm_config.config_list.is_empty() {
            vec![ModelEntry::default()]
        } else {
            request.llm_config.config_list.clone()
        };

        let mut last_error = None;
        for entry in &entries {
            let provider = match self.provider_for(entry, &request.llm_config) {
                Ok(provider) => provider,
                Err(e) => {
                    warn!(model = %entry.model, "Skipping model entry: {}", e);
                    last_error = Some(e);
                    continue;
                }
            };

            let mut builder =
                CompletionRequest::builder(&entry.model).messages(request.messages.clone());
            if let Some(system) = &request.system_message {
                builder = builder.system(system.clone());
            }
            if let Some(temperature) = request.llm_config.temperature {
                builder = builder.temperature(temperature);
            }
            if let Some(max_tokens) = request.llm_config.max_tokens {
                builder = builder.max_tokens(max_tokens);
            }

            match provider.complete(builder.build()).await {
                Ok(response) => {
                    debug!(
                        model = %entry.model,
                        provider = provider.name(),
                        tokens = response.usage.total(),
                        "Generated reply"
                    );
                    return Ok(Some(response.message.content));
                }
                Err(e) => {
                    warn!(model = %entry.model, "Model call failed: {}", e);
                    last_error = Some(e);
                }
            }
        }

        Err(last_error.map_or_else(
            || Error::Generation("no model configured".to_string()),
            Error::from,
        ))
    }
}
