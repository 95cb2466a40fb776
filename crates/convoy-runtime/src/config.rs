//! Agent configuration types
//!
//! These types mirror the JSON shape of agent definitions. `llm_config` and
//! `code_execution_config` accept `false` (disabled), `true` (enabled with
//! defaults) or an object; see [`false_or`].

use crate::termination::TerminationCheck;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::PathBuf;

/// Default model when a config entry names none
pub const DEFAULT_MODEL: &str = "gpt-4";

/// Default cap on consecutive automatic replies to one peer
pub const DEFAULT_MAX_CONSECUTIVE_AUTO_REPLY: usize = 10;

/// Configuration of a single conversable agent
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Agent name, unique within a conversation
    pub name: String,

    /// System prompt
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_message: Option<String>,

    /// Model access; `None` disables LLM replies
    #[serde(default, with = "false_or")]
    pub llm_config: Option<LlmConfig>,

    /// Code execution settings; `None` disables execution
    #[serde(default, with = "false_or")]
    pub code_execution_config: Option<CodeExecutionConfig>,

    /// When to ask a human for input
    #[serde(default)]
    pub human_input_mode: HumanInputMode,

    /// Cap on consecutive automatic replies to one peer
    #[serde(default = "default_max_consecutive_auto_reply")]
    pub max_consecutive_auto_reply: usize,

    /// Reply used when nothing else produced one
    #[serde(default)]
    pub default_auto_reply: String,

    /// Short description used for speaker selection
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Predicate ending the conversation; filled in by sanitization
    #[serde(skip)]
    pub is_termination_msg: Option<TerminationCheck>,
}

fn default_max_consecutive_auto_reply() -> usize {
    DEFAULT_MAX_CONSECUTIVE_AUTO_REPLY
}

impl AgentConfig {
    /// Config with the given name and every other field at its default
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            system_message: None,
            llm_config: None,
            code_execution_config: None,
            human_input_mode: HumanInputMode::default(),
            max_consecutive_auto_reply: DEFAULT_MAX_CONSECUTIVE_AUTO_REPLY,
            default_auto_reply: String::new(),
            description: None,
            is_termination_msg: None,
        }
    }

    /// Set the system prompt
    pub fn with_system_message(mut self, message: impl Into<String>) -> Self {
        self.system_message = Some(message.into());
        self
    }

    /// Enable LLM replies
    pub fn with_llm_config(mut self, config: LlmConfig) -> Self {
        self.llm_config = Some(config);
        self
    }

    /// Enable code execution
    pub fn with_code_execution(mut self, config: CodeExecutionConfig) -> Self {
        self.code_execution_config = Some(config);
        self
    }

    /// Set the auto-reply cap
    pub fn with_max_consecutive_auto_reply(mut self, max: usize) -> Self {
        self.max_consecutive_auto_reply = max;
        self
    }

    /// Set the fallback reply
    pub fn with_default_auto_reply(mut self, reply: impl Into<String>) -> Self {
        self.default_auto_reply = reply.into();
        self
    }

    /// Set the description
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Set the termination predicate
    pub fn with_termination(mut self, check: TerminationCheck) -> Self {
        self.is_termination_msg = Some(check);
        self
    }
}

/// Model access settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Candidate models, tried in order
    #[serde(default)]
    pub config_list: Vec<ModelEntry>,

    /// Sampling temperature
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,

    /// Maximum tokens per completion
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<usize>,

    /// Request timeout in seconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<u64>,

    /// Any other setting, kept verbatim
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// One model endpoint in a `config_list`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelEntry {
    /// Model (or Azure deployment) name
    #[serde(default = "default_model")]
    pub model: String,

    /// Inline API key
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Endpoint base URL
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,

    /// `azure` selects the Azure URL layout
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_type: Option<String>,

    /// API version query parameter
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_version: Option<String>,

    /// Provider fields convoy does not interpret
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

fn default_model() -> String {
    DEFAULT_MODEL.to_string()
}

impl ModelEntry {
    /// Entry for `model` with nothing else set
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            api_key: None,
            base_url: None,
            api_type: None,
            api_version: None,
            extra: Map::new(),
        }
    }

    /// Set the inline API key
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    /// Set the base URL
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    /// Whether a non-empty inline key is present
    pub fn has_api_key(&self) -> bool {
        self.api_key.as_deref().is_some_and(|key| !key.is_empty())
    }

    /// The entry without null-valued extra fields
    pub fn sanitized(mut self) -> Self {
        self.extra.retain(|_, value| !value.is_null());
        self
    }
}

impl Default for ModelEntry {
    fn default() -> Self {
        Self::new(DEFAULT_MODEL)
    }
}

/// Code execution settings
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeExecutionConfig {
    /// Directory code runs in
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub work_dir: Option<PathBuf>,

    /// Run inside a container; convoy always forces this off
    #[serde(default)]
    pub use_docker: bool,

    /// Per-block timeout in seconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<u64>,

    /// How many recent messages are scanned for code (default 1)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_n_messages: Option<usize>,
}

/// When an agent asks a human for input
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HumanInputMode {
    /// Before every reply
    Always,
    /// Only when the conversation would end
    Terminate,
    /// Never
    #[default]
    Never,
}

/// How a group chat manager picks the next speaker
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpeakerSelection {
    /// Ask the model, falling back to round robin
    #[default]
    Auto,
    /// Participants take turns in order
    RoundRobin,
}

/// Group-level settings of a group chat
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupSettings {
    /// Maximum number of rounds
    #[serde(default = "default_max_round")]
    pub max_round: usize,

    /// Name of the administrating participant
    #[serde(default = "default_admin_name")]
    pub admin_name: String,

    /// Speaker selection strategy
    #[serde(default)]
    pub speaker_selection_method: SpeakerSelection,

    /// Whether a speaker may talk twice in a row
    #[serde(default = "default_true")]
    pub allow_repeat_speaker: bool,
}

fn default_max_round() -> usize {
    10
}

fn default_admin_name() -> String {
    "Admin".to_string()
}

fn default_true() -> bool {
    true
}

impl Default for GroupSettings {
    fn default() -> Self {
        Self {
            max_round: default_max_round(),
            admin_name: default_admin_name(),
            speaker_selection_method: SpeakerSelection::default(),
            allow_repeat_speaker: true,
        }
    }
}

/// Serde adapter for settings written as `false`, `true` or an object
///
/// `false`, `null` and a missing field deserialize to `None`, `true` to the
/// type's default. `None` serializes back as `false`.
pub mod false_or {
    use serde::de::{DeserializeOwned, Error as _};
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use serde_json::Value;

    /// Write `None` as `false`
    pub fn serialize<S, T>(value: &Option<T>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
        T: Serialize,
    {
        match value {
            Some(inner) => inner.serialize(serializer),
            None => serializer.serialize_bool(false),
        }
    }

    /// Read `false`, `true` or an object
    pub fn deserialize<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
    where
        D: Deserializer<'de>,
        T: DeserializeOwned + Default,
    {
        match Option::<Value>::deserialize(deserializer)? {
            None | Some(Value::Null | Value::Bool(false)) => Ok(None),
            Some(Value::Bool(true)) => Ok(Some(T::default())),
            Some(other) => T::deserialize(other).map(Some).map_err(D::Error::custom),
        }
    }
}
