//! Agent runtime for convoy
//!
//! This crate provides the agents that take part in conversations and the
//! machinery they share: configuration types, the termination predicate,
//! reply generation through a model, local code execution, group chats with
//! their manager, and the two-party conversation loop.

pub mod agents;
pub mod chat;
pub mod config;
pub mod executor;
pub mod generator;
pub mod runtime;
pub mod termination;

// Re-export key types
pub use agents::{AgentRole, ConversableAgent, GroupChat, GroupChatManager};
pub use chat::initiate_chat;
pub use config::{
    AgentConfig, CodeExecutionConfig, GroupSettings, HumanInputMode, LlmConfig, ModelEntry,
    SpeakerSelection,
};
pub use executor::{CodeBlock, CodeExecutor, ExecutionResult, LocalCodeExecutor, extract_code_blocks};
pub use generator::{DEFAULT_API_KEY_ENV, GenerationRequest, LlmReplyGenerator, ReplyGenerator};
pub use runtime::{AgentRuntime, AgentRuntimeBuilder};
pub use termination::{
    TERMINATION_KEYWORD, TERMINATION_WINDOW, TerminationCheck, contains_termination_keyword,
};
