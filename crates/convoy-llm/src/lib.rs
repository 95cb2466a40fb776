//! LLM provider abstraction layer for convoy
//!
//! This crate provides provider-agnostic abstractions for asking a Large
//! Language Model for the next turn of a conversation. It includes:
//!
//! - Completion request/response types
//! - Provider trait for LLM implementations
//! - An OpenAI-compatible provider (behind the `openai` feature, on by default)

pub mod completion;
pub mod error;
pub mod provider;

// Re-export main types
pub use completion::{CompletionRequest, CompletionResponse, StopReason, TokenUsage};
pub use error::{LLMError, Result};
pub use provider::LLMProvider;

// Provider implementations (feature-gated)
#[cfg(feature = "openai")]
pub mod providers;
