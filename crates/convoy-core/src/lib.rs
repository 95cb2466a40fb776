//! Core abstractions for convoy
//!
//! This crate defines the fundamental traits and types used throughout the
//! convoy workspace: the [`Agent`] trait, [`Message`]s, per-peer
//! [`ConversationMemory`], reply hooks and the shared [`Error`] type.

pub mod agent;
pub mod error;
pub mod memory;
pub mod message;

pub use agent::{Agent, ReplyDecision, ReplyHook, deliver, run_reply_hooks};
pub use error::{Error, Result};
pub use memory::ConversationMemory;
pub use message::{Message, Role};
