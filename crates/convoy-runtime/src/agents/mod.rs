//! Concrete agent implementations

pub mod conversable;
pub mod group;

pub use conversable::{AgentRole, ConversableAgent};
pub use group::{GroupChat, GroupChatManager};
