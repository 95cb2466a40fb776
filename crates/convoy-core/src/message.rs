//! Message types exchanged between agents

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Message role in a conversation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Message written by the conversation partner
    User,
    /// Message written by the agent holding the memory
    Assistant,
    /// System message
    System,
    /// Function/tool output
    Function,
}

impl Role {
    /// Wire name of the role
    pub fn as_str(self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::System => "system",
            Role::Function => "function",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "user" => Ok(Role::User),
            "assistant" => Ok(Role::Assistant),
            "system" => Ok(Role::System),
            "function" | "tool" => Ok(Role::Function),
            other => Err(format!("unknown role '{other}'")),
        }
    }
}

/// A single turn of conversation
///
/// `name` carries the real speaker when a message is relayed by someone else,
/// e.g. a group chat manager broadcasting a participant's reply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Message role
    pub role: Role,

    /// Text content
    #[serde(default)]
    pub content: String,

    /// Speaker label overriding the role-derived one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl Message {
    /// Create a message with an explicit role
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            name: None,
        }
    }

    /// Create a user message
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    /// Create an assistant message
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }

    /// Set the speaker name
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Copy of this message with a different role, keeping content and name
    pub fn with_role(&self, role: Role) -> Self {
        Self {
            role,
            content: self.content.clone(),
            name: self.name.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constructors() {
        let msg = Message::user("Hello");
        assert_eq!(msg.role, Role::User);
        assert_eq!(msg.content, "Hello");
        assert!(msg.name.is_none());

        let msg = Message::assistant("Hi").with_name("coder");
        assert_eq!(msg.role, Role::Assistant);
        assert_eq!(msg.name.as_deref(), Some("coder"));
    }

    #[test]
    fn test_name_is_omitted_when_absent() {
        let json = serde_json::to_value(Message::user("x")).unwrap();
        assert_eq!(json, serde_json::json!({"role": "user", "content": "x"}));
    }

    #[test]
    fn test_role_parsing() {
        assert_eq!("Assistant".parse::<Role>(), Ok(Role::Assistant));
        assert_eq!("tool".parse::<Role>(), Ok(Role::Function));
        assert!("narrator".parse::<Role>().is_err());
    }

    #[test]
    fn test_with_role_keeps_name() {
        let msg = Message::assistant("done").with_name("critic");
        let seen = msg.with_role(Role::User);
        assert_eq!(seen.role, Role::User);
        assert_eq!(seen.name.as_deref(), Some("critic"));
        assert_eq!(seen.content, "done");
    }
}
