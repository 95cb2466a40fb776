//! Per-peer conversation memory
//!
//! Every agent keeps one ordered message list per conversation partner, keyed
//! by the partner's name. Messages are stored from the owner's point of view:
//! what the owner sent is `assistant`, what it received is `user`. Function
//! output keeps its role in both directions.

use crate::{Message, Role};
use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

/// Conversation memory of one agent
#[derive(Debug, Default)]
pub struct ConversationMemory {
    threads: RwLock<HashMap<String, Vec<Message>>>,
}

impl ConversationMemory {
    /// Create an empty memory
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a message received from `peer`
    pub fn record_received(&self, peer: &str, message: &Message) {
        self.push(peer, Self::stored_as(message, Role::User));
    }

    /// Store a message sent to `peer`
    pub fn record_sent(&self, peer: &str, message: &Message) {
        self.push(peer, Self::stored_as(message, Role::Assistant));
    }

    /// All messages exchanged with `peer`, oldest first
    pub fn messages_with(&self, peer: &str) -> Vec<Message> {
        let threads = self.threads.read().unwrap_or_else(PoisonError::into_inner);
        threads.get(peer).cloned().unwrap_or_default()
    }

    /// The most recent message exchanged with `peer`
    pub fn last_with(&self, peer: &str) -> Option<Message> {
        let threads = self.threads.read().unwrap_or_else(PoisonError::into_inner);
        threads.get(peer).and_then(|thread| thread.last().cloned())
    }

    /// Names of every peer this memory holds a thread for
    pub fn peers(&self) -> Vec<String> {
        let threads = self.threads.read().unwrap_or_else(PoisonError::into_inner);
        let mut peers: Vec<String> = threads.keys().cloned().collect();
        peers.sort();
        peers
    }

    /// Forget the thread with `peer`, or every thread when `peer` is `None`
    pub fn clear(&self, peer: Option<&str>) {
        let mut threads = self.threads.write().unwrap_or_else(PoisonError::into_inner);
        match peer {
            Some(peer) => {
                threads.remove(peer);
            }
            None => threads.clear(),
        }
    }

    fn push(&self, peer: &str, message: Message) {
        let mut threads = self.threads.write().unwrap_or_else(PoisonError::into_inner);
        threads.entry(peer.to_string()).or_default().push(message);
    }

    fn stored_as(message: &Message, role: Role) -> Message {
        if message.role == Role::Function {
            message.clone()
        } else {
            message.with_role(role)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_roles_follow_direction() {
        let memory = ConversationMemory::new();
        memory.record_received("alice", &Message::assistant("hi"));
        memory.record_sent("alice", &Message::user("hello back"));

        let thread = memory.messages_with("alice");
        assert_eq!(thread.len(), 2);
        assert_eq!(thread[0].role, Role::User);
        assert_eq!(thread[1].role, Role::Assistant);
    }

    #[test]
    fn test_function_role_is_kept() {
        let memory = ConversationMemory::new();
        memory.record_received("tool", &Message::new(Role::Function, "42"));
        assert_eq!(memory.last_with("tool").unwrap().role, Role::Function);
    }

    #[test]
    fn test_threads_are_separate() {
        let memory = ConversationMemory::new();
        memory.record_received("a", &Message::user("1"));
        memory.record_received("b", &Message::user("2"));
        memory.record_received("b", &Message::user("3"));

        assert_eq!(memory.messages_with("a").len(), 1);
        assert_eq!(memory.messages_with("b").len(), 2);
        assert_eq!(memory.peers(), vec!["a".to_string(), "b".to_string()]);
        assert!(memory.messages_with("c").is_empty());
    }

    #[test]
    fn test_clear() {
        let memory = ConversationMemory::new();
        memory.record_received("a", &Message::user("1"));
        memory.record_received("b", &Message::user("2"));

        memory.clear(Some("a"));
        assert!(memory.messages_with("a").is_empty());
        assert_eq!(memory.messages_with("b").len(), 1);

        memory.clear(None);
        assert!(memory.peers().is_empty());
    }
}
