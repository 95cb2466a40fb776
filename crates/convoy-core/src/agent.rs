//! Core Agent trait definition

use crate::{Message, Result};
use async_trait::async_trait;
use std::sync::Arc;

/// Outcome of a reply hook
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplyDecision {
    /// Let the remaining hooks and the normal reply pipeline run
    Defer,
    /// Stop here and answer with the given reply (`None` means "no reply")
    Final(Option<Message>),
}

/// Hook run at the start of every `generate_reply`
///
/// Hooks see the replying agent (`recipient`), its memory of the conversation
/// with `sender`, and the sender itself.
pub trait ReplyHook: Send + Sync {
    /// Inspect the turn and decide whether to short-circuit it
    fn on_reply(
        &self,
        recipient: &dyn Agent,
        messages: &[Message],
        sender: &dyn Agent,
    ) -> ReplyDecision;
}

/// Core trait that all conversational agents implement
///
/// Agents exchange [`Message`]s through [`deliver`], which only touches memory,
/// and produce new turns through [`Agent::generate_reply`]. All methods take
/// `&self`; implementations keep their mutable state behind locks that are
/// never held across an `.await`.
#[async_trait]
pub trait Agent: Send + Sync {
    /// Get the agent's name, unique within a conversation
    fn name(&self) -> &str;

    /// Short description used when other agents pick a speaker
    fn description(&self) -> &str {
        ""
    }

    /// Store a message received from `sender`
    fn receive(&self, message: &Message, sender: &dyn Agent);

    /// Store a message this agent sent to `recipient`
    fn record_sent(&self, message: &Message, recipient: &dyn Agent);

    /// Produce the next turn in the conversation with `sender`
    ///
    /// Returns `Ok(None)` when the agent has nothing more to say, which ends
    /// the exchange.
    async fn generate_reply(&self, sender: &dyn Agent) -> Result<Option<Message>>;

    /// Messages exchanged with the agent called `peer`
    fn chat_messages(&self, peer: &str) -> Vec<Message>;

    /// Forget the conversation with `peer`, or every conversation when `None`
    fn clear_history(&self, peer: Option<&str>);

    /// Reset the consecutive auto-reply counter for `peer`, or for everyone
    fn reset_consecutive_auto_reply_counter(&self, _peer: Option<&str>) {}

    /// Register a hook run before every reply; newer hooks run first
    fn register_reply(&self, hook: Arc<dyn ReplyHook>);
}

/// Hand `message` from `sender` to `recipient` without asking for a reply
///
/// Both sides record the message in their memory of each other. Nothing is
/// generated and no reply hook runs.
pub fn deliver(message: &Message, sender: &dyn Agent, recipient: &dyn Agent) {
    sender.record_sent(message, recipient);
    recipient.receive(message, sender);
}

/// Run `hooks` in order and return the first final decision
pub fn run_reply_hooks(
    hooks: &[Arc<dyn ReplyHook>],
    recipient: &dyn Agent,
    messages: &[Message],
    sender: &dyn Agent,
) -> ReplyDecision {
    for hook in hooks {
        if let decision @ ReplyDecision::Final(_) = hook.on_reply(recipient, messages, sender) {
            return decision;
        }
    }
    ReplyDecision::Defer
}
