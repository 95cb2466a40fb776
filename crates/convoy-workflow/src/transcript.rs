//! Transcript recording
//!
//! [`TranscriptRecorder`] is registered as a reply hook on every agent a
//! workflow builds, so it sees each turn right before the replying agent
//! generates. It never changes the outcome of a turn.

use chrono::{DateTime, Utc};
use convoy_core::{Agent, Message, ReplyDecision, ReplyHook, Result};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, PoisonError};
use tracing::trace;

/// One recorded turn
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranscriptEntry {
    /// Agent about to reply
    pub recipient: String,
    /// Who actually said `message`
    pub sender: String,
    /// The message being answered
    pub message: Message,
    /// When the turn was recorded
    pub timestamp: DateTime<Utc>,
}

/// Callback told about every turn before it is recorded
pub trait TurnObserver: Send + Sync {
    /// Called with the sending agent's name, the replying agent's name and the last message
    fn on_turn(&self, sender: &str, recipient: &str, message: &Message);
}

impl<F> TurnObserver for F
where
    F: Fn(&str, &str, &Message) + Send + Sync,
{
    fn on_turn(&self, sender: &str, recipient: &str, message: &Message) {
        self(sender, recipient, message);
    }
}

/// Append-only log of turns, shared by every agent of a workflow
#[derive(Default)]
pub struct TranscriptRecorder {
    entries: Mutex<Vec<TranscriptEntry>>,
    observer: Option<Arc<dyn TurnObserver>>,
}

impl TranscriptRecorder {
    /// Recorder without observer
    pub fn new() -> Self {
        Self::default()
    }

    /// Recorder calling `observer` on every turn
    pub fn with_observer(observer: Arc<dyn TurnObserver>) -> Self {
        Self {
            entries: Mutex::new(Vec::new()),
            observer: Some(observer),
        }
    }

    /// Copy of every entry, oldest first
    pub fn entries(&self) -> Vec<TranscriptEntry> {
        self.lock().clone()
    }

    /// Number of recorded turns
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Whether nothing was recorded yet
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// The transcript as a pretty-printed JSON array
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&*self.lock())?)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<TranscriptEntry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl ReplyHook for TranscriptRecorder {
    fn on_reply(
        &self,
        recipient: &dyn Agent,
        messages: &[Message],
        sender: &dyn Agent,
    ) -> ReplyDecision {
        let Some(last) = messages.last() else {
            return ReplyDecision::Defer;
        };

        if let Some(observer) = &self.observer {
            observer.on_turn(sender.name(), recipient.name(), last);
        }

        // Inside a group the manager relays everything; the stamped name is the real speaker.
        let speaker = last
            .name
            .clone()
            .unwrap_or_else(|| sender.name().to_string());

        let mut entries = self.lock();
        let now = Utc::now();
        let timestamp = entries.last().map_or(now, |prev| prev.timestamp.max(now));
        trace!(sender = %speaker, recipient = %recipient.name(), "Recording turn");
        entries.push(TranscriptEntry {
            recipient: recipient.name().to_string(),
            sender: speaker,
            message: last.clone(),
            timestamp,
        });

        ReplyDecision::Defer
    }
}
