//! Replaying a stored transcript into a fresh pair of agents

use convoy_core::{Agent, Error, Message, Result, Role, deliver};
use serde_json::Value;
use tracing::{debug, warn};

/// Turn untyped history records into messages
///
/// Accepts a JSON array of objects. Content is coerced: missing or null
/// becomes empty, other non-string values become their JSON text. Unknown
/// fields are ignored. Only a record that is not an object, or whose `role`
/// is not a string, is rejected. Records with a role convoy does not know are
/// skipped with a warning.
pub fn parse_history(value: &Value) -> Result<Vec<Message>> {
    let Value::Array(records) = value else {
        return Err(Error::InvalidHistory(
            "history must be a JSON array".to_string(),
        ));
    };

    let mut messages = Vec::with_capacity(records.len());
    for (idx, record) in records.iter().enumerate() {
        let Value::Object(fields) = record else {
            return Err(Error::InvalidHistory(format!(
                "entry {idx} is not an object"
            )));
        };

        let Some(Value::String(role)) = fields.get("role") else {
            return Err(Error::InvalidHistory(format!(
                "entry {idx} has no string role"
            )));
        };
        let role: Role = match role.parse() {
            Ok(role) => role,
            Err(_) => {
                warn!(entry = idx, role = %role, "Skipping history entry with unknown role");
                continue;
            }
        };

        let content = match fields.get("content") {
            None | Some(Value::Null) => String::new(),
            Some(Value::String(text)) => text.clone(),
            Some(other) => other.to_string(),
        };

        let mut message = Message::new(role, content);
        if let Some(Value::String(name)) = fields.get("name") {
            message = message.with_name(name.clone());
        }
        messages.push(message);
    }

    Ok(messages)
}

/// [`parse_history`] over JSON text
pub fn parse_history_str(json: &str) -> Result<Vec<Message>> {
    let value: Value = serde_json::from_str(json)?;
    parse_history(&value)
}

/// Re-insert `history` into the memories of `sender` and `receiver`
///
/// `user` messages travel sender to receiver, `assistant` messages receiver
/// to sender. Nothing is generated and no reply hook runs. Other roles are
/// skipped. Returns the number of messages delivered.
pub fn populate_history(history: &[Message], sender: &dyn Agent, receiver: &dyn Agent) -> usize {
    let mut delivered = 0;
    for message in history {
        match message.role {
            Role::User => deliver(message, sender, receiver),
            Role::Assistant => deliver(message, receiver, sender),
            Role::System | Role::Function => {
                warn!(role = %message.role, "Skipping history message that has no direction");
                continue;
            }
        }
        delivered += 1;
    }
    debug!(delivered, total = history.len(), "Replayed history");
    delivered
}
