//! Terminal rendering of transcripts and participants

use comfy_table::{ContentArrangement, Table, presets::UTF8_FULL};
use convoy_workflow::{LoadedAgent, TranscriptEntry};

const MAX_CELL_CHARS: usize = 160;

fn table() -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic);
    table
}

fn shorten(text: &str) -> String {
    let text = text.trim();
    if text.chars().count() <= MAX_CELL_CHARS {
        return text.to_string();
    }
    let head: String = text.chars().take(MAX_CELL_CHARS - 1).collect();
    format!("{head}…")
}

/// One row per recorded turn
pub fn transcript_table(entries: &[TranscriptEntry]) -> Table {
    let mut table = table();
    table.set_header(vec!["#", "Time", "From", "To", "Message"]);
    for (idx, entry) in entries.iter().enumerate() {
        table.add_row(vec![
            (idx + 1).to_string(),
            entry.timestamp.format("%H:%M:%S%.3f").to_string(),
            entry.sender.clone(),
            entry.recipient.clone(),
            shorten(&entry.message.content),
        ]);
    }
    table
}

/// Sender and receiver with their group members
pub fn participants_table(sender: &LoadedAgent, receiver: &LoadedAgent) -> Table {
    let mut table = table();
    table.set_header(vec!["Side", "Agent", "Kind", "Members"]);
    for (side, agent) in [("sender", sender), ("receiver", receiver)] {
        let (kind, members) = match agent.group() {
            Some(group) => ("group chat", group.agent_names().join(", ")),
            None => ("agent", String::new()),
        };
        table.add_row(vec![side, agent.name(), kind, members.as_str()]);
    }
    table
}
