//! Termination predicates

use convoy_core::Message;
use std::fmt;
use std::sync::Arc;

/// Keyword that ends a conversation by convention
pub const TERMINATION_KEYWORD: &str = "TERMINATE";

/// How many trailing characters are searched for the keyword
pub const TERMINATION_WINDOW: usize = 20;

/// True when the right-trimmed `content` has the keyword in its last
/// [`TERMINATION_WINDOW`] characters
pub fn contains_termination_keyword(content: &str) -> bool {
    let trimmed = content.trim_end();
    let start = trimmed
        .char_indices()
        .rev()
        .nth(TERMINATION_WINDOW - 1)
        .map_or(0, |(idx, _)| idx);
    trimmed[start..].contains(TERMINATION_KEYWORD)
}

/// Predicate deciding whether a received message ends the conversation
///
/// Clones share the same closure, so [`TerminationCheck::same_as`] can tell an
/// installed predicate apart from a freshly built one.
#[derive(Clone)]
pub struct TerminationCheck(Arc<dyn Fn(&Message) -> bool + Send + Sync>);

impl TerminationCheck {
    /// Wrap a custom predicate
    pub fn new(predicate: impl Fn(&Message) -> bool + Send + Sync + 'static) -> Self {
        Self(Arc::new(predicate))
    }

    /// The conventional keyword predicate
    pub fn keyword() -> Self {
        Self::new(|message| contains_termination_keyword(&message.content))
    }

    /// Evaluate the predicate
    pub fn matches(&self, message: &Message) -> bool {
        (self.0)(message)
    }

    /// Whether both checks wrap the very same closure
    pub fn same_as(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl Default for TerminationCheck {
    fn default() -> Self {
        Self::keyword()
    }
}

impl fmt::Debug for TerminationCheck {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("TerminationCheck(..)")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keyword_at_the_end() {
        assert!(contains_termination_keyword("All tasks are done. TERMINATE"));
        assert!(contains_termination_keyword("TERMINATE\n\n  "));
        assert!(contains_termination_keyword("TERMINATE"));
    }

    #[test]
    fn test_keyword_outside_window() {
        assert!(!contains_termination_keyword("TERMINATE is a keyword"));
        assert!(!contains_termination_keyword(""));
    }

    #[test]
    fn test_window_counts_characters() {
        // 11 two-byte characters plus the keyword are exactly 20 characters
        let content = format!("{}{}", "é".repeat(11), TERMINATION_KEYWORD);
        assert!(contains_termination_keyword(&content));

        let content = format!("{TERMINATION_KEYWORD}{}", "é".repeat(12));
        assert!(!contains_termination_keyword(&content));
    }

    #[test]
    fn test_same_as_tracks_identity() {
        let check = TerminationCheck::keyword();
        let clone = check.clone();
        assert!(check.same_as(&clone));
        assert!(!check.same_as(&TerminationCheck::keyword()));
    }

    #[test]
    fn test_custom_predicate() {
        let check = TerminationCheck::new(|m| m.content == "bye");
        assert!(check.matches(&Message::user("bye")));
        assert!(!check.matches(&Message::user("TERMINATE")));
    }
}
