//! Error types for convoy-core

use thiserror::Error;

/// Result type alias for convoy
pub type Result<T> = std::result::Result<T, Error>;

/// Error type shared by every convoy crate
#[derive(Error, Debug)]
pub enum Error {
    /// Invalid or incomplete agent configuration, detected at load time
    #[error("Configuration error for agent '{agent}': {message}")]
    Config {
        /// Name of the offending agent
        agent: String,
        /// What is wrong with it
        message: String,
    },

    /// The declared agent type is not one convoy knows how to build
    #[error("Unknown agent type '{kind}' for agent '{agent}'")]
    UnknownAgentType {
        /// Name of the offending agent
        agent: String,
        /// The declared type
        kind: String,
    },

    /// A history entry could not be turned into a message
    #[error("Invalid history entry: {0}")]
    InvalidHistory(String),

    /// The turn-generation collaborator failed
    #[error("Reply generation failed: {0}")]
    Generation(String),

    /// The code execution collaborator failed
    #[error("Code execution failed: {0}")]
    Execution(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    /// Shorthand for [`Error::Config`]
    pub fn config(agent: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Config {
            agent: agent.into(),
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_error_names_agent() {
        let err = Error::config("planner", "api_key missing");
        assert_eq!(
            err.to_string(),
            "Configuration error for agent 'planner': api_key missing"
        );
    }

    #[test]
    fn test_unknown_type_message() {
        let err = Error::UnknownAgentType {
            agent: "x".to_string(),
            kind: "bogus".to_string(),
        };
        assert!(err.to_string().contains("bogus"));
    }
}
