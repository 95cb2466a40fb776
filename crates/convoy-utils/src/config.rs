//! Configuration management utilities

use crate::logging::LogFormat;
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;
use thiserror::Error;

/// Environment variable naming the deployment environment
pub const ENV_ENVIRONMENT: &str = "CONVOY_ENV";
/// Environment variable overriding the work directory
pub const ENV_WORK_DIR: &str = "CONVOY_WORK_DIR";
/// Environment variable naming the variable that holds the fallback API key
pub const ENV_API_KEY_ENV: &str = "CONVOY_API_KEY_ENV";
/// Environment variable selecting the log format
pub const ENV_LOG_FORMAT: &str = "CONVOY_LOG_FORMAT";

/// Errors raised while reading settings
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid log format '{0}', expected 'pretty' or 'json'")]
    InvalidLogFormat(String),
}

/// Main configuration structure
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Application name
    pub app_name: String,
    /// Environment (dev, prod, etc.)
    pub environment: String,
    /// Directory workflows execute code and write skills in
    pub work_dir: PathBuf,
    /// Variable consulted for the fallback API key
    pub api_key_env: String,
    /// Log output format
    pub log_format: LogFormat,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            app_name: "convoy".to_string(),
            environment: "development".to_string(),
            work_dir: PathBuf::from("work_dir"),
            api_key_env: "OPENAI_API_KEY".to_string(),
            log_format: LogFormat::default(),
        }
    }
}

impl Config {
    /// Defaults overridden by the `CONVOY_*` environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Defaults overridden by whatever `lookup` returns for each `CONVOY_*` key
    ///
    /// Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());
        let mut config = Self::default();

        if let Some(environment) = get(ENV_ENVIRONMENT) {
            config.environment = environment;
        }
        if let Some(work_dir) = get(ENV_WORK_DIR) {
            config.work_dir = PathBuf::from(work_dir);
        }
        if let Some(api_key_env) = get(ENV_API_KEY_ENV) {
            config.api_key_env = api_key_env;
        }
        if let Some(format) = get(ENV_LOG_FORMAT) {
            config.log_format = format.parse()?;
        }

        Ok(config)
    }

    /// Whether this is a production deployment
    pub fn is_production(&self) -> bool {
        matches!(self.environment.as_str(), "prod" | "production")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_defaults_without_variables() {
        let config = Config::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.api_key_env, "OPENAI_API_KEY");
        assert!(!config.is_production());
    }

    #[test]
    fn test_overrides() {
        let config = Config::from_lookup(lookup(&[
            ("CONVOY_ENV", "production"),
            ("CONVOY_WORK_DIR", "/tmp/convoy"),
            ("CONVOY_API_KEY_ENV", "AZURE_OPENAI_KEY"),
            ("CONVOY_LOG_FORMAT", "json"),
        ]))
        .unwrap();

        assert!(config.is_production());
        assert_eq!(config.work_dir, PathBuf::from("/tmp/convoy"));
        assert_eq!(config.api_key_env, "AZURE_OPENAI_KEY");
        assert_eq!(config.log_format, LogFormat::Json);
    }

    #[test]
    fn test_empty_values_are_ignored() {
        let config = Config::from_lookup(lookup(&[("CONVOY_WORK_DIR", "  ")])).unwrap();
        assert_eq!(config.work_dir, PathBuf::from("work_dir"));
    }

    #[test]
    fn test_bad_log_format() {
        let err = Config::from_lookup(lookup(&[("CONVOY_LOG_FORMAT", "xml")])).unwrap_err();
        assert_eq!(err, ConfigError::InvalidLogFormat("xml".to_string()));
    }
}
