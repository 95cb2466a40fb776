//! Code execution for fenced code blocks found in messages

use crate::config::CodeExecutionConfig;
use async_trait::async_trait;
use convoy_core::{Error, Result};
use regex::Regex;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, info, instrument, warn};

/// Per-block timeout when the config sets none
pub const DEFAULT_EXECUTION_TIMEOUT_SECS: u64 = 60;

const CODE_BLOCK_PATTERN: &str = r"(?s)```[ \t]*(\w+)?[ \t]*\r?\n(.*?)\r?\n[ \t]*```";

/// A fenced code block
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeBlock {
    /// Language tag, empty when the fence has none
    pub language: String,
    /// Code between the fences
    pub code: String,
}

/// Combined outcome of running a message's code blocks
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionResult {
    /// Exit code of the last block that ran
    pub exit_code: i32,
    /// Output of every block that ran, in order
    pub output: String,
}

impl ExecutionResult {
    /// Whether every block exited with 0
    pub fn succeeded(&self) -> bool {
        self.exit_code == 0
    }

    /// Reply text reporting this result back into the conversation
    pub fn to_reply(&self) -> String {
        let status = if self.succeeded() {
            "execution succeeded"
        } else {
            "execution failed"
        };
        format!(
            "exitcode: {} ({status})\nCode output: {}",
            self.exit_code, self.output
        )
    }
}

/// Every fenced code block in `text`, in order
pub fn extract_code_blocks(text: &str) -> Result<Vec<CodeBlock>> {
    let re = Regex::new(CODE_BLOCK_PATTERN).map_err(|e| Error::Execution(e.to_string()))?;
    Ok(re
        .captures_iter(text)
        .map(|caps| CodeBlock {
            language: caps
                .get(1)
                .map(|m| m.as_str().to_ascii_lowercase())
                .unwrap_or_default(),
            code: caps.get(2).map(|m| m.as_str().to_string()).unwrap_or_default(),
        })
        .collect())
}

/// Runs code blocks on behalf of an agent
#[async_trait]
pub trait CodeExecutor: Send + Sync {
    /// Run `blocks` in order, stopping at the first failure
    async fn execute(
        &self,
        blocks: &[CodeBlock],
        config: &CodeExecutionConfig,
    ) -> Result<ExecutionResult>;
}

/// Executor running blocks as local processes inside the work directory
///
/// Python blocks (and untagged ones) run through `python3 -c`, shell blocks
/// through `sh -c`. Other languages are reported as failed executions.
#[derive(Debug, Clone)]
pub struct LocalCodeExecutor {
    python: String,
    default_timeout: Duration,
}

impl LocalCodeExecutor {
    /// Executor using `python3` and a 60 second timeout
    pub fn new() -> Self {
        Self {
            python: "python3".to_string(),
            default_timeout: Duration::from_secs(DEFAULT_EXECUTION_TIMEOUT_SECS),
        }
    }

    /// Use a different Python interpreter
    pub fn with_python(mut self, python: impl Into<String>) -> Self {
        self.python = python.into();
        self
    }

    /// Timeout used when the config sets none
    pub fn with_default_timeout(mut self, timeout: Duration) -> Self {
        self.default_timeout = timeout;
        self
    }

    fn interpreter(&self, language: &str) -> Option<&str> {
        match language {
            "" | "python" | "py" | "python3" => Some(&self.python),
            "sh" | "bash" | "shell" | "console" => Some("sh"),
            _ => None,
        }
    }

    async fn run_block(
        &self,
        interpreter: &str,
        block: &CodeBlock,
        work_dir: &Path,
        timeout: Duration,
    ) -> Result<ExecutionResult> {
        let mut command = Command::new(interpreter);
        command
            .arg("-c")
            .arg(&block.code)
            .current_dir(work_dir)
            .kill_on_drop(true);

        match tokio::time::timeout(timeout, command.output()).await {
            Ok(output) => {
                let output = output.map_err(|e| {
                    Error::Execution(format!("failed to launch {interpreter}: {e}"))
                })?;
                let mut text = String::from_utf8_lossy(&output.stdout).into_owned();
                text.push_str(&String::from_utf8_lossy(&output.stderr));
                Ok(ExecutionResult {
                    exit_code: output.status.code().unwrap_or(-1),
                    output: text,
                })
            }
            Err(_) => {
                warn!("Code block timed out after {:?}", timeout);
                Ok(ExecutionResult {
                    exit_code: 1,
                    output: "Timeout".to_string(),
                })
            }
        }
    }
}

impl Default for LocalCodeExecutor {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CodeExecutor for LocalCodeExecutor {
    #[instrument(skip(self, blocks, config), fields(blocks = blocks.len()))]
    async fn execute(
        &self,
        blocks: &[CodeBlock],
        config: &CodeExecutionConfig,
    ) -> Result<ExecutionResult> {
        let work_dir = config
            .work_dir
            .clone()
            .unwrap_or_else(|| PathBuf::from("."));
        tokio::fs::create_dir_all(&work_dir).await?;
        let timeout = config
            .timeout
            .map_or(self.default_timeout, Duration::from_secs);

        let mut combined = ExecutionResult {
            exit_code: 0,
            output: String::new(),
        };

        for (idx, block) in blocks.iter().enumerate() {
            let Some(interpreter) = self.interpreter(&block.language) else {
                combined.exit_code = 1;
                combined
                    .output
                    .push_str(&format!("unknown language {}", block.language));
                break;
            };

            info!(
                "Executing code block {} ({})",
                idx + 1,
                if block.language.is_empty() {
                    "python"
                } else {
                    &block.language
                }
            );
            let result = self.run_block(interpreter, block, &work_dir, timeout).await?;
            debug!(exit_code = result.exit_code, "Code block finished");

            combined.exit_code = result.exit_code;
            combined.output.push_str(&result.output);
            if !result.succeeded() {
                break;
            }
        }

        Ok(combined)
    }
}
