//! Load-time defaults and validation for agent specifications

use crate::skills::SkillRenderer;
use crate::spec::{AgentKind, AgentSpec};
use convoy_core::{Error, Result};
use convoy_runtime::{DEFAULT_API_KEY_ENV, ModelEntry, TerminationCheck};
use std::env;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

/// System message of assistants that declare none but carry skills
pub const DEFAULT_ASSISTANT_SYSTEM_MESSAGE: &str = "You are a helpful AI assistant.
Solve tasks using your coding and language skills.
In the following cases, suggest python code (in a python coding block) or shell script (in a sh coding block) for the user to execute.
    1. When you need to collect info, use the code to output the info you need, for example, browse or search the web, download/read a file, print the content of a webpage or a file, get the current date/time, check the operating system. After sufficient info is printed and the task is ready to be solved based on your language skill, you can solve the task by yourself.
    2. When you need to perform some task with code, use the code to perform the task and output the result. Finish the task smartly.
Solve the task step by step if you need to. If a plan is not provided, explain your plan first. Be clear which step uses code, and which step uses your language skill.
When using code, you must indicate the script type in the code block. The user cannot provide any other feedback or perform any other action beyond executing the code you suggest. The user can't modify your code. So do not suggest incomplete code which requires users to modify. Don't use a code block if it's not intended to be executed by the user.
If you want the user to save the code in a file before executing it, put # filename: <filename> inside the code block as the first line. Don't include multiple code blocks in one response. Do not ask users to copy and paste the result. Instead, use 'print' function for the output when relevant. Check the execution result returned by the user.
If the result indicates there is an error, fix the error and output the code again. Suggest the full code instead of partial code or code changes. If the error can't be fixed or if the task is not solved even after the code is executed successfully, analyze the problem, revisit your assumption, collect additional info you need, and think of a different approach to try.
When you find an answer, verify the answer carefully. Include verifiable evidence in your response if possible.
Reply \"TERMINATE\" in the end when everything is done.";

/// System message of every other agent that declares none but carries skills
pub const DEFAULT_SYSTEM_MESSAGE: &str = "You are a helpful AI Assistant.";

/// Where the fallback API key comes from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CredentialSource {
    /// Read this environment variable at sanitization time
    Env(String),
    /// Use this value; `None` means no fallback at all
    Fixed(Option<String>),
}

impl CredentialSource {
    /// The fallback key, if one is available and non-empty
    pub fn resolve(&self) -> Option<String> {
        match self {
            CredentialSource::Env(var) => env::var(var).ok(),
            CredentialSource::Fixed(value) => value.clone(),
        }
        .filter(|key| !key.is_empty())
    }
}

impl Default for CredentialSource {
    fn default() -> Self {
        CredentialSource::Env(DEFAULT_API_KEY_ENV.to_string())
    }
}

impl fmt::Display for CredentialSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CredentialSource::Env(var) => write!(f, "the {var} environment variable"),
            CredentialSource::Fixed(_) => f.write_str("the configured fallback key"),
        }
    }
}

/// Fills in defaults and validates a single agent specification
pub struct Sanitizer {
    work_dir: PathBuf,
    credentials: CredentialSource,
    skills: Arc<dyn SkillRenderer>,
}

impl Sanitizer {
    /// Sanitizer for agents working in `work_dir`
    pub fn new(
        work_dir: impl Into<PathBuf>,
        credentials: CredentialSource,
        skills: Arc<dyn SkillRenderer>,
    ) -> Self {
        Self {
            work_dir: work_dir.into(),
            credentials,
            skills,
        }
    }

    /// Directory code execution and skill files are pointed at
    pub fn work_dir(&self) -> &Path {
        &self.work_dir
    }

    /// Return `spec` with defaults applied
    ///
    /// Fails with [`Error::Config`] when an enabled `llm_config` has an entry
    /// without key and no fallback key is available. Sanitizing an already
    /// sanitized spec changes nothing.
    pub fn sanitize(&self, mut spec: AgentSpec) -> Result<AgentSpec> {
        let kind = spec.agent_kind()?;
        let config = &mut spec.config;

        if config.is_termination_msg.is_none() {
            config.is_termination_msg = Some(TerminationCheck::keyword());
        }

        if let Some(llm_config) = config.llm_config.as_mut() {
            if llm_config.config_list.is_empty() {
                llm_config.config_list.push(ModelEntry::default());
            }

            let mut fallback = None;
            let entries = std::mem::take(&mut llm_config.config_list);
            for mut entry in entries {
                if !entry.has_api_key() {
                    if fallback.is_none() {
                        fallback = self.credentials.resolve();
                    }
                    let Some(key) = fallback.clone() else {
                        return Err(Error::config(
                            &config.name,
                            format!(
                                "api_key is missing for model '{}' and no key was found in {}",
                                entry.model, self.credentials
                            ),
                        ));
                    };
                    entry.api_key = Some(key);
                }
                llm_config.config_list.push(entry.sanitized());
            }
        }

        if let Some(exec) = config.code_execution_config.as_mut() {
            exec.work_dir = Some(self.work_dir.clone());
            exec.use_docker = false;
        }

        if !spec.skills.is_empty() {
            let prompt = self.skills.render(&spec.skills, &self.work_dir)?;
            let default_message = match kind {
                AgentKind::Assistant => DEFAULT_ASSISTANT_SYSTEM_MESSAGE,
                AgentKind::UserProxy | AgentKind::GroupChat => DEFAULT_SYSTEM_MESSAGE,
            };
            let base = spec
                .config
                .system_message
                .take()
                .unwrap_or_else(|| default_message.to_string());
            spec.config.system_message = Some(if base.ends_with(&prompt) {
                base
            } else {
                format!("{base}\n\n{prompt}")
            });
        }

        debug!(agent = %spec.config.name, kind = %kind, "Sanitized agent spec");
        Ok(spec)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::skills::JinjaSkillRenderer;
    use crate::spec::Skill;
    use convoy_core::Message;
    use convoy_runtime::{AgentConfig, CodeExecutionConfig, LlmConfig};
    use serde_json::json;

    fn sanitizer(dir: &Path, credentials: CredentialSource) -> Sanitizer {
        Sanitizer::new(
            dir,
            credentials,
            Arc::new(JinjaSkillRenderer::new().without_files()),
        )
    }

    fn llm_with(entries: Vec<ModelEntry>) -> LlmConfig {
        LlmConfig {
            config_list: entries,
            ..LlmConfig::default()
        }
    }

    #[test]
    fn test_installs_keyword_termination() {
        let dir = tempfile::tempdir().unwrap();
        let spec = sanitizer(dir.path(), CredentialSource::Fixed(None))
            .sanitize(AgentSpec::user_proxy(AgentConfig::new("user")))
            .unwrap();

        let check = spec.config.is_termination_msg.unwrap();
        assert!(check.matches(&Message::user("...done. TERMINATE")));
        assert!(!check.matches(&Message::user("TERMINATE is a keyword")));
    }

    #[test]
    fn test_missing_credential_names_agent() {
        let dir = tempfile::tempdir().unwrap();
        let spec = AgentSpec::assistant(
            AgentConfig::new("planner").with_llm_config(llm_with(vec![ModelEntry::new("gpt-4o")])),
        );

        let err = sanitizer(dir.path(), CredentialSource::Fixed(Some(String::new())))
            .sanitize(spec)
            .unwrap_err();
        assert!(matches!(err, Error::Config { ref agent, .. } if agent == "planner"));
    }

    #[test]
    fn test_missing_env_credential_fails() {
        let dir = tempfile::tempdir().unwrap();
        let spec = AgentSpec::assistant(AgentConfig::new("planner").with_llm_config(LlmConfig::default()));

        let err = sanitizer(
            dir.path(),
            CredentialSource::Env("CONVOY_SANITIZER_TEST_UNSET_KEY".to_string()),
        )
        .sanitize(spec)
        .unwrap_err();
        assert!(err.to_string().contains("CONVOY_SANITIZER_TEST_UNSET_KEY"));
    }

    #[test]
    fn test_fallback_key_and_null_fields() {
        let dir = tempfile::tempdir().unwrap();
        let entry: ModelEntry =
            serde_json::from_value(json!({"model": "gpt-4o", "organization": null, "seed": 42}))
                .unwrap();
        let inline = ModelEntry::new("local").with_api_key("inline");
        let spec = AgentSpec::assistant(
            AgentConfig::new("planner").with_llm_config(llm_with(vec![entry, inline])),
        );

        let spec = sanitizer(dir.path(), CredentialSource::Fixed(Some("sk-env".to_string())))
            .sanitize(spec)
            .unwrap();
        let list = spec.config.llm_config.unwrap().config_list;
        assert_eq!(list[0].api_key.as_deref(), Some("sk-env"));
        assert_eq!(list[0].extra.len(), 1);
        assert_eq!(list[0].extra["seed"], json!(42));
        assert_eq!(list[1].api_key.as_deref(), Some("inline"));
    }

    #[test]
    fn test_code_execution_policy() {
        let dir = tempfile::tempdir().unwrap();
        let spec = AgentSpec::user_proxy(AgentConfig::new("user").with_code_execution(
            CodeExecutionConfig {
                work_dir: Some(PathBuf::from("elsewhere")),
                use_docker: true,
                ..CodeExecutionConfig::default()
            },
        ));

        let spec = sanitizer(dir.path(), CredentialSource::Fixed(None))
            .sanitize(spec)
            .unwrap();
        let exec = spec.config.code_execution_config.unwrap();
        assert_eq!(exec.work_dir.as_deref(), Some(dir.path()));
        assert!(!exec.use_docker);
    }

    #[test]
    fn test_skills_use_type_default_system_message() {
        let dir = tempfile::tempdir().unwrap();
        let sanitizer = sanitizer(dir.path(), CredentialSource::Fixed(None));
        let skills = vec![Skill::new("fetch", "def fetch(): pass")];

        let assistant = sanitizer
            .sanitize(AgentSpec::assistant(AgentConfig::new("a")).with_skills(skills.clone()))
            .unwrap();
        let message = assistant.config.system_message.unwrap();
        assert!(message.starts_with(DEFAULT_ASSISTANT_SYSTEM_MESSAGE));
        assert!(message.contains("\n\nWhile solving the task"));

        let proxy = sanitizer
            .sanitize(AgentSpec::user_proxy(AgentConfig::new("u")).with_skills(skills))
            .unwrap();
        assert!(proxy.config.system_message.unwrap().starts_with(DEFAULT_SYSTEM_MESSAGE));
    }

    #[test]
    fn test_sanitize_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let sanitizer = sanitizer(dir.path(), CredentialSource::Fixed(Some("sk".to_string())));
        let spec = AgentSpec::assistant(
            AgentConfig::new("a")
                .with_system_message("Plan trips.")
                .with_llm_config(LlmConfig::default())
                .with_code_execution(CodeExecutionConfig::default()),
        )
        .with_skills(vec![Skill::new("fetch", "def fetch(): pass")]);

        let once = sanitizer.sanitize(spec).unwrap();
        let twice = sanitizer.sanitize(once.clone()).unwrap();

        assert_eq!(once.config.system_message, twice.config.system_message);
        assert_eq!(once.config.code_execution_config, twice.config.code_execution_config);
        assert_eq!(once.config.llm_config, twice.config.llm_config);
        let (first, second) = (
            once.config.is_termination_msg.unwrap(),
            twice.config.is_termination_msg.unwrap(),
        );
        assert!(first.same_as(&second));
    }

    #[test]
    fn test_unknown_kind_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let mut spec = AgentSpec::assistant(AgentConfig::new("x"));
        spec.kind = "bogus".to_string();

        let err = sanitizer(dir.path(), CredentialSource::Fixed(None))
            .sanitize(spec)
            .unwrap_err();
        assert!(matches!(err, Error::UnknownAgentType { .. }));
    }
}
