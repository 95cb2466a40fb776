//! Declarative workflow and agent specifications

use convoy_core::{Error, Result};
use convoy_runtime::{AgentConfig, GroupSettings};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

/// Kind of agent an [`AgentSpec`] declares
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AgentKind {
    /// Model-backed assistant
    Assistant,
    /// Proxy for the user
    UserProxy,
    /// Nested group chat run by a manager
    GroupChat,
}

impl AgentKind {
    /// Canonical spelling
    pub fn as_str(self) -> &'static str {
        match self {
            AgentKind::Assistant => "assistant",
            AgentKind::UserProxy => "userproxy",
            AgentKind::GroupChat => "groupchat",
        }
    }
}

impl fmt::Display for AgentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AgentKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "assistant" => Ok(AgentKind::Assistant),
            "userproxy" | "user_proxy" => Ok(AgentKind::UserProxy),
            "groupchat" | "group" => Ok(AgentKind::GroupChat),
            other => Err(other.to_string()),
        }
    }
}

/// A skill made available to an agent as Python code
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Skill {
    /// Display title
    pub title: String,
    /// Python source
    pub content: String,
    /// Extra file the source is written to, next to `skills.py`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,
    /// What the skill does
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl Skill {
    /// Skill with a title and source
    pub fn new(title: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            content: content.into(),
            file_name: None,
            description: None,
        }
    }
}

/// Members and settings of a nested group chat
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GroupChatConfig {
    /// Participants, in speaking order
    #[serde(default)]
    pub agents: Vec<AgentSpec>,

    /// Group-level settings
    #[serde(flatten)]
    pub settings: GroupSettings,
}

/// Declarative description of one agent, or of a group run by a manager
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentSpec {
    /// Declared agent type; validated when the spec is loaded
    #[serde(rename = "type", alias = "kind")]
    pub kind: String,

    /// Agent configuration (the manager's, for groups)
    pub config: AgentConfig,

    /// Skills appended to the system message
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub skills: Vec<Skill>,

    /// Members and settings, for groups only
    #[serde(default, alias = "group_config", skip_serializing_if = "Option::is_none")]
    pub groupchat_config: Option<GroupChatConfig>,
}

impl AgentSpec {
    /// Spec of an agent of the given kind
    pub fn new(kind: AgentKind, config: AgentConfig) -> Self {
        Self {
            kind: kind.as_str().to_string(),
            config,
            skills: Vec::new(),
            groupchat_config: None,
        }
    }

    /// Assistant spec
    pub fn assistant(config: AgentConfig) -> Self {
        Self::new(AgentKind::Assistant, config)
    }

    /// User proxy spec
    pub fn user_proxy(config: AgentConfig) -> Self {
        Self::new(AgentKind::UserProxy, config)
    }

    /// Group spec with its manager config and members
    pub fn group(config: AgentConfig, group: GroupChatConfig) -> Self {
        Self {
            groupchat_config: Some(group),
            ..Self::new(AgentKind::GroupChat, config)
        }
    }

    /// Attach skills
    pub fn with_skills(mut self, skills: Vec<Skill>) -> Self {
        self.skills = skills;
        self
    }

    /// Name of the declared agent
    pub fn name(&self) -> &str {
        &self.config.name
    }

    /// The declared kind, or [`Error::UnknownAgentType`]
    pub fn agent_kind(&self) -> Result<AgentKind> {
        self.kind.parse().map_err(|kind| Error::UnknownAgentType {
            agent: self.config.name.clone(),
            kind,
        })
    }
}

/// The two top-level participants of a workflow
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowConfig {
    /// Workflow name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// What the workflow does
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Agent opening the conversation
    pub sender: AgentSpec,

    /// Agent (or group) answering it
    pub receiver: AgentSpec,
}

impl WorkflowConfig {
    /// Workflow between `sender` and `receiver`
    pub fn new(sender: AgentSpec, receiver: AgentSpec) -> Self {
        Self {
            name: None,
            description: None,
            sender,
            receiver,
        }
    }

    /// Parse a workflow from JSON text
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Load a workflow from a JSON file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use convoy_runtime::SpeakerSelection;

    const GROUP_WORKFLOW: &str = r#"{
        "name": "travel",
        "sender": {"type": "userproxy", "config": {"name": "user", "code_execution_config": false}},
        "receiver": {
            "type": "groupchat",
            "config": {"name": "manager", "llm_config": false},
            "groupchat_config": {
                "agents": [
                    {"type": "assistant", "config": {"name": "planner"}},
                    {"kind": "user_proxy", "config": {"name": "executor"}, "skills": [
                        {"title": "fetch", "content": "def fetch(): pass"}
                    ]}
                ],
                "max_round": 5,
                "speaker_selection_method": "round_robin"
            }
        }
    }"#;

    #[test]
    fn test_parse_group_workflow() {
        let config = WorkflowConfig::from_json(GROUP_WORKFLOW).unwrap();
        assert_eq!(config.name.as_deref(), Some("travel"));
        assert_eq!(config.sender.agent_kind().unwrap(), AgentKind::UserProxy);

        let group = config.receiver.groupchat_config.as_ref().unwrap();
        assert_eq!(group.agents.len(), 2);
        assert_eq!(group.settings.max_round, 5);
        assert_eq!(group.settings.speaker_selection_method, SpeakerSelection::RoundRobin);
        assert_eq!(group.settings.admin_name, "Admin");
        assert_eq!(group.agents[1].agent_kind().unwrap(), AgentKind::UserProxy);
        assert_eq!(group.agents[1].skills[0].title, "fetch");
    }

    #[test]
    fn test_unknown_kind_survives_parsing() {
        let spec: AgentSpec =
            serde_json::from_str(r#"{"type": "bogus", "config": {"name": "x"}}"#).unwrap();
        let err = spec.agent_kind().unwrap_err();
        assert!(matches!(
            err,
            Error::UnknownAgentType { ref agent, ref kind } if agent == "x" && kind == "bogus"
        ));
    }

    #[test]
    fn test_kind_aliases() {
        assert_eq!("GroupChat".parse::<AgentKind>().unwrap(), AgentKind::GroupChat);
        assert_eq!("group".parse::<AgentKind>().unwrap(), AgentKind::GroupChat);
        assert_eq!("user_proxy".parse::<AgentKind>().unwrap(), AgentKind::UserProxy);
    }

    #[test]
    fn test_group_config_alias() {
        let spec: AgentSpec = serde_json::from_str(
            r#"{"type": "group", "config": {"name": "g"}, "group_config": {"agents": []}}"#,
        )
        .unwrap();
        assert!(spec.groupchat_config.is_some());
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("workflow.json");
        std::fs::write(&path, GROUP_WORKFLOW).unwrap();

        let config = WorkflowConfig::from_file(&path).unwrap();
        assert_eq!(config.receiver.name(), "manager");

        let missing = WorkflowConfig::from_file(dir.path().join("nope.json"));
        assert!(matches!(missing, Err(Error::Io(_))));
    }
}
