//! Turning agent specifications into live agents
//!
//! Loading happens in two phases. [`AgentFactory::resolve`] checks types,
//! sanitizes every spec and walks nested groups, so every configuration
//! error surfaces before anything is built. [`AgentFactory::instantiate`]
//! then builds the agents and registers the transcript recorder on each.

use crate::assembler::GroupAssembler;
use crate::sanitizer::Sanitizer;
use crate::spec::{AgentKind, AgentSpec};
use crate::transcript::TranscriptRecorder;
use convoy_core::{Agent, Error, Result};
use convoy_runtime::{
    AgentConfig, AgentRuntime, ConversableAgent, GroupChat, GroupChatManager, GroupSettings,
};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, instrument};

/// A spec that passed validation and sanitization
#[derive(Debug, Clone)]
pub enum ResolvedAgent {
    /// Assistant or user proxy
    Leaf {
        /// Which of the two
        kind: AgentKind,
        /// Sanitized configuration
        config: AgentConfig,
    },
    /// Group chat and its manager
    Group {
        /// Sanitized manager configuration
        config: AgentConfig,
        /// Group-level settings
        settings: GroupSettings,
        /// Resolved members, in speaking order
        members: Vec<ResolvedAgent>,
    },
}

impl ResolvedAgent {
    /// Name of the agent (the manager, for groups)
    pub fn name(&self) -> &str {
        match self {
            ResolvedAgent::Leaf { config, .. } | ResolvedAgent::Group { config, .. } => &config.name,
        }
    }

    /// Names of the direct members, empty for leaves
    pub fn member_names(&self) -> Vec<&str> {
        match self {
            ResolvedAgent::Leaf { .. } => Vec::new(),
            ResolvedAgent::Group { members, .. } => members.iter().map(ResolvedAgent::name).collect(),
        }
    }
}

/// A constructed agent
#[derive(Clone)]
pub enum LoadedAgent {
    /// Assistant or user proxy
    Leaf(Arc<ConversableAgent>),
    /// Manager of a group chat
    Group(Arc<GroupChatManager>),
}

impl LoadedAgent {
    /// The agent behind the trait object
    pub fn as_agent(&self) -> Arc<dyn Agent> {
        match self {
            LoadedAgent::Leaf(agent) => Arc::clone(agent) as Arc<dyn Agent>,
            LoadedAgent::Group(manager) => Arc::clone(manager) as Arc<dyn Agent>,
        }
    }

    /// Agent name
    pub fn name(&self) -> &str {
        match self {
            LoadedAgent::Leaf(agent) => agent.name(),
            LoadedAgent::Group(manager) => manager.name(),
        }
    }

    /// The managed group chat, for groups
    pub fn group(&self) -> Option<&Arc<GroupChat>> {
        match self {
            LoadedAgent::Leaf(_) => None,
            LoadedAgent::Group(manager) => Some(manager.groupchat()),
        }
    }
}

/// Builds agents, recursively, from specifications
pub struct AgentFactory {
    runtime: AgentRuntime,
    sanitizer: Sanitizer,
    recorder: Arc<TranscriptRecorder>,
    assembler: GroupAssembler,
}

impl AgentFactory {
    /// Factory building through `runtime` and recording into `recorder`
    pub fn new(runtime: AgentRuntime, sanitizer: Sanitizer, recorder: Arc<TranscriptRecorder>) -> Self {
        let assembler = GroupAssembler::new(runtime.clone());
        Self {
            runtime,
            sanitizer,
            recorder,
            assembler,
        }
    }

    /// The assembler used for groups
    pub fn assembler(&self) -> &GroupAssembler {
        &self.assembler
    }

    /// Resolve and instantiate `spec`
    pub fn load(&self, spec: &AgentSpec) -> Result<LoadedAgent> {
        let resolved = self.resolve(spec)?;
        Ok(self.instantiate(&resolved))
    }

    /// Validate and sanitize `spec` and everything nested in it
    #[instrument(skip(self, spec), fields(agent = %spec.name()))]
    pub fn resolve(&self, spec: &AgentSpec) -> Result<ResolvedAgent> {
        self.resolve_nested(spec, &mut Vec::new())
    }

    fn resolve_nested(&self, spec: &AgentSpec, groups: &mut Vec<String>) -> Result<ResolvedAgent> {
        let kind = spec.agent_kind()?;
        let spec = self.sanitizer.sanitize(spec.clone())?;

        if kind != AgentKind::GroupChat {
            return Ok(ResolvedAgent::Leaf {
                kind,
                config: spec.config,
            });
        }

        let name = spec.config.name.clone();
        let Some(group) = spec.groupchat_config else {
            return Err(Error::config(name, "group agent has no groupchat_config"));
        };
        if groups.contains(&name) {
            return Err(Error::config(
                &name,
                format!("group contains itself via {}", groups.join(" -> ")),
            ));
        }

        groups.push(name.clone());
        let mut members = Vec::with_capacity(group.agents.len());
        let mut seen = HashSet::new();
        for child in &group.agents {
            let member = self.resolve_nested(child, groups)?;
            if !seen.insert(member.name().to_string()) {
                return Err(Error::config(
                    member.name(),
                    format!("duplicate participant in group '{name}'"),
                ));
            }
            members.push(member);
        }
        groups.pop();

        debug!(group = %name, members = members.len(), "Resolved group");
        Ok(ResolvedAgent::Group {
            config: spec.config,
            settings: group.settings,
            members,
        })
    }

    /// Build the agents described by `resolved`
    pub fn instantiate(&self, resolved: &ResolvedAgent) -> LoadedAgent {
        match resolved {
            ResolvedAgent::Leaf { kind, config } => {
                let agent = Arc::new(match kind {
                    AgentKind::Assistant => self.runtime.create_assistant(config.clone()),
                    AgentKind::UserProxy | AgentKind::GroupChat => {
                        self.runtime.create_user_proxy(config.clone())
                    }
                });
                agent.register_reply(self.recorder.clone());
                LoadedAgent::Leaf(agent)
            }
            ResolvedAgent::Group {
                config,
                settings,
                members,
            } => {
                let members = members
                    .iter()
                    .map(|member| self.instantiate(member).as_agent())
                    .collect();
                let manager = self
                    .assembler
                    .assemble(config.clone(), settings.clone(), members);
                manager.register_reply(self.recorder.clone());
                LoadedAgent::Group(manager)
            }
        }
    }
}
