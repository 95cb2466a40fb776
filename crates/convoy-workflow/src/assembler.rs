//! Building group chats out of already constructed agents

use convoy_core::{Agent, Result};
use convoy_runtime::{AgentConfig, AgentRuntime, GroupChat, GroupChatManager, GroupSettings};
use std::sync::Arc;
use tracing::info;

/// Assembles group chats and their managers
#[derive(Clone)]
pub struct GroupAssembler {
    runtime: AgentRuntime,
}

impl GroupAssembler {
    /// Assembler creating agents through `runtime`
    pub fn new(runtime: AgentRuntime) -> Self {
        Self { runtime }
    }

    /// Group chat over `members`, run by a manager built from `config`
    pub fn assemble(
        &self,
        config: AgentConfig,
        settings: GroupSettings,
        members: Vec<Arc<dyn Agent>>,
    ) -> Arc<GroupChatManager> {
        let count = members.len();
        let groupchat = self.runtime.create_group_chat(members, settings);
        let manager = self.runtime.create_group_manager(config, groupchat);
        info!(manager = %manager.name(), members = count, "Assembled group chat");
        Arc::new(manager)
    }

    /// Add `agent` to an assembled group; the name must not be taken yet
    pub fn add_participant(&self, group: &GroupChat, agent: Arc<dyn Agent>) -> Result<()> {
        let name = agent.name().to_string();
        group.add_participant(agent)?;
        info!(participant = %name, members = group.len(), "Added participant to group chat");
        Ok(())
    }
}
