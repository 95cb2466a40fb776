//! Runtime holding the collaborators every agent shares
//!
//! The AgentRuntime owns the reply generator and the code executor and hands
//! them to the agents it creates.

use crate::agents::{AgentRole, ConversableAgent, GroupChat, GroupChatManager};
use crate::config::{AgentConfig, GroupSettings};
use crate::executor::{CodeExecutor, LocalCodeExecutor};
use crate::generator::{LlmReplyGenerator, ReplyGenerator};
use convoy_core::Agent;
use std::sync::Arc;

/// Shared collaborators and factory methods for agents
///
/// # Example
///
/// ```no_run
/// use convoy_runtime::{AgentConfig, AgentRuntime, LlmReplyGenerator};
/// use std::sync::Arc;
///
/// let runtime = AgentRuntime::builder()
///     .generator(Arc::new(LlmReplyGenerator::new()))
///     .build();
///
/// let assistant = runtime.create_assistant(AgentConfig::new("assistant"));
/// let user = runtime.create_user_proxy(AgentConfig::new("user"));
/// ```
#[derive(Clone)]
pub struct AgentRuntime {
    generator: Arc<dyn ReplyGenerator>,
    executor: Option<Arc<dyn CodeExecutor>>,
}

impl AgentRuntime {
    /// Create a runtime from its collaborators
    pub fn new(
        generator: Arc<dyn ReplyGenerator>,
        executor: Option<Arc<dyn CodeExecutor>>,
    ) -> Self {
        Self {
            generator,
            executor,
        }
    }

    /// Create a new runtime builder
    pub fn builder() -> AgentRuntimeBuilder {
        AgentRuntimeBuilder::new()
    }

    /// The shared reply generator
    pub fn generator(&self) -> &Arc<dyn ReplyGenerator> {
        &self.generator
    }

    /// The shared code executor, if any
    pub fn executor(&self) -> Option<&Arc<dyn CodeExecutor>> {
        self.executor.as_ref()
    }

    /// Create an assistant agent
    pub fn create_assistant(&self, config: AgentConfig) -> ConversableAgent {
        self.create_conversable(config, AgentRole::Assistant)
    }

    /// Create a user proxy agent
    pub fn create_user_proxy(&self, config: AgentConfig) -> ConversableAgent {
        self.create_conversable(config, AgentRole::UserProxy)
    }

    /// Create a conversable agent of the given role
    pub fn create_conversable(&self, config: AgentConfig, role: AgentRole) -> ConversableAgent {
        ConversableAgent::new(
            config,
            role,
            Arc::clone(&self.generator),
            self.executor.clone(),
        )
    }

    /// Create a group chat over `agents`
    pub fn create_group_chat(
        &self,
        agents: Vec<Arc<dyn Agent>>,
        settings: GroupSettings,
    ) -> Arc<GroupChat> {
        Arc::new(GroupChat::new(agents, settings))
    }

    /// Create the manager running `groupchat`
    pub fn create_group_manager(
        &self,
        config: AgentConfig,
        groupchat: Arc<GroupChat>,
    ) -> GroupChatManager {
        GroupChatManager::new(config, groupchat, Arc::clone(&self.generator))
    }
}

impl Default for AgentRuntime {
    fn default() -> Self {
        Self::builder().build()
    }
}

/// Builder for AgentRuntime
pub struct AgentRuntimeBuilder {
    generator: Option<Arc<dyn ReplyGenerator>>,
    executor: Option<Arc<dyn CodeExecutor>>,
    code_execution: bool,
}

impl AgentRuntimeBuilder {
    /// Create a new runtime builder
    pub fn new() -> Self {
        Self {
            generator: None,
            executor: None,
            code_execution: true,
        }
    }

    /// Set the reply generator
    pub fn generator(mut self, generator: Arc<dyn ReplyGenerator>) -> Self {
        self.generator = Some(generator);
        self
    }

    /// Set the code executor
    pub fn executor(mut self, executor: Arc<dyn CodeExecutor>) -> Self {
        self.executor = Some(executor);
        self.code_execution = true;
        self
    }

    /// Build agents that never execute code, whatever their config says
    pub fn without_code_execution(mut self) -> Self {
        self.executor = None;
        self.code_execution = false;
        self
    }

    /// Build the runtime
    ///
    /// Defaults to [`LlmReplyGenerator`] and [`LocalCodeExecutor`].
    pub fn build(self) -> AgentRuntime {
        let generator = self
            .generator
            .unwrap_or_else(|| Arc::new(LlmReplyGenerator::new()));
        let executor = if self.code_execution {
            Some(
                self.executor
                    .unwrap_or_else(|| Arc::new(LocalCodeExecutor::new())),
            )
        } else {
            None
        };
        AgentRuntime::new(generator, executor)
    }
}

impl Default for AgentRuntimeBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generator::MockReplyGenerator;

    #[test]
    fn test_builder_defaults() {
        let runtime = AgentRuntime::builder().build();
        assert!(runtime.executor().is_some());
    }

    #[test]
    fn test_without_code_execution() {
        let runtime = AgentRuntime::builder().without_code_execution().build();
        assert!(runtime.executor().is_none());
    }

    #[test]
    fn test_agents_share_the_generator() {
        let generator: Arc<dyn ReplyGenerator> = Arc::new(MockReplyGenerator::new());
        let runtime = AgentRuntime::builder().generator(generator.clone()).build();

        assert!(Arc::ptr_eq(runtime.generator(), &generator));

        let assistant = runtime.create_assistant(AgentConfig::new("assistant"));
        let proxy = runtime.create_user_proxy(AgentConfig::new("user"));
        assert_eq!(assistant.role(), AgentRole::Assistant);
        assert_eq!(proxy.role(), AgentRole::UserProxy);
    }

    #[test]
    fn test_created_proxy_replies_without_model() {
        let mut generator = MockReplyGenerator::new();
        generator.expect_generate().never();
        let runtime = AgentRuntime::builder()
            .generator(Arc::new(generator))
            .without_code_execution()
            .build();
        let proxy = runtime.create_user_proxy(AgentConfig::new("user").with_default_auto_reply("ok"));
        let other = runtime.create_user_proxy(AgentConfig::new("other"));

        convoy_core::deliver(&convoy_core::Message::user("hi"), &other, &proxy);
        let reply = tokio_test::block_on(proxy.generate_reply(&other)).unwrap();
        assert_eq!(reply.unwrap().content, "ok");
    }

    #[test]
    fn test_group_manager_wraps_group() {
        let runtime = AgentRuntime::builder().without_code_execution().build();
        let a: Arc<dyn Agent> = Arc::new(runtime.create_assistant(AgentConfig::new("a")));
        let group = runtime.create_group_chat(vec![a], GroupSettings::default());
        let manager = runtime.create_group_manager(AgentConfig::new("manager"), group.clone());

        assert_eq!(manager.name(), "manager");
        assert!(Arc::ptr_eq(manager.groupchat(), &group));
    }
}
