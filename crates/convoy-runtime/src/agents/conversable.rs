//! Conversable agent: the assistant and user proxy building block

use crate::config::{AgentConfig, HumanInputMode};
use crate::executor::{CodeExecutor, extract_code_blocks};
use crate::generator::{GenerationRequest, ReplyGenerator};
use crate::termination::TerminationCheck;
use async_trait::async_trait;
use convoy_core::{
    Agent, ConversationMemory, Message, ReplyDecision, ReplyHook, Result, run_reply_hooks,
};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use tracing::{debug, info, instrument, warn};

/// Flavour of a [`ConversableAgent`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgentRole {
    /// Answers with the model
    Assistant,
    /// Stands in for the user, usually executing code
    UserProxy,
}

/// An agent that replies through hooks, code execution, a model or a canned answer
///
/// Each call to [`Agent::generate_reply`] runs, in order:
///
/// 1. registered reply hooks, newest first
/// 2. the termination check on the last message from the sender
/// 3. the consecutive auto-reply limit for that sender
/// 4. code execution, when enabled and the recent messages carry code blocks
/// 5. model generation, when `llm_config` is enabled
/// 6. `default_auto_reply`
pub struct ConversableAgent {
    config: AgentConfig,
    role: AgentRole,
    termination: TerminationCheck,
    memory: ConversationMemory,
    hooks: RwLock<Vec<Arc<dyn ReplyHook>>>,
    auto_replies: Mutex<HashMap<String, usize>>,
    generator: Arc<dyn ReplyGenerator>,
    executor: Option<Arc<dyn CodeExecutor>>,
}

impl ConversableAgent {
    /// Create an agent from its configuration and collaborators
    pub fn new(
        config: AgentConfig,
        role: AgentRole,
        generator: Arc<dyn ReplyGenerator>,
        executor: Option<Arc<dyn CodeExecutor>>,
    ) -> Self {
        if config.human_input_mode != HumanInputMode::Never {
            warn!(
                agent = %config.name,
                mode = ?config.human_input_mode,
                "Interactive human input is not supported, replying automatically"
            );
        }

        let termination = config.is_termination_msg.clone().unwrap_or_default();
        Self {
            config,
            role,
            termination,
            memory: ConversationMemory::new(),
            hooks: RwLock::new(Vec::new()),
            auto_replies: Mutex::new(HashMap::new()),
            generator,
            executor,
        }
    }

    /// The agent's configuration
    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    /// Assistant or user proxy
    pub fn role(&self) -> AgentRole {
        self.role
    }

    /// The system prompt, if any
    pub fn system_message(&self) -> Option<&str> {
        self.config.system_message.as_deref()
    }

    /// Number of hooks registered so far
    pub fn hook_count(&self) -> usize {
        self.hooks
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Bump the auto-reply counter for `peer`; false once the cap is reached
    fn take_auto_reply(&self, peer: &str) -> bool {
        let mut counts = self
            .auto_replies
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let count = counts.entry(peer.to_string()).or_default();
        if *count >= self.config.max_consecutive_auto_reply {
            return false;
        }
        *count += 1;
        true
    }

    async fn execute_code(&self, messages: &[Message]) -> Result<Option<Message>> {
        let (Some(exec_config), Some(executor)) =
            (&self.config.code_execution_config, &self.executor)
        else {
            return Ok(None);
        };

        let scan = exec_config.last_n_messages.unwrap_or(1);
        for message in messages.iter().rev().take(scan) {
            let blocks = extract_code_blocks(&message.content)?;
            if blocks.is_empty() {
                continue;
            }
            info!(agent = %self.config.name, blocks = blocks.len(), "Executing code from conversation");
            let result = executor.execute(&blocks, exec_config).await?;
            return Ok(Some(Message::assistant(result.to_reply())));
        }
        Ok(None)
    }
}

#[async_trait]
impl Agent for ConversableAgent {
    fn name(&self) -> &str {
        &self.config.name
    }

    fn description(&self) -> &str {
        self.config
            .description
            .as_deref()
            .or(self.config.system_message.as_deref())
            .unwrap_or_default()
    }

    fn receive(&self, message: &Message, sender: &dyn Agent) {
        self.memory.record_received(sender.name(), message);
    }

    fn record_sent(&self, message: &Message, recipient: &dyn Agent) {
        self.memory.record_sent(recipient.name(), message);
    }

    #[instrument(skip(self, sender), fields(agent = %self.config.name, sender = %sender.name()))]
    async fn generate_reply(&self, sender: &dyn Agent) -> Result<Option<Message>> {
        let messages = self.memory.messages_with(sender.name());

        let hooks = self
            .hooks
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        if let ReplyDecision::Final(reply) = run_reply_hooks(&hooks, self, &messages, sender) {
            return Ok(reply);
        }

        if messages.last().is_some_and(|last| self.termination.matches(last)) {
            debug!("Termination message received");
            self.reset_consecutive_auto_reply_counter(Some(sender.name()));
            return Ok(None);
        }

        if !self.take_auto_reply(sender.name()) {
            debug!(
                max = self.config.max_consecutive_auto_reply,
                "Consecutive auto-reply limit reached"
            );
            return Ok(None);
        }

        if let Some(reply) = self.execute_code(&messages).await? {
            return Ok(Some(reply));
        }

        if let Some(llm_config) = &self.config.llm_config {
            let request = GenerationRequest {
                agent: self.config.name.clone(),
                system_message: self.config.system_message.clone(),
                messages,
                llm_config: llm_config.clone(),
            };
            if let Some(text) = self.generator.generate(request).await? {
                return Ok(Some(Message::assistant(text)));
            }
        }

        Ok(Some(Message::assistant(self.config.default_auto_reply.clone())))
    }

    fn chat_messages(&self, peer: &str) -> Vec<Message> {
        self.memory.messages_with(peer)
    }

    fn clear_history(&self, peer: Option<&str>) {
        self.memory.clear(peer);
    }

    fn reset_consecutive_auto_reply_counter(&self, peer: Option<&str>) {
        let mut counts = self
            .auto_replies
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        match peer {
            Some(peer) => {
                counts.remove(peer);
            }
            None => counts.clear(),
        }
    }

    fn register_reply(&self, hook: Arc<dyn ReplyHook>) {
        self.hooks
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(0, hook);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{CodeExecutionConfig, LlmConfig};
    use crate::executor::{CodeBlock, ExecutionResult};
    use crate::generator::MockReplyGenerator;
    use convoy_core::{Role, deliver};

    fn silent_generator() -> Arc<dyn ReplyGenerator> {
        let mut generator = MockReplyGenerator::new();
        generator.expect_generate().never();
        Arc::new(generator)
    }

    fn proxy(name: &str) -> ConversableAgent {
        ConversableAgent::new(
            AgentConfig::new(name),
            AgentRole::UserProxy,
            silent_generator(),
            None,
        )
    }

    #[tokio::test]
    async fn test_llm_reply_sees_memory_and_system_message() {
        let mut generator = MockReplyGenerator::new();
        generator
            .expect_generate()
            .withf(|req| {
                req.agent == "assistant"
                    && req.system_message.as_deref() == Some("be brief")
                    && req.messages.len() == 1
                    && req.messages[0].role == Role::User
            })
            .times(1)
            .returning(|_| Ok(Some("hello back".to_string())));

        let assistant = ConversableAgent::new(
            AgentConfig::new("assistant")
                .with_system_message("be brief")
                .with_llm_config(LlmConfig::default()),
            AgentRole::Assistant,
            Arc::new(generator),
            None,
        );
        let user = proxy("user");

        deliver(&Message::user("hello"), &user, &assistant);
        let reply = assistant.generate_reply(&user).await.unwrap().unwrap();
        assert_eq!(reply.content, "hello back");
    }

    #[tokio::test]
    async fn test_termination_message_ends_exchange() {
        let user = proxy("user");
        let other = proxy("other");

        deliver(&Message::user("all done. TERMINATE"), &other, &user);
        assert!(user.generate_reply(&other).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_auto_reply_limit_and_reset() {
        let user = ConversableAgent::new(
            AgentConfig::new("user")
                .with_max_consecutive_auto_reply(2)
                .with_default_auto_reply("continue"),
            AgentRole::UserProxy,
            silent_generator(),
            None,
        );
        let other = proxy("other");
        deliver(&Message::user("hi"), &other, &user);

        assert_eq!(
            user.generate_reply(&other).await.unwrap().unwrap().content,
            "continue"
        );
        assert!(user.generate_reply(&other).await.unwrap().is_some());
        assert!(user.generate_reply(&other).await.unwrap().is_none());

        user.reset_consecutive_auto_reply_counter(Some("other"));
        assert!(user.generate_reply(&other).await.unwrap().is_some());
    }

    struct FakeExecutor;

    #[async_trait]
    impl CodeExecutor for FakeExecutor {
        async fn execute(
            &self,
            blocks: &[CodeBlock],
            _config: &CodeExecutionConfig,
        ) -> Result<ExecutionResult> {
            Ok(ExecutionResult {
                exit_code: 0,
                output: format!("ran {}", blocks[0].code),
            })
        }
    }

    #[tokio::test]
    async fn test_code_execution_reply() {
        let user = ConversableAgent::new(
            AgentConfig::new("user").with_code_execution(CodeExecutionConfig::default()),
            AgentRole::UserProxy,
            silent_generator(),
            Some(Arc::new(FakeExecutor)),
        );
        let assistant = proxy("assistant");

        deliver(&Message::user("```python\nprint(1)\n```"), &assistant, &user);
        let reply = user.generate_reply(&assistant).await.unwrap().unwrap();
        assert_eq!(
            reply.content,
            "exitcode: 0 (execution succeeded)\nCode output: ran print(1)"
        );
    }

    struct Stop;

    impl ReplyHook for Stop {
        fn on_reply(&self, _: &dyn Agent, _: &[Message], _: &dyn Agent) -> ReplyDecision {
            ReplyDecision::Final(Some(Message::assistant("from hook")))
        }
    }

    #[tokio::test]
    async fn test_hooks_run_before_termination() {
        let user = proxy("user");
        let other = proxy("other");
        user.register_reply(Arc::new(Stop));
        assert_eq!(user.hook_count(), 1);

        deliver(&Message::user("TERMINATE"), &other, &user);
        let reply = user.generate_reply(&other).await.unwrap().unwrap();
        assert_eq!(reply.content, "from hook");
    }

    #[test]
    fn test_description_falls_back_to_system_message() {
        let agent = ConversableAgent::new(
            AgentConfig::new("coder").with_system_message("You write code."),
            AgentRole::Assistant,
            silent_generator(),
            None,
        );
        assert_eq!(agent.description(), "You write code.");
    }
}
