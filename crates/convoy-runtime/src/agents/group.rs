//! Group chats and the manager agent that runs them

use crate::config::{AgentConfig, GroupSettings, SpeakerSelection};
use crate::generator::{GenerationRequest, ReplyGenerator};
use crate::termination::TerminationCheck;
use async_trait::async_trait;
use convoy_core::{
    Agent, ConversationMemory, Error, Message, ReplyDecision, ReplyHook, Result, Role, deliver,
    run_reply_hooks,
};
use regex::Regex;
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use tracing::{debug, info, instrument, warn};

/// Participants, shared message log and settings of a multi-party conversation
pub struct GroupChat {
    agents: RwLock<Vec<Arc<dyn Agent>>>,
    messages: Mutex<Vec<Message>>,
    settings: GroupSettings,
}

impl GroupChat {
    /// Create a group chat with the given participants
    pub fn new(agents: Vec<Arc<dyn Agent>>, settings: GroupSettings) -> Self {
        Self {
            agents: RwLock::new(agents),
            messages: Mutex::new(Vec::new()),
            settings,
        }
    }

    /// Group-level settings
    pub fn settings(&self) -> &GroupSettings {
        &self.settings
    }

    /// Snapshot of the participants, in speaking order
    pub fn agents(&self) -> Vec<Arc<dyn Agent>> {
        self.agents
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Participant names, in speaking order
    pub fn agent_names(&self) -> Vec<String> {
        self.agents
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|agent| agent.name().to_string())
            .collect()
    }

    /// Number of participants
    pub fn len(&self) -> usize {
        self.agents
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Whether the group has no participants
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Participant called `name`
    pub fn agent_by_name(&self, name: &str) -> Option<Arc<dyn Agent>> {
        self.agents
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .find(|agent| agent.name() == name)
            .cloned()
    }

    /// Append a participant; names must stay unique
    pub fn add_participant(&self, agent: Arc<dyn Agent>) -> Result<()> {
        let mut agents = self.agents.write().unwrap_or_else(PoisonError::into_inner);
        if agents.iter().any(|existing| existing.name() == agent.name()) {
            return Err(Error::config(
                agent.name(),
                "a participant with this name is already in the group chat",
            ));
        }
        agents.push(agent);
        Ok(())
    }

    /// Shared message log, oldest first
    pub fn messages(&self) -> Vec<Message> {
        self.messages
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Append to the shared log
    pub fn append(&self, message: Message) {
        self.messages
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(message);
    }

    /// Empty the shared log
    pub fn reset(&self) {
        self.messages
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    /// Participant speaking after `last` among `candidates`, in group order
    ///
    /// Falls back to the first candidate when `last` is not a participant.
    pub fn next_agent(&self, last: &str, candidates: &[Arc<dyn Agent>]) -> Option<Arc<dyn Agent>> {
        let agents = self.agents();
        let start = agents
            .iter()
            .position(|agent| agent.name() == last)
            .map_or(0, |idx| idx + 1);

        (0..agents.len())
            .map(|offset| &agents[(start + offset) % agents.len()])
            .find(|agent| candidates.iter().any(|c| c.name() == agent.name()))
            .cloned()
            .or_else(|| candidates.first().cloned())
    }

    /// System prompt asking the model to pick the next speaker
    pub fn select_speaker_prompt(candidates: &[Arc<dyn Agent>]) -> String {
        let roles = candidates
            .iter()
            .map(|agent| format!("{}: {}", agent.name(), agent.description()))
            .collect::<Vec<_>>()
            .join("\n");
        format!(
            "You are in a role play game. The following roles are available:\n{roles}.\n\n\
             Read the following conversation.\n\
             Then select the next role from {} to play. Only return the role.",
            Self::name_list(candidates)
        )
    }

    fn name_list(candidates: &[Arc<dyn Agent>]) -> String {
        let names: Vec<&str> = candidates.iter().map(|agent| agent.name()).collect();
        format!("[{}]", names.join(", "))
    }

    /// The single candidate named in `answer`, if exactly one is
    fn candidate_named(
        answer: &str,
        candidates: &[Arc<dyn Agent>],
    ) -> Result<Option<Arc<dyn Agent>>> {
        let mut found = Vec::new();
        for agent in candidates {
            let pattern = format!(r"(?:^|\W){}(?:\W|$)", regex::escape(agent.name()));
            let re = Regex::new(&pattern).map_err(|e| Error::Generation(e.to_string()))?;
            if re.is_match(answer) {
                found.push(Arc::clone(agent));
            }
        }
        Ok(if found.len() == 1 { found.pop() } else { None })
    }
}

/// Agent that runs a [`GroupChat`] whenever it is asked to reply
///
/// The triggering message is stamped with the speaker's name, logged and
/// broadcast to every other participant. The selected speaker then replies,
/// and so on, until the termination predicate matches, `max_round` is reached
/// or a speaker declines. The manager itself never answers its caller.
pub struct GroupChatManager {
    config: AgentConfig,
    termination: TerminationCheck,
    groupchat: Arc<GroupChat>,
    memory: ConversationMemory,
    hooks: RwLock<Vec<Arc<dyn ReplyHook>>>,
    generator: Arc<dyn ReplyGenerator>,
}

impl GroupChatManager {
    /// Create a manager for `groupchat`
    pub fn new(
        config: AgentConfig,
        groupchat: Arc<GroupChat>,
        generator: Arc<dyn ReplyGenerator>,
    ) -> Self {
        let termination = config.is_termination_msg.clone().unwrap_or_default();
        Self {
            config,
            termination,
            groupchat,
            memory: ConversationMemory::new(),
            hooks: RwLock::new(Vec::new()),
            generator,
        }
    }

    /// The manager's configuration
    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    /// The managed group chat
    pub fn groupchat(&self) -> &Arc<GroupChat> {
        &self.groupchat
    }

    /// Number of hooks registered so far
    pub fn hook_count(&self) -> usize {
        self.hooks
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    async fn select_speaker(&self, last: &str) -> Result<Arc<dyn Agent>> {
        let agents = self.groupchat.agents();
        if agents.is_empty() {
            return Err(Error::config(&self.config.name, "group chat has no participants"));
        }

        let mut candidates: Vec<Arc<dyn Agent>> = if self.groupchat.settings.allow_repeat_speaker {
            agents.clone()
        } else {
            agents.iter().filter(|a| a.name() != last).cloned().collect()
        };
        if candidates.is_empty() {
            candidates = agents;
        }

        let round_robin = || {
            self.groupchat
                .next_agent(last, &candidates)
                .ok_or_else(|| Error::config(&self.config.name, "no speaker available"))
        };

        let llm_config = match (&self.groupchat.settings.speaker_selection_method, &self.config.llm_config) {
            (SpeakerSelection::Auto, Some(llm_config)) if candidates.len() > 1 => llm_config.clone(),
            _ => return round_robin(),
        };

        let mut messages = self.groupchat.messages();
        messages.push(Message::new(
            Role::System,
            format!(
                "Read the above conversation. Then select the next role from {} to play. Only return the role.",
                GroupChat::name_list(&candidates)
            ),
        ));
        let request = GenerationRequest {
            agent: self.config.name.clone(),
            system_message: Some(GroupChat::select_speaker_prompt(&candidates)),
            messages,
            llm_config,
        };

        let answer = self.generator.generate(request).await?.unwrap_or_default();
        match GroupChat::candidate_named(&answer, &candidates)? {
            Some(agent) => Ok(agent),
            None => {
                warn!(answer = %answer, "Speaker selection named no single participant, using round robin");
                round_robin()
            }
        }
    }

    #[instrument(skip(self, message), fields(manager = %self.config.name))]
    async fn run_chat(&self, mut message: Message, first_speaker: &str) -> Result<usize> {
        let max_round = self.groupchat.settings.max_round;
        let mut speaker_name = first_speaker.to_string();
        let mut rounds = 0;

        for round in 0..max_round {
            if message.role != Role::Function {
                message.name = Some(speaker_name.clone());
            }
            self.groupchat.append(message.clone());

            if self.termination.matches(&message) {
                debug!("Termination message in group chat");
                break;
            }

            for agent in self.groupchat.agents() {
                if agent.name() != speaker_name {
                    deliver(&message, self, agent.as_ref());
                }
            }

            if round + 1 == max_round {
                info!(max_round, "Group chat reached its round limit");
                break;
            }

            let speaker = self.select_speaker(&speaker_name).await?;
            debug!(next = %speaker.name(), "Selected next speaker");

            let Some(reply) = speaker.generate_reply(self).await? else {
                break;
            };
            deliver(&reply, speaker.as_ref(), self);
            rounds += 1;

            message = self
                .memory
                .last_with(speaker.name())
                .unwrap_or(reply);
            speaker_name = speaker.name().to_string();
        }

        Ok(rounds)
    }
}

#[async_trait]
impl Agent for GroupChatManager {
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

        let Some(message) = messages.last().cloned() else {
            return Ok(None);
        };

        let rounds = self.run_chat(message, sender.name()).await?;
        info!(manager = %self.config.name, rounds, "Group chat finished");
        Ok(None)
    }

    fn chat_messages(&self, peer: &str) -> Vec<Message> {
        self.memory.messages_with(peer)
    }

    fn clear_history(&self, peer: Option<&str>) {
        self.memory.clear(peer);
        self.groupchat.reset();
        for agent in self.groupchat.agents() {
            agent.clear_history(Some(self.name()));
        }
    }

    fn reset_consecutive_auto_reply_counter(&self, _peer: Option<&str>) {
        for agent in self.groupchat.agents() {
            agent.reset_consecutive_auto_reply_counter(Some(self.name()));
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
    use crate::agents::{AgentRole, ConversableAgent};
    use crate::config::LlmConfig;
    use crate::generator::MockReplyGenerator;

    fn silent_generator() -> Arc<dyn ReplyGenerator> {
        let mut generator = MockReplyGenerator::new();
        generator.expect_generate().never();
        Arc::new(generator)
    }

    fn member(name: &str, reply: &str) -> Arc<dyn Agent> {
        Arc::new(ConversableAgent::new(
            AgentConfig::new(name).with_default_auto_reply(reply),
            AgentRole::UserProxy,
            silent_generator(),
            None,
        ))
    }

    fn round_robin(max_round: usize) -> GroupSettings {
        GroupSettings {
            max_round,
            speaker_selection_method: SpeakerSelection::RoundRobin,
            ..GroupSettings::default()
        }
    }

    #[test]
    fn test_add_participant_rejects_duplicates() {
        let group = GroupChat::new(vec![member("a", ""), member("b", "")], GroupSettings::default());
        assert_eq!(group.len(), 2);

        group.add_participant(member("c", "")).unwrap();
        assert_eq!(group.agent_names(), vec!["a", "b", "c"]);

        let err = group.add_participant(member("a", "")).unwrap_err();
        assert!(matches!(err, Error::Config { ref agent, .. } if agent == "a"));
        assert_eq!(group.len(), 3);
    }

    #[test]
    fn test_next_agent_wraps_and_handles_outsiders() {
        let group = GroupChat::new(
            vec![member("a", ""), member("b", ""), member("c", "")],
            GroupSettings::default(),
        );
        let all = group.agents();

        assert_eq!(group.next_agent("a", &all).unwrap().name(), "b");
        assert_eq!(group.next_agent("c", &all).unwrap().name(), "a");
        assert_eq!(group.next_agent("outsider", &all).unwrap().name(), "a");

        let without_b: Vec<_> = all.iter().filter(|a| a.name() != "b").cloned().collect();
        assert_eq!(group.next_agent("a", &without_b).unwrap().name(), "c");
    }

    #[test]
    fn test_candidate_named() {
        let group = GroupChat::new(
            vec![member("coder", ""), member("critic", "")],
            GroupSettings::default(),
        );
        let all = group.agents();

        let picked = GroupChat::candidate_named("critic", &all).unwrap();
        assert_eq!(picked.unwrap().name(), "critic");
        assert!(GroupChat::candidate_named("coder or critic", &all).unwrap().is_none());
        assert!(GroupChat::candidate_named("nobody", &all).unwrap().is_none());
    }

    #[tokio::test]
    async fn test_round_robin_run_respects_max_round() {
        let group = Arc::new(GroupChat::new(
            vec![member("a", "from a"), member("b", "from b")],
            round_robin(4),
        ));
        let manager = GroupChatManager::new(AgentConfig::new("manager"), group.clone(), silent_generator());
        let user = member("user", "");
        group.add_participant(user.clone()).unwrap();

        deliver(&Message::user("kick off"), user.as_ref(), &manager);
        assert!(manager.generate_reply(user.as_ref()).await.unwrap().is_none());

        let log = group.messages();
        let speakers: Vec<_> = log.iter().map(|m| m.name.clone().unwrap()).collect();
        assert_eq!(speakers, vec!["user", "a", "b", "user"]);
        assert_eq!(log[1].content, "from a");

        // every participant heard the opening message from the manager
        let heard = group.agent_by_name("b").unwrap().chat_messages("manager");
        assert_eq!(heard[0].content, "kick off");
    }

    #[tokio::test]
    async fn test_termination_stops_group_chat() {
        let group = Arc::new(GroupChat::new(
            vec![member("a", "done. TERMINATE"), member("b", "never")],
            round_robin(10),
        ));
        let manager = GroupChatManager::new(AgentConfig::new("manager"), group.clone(), silent_generator());
        let user = member("user", "");
        group.add_participant(user.clone()).unwrap();

        deliver(&Message::user("go"), user.as_ref(), &manager);
        manager.generate_reply(user.as_ref()).await.unwrap();

        let log = group.messages();
        assert_eq!(log.len(), 2);
        assert_eq!(log[1].name.as_deref(), Some("a"));
    }

    #[tokio::test]
    async fn test_auto_selection_asks_the_model() {
        let mut generator = MockReplyGenerator::new();
        generator
            .expect_generate()
            .withf(|req| req.agent == "manager" && req.system_message.is_some())
            .times(1)
            .returning(|_| Ok(Some("b".to_string())));

        let group = Arc::new(GroupChat::new(
            vec![member("a", "from a"), member("b", "from b")],
            GroupSettings {
                max_round: 2,
                ..GroupSettings::default()
            },
        ));
        let manager = GroupChatManager::new(
            AgentConfig::new("manager").with_llm_config(LlmConfig::default()),
            group.clone(),
            Arc::new(generator),
        );
        let user = member("user", "");
        group.add_participant(user.clone()).unwrap();

        deliver(&Message::user("go"), user.as_ref(), &manager);
        manager.generate_reply(user.as_ref()).await.unwrap();

        let log = group.messages();
        assert_eq!(log[1].name.as_deref(), Some("b"));
    }

    #[tokio::test]
    async fn test_clear_history_reaches_members() {
        let group = Arc::new(GroupChat::new(
            vec![member("a", "from a"), member("b", "from b")],
            round_robin(3),
        ));
        let manager = GroupChatManager::new(AgentConfig::new("manager"), group.clone(), silent_generator());
        let user = member("user", "");
        group.add_participant(user.clone()).unwrap();

        deliver(&Message::user("first"), user.as_ref(), &manager);
        manager.generate_reply(user.as_ref()).await.unwrap();
        assert!(!group.agent_by_name("a").unwrap().chat_messages("manager").is_empty());

        manager.clear_history(Some("user"));
        for name in ["a", "b", "user"] {
            let member = group.agent_by_name(name).unwrap();
            assert!(member.chat_messages("manager").is_empty(), "{name} kept old messages");
        }
    }

    #[tokio::test]
    async fn test_counter_reset_reaches_members() {
        let capped = |name: &str| -> Arc<dyn Agent> {
            Arc::new(ConversableAgent::new(
                AgentConfig::new(name)
                    .with_default_auto_reply(format!("from {name}"))
                    .with_max_consecutive_auto_reply(1),
                AgentRole::UserProxy,
                silent_generator(),
                None,
            ))
        };
        let group = Arc::new(GroupChat::new(vec![capped("a"), capped("b")], round_robin(4)));
        let manager = GroupChatManager::new(AgentConfig::new("manager"), group.clone(), silent_generator());
        let user = member("user", "");
        group.add_participant(user.clone()).unwrap();

        for opening in ["first", "second"] {
            manager.reset_consecutive_auto_reply_counter(Some("user"));
            manager.clear_history(Some("user"));
            deliver(&Message::user(opening), user.as_ref(), &manager);
            manager.generate_reply(user.as_ref()).await.unwrap();

            let speakers: Vec<_> = group
                .messages()
                .iter()
                .map(|m| m.name.clone().unwrap())
                .collect();
            assert_eq!(speakers, vec!["user", "a", "b", "user"], "run starting with {opening}");
        }
    }

    #[tokio::test]
    async fn test_clear_history_resets_log() {
        let group = Arc::new(GroupChat::new(vec![member("a", "x")], round_robin(2)));
        let manager = GroupChatManager::new(AgentConfig::new("manager"), group.clone(), silent_generator());
        group.append(Message::user("old"));

        manager.clear_history(None);
        assert!(group.messages().is_empty());
    }
}
