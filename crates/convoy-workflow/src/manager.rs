//! Workflow manager: loads a sender/receiver pair and runs their conversation

use crate::factory::{AgentFactory, LoadedAgent, ResolvedAgent};
use crate::history::populate_history;
use crate::sanitizer::{CredentialSource, Sanitizer};
use crate::skills::{JinjaSkillRenderer, SkillRenderer};
use crate::spec::WorkflowConfig;
use crate::transcript::{TranscriptEntry, TranscriptRecorder, TurnObserver};
use crate::workdir::{DEFAULT_WORK_DIR, WorkDir};
use convoy_core::{Error, Message, Result};
use convoy_runtime::{AgentRuntime, initiate_chat};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, instrument};

/// A loaded workflow, ready to run
///
/// Construction prepares the work directory, resolves both top-level specs
/// (so configuration errors surface before any agent exists), builds the
/// agents, adds the sender to the receiver's group when the receiver is one,
/// and replays the supplied history.
///
/// # Example
///
/// ```no_run
/// use convoy_workflow::{WorkflowConfig, WorkflowManager};
///
/// # async fn example() -> convoy_core::Result<()> {
/// let config = WorkflowConfig::from_file("workflow.json")?;
/// let manager = WorkflowManager::builder(config)
///     .work_dir("scratch")
///     .build()?;
///
/// manager.run("Plot NVDA and TSLA stock prices YTD.", false).await?;
/// println!("{}", manager.transcript_json()?);
/// # Ok(())
/// # }
/// ```
pub struct WorkflowManager {
    config: WorkflowConfig,
    work_dir: WorkDir,
    recorder: Arc<TranscriptRecorder>,
    sender: LoadedAgent,
    receiver: LoadedAgent,
}

impl WorkflowManager {
    /// Create a new manager builder for `config`
    pub fn builder(config: WorkflowConfig) -> WorkflowManagerBuilder {
        WorkflowManagerBuilder::new(config)
    }

    /// The workflow definition as loaded
    pub fn config(&self) -> &WorkflowConfig {
        &self.config
    }

    /// The prepared work directory
    pub fn work_dir(&self) -> &Path {
        self.work_dir.path()
    }

    /// Agent opening the conversation
    pub fn sender(&self) -> &LoadedAgent {
        &self.sender
    }

    /// Agent (or group manager) answering it
    pub fn receiver(&self) -> &LoadedAgent {
        &self.receiver
    }

    /// Replay `history` into the sender and receiver without generating anything
    pub fn populate_history(&self, history: &[Message]) -> usize {
        let sender = self.sender.as_agent();
        let receiver = self.receiver.as_agent();
        populate_history(history, sender.as_ref(), receiver.as_ref())
    }

    /// Run the conversation starting with `message`
    ///
    /// With `clear_history` the two agents forget what they said to each
    /// other before; the transcript and the work directory are kept. Returns
    /// the number of replies exchanged between sender and receiver.
    #[instrument(skip(self, message), fields(sender = %self.sender.name(), receiver = %self.receiver.name()))]
    pub async fn run(&self, message: impl Into<String>, clear_history: bool) -> Result<usize> {
        let sender = self.sender.as_agent();
        let receiver = self.receiver.as_agent();
        let replies = initiate_chat(
            sender.as_ref(),
            receiver.as_ref(),
            Message::user(message),
            clear_history,
        )
        .await?;
        info!(replies, turns = self.recorder.len(), "Workflow run finished");
        Ok(replies)
    }

    /// Every turn recorded so far, oldest first
    pub fn transcript(&self) -> Vec<TranscriptEntry> {
        self.recorder.entries()
    }

    /// The transcript as a JSON array
    pub fn transcript_json(&self) -> Result<String> {
        self.recorder.to_json()
    }
}

/// Builder for WorkflowManager
pub struct WorkflowManagerBuilder {
    config: WorkflowConfig,
    work_dir: PathBuf,
    clear_work_dir: bool,
    history: Vec<Message>,
    credentials: CredentialSource,
    skill_renderer: Option<Arc<dyn SkillRenderer>>,
    observer: Option<Arc<dyn TurnObserver>>,
    runtime: Option<AgentRuntime>,
}

impl WorkflowManagerBuilder {
    /// Create a new builder
    pub fn new(config: WorkflowConfig) -> Self {
        Self {
            config,
            work_dir: PathBuf::from(DEFAULT_WORK_DIR),
            clear_work_dir: true,
            history: Vec::new(),
            credentials: CredentialSource::default(),
            skill_renderer: None,
            observer: None,
            runtime: None,
        }
    }

    /// Set the work directory (default `work_dir`)
    pub fn work_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.work_dir = path.into();
        self
    }

    /// Whether to empty the work directory on build (default `true`)
    pub fn clear_work_dir(mut self, clear: bool) -> Self {
        self.clear_work_dir = clear;
        self
    }

    /// History replayed into the agents after they are built
    pub fn history(mut self, history: Vec<Message>) -> Self {
        self.history = history;
        self
    }

    /// Where the fallback API key comes from
    pub fn credentials(mut self, credentials: CredentialSource) -> Self {
        self.credentials = credentials;
        self
    }

    /// Set the skill renderer (default [`JinjaSkillRenderer`])
    pub fn skill_renderer(mut self, renderer: Arc<dyn SkillRenderer>) -> Self {
        self.skill_renderer = Some(renderer);
        self
    }

    /// Callback told about every turn
    pub fn observer(mut self, observer: Arc<dyn TurnObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    /// Set the agent runtime (default: model-backed generator, local code execution)
    pub fn runtime(mut self, runtime: AgentRuntime) -> Self {
        self.runtime = Some(runtime);
        self
    }

    /// Build the manager
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] or [`Error::UnknownAgentType`] for invalid
    /// specs, and [`Error::Io`] when the work directory cannot be prepared.
    pub fn build(self) -> Result<WorkflowManager> {
        let work_dir = WorkDir::prepare(self.work_dir, self.clear_work_dir)?;

        let recorder = Arc::new(match self.observer {
            Some(observer) => TranscriptRecorder::with_observer(observer),
            None => TranscriptRecorder::new(),
        });
        let sanitizer = Sanitizer::new(
            work_dir.path(),
            self.credentials,
            self.skill_renderer
                .unwrap_or_else(|| Arc::new(JinjaSkillRenderer::new())),
        );
        let runtime = self.runtime.unwrap_or_default();
        let factory = AgentFactory::new(runtime, sanitizer, recorder.clone());

        let sender_spec = factory.resolve(&self.config.sender)?;
        let receiver_spec = factory.resolve(&self.config.receiver)?;
        if sender_spec.name() == receiver_spec.name() {
            return Err(Error::config(
                sender_spec.name(),
                "sender and receiver must have different names",
            ));
        }
        let receiver_is_group = matches!(receiver_spec, ResolvedAgent::Group { .. });
        if receiver_is_group && receiver_spec.member_names().contains(&sender_spec.name()) {
            return Err(Error::config(
                sender_spec.name(),
                format!(
                    "sender cannot join group '{}': a member already has this name",
                    receiver_spec.name()
                ),
            ));
        }

        let sender = factory.instantiate(&sender_spec);
        let receiver = factory.instantiate(&receiver_spec);
        if let Some(group) = receiver.group() {
            factory
                .assembler()
                .add_participant(group, sender.as_agent())?;
        }

        let manager = WorkflowManager {
            config: self.config,
            work_dir,
            recorder,
            sender,
            receiver,
        };

        if !self.history.is_empty() {
            let delivered = manager.populate_history(&self.history);
            info!(delivered, "Replayed workflow history");
        }

        info!(
            sender = %manager.sender.name(),
            receiver = %manager.receiver.name(),
            dir = %manager.work_dir().display(),
            "Workflow loaded"
        );
        Ok(manager)
    }
}
