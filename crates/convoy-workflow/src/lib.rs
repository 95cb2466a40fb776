//! Declarative two-party and group-chat workflows for convoy
//!
//! A [`WorkflowConfig`] names a sender and a receiver, each an assistant, a
//! user proxy or a group chat of further agents. [`WorkflowManager`] turns it
//! into live agents, replays earlier history into them, runs conversations and
//! keeps a transcript of every turn.

pub mod assembler;
pub mod factory;
pub mod history;
pub mod manager;
pub mod sanitizer;
pub mod skills;
pub mod spec;
pub mod transcript;
pub mod workdir;

#[cfg(test)]
mod test_support;

pub use assembler::GroupAssembler;
pub use factory::{AgentFactory, LoadedAgent, ResolvedAgent};
pub use history::{parse_history, parse_history_str, populate_history};
pub use manager::{WorkflowManager, WorkflowManagerBuilder};
pub use sanitizer::{
    CredentialSource, DEFAULT_ASSISTANT_SYSTEM_MESSAGE, DEFAULT_SYSTEM_MESSAGE, Sanitizer,
};
pub use skills::{JinjaSkillRenderer, SKILLS_FILE, SkillRenderer};
pub use spec::{AgentKind, AgentSpec, GroupChatConfig, Skill, WorkflowConfig};
pub use transcript::{TranscriptEntry, TranscriptRecorder, TurnObserver};
pub use workdir::{DEFAULT_WORK_DIR, WorkDir};
