//! Command execution

use crate::cli::{Cli, Commands, RunArgs, ValidateArgs};
use crate::output::{participants_table, transcript_table};
use anyhow::{Context, Result};
use convoy_runtime::{AgentRuntime, LlmReplyGenerator};
use convoy_utils::Config;
use convoy_workflow::{
    CredentialSource, JinjaSkillRenderer, WorkflowConfig, WorkflowManager, WorkflowManagerBuilder,
    parse_history_str,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

pub async fn run(cli: Cli, settings: Config) -> Result<()> {
    match cli.command {
        Commands::Run(args) => run_workflow(args, &settings).await,
        Commands::Validate(args) => validate(&args, &settings),
    }
}

fn load_workflow(path: &Path) -> Result<WorkflowConfig> {
    WorkflowConfig::from_file(path)
        .with_context(|| format!("failed to load workflow from {}", path.display()))
}

fn runtime_for(api_key_env: &str) -> AgentRuntime {
    AgentRuntime::builder()
        .generator(Arc::new(LlmReplyGenerator::new().with_api_key_env(api_key_env)))
        .build()
}

fn resolve_work_dir(flag: Option<PathBuf>, settings: &Config) -> PathBuf {
    flag.unwrap_or_else(|| settings.work_dir.clone())
}

async fn run_workflow(args: RunArgs, settings: &Config) -> Result<()> {
    let workflow = load_workflow(&args.workflow)?;
    let history = match &args.history {
        Some(path) => {
            let json = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read history from {}", path.display()))?;
            parse_history_str(&json)
                .with_context(|| format!("invalid history in {}", path.display()))?
        }
        None => Vec::new(),
    };

    let api_key_env = args
        .api_key_env
        .unwrap_or_else(|| settings.api_key_env.clone());
    let manager = WorkflowManager::builder(workflow)
        .work_dir(resolve_work_dir(args.work_dir, settings))
        .clear_work_dir(!args.keep_work_dir)
        .history(history)
        .credentials(CredentialSource::Env(api_key_env.clone()))
        .runtime(runtime_for(&api_key_env))
        .build()
        .context("failed to load workflow agents")?;

    let replies = manager
        .run(args.message, args.clear_history)
        .await
        .context("conversation failed")?;

    println!("{}", transcript_table(&manager.transcript()));
    info!(replies, "Conversation complete");

    if let Some(path) = &args.transcript {
        std::fs::write(path, manager.transcript_json()?)
            .with_context(|| format!("failed to write transcript to {}", path.display()))?;
        info!(path = %path.display(), "Transcript written");
    }

    Ok(())
}

/// Manager builder that checks the agent graph without writing into the work directory
fn validation_builder(
    workflow: WorkflowConfig,
    args: &ValidateArgs,
    settings: &Config,
) -> WorkflowManagerBuilder {
    let api_key_env = args
        .api_key_env
        .clone()
        .unwrap_or_else(|| settings.api_key_env.clone());
    WorkflowManager::builder(workflow)
        .work_dir(resolve_work_dir(args.work_dir.clone(), settings))
        .clear_work_dir(false)
        .skill_renderer(Arc::new(JinjaSkillRenderer::new().without_files()))
        .credentials(CredentialSource::Env(api_key_env.clone()))
        .runtime(runtime_for(&api_key_env))
}

fn validate(args: &ValidateArgs, settings: &Config) -> Result<()> {
    let workflow = load_workflow(&args.workflow)?;

    let manager = validation_builder(workflow, args, settings)
        .build()
        .context("workflow is invalid")?;

    println!("{}", participants_table(manager.sender(), manager.receiver()));
    println!("Workflow OK");
    Ok(())
}
