use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "convoy", version, about = "Run multi-agent conversation workflows")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Load a workflow and run one conversation
    Run(RunArgs),
    /// Load a workflow without running it and list its participants
    Validate(ValidateArgs),
}

#[derive(Args, Debug)]
pub struct RunArgs {
    /// Workflow definition (JSON)
    #[arg(short, long)]
    pub workflow: PathBuf,
    /// Opening message from the sender
    #[arg(short, long)]
    pub message: String,
    /// Earlier conversation to replay first (JSON array of {role, content})
    #[arg(long)]
    pub history: Option<PathBuf>,
    /// Work directory; defaults to CONVOY_WORK_DIR or ./work_dir
    #[arg(long)]
    pub work_dir: Option<PathBuf>,
    /// Keep whatever is already in the work directory
    #[arg(long)]
    pub keep_work_dir: bool,
    /// Forget replayed history before starting
    #[arg(long)]
    pub clear_history: bool,
    /// Write the transcript as JSON to this file
    #[arg(long)]
    pub transcript: Option<PathBuf>,
    /// Environment variable holding the fallback API key
    #[arg(long)]
    pub api_key_env: Option<String>,
}

#[derive(Args, Debug)]
pub struct ValidateArgs {
    /// Workflow definition (JSON)
    #[arg(short, long)]
    pub workflow: PathBuf,
    /// Work directory; defaults to CONVOY_WORK_DIR or ./work_dir
    #[arg(long)]
    pub work_dir: Option<PathBuf>,
    /// Environment variable holding the fallback API key
    #[arg(long)]
    pub api_key_env: Option<String>,
}
