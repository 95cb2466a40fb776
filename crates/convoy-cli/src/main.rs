//! Command-line interface for convoy

mod app;
mod cli;
mod output;

use anyhow::Result;
use clap::Parser;

#[tokio::main]
async fn main() -> Result<()> {
    let settings = convoy_utils::Config::from_env()?;
    convoy_utils::init_tracing_with(settings.log_format);

    let cli = cli::Cli::parse();
    tracing::debug!(environment = %settings.environment, "Starting convoy");
    app::run(cli, settings).await
}
