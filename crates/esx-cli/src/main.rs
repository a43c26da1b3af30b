//! esx - patch legacy front-end packages into ES modules

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use esx_cli::cmd;
use esx_cli::context::Context;
use esx_cli::{Cli, Commands};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.global.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env()
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    if let Commands::Completions { shell } = cli.command {
        cmd::completions::completions(shell);
        return Ok(());
    }

    let ctx = Context::load(&cli.global)?;
    match cli.command {
        Commands::Patch => cmd::patch::patch(&ctx).await,
        Commands::List => cmd::list::list(&ctx).await,
        Commands::Modules => cmd::modules::modules(&ctx).await,
        Commands::Files => cmd::files::files(&ctx).await,
        Commands::Js { package, files } => cmd::js::js(&ctx, &package, &files).await,
        Commands::Clean { dry_run } => cmd::clean::clean(&ctx, dry_run).await,
        Commands::Completions { .. } => Ok(()),
    }
}
