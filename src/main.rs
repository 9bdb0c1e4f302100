//! Taxonomist CLI entry point.

use anyhow::Result;
use clap::Parser;

use taxonomist::cli::{commands, handle_error, Cli, Commands};
use taxonomist::infrastructure::logging::LoggerImpl;
use taxonomist::ConfigLoader;

async fn run(cli: Cli) -> Result<()> {
    let config = match &cli.config {
        Some(path) => ConfigLoader::load_from_file(path)?,
        None => ConfigLoader::load()?,
    };
    // Held for the process lifetime so the file writer flushes on exit.
    let _logger = LoggerImpl::init(&config.logging)?;

    match cli.command {
        Commands::Classify(args) => commands::classify::execute(args, config, cli.json).await,
        Commands::Heuristic(args) => commands::heuristic::execute(args, config, cli.json).await,
        Commands::Config(args) => commands::config::execute(args, config, cli.json).await,
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let json_mode = cli.json;

    if let Err(err) = run(cli).await {
        handle_error(err, json_mode);
    }
}
