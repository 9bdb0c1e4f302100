//! Command-line interface.

pub mod commands;
pub mod output;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use commands::classify::ClassifyArgs;
use commands::config::ConfigArgs;
use commands::heuristic::HeuristicArgs;

#[derive(Parser)]
#[command(name = "taxonomist")]
#[command(about = "Taxonomist - test suite taxonomy classification", long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Output in JSON format
    #[arg(short, long, global = true)]
    pub json: bool,

    /// Configuration file (defaults to .taxonomist/config.yaml + local.yaml)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Classify a test manifest with the configured classifier
    Classify(ClassifyArgs),

    /// Classify a test manifest offline using file paths only
    Heuristic(HeuristicArgs),

    /// Show the effective configuration
    Config(ConfigArgs),
}

/// Print an error the way the selected output mode expects and exit non-zero.
pub fn handle_error(err: anyhow::Error, json_mode: bool) -> ! {
    if json_mode {
        let body = serde_json::json!({
            "success": false,
            "error": format!("{err:#}"),
        });
        eprintln!("{}", serde_json::to_string_pretty(&body).unwrap_or_default());
    } else {
        eprintln!("{} {err:#}", console::style("error:").red().bold());
    }
    std::process::exit(1);
}
