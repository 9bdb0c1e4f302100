//! `taxonomist config`: print the effective configuration.

use anyhow::{Context, Result};
use clap::Args;
use serde::Serialize;

use crate::cli::output::{output, CommandOutput};
use crate::domain::models::Config;

#[derive(Args, Debug)]
pub struct ConfigArgs {
    /// Only print the named section (classification, cache, retry, ...)
    #[arg(long)]
    pub section: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ConfigOutput {
    pub config: serde_json::Value,
    /// API keys are never printed, only whether one resolves.
    pub api_key_configured: bool,
}

impl CommandOutput for ConfigOutput {
    fn to_human(&self) -> String {
        let yaml = serde_yaml::to_string(&self.config).unwrap_or_default();
        let key = if self.api_key_configured { "set" } else { "not set" };
        format!("{}\n# api key: {key}", yaml.trim_end())
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "config": self.config,
            "api_key_configured": self.api_key_configured,
        })
    }
}

fn render(config: &Config, section: Option<&str>) -> Result<serde_json::Value> {
    let value = serde_json::to_value(config).context("Failed to render configuration")?;
    let Some(section) = section else {
        return Ok(value);
    };
    value
        .get(section)
        .cloned()
        .with_context(|| format!("Unknown configuration section: {section}"))
}

pub async fn execute(args: ConfigArgs, config: Config, json_mode: bool) -> Result<()> {
    let rendered = render(&config, args.section.as_deref())?;
    output(
        &ConfigOutput {
            config: rendered,
            api_key_configured: config.classifier.resolve_api_key().is_some(),
        },
        json_mode,
    );
    Ok(())
}
