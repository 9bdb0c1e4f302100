//! `taxonomist classify`: full classification against the configured endpoint.

use anyhow::Result;
use clap::Args;
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::adapters::classifiers::AnthropicClassifier;
use crate::cli::commands::{load_manifest, manifest_input};
use crate::cli::output::{
    create_spinner, format_circuits_table, format_metrics_table, format_taxonomy_table, output, CommandOutput,
};
use crate::domain::models::{ClassificationMetrics, ClassificationOutput, Config, TaxonomySource, TokenUsage};
use crate::services::{CircuitStats, ClassificationService};

#[derive(Args, Debug)]
pub struct ClassifyArgs {
    /// JSON manifest of test files and test names
    pub manifest: PathBuf,

    /// Analysis identifier (defaults to the manifest's, then a new UUID)
    #[arg(long)]
    pub analysis_id: Option<String>,

    /// Source language of the tests
    #[arg(short, long)]
    pub language: Option<String>,

    /// Override classification.batch_size
    #[arg(long)]
    pub batch_size: Option<usize>,

    /// Override classification.wave_width
    #[arg(long)]
    pub wave_width: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct ClassifyOutput {
    pub analysis_id: String,
    pub taxonomy_source: TaxonomySource,
    pub classifier_calls: u64,
    pub usage: TokenUsage,
    pub metrics: ClassificationMetrics,
    pub result: ClassificationOutput,
    pub circuits: Vec<CircuitStats>,
}

impl CommandOutput for ClassifyOutput {
    fn to_human(&self) -> String {
        let mut rendered = format!(
            "Classified {} tests into {} domains ({:?} taxonomy, {} calls, {} tokens)\n\n{}\n\n{}",
            self.metrics.total_tests,
            self.result.domains.len(),
            self.taxonomy_source,
            self.classifier_calls,
            self.usage.total(),
            format_taxonomy_table(&self.result),
            format_metrics_table(&self.metrics),
        );
        if let Some(circuits) = format_circuits_table(&self.circuits) {
            rendered.push_str("\n\nClassifier circuits\n");
            rendered.push_str(&circuits);
        }
        rendered
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "success": true,
            "analysis_id": self.analysis_id,
            "taxonomy_source": self.taxonomy_source,
            "classifier_calls": self.classifier_calls,
            "usage": self.usage,
            "metrics": self.metrics,
            "result": self.result,
            "circuits": self.circuits,
        })
    }
}

pub async fn execute(args: ClassifyArgs, mut config: Config, json_mode: bool) -> Result<()> {
    if let Some(batch_size) = args.batch_size {
        config.classification.batch_size = batch_size;
    }
    if let Some(wave_width) = args.wave_width {
        config.classification.wave_width = wave_width;
    }

    let input = manifest_input(load_manifest(&args.manifest)?, args.analysis_id, args.language);
    let client = Arc::new(AnthropicClassifier::from_config(&config.classifier)?);
    let service = ClassificationService::from_config(client, config);

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Interrupted, cancelling classification");
            on_interrupt.cancel();
        }
    });

    let spinner = (!json_mode).then(|| {
        create_spinner(format!("Classifying {} tests from {} files", input.test_count(), input.files.len()))
    });
    let result = service.classify_with_cancel(&input, cancel).await;
    if let Some(spinner) = spinner {
        spinner.finish_and_clear();
    }
    let run = result?;

    let metrics = run.metrics.log(&input.analysis_id);
    output(
        &ClassifyOutput {
            analysis_id: input.analysis_id,
            taxonomy_source: run.taxonomy_source,
            classifier_calls: run.classifier_calls,
            usage: run.usage,
            metrics,
            result: run.output,
            circuits: run.circuits,
        },
        json_mode,
    );
    Ok(())
}
