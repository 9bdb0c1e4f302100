//! `taxonomist heuristic`: path-only classification, no network.

use anyhow::Result;
use clap::Args;
use serde::Serialize;
use std::path::PathBuf;

use crate::cli::commands::{load_manifest, manifest_input};
use crate::cli::output::{format_taxonomy_table, output, CommandOutput};
use crate::domain::models::{ClassificationOutput, Config, Phase1Input};
use crate::services::path_heuristic::{heuristic_assignments, heuristic_taxonomy};
use crate::services::ResultMerger;

#[derive(Args, Debug)]
pub struct HeuristicArgs {
    /// JSON manifest of test files and test names
    pub manifest: PathBuf,

    /// Analysis identifier (defaults to the manifest's, then a new UUID)
    #[arg(long)]
    pub analysis_id: Option<String>,

    /// Source language of the tests
    #[arg(short, long)]
    pub language: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct HeuristicOutput {
    pub analysis_id: String,
    pub total_tests: usize,
    pub result: ClassificationOutput,
}

impl CommandOutput for HeuristicOutput {
    fn to_human(&self) -> String {
        format!(
            "Placed {} tests into {} domains by path\n\n{}",
            self.total_tests,
            self.result.domains.len(),
            format_taxonomy_table(&self.result),
        )
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "success": true,
            "analysis_id": self.analysis_id,
            "total_tests": self.total_tests,
            "result": self.result,
        })
    }
}

/// Classify every test from its file path alone.
pub fn classify_offline(input: &Phase1Input, default_confidence: f64) -> ClassificationOutput {
    let tests = input.tests();
    let taxonomy = heuristic_taxonomy(input);
    let assignments = heuristic_assignments(&tests);
    ResultMerger::new(default_confidence).merge(Some(&taxonomy), &assignments, tests.len())
}

pub async fn execute(args: HeuristicArgs, config: Config, json_mode: bool) -> Result<()> {
    let input = manifest_input(load_manifest(&args.manifest)?, args.analysis_id, args.language);
    let result = classify_offline(&input, config.classification.default_confidence);

    output(
        &HeuristicOutput {
            total_tests: input.test_count(),
            analysis_id: input.analysis_id,
            result,
        },
        json_mode,
    );
    Ok(())
}
