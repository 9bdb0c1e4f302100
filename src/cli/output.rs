//! Output formatting utilities for the CLI.

use comfy_table::{presets, Cell, CellAlignment, ContentArrangement, Table};
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use std::time::Duration;

use crate::domain::models::{ClassificationMetrics, ClassificationOutput};
use crate::services::CircuitStats;

const SPINNER_TEMPLATE: &str = "[{elapsed_precise}] {spinner:.green} {msg}";
const SPINNER_CHARS: &str = "⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏";

pub trait CommandOutput: Serialize {
    fn to_human(&self) -> String;
    fn to_json(&self) -> serde_json::Value;
}

pub fn output<T: CommandOutput>(result: &T, json_mode: bool) {
    if json_mode {
        println!("{}", serde_json::to_string_pretty(&result.to_json()).unwrap_or_default());
    } else {
        println!("{}", result.to_human());
    }
}

/// Spinner on stderr for indeterminate operations.
pub fn create_spinner(message: impl Into<String>) -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template(SPINNER_TEMPLATE) {
        spinner.set_style(style.tick_chars(SPINNER_CHARS));
    }
    spinner.set_message(message.into());
    spinner.enable_steady_tick(Duration::from_millis(100));
    spinner
}

fn table(headers: &[&str]) -> Table {
    let mut table = Table::new();
    table
        .load_preset(presets::UTF8_BORDERS_ONLY)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(headers.iter().map(|h| Cell::new(h.to_uppercase())).collect::<Vec<_>>());
    table
}

/// Domains, features and test counts.
pub fn format_taxonomy_table(output: &ClassificationOutput) -> String {
    let mut table = table(&["Domain", "Feature", "Tests"]);
    for domain in &output.domains {
        for (position, feature) in domain.features.iter().enumerate() {
            let domain_cell = if position == 0 { domain.name.as_str() } else { "" };
            table.add_row(vec![
                Cell::new(domain_cell),
                Cell::new(&feature.name),
                Cell::new(feature.test_indices.len()).set_alignment(CellAlignment::Right),
            ]);
        }
    }
    table.to_string()
}

fn percent(rate: f64) -> String {
    format!("{:.1}%", rate * 100.0)
}

pub fn format_metrics_table(metrics: &ClassificationMetrics) -> String {
    let mut table = table(&["Metric", "Value"]);
    let uncategorized = if metrics.has_quality_violation() {
        console::style(percent(metrics.uncategorized_rate)).yellow().to_string()
    } else {
        percent(metrics.uncategorized_rate)
    };
    let rows = [
        ("Total tests", metrics.total_tests.to_string()),
        ("Batches", metrics.batch_count.to_string()),
        ("Classification rate", percent(metrics.classification_rate)),
        ("Fallback rate", percent(metrics.fallback_rate)),
        ("Retries per batch", format!("{:.2}", metrics.retry_rate)),
        ("Heuristic placements", metrics.heuristic_fallback_count.to_string()),
        ("Uncategorized", uncategorized),
    ];
    for (name, value) in rows {
        table.add_row(vec![Cell::new(name), Cell::new(value).set_alignment(CellAlignment::Right)]);
    }
    table.to_string()
}

/// Circuits that are not closed; `None` when every circuit is healthy.
pub fn format_circuits_table(circuits: &[CircuitStats]) -> Option<String> {
    let mut tripped = circuits.iter().filter(|c| c.state != "closed").peekable();
    tripped.peek()?;

    let mut table = table(&["Phase", "State", "Failures", "Opened"]);
    for circuit in tripped {
        table.add_row(vec![
            Cell::new(&circuit.phase),
            Cell::new(console::style(&circuit.state).red().to_string()),
            Cell::new(circuit.failure_count).set_alignment(CellAlignment::Right),
            Cell::new(circuit.opened_at.map(|at| at.to_rfc3339()).unwrap_or_default()),
        ]);
    }
    Some(table.to_string())
}
