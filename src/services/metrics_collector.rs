//! Quality metrics for one classification request.

use std::collections::BTreeMap;
use std::sync::Mutex;
use tracing::{info, warn};

use crate::domain::models::{ClassificationMetrics, ClassificationOutput};
use crate::services::fallback_chain::BatchStats;

/// Names that mean "we did not really classify this".
const GENERIC_NAMES: &[&str] = &["uncategorized", "general", "other", "misc", "miscellaneous"];

fn is_generic(name: &str) -> bool {
    GENERIC_NAMES.contains(&name.trim().to_lowercase().as_str())
}

#[derive(Debug, Default)]
struct Tally {
    total_tests: usize,
    batch_count: usize,
    retries: u32,
    individual_fallbacks: usize,
    heuristic_fallbacks: usize,
    uncategorized: usize,
    domain_distribution: BTreeMap<String, usize>,
}

/// Accumulates per-batch statistics and the final output's shape.
#[derive(Debug, Default)]
pub struct MetricsCollector {
    tally: Mutex<Tally>,
}

impl MetricsCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_batch(&self, stats: &BatchStats) {
        if let Ok(mut tally) = self.tally.lock() {
            tally.total_tests += stats.test_count;
            tally.batch_count += 1;
            tally.retries += stats.retries;
            tally.individual_fallbacks += stats.individual_fallbacks;
            tally.heuristic_fallbacks += stats.heuristic_fallbacks;
        }
    }

    /// Record where tests finally landed: domain distribution and generic
    /// names.
    pub fn record_output(&self, output: &ClassificationOutput) {
        let Ok(mut tally) = self.tally.lock() else {
            return;
        };
        for domain in &output.domains {
            let generic_domain = is_generic(&domain.name);
            for feature in &domain.features {
                let count = feature.test_indices.len();
                *tally.domain_distribution.entry(domain.name.clone()).or_default() += count;
                if generic_domain || is_generic(&feature.name) {
                    tally.uncategorized += count;
                }
            }
        }
    }

    pub fn collect(&self) -> ClassificationMetrics {
        let Ok(tally) = self.tally.lock() else {
            return ClassificationMetrics::default();
        };

        let rate = |part: usize, whole: usize| {
            if whole == 0 {
                0.0
            } else {
                part as f64 / whole as f64
            }
        };

        let total = tally.total_tests;
        ClassificationMetrics {
            total_tests: total,
            batch_count: tally.batch_count,
            classification_rate: if total == 0 {
                1.0
            } else {
                rate(total.saturating_sub(tally.individual_fallbacks), total)
            },
            fallback_rate: rate(tally.individual_fallbacks, total),
            retry_rate: rate(tally.retries as usize, tally.batch_count),
            uncategorized_rate: rate(tally.uncategorized, total),
            total_retries: tally.retries,
            fallback_count: tally.individual_fallbacks,
            heuristic_fallback_count: tally.heuristic_fallbacks,
            domain_distribution: tally.domain_distribution.clone(),
        }
    }

    /// Log the collected metrics; generic placements are a quality violation.
    pub fn log(&self, analysis_id: &str) -> ClassificationMetrics {
        let metrics = self.collect();
        if metrics.has_quality_violation() {
            warn!(
                analysis_id,
                uncategorized_rate = metrics.uncategorized_rate,
                total_tests = metrics.total_tests,
                "Quality violation: tests placed under generic names"
            );
        }
        info!(
            analysis_id,
            total_tests = metrics.total_tests,
            batches = metrics.batch_count,
            classification_rate = metrics.classification_rate,
            fallback_rate = metrics.fallback_rate,
            retry_rate = metrics.retry_rate,
            heuristic_fallbacks = metrics.heuristic_fallback_count,
            domains = metrics.domain_distribution.len(),
            "Classification metrics"
        );
        metrics
    }
}
