use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Quality metrics for one classification request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassificationMetrics {
    pub total_tests: usize,
    pub batch_count: usize,
    /// Share of tests classified without individual fallback.
    pub classification_rate: f64,
    /// Share of tests that needed individual fallback.
    pub fallback_rate: f64,
    /// Retries per batch.
    pub retry_rate: f64,
    /// Share of tests placed under a generic domain or feature name.
    pub uncategorized_rate: f64,
    pub total_retries: u32,
    pub fallback_count: usize,
    pub heuristic_fallback_count: usize,
    pub domain_distribution: BTreeMap<String, usize>,
}

impl ClassificationMetrics {
    pub fn has_quality_violation(&self) -> bool {
        self.uncategorized_rate > 0.0
    }
}
