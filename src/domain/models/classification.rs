//! Batch-level assignments and the final classification output.

use serde::{Deserialize, Serialize};
use std::ops::AddAssign;

/// One classifier verdict for a single test, in the compact two-field shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Classification {
    pub domain: String,
    pub feature: String,
}

impl Classification {
    pub fn new(domain: impl Into<String>, feature: impl Into<String>) -> Self {
        Self {
            domain: domain.into(),
            feature: feature.into(),
        }
    }
}

/// Tests a batch placed under one `(domain, feature)` pair.
///
/// Results from different batches never share a test index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignmentResult {
    pub domain: String,
    pub feature: String,
    pub test_indices: Vec<usize>,
}

/// Compact anchor passed to later waves to keep domain naming consistent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DomainSummary {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl DomainSummary {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
        }
    }
}

/// Token accounting reported by the classifier.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenUsage {
    pub input_tokens: u64,
    pub output_tokens: u64,
}

impl TokenUsage {
    pub const fn new(input_tokens: u64, output_tokens: u64) -> Self {
        Self {
            input_tokens,
            output_tokens,
        }
    }

    pub const fn total(&self) -> u64 {
        self.input_tokens + self.output_tokens
    }
}

impl AddAssign for TokenUsage {
    fn add_assign(&mut self, rhs: Self) {
        self.input_tokens += rhs.input_tokens;
        self.output_tokens += rhs.output_tokens;
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutputFeature {
    pub name: String,
    pub confidence: f64,
    pub test_indices: Vec<usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutputDomain {
    pub name: String,
    pub description: String,
    pub confidence: f64,
    pub features: Vec<OutputFeature>,
}

/// Final hierarchical taxonomy with every input test placed exactly once.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClassificationOutput {
    pub domains: Vec<OutputDomain>,
}

impl ClassificationOutput {
    /// All placed test indices, sorted.
    pub fn test_indices(&self) -> Vec<usize> {
        let mut indices: Vec<usize> = self
            .domains
            .iter()
            .flat_map(|d| d.features.iter())
            .flat_map(|f| f.test_indices.iter().copied())
            .collect();
        indices.sort_unstable();
        indices
    }

    /// True when the placed indices are exactly `0..total` with no repeats.
    pub fn is_complete(&self, total: usize) -> bool {
        self.test_indices().into_iter().eq(0..total)
    }
}
