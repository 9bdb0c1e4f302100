//! Prompt builder port.

use serde::Serialize;

use crate::domain::models::{DomainSummary, TestRef};

/// A rendered system/user prompt pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prompt {
    pub system: String,
    pub user: String,
}

/// Per-file metadata sent for taxonomy extraction. No source code.
#[derive(Debug, Clone, Serialize)]
pub struct TaxonomyFileSummary {
    pub file_index: usize,
    pub path: String,
    pub test_names: Vec<String>,
}

/// Structured input for the one-shot taxonomy request.
#[derive(Debug, Clone, Serialize)]
pub struct TaxonomyRequest {
    pub language: String,
    pub files: Vec<TaxonomyFileSummary>,
}

/// Structured input for a batch classification request.
#[derive(Debug, Clone, Serialize)]
pub struct BatchRequest<'a> {
    pub language: &'a str,
    pub tests: &'a [TestRef],
    pub existing_domains: &'a [DomainSummary],
}

/// Deterministic mapping from structured requests to prompt text.
pub trait PromptBuilder: Send + Sync {
    fn taxonomy_prompt(&self, request: &TaxonomyRequest) -> Prompt;

    fn batch_prompt(&self, request: &BatchRequest<'_>) -> Prompt;
}
