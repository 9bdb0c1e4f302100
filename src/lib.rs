//! Taxonomist - resilient test-suite taxonomy classification
//!
//! Taxonomist groups a project's tests into a two-level taxonomy of
//! domains and features using a generative classifier, and guarantees that
//! every test lands exactly once even when the classifier misbehaves.
//!
//! # Architecture
//!
//! - **Domain Layer** (`domain`): models, errors and the ports the services depend on
//! - **Service Layer** (`services`): taxonomy extraction, batch planning, wave
//!   scheduling, the fallback chain, merging and metrics
//! - **Adapters** (`adapters`): classifier clients
//! - **Infrastructure Layer** (`infrastructure`): configuration and logging
//! - **CLI Layer** (`cli`): command-line interface
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use taxonomist::adapters::classifiers::AnthropicClassifier;
//! use taxonomist::{ClassificationService, ConfigLoader, Phase1Input};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = ConfigLoader::load()?;
//!     let client = Arc::new(AnthropicClassifier::from_config(&config.classifier)?);
//!     let service = ClassificationService::from_config(client, config);
//!     let input = Phase1Input::from_files("run-1", "go", vec![("auth/login_test.go", vec!["TestLogin"])]);
//!     let run = service.classify(&input).await?;
//!     println!("{} domains", run.output.domains.len());
//!     Ok(())
//! }
//! ```

pub mod adapters;
pub mod cli;
pub mod domain;
pub mod infrastructure;
pub mod services;

pub use domain::errors::{ClassifierError, ClassifyError, ClassifyResult};
pub use domain::models::{
    AssignmentResult, ClassificationMetrics, ClassificationOutput, Config, Phase1Input, Taxonomy,
    TaxonomySource, TestRef, TokenUsage,
};
pub use domain::ports::{ClassifierClient, PromptBuilder};
pub use infrastructure::config::{ConfigError, ConfigLoader};
pub use services::{ClassificationRun, ClassificationService, TaxonomyCache};
