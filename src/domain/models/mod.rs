//! Domain models for test classification.

pub mod classification;
pub mod config;
pub mod metrics;
pub mod taxonomy;
pub mod test_ref;

pub use classification::{
    AssignmentResult, Classification, ClassificationOutput, DomainSummary, OutputDomain,
    OutputFeature, TokenUsage,
};
pub use config::{
    CacheConfig, CircuitBreakerSettings, ClassificationConfig, ClassifierConfig, Config,
    LoggingConfig, RetryConfig,
};
pub use metrics::ClassificationMetrics;
pub use taxonomy::{Taxonomy, TaxonomyDomain, TaxonomyFeature, TaxonomySource};
pub use test_ref::{ManifestFile, Phase1Input, TestFile, TestManifest, TestRef};
