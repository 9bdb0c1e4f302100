pub mod batch_planner;
pub mod circuit_breaker;
pub mod classification_service;
pub mod classifier_gateway;
pub mod fallback_chain;
pub mod metrics_collector;
pub mod path_heuristic;
pub mod prompt_templates;
pub mod response_parser;
pub mod result_merger;
pub mod retry;
pub mod taxonomy_cache;
pub mod taxonomy_extraction;
pub mod wave_scheduler;

pub use batch_planner::{Batch, BatchPlanner};
pub use circuit_breaker::{
    CircuitBreakerConfig, CircuitBreakerService, CircuitState, CircuitStats, ClassifierPhase,
};
pub use classification_service::{ClassificationRun, ClassificationService};
pub use classifier_gateway::{ClassifierGateway, UsageMeter};
pub use fallback_chain::{BatchOutcome, BatchStats, FallbackChain};
pub use metrics_collector::MetricsCollector;
pub use prompt_templates::DefaultPromptBuilder;
pub use result_merger::ResultMerger;
pub use retry::RetryPolicy;
pub use taxonomy_cache::{CacheKey, TaxonomyCache};
pub use taxonomy_extraction::{ExtractedTaxonomy, TaxonomyExtractionStage};
pub use wave_scheduler::{AnchorSet, WaveScheduler};
