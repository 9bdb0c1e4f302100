//! One-shot taxonomy extraction with cache and heuristic fallback.

use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use crate::domain::errors::{ClassifyError, ClassifyResult};
use crate::domain::models::{Phase1Input, Taxonomy, TaxonomySource};
use crate::domain::ports::{PromptBuilder, TaxonomyFileSummary, TaxonomyRequest};
use crate::services::classifier_gateway::{ClassifierGateway, UsageMeter};
use crate::services::path_heuristic::heuristic_taxonomy;
use crate::services::response_parser::parse_taxonomy;
use crate::services::retry::RetryPolicy;
use crate::services::taxonomy_cache::{CacheKey, TaxonomyCache};

/// A taxonomy and where it came from.
#[derive(Debug, Clone)]
pub struct ExtractedTaxonomy {
    pub taxonomy: Arc<Taxonomy>,
    pub source: TaxonomySource,
}

pub struct TaxonomyExtractionStage {
    gateway: ClassifierGateway,
    prompts: Arc<dyn PromptBuilder>,
    cache: Arc<TaxonomyCache>,
    retry: RetryPolicy,
}

impl TaxonomyExtractionStage {
    pub fn new(
        gateway: ClassifierGateway,
        prompts: Arc<dyn PromptBuilder>,
        cache: Arc<TaxonomyCache>,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            gateway,
            prompts,
            cache,
            retry,
        }
    }

    /// Build the extraction request: paths and test names only.
    pub fn request(input: &Phase1Input) -> TaxonomyRequest {
        TaxonomyRequest {
            language: input.language.clone(),
            files: input
                .files
                .iter()
                .enumerate()
                .map(|(file_index, file)| TaxonomyFileSummary {
                    file_index,
                    path: file.path.clone(),
                    test_names: file.tests.iter().map(|t| t.name.clone()).collect(),
                })
                .collect(),
        }
    }

    /// Return a cached taxonomy, extract a fresh one, or fall back to the
    /// path heuristic. Only cancellation is an error.
    #[instrument(skip_all, fields(analysis_id = %input.analysis_id))]
    pub async fn extract(
        &self,
        input: &Phase1Input,
        cancel: &CancellationToken,
        meter: &UsageMeter,
    ) -> ClassifyResult<ExtractedTaxonomy> {
        let key = CacheKey::new(&input.analysis_id, &input.language, self.gateway.model_id());
        if let Some(taxonomy) = self.cache.get(&key).await {
            debug!(domains = taxonomy.domains.len(), "Taxonomy cache hit");
            return Ok(ExtractedTaxonomy {
                taxonomy,
                source: TaxonomySource::Cached,
            });
        }

        let prompt = self.prompts.taxonomy_prompt(&Self::request(input));
        let attempted = self
            .retry
            .execute(cancel, |_| {
                self.gateway.call(&prompt, cancel, meter, parse_taxonomy)
            })
            .await;

        match attempted.result {
            Ok(taxonomy) => {
                info!(
                    domains = taxonomy.domains.len(),
                    features = taxonomy.feature_count(),
                    attempts = attempted.attempts,
                    "Taxonomy extracted"
                );
                self.cache.set(key, taxonomy.clone()).await;
                Ok(ExtractedTaxonomy {
                    taxonomy: Arc::new(taxonomy),
                    source: TaxonomySource::Extracted,
                })
            }
            Err(_) if cancel.is_cancelled() => Err(ClassifyError::Cancelled),
            Err(err) => {
                let taxonomy = heuristic_taxonomy(input);
                warn!(
                    error = %err,
                    attempts = attempted.attempts,
                    domains = taxonomy.domains.len(),
                    "Taxonomy extraction failed, using path heuristic"
                );
                Ok(ExtractedTaxonomy {
                    taxonomy: Arc::new(taxonomy),
                    source: TaxonomySource::Heuristic,
                })
            }
        }
    }
}
