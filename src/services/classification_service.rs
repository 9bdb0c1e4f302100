//! Classification entrypoint.
//!
//! Taxonomy (cache → extraction → heuristic), then batch planning, wave
//! execution and merging. The cache and circuit breaker are injected so one
//! instance can be shared by every request in a process.

use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument, warn};

use crate::domain::errors::{ClassifyError, ClassifyResult};
use crate::domain::models::{
    ClassificationOutput, Config, DomainSummary, Phase1Input, TaxonomySource, TokenUsage,
};
use crate::domain::ports::{ClassifierClient, PromptBuilder};
use crate::services::batch_planner::BatchPlanner;
use crate::services::circuit_breaker::{
    CircuitBreakerConfig, CircuitBreakerService, CircuitStats, ClassifierPhase,
};
use crate::services::classifier_gateway::{ClassifierGateway, UsageMeter};
use crate::services::fallback_chain::FallbackChain;
use crate::services::metrics_collector::MetricsCollector;
use crate::services::prompt_templates::DefaultPromptBuilder;
use crate::services::result_merger::ResultMerger;
use crate::services::retry::RetryPolicy;
use crate::services::taxonomy_cache::TaxonomyCache;
use crate::services::taxonomy_extraction::TaxonomyExtractionStage;
use crate::services::wave_scheduler::{AnchorSet, WaveScheduler};

/// Everything one `classify` call produced.
///
/// `metrics` is request-scoped; call [`MetricsCollector::collect`] or
/// [`MetricsCollector::log`] once the call has returned.
#[derive(Debug)]
pub struct ClassificationRun {
    pub output: ClassificationOutput,
    pub usage: TokenUsage,
    pub metrics: MetricsCollector,
    pub taxonomy_source: TaxonomySource,
    /// Classifier calls that returned a reply, across both phases
    pub classifier_calls: u64,
    /// Breaker state per phase when the request finished
    pub circuits: Vec<CircuitStats>,
}

pub struct ClassificationService {
    client: Arc<dyn ClassifierClient>,
    prompts: Arc<dyn PromptBuilder>,
    cache: Arc<TaxonomyCache>,
    breaker: Arc<CircuitBreakerService>,
    config: Config,
}

impl ClassificationService {
    pub fn new(
        client: Arc<dyn ClassifierClient>,
        cache: Arc<TaxonomyCache>,
        breaker: Arc<CircuitBreakerService>,
        config: Config,
    ) -> Self {
        Self {
            client,
            prompts: Arc::new(DefaultPromptBuilder),
            cache,
            breaker,
            config,
        }
    }

    /// Service with its own cache and breaker built from `config`.
    pub fn from_config(client: Arc<dyn ClassifierClient>, config: Config) -> Self {
        let cache = Arc::new(TaxonomyCache::from_config(&config.cache));
        let breaker = Arc::new(CircuitBreakerService::new(CircuitBreakerConfig::from(
            &config.circuit_breaker,
        )));
        Self::new(client, cache, breaker, config)
    }

    #[must_use]
    pub fn with_prompt_builder(mut self, prompts: Arc<dyn PromptBuilder>) -> Self {
        self.prompts = prompts;
        self
    }

    pub const fn config(&self) -> &Config {
        &self.config
    }

    pub fn cache(&self) -> &Arc<TaxonomyCache> {
        &self.cache
    }

    pub fn breaker(&self) -> &Arc<CircuitBreakerService> {
        &self.breaker
    }

    pub async fn classify(&self, input: &Phase1Input) -> ClassifyResult<ClassificationRun> {
        self.classify_with_cancel(input, CancellationToken::new()).await
    }

    /// Classify every test in `input`. Fails as a whole or returns an output
    /// covering every test exactly once; there is no partial result.
    #[instrument(skip_all, fields(
        analysis_id = %input.analysis_id,
        language = %input.language,
        tests = input.test_count(),
    ))]
    pub async fn classify_with_cancel(
        &self,
        input: &Phase1Input,
        cancel: CancellationToken,
    ) -> ClassifyResult<ClassificationRun> {
        if input.files.is_empty() {
            return Err(ClassifyError::InvalidInput("no test files to classify".to_string()));
        }
        if !input.has_dense_indices() {
            return Err(ClassifyError::InvalidInput(
                "test indices must be unique and cover 0..N".to_string(),
            ));
        }

        // The deadline cancels this request only, never the caller's token.
        let scope = cancel.child_token();
        let Some(deadline) = self.config.classification.request_timeout() else {
            return self.run(input, &scope).await;
        };

        if let Ok(result) = tokio::time::timeout(deadline, self.run(input, &scope)).await {
            result
        } else {
            scope.cancel();
            warn!(?deadline, "Classification deadline exceeded");
            Err(ClassifyError::DeadlineExceeded(deadline))
        }
    }

    async fn run(&self, input: &Phase1Input, cancel: &CancellationToken) -> ClassifyResult<ClassificationRun> {
        let settings = &self.config.classification;
        let retry = &self.config.retry;
        let meter = Arc::new(UsageMeter::default());

        let stage = TaxonomyExtractionStage::new(
            ClassifierGateway::new(Arc::clone(&self.client), Arc::clone(&self.breaker), ClassifierPhase::Taxonomy),
            Arc::clone(&self.prompts),
            Arc::clone(&self.cache),
            RetryPolicy::new(retry.taxonomy_max_attempts, retry.initial_backoff_ms, retry.max_backoff_ms),
        );
        let extracted = stage.extract(input, cancel, &meter).await?;

        let tests = input.tests();
        let batches = BatchPlanner::new(settings.batch_size).plan(&tests);
        let batch_count = batches.len();

        let chain = Arc::new(FallbackChain::new(
            ClassifierGateway::new(
                Arc::clone(&self.client),
                Arc::clone(&self.breaker),
                ClassifierPhase::Classification,
            ),
            Arc::clone(&self.prompts),
            RetryPolicy::new(retry.batch_max_attempts, retry.initial_backoff_ms, retry.max_backoff_ms),
            settings.min_split_size,
            input.language.clone(),
            Arc::clone(&meter),
        ));

        let anchors = AnchorSet::new(extracted.taxonomy.domains.iter().map(|domain| DomainSummary {
            name: domain.name.clone(),
            description: (!domain.description.is_empty()).then(|| domain.description.clone()),
        }));

        let outcomes = WaveScheduler::new(settings.wave_width)
            .run(chain, batches, anchors, cancel)
            .await?;

        let metrics = MetricsCollector::new();
        for outcome in &outcomes {
            metrics.record_batch(&outcome.stats);
        }

        let output = ResultMerger::new(settings.default_confidence).merge(
            Some(&extracted.taxonomy),
            outcomes.iter().flat_map(|outcome| outcome.assignments.iter()),
            tests.len(),
        );
        metrics.record_output(&output);

        let usage = meter.usage();
        let circuits = self.breaker.stats().await;
        for circuit in circuits.iter().filter(|c| c.state != "closed") {
            warn!(
                phase = %circuit.phase,
                state = %circuit.state,
                failures = circuit.failure_count,
                "Classifier circuit not closed after request"
            );
        }
        info!(
            batches = batch_count,
            domains = output.domains.len(),
            taxonomy = ?extracted.source,
            input_tokens = usage.input_tokens,
            output_tokens = usage.output_tokens,
            "Classification complete"
        );

        Ok(ClassificationRun {
            output,
            usage,
            metrics,
            taxonomy_source: extracted.source,
            classifier_calls: meter.calls(),
            circuits,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::classifiers::mock::ScriptedClassifier;
    use crate::domain::models::TestFile;

    fn config() -> Config {
        let mut config = Config::default();
        config.retry.initial_backoff_ms = 0;
        config.retry.max_backoff_ms = 0;
        config
    }

    #[tokio::test]
    async fn test_empty_input_fails_fast() {
        let client = Arc::new(ScriptedClassifier::uniform("A", "B"));
        let service = ClassificationService::from_config(client.clone(), config());
        let input = Phase1Input::from_files("a", "go", Vec::<(String, Vec<String>)>::new());

        let err = service.classify(&input).await.unwrap_err();
        assert!(matches!(err, ClassifyError::InvalidInput(_)));
        assert_eq!(client.call_count(), 0);
    }

    #[tokio::test]
    async fn test_sparse_indices_rejected() {
        let client = Arc::new(ScriptedClassifier::uniform("A", "B"));
        let service = ClassificationService::from_config(client, config());
        let mut input = Phase1Input::from_files("a", "go", vec![("x/a_test.go", vec!["TestA", "TestB"])]);
        input.files[0].tests[1].index = 5;

        assert!(matches!(
            service.classify(&input).await,
            Err(ClassifyError::InvalidInput(_))
        ));
    }

    #[tokio::test]
    async fn test_deadline_leaves_caller_token_live() {
        let client = Arc::new(
            ScriptedClassifier::uniform("A", "B").with_delay(std::time::Duration::from_secs(30)),
        );
        let mut config = config();
        config.classification.request_timeout_secs = 1;
        let service = ClassificationService::from_config(client, config);
        let shared = CancellationToken::new();
        let input = Phase1Input::from_files("a", "go", vec![("x/a_test.go", vec!["TestA"])]);

        let err = service.classify_with_cancel(&input, shared.clone()).await.unwrap_err();
        assert!(matches!(err, ClassifyError::DeadlineExceeded(_)));
        assert!(!shared.is_cancelled());
    }

    #[tokio::test]
    async fn test_single_file_end_to_end() {
        let client = Arc::new(
            ScriptedClassifier::uniform("Auth", "Login").with_usage(TokenUsage::new(7, 3)),
        );
        let service = ClassificationService::from_config(client.clone(), config());
        let input = Phase1Input {
            analysis_id: "a".into(),
            language: "go".into(),
            files: vec![TestFile {
                path: "auth/login_test.go".into(),
                tests: Phase1Input::from_files("a", "go", vec![("auth/login_test.go", vec!["TestA", "TestB"])])
                    .tests(),
            }],
        };

        let run = service.classify(&input).await.unwrap();
        assert!(run.output.is_complete(2));
        assert_eq!(run.taxonomy_source, TaxonomySource::Extracted);
        assert_eq!(run.classifier_calls, 2);
        assert_eq!(run.usage, TokenUsage::new(14, 6));
        assert!(run.circuits.iter().all(|c| c.state == "closed"));
        assert_eq!(run.output.domains[0].name, "Auth");
    }
}
