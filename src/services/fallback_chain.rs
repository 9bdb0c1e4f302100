//! Per-batch recovery pipeline.
//!
//! A batch is retried at its own size, then split in half (recursively while
//! halves stay at or above the split threshold), then classified one test at
//! a time, and finally placed by the path heuristic. Every test in the batch
//! therefore leaves with a classification unless the request itself has to
//! be aborted.

use futures::future::BoxFuture;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use crate::domain::errors::{AttemptError, ClassifierError, ClassifyError};
use crate::domain::models::{AssignmentResult, Classification, DomainSummary, TestRef};
use crate::domain::ports::{BatchRequest, PromptBuilder};
use crate::services::batch_planner::Batch;
use crate::services::classifier_gateway::{ClassifierGateway, UsageMeter};
use crate::services::path_heuristic;
use crate::services::response_parser::parse_batch;
use crate::services::retry::{Attempted, RetryPolicy};

/// Counters for one batch, consumed by the metrics collector.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchStats {
    pub test_count: usize,
    /// Attempts made at any granularity, including ones refused by an open breaker
    pub attempts: u32,
    pub retries: u32,
    pub splits: u32,
    /// Tests that needed per-test classification (including those that then
    /// fell through to the heuristic)
    pub individual_fallbacks: usize,
    pub heuristic_fallbacks: usize,
}

/// Assignments for one planned batch.
#[derive(Debug, Clone)]
pub struct BatchOutcome {
    pub batch: usize,
    pub assignments: Vec<AssignmentResult>,
    pub stats: BatchStats,
}

impl BatchOutcome {
    /// Domains named by this batch, in first-seen order.
    pub fn domain_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = Vec::new();
        for assignment in &self.assignments {
            if !names.contains(&assignment.domain.as_str()) {
                names.push(&assignment.domain);
            }
        }
        names
    }
}

pub struct FallbackChain {
    gateway: ClassifierGateway,
    prompts: Arc<dyn PromptBuilder>,
    retry: RetryPolicy,
    min_split_size: usize,
    language: String,
    meter: Arc<UsageMeter>,
}

impl FallbackChain {
    pub fn new(
        gateway: ClassifierGateway,
        prompts: Arc<dyn PromptBuilder>,
        retry: RetryPolicy,
        min_split_size: usize,
        language: impl Into<String>,
        meter: Arc<UsageMeter>,
    ) -> Self {
        Self {
            gateway,
            prompts,
            retry,
            // Splitting a single test is meaningless.
            min_split_size: min_split_size.max(2),
            language: language.into(),
            meter,
        }
    }

    /// Classify every test in `batch`.
    ///
    /// Fails only on cancellation or a permanent classifier error; all other
    /// failures are absorbed by the chain.
    #[instrument(skip_all, fields(batch = batch.index, size = batch.len()))]
    pub async fn run(
        &self,
        batch: &Batch,
        anchors: &[DomainSummary],
        cancel: &CancellationToken,
    ) -> Result<BatchOutcome, ClassifyError> {
        let mut stats = BatchStats {
            test_count: batch.len(),
            ..BatchStats::default()
        };

        let verdicts = self
            .classify_group(&batch.tests, anchors, cancel, &mut stats)
            .await
            .map_err(|err| match err {
                AttemptError::Classifier(ClassifierError::Cancelled) => ClassifyError::Cancelled,
                AttemptError::Classifier(source) => ClassifyError::BatchFailed {
                    batch: batch.index,
                    source,
                },
                AttemptError::Response(err) => ClassifyError::TaskFailed(err.to_string()),
            })?;

        if stats.individual_fallbacks > 0 || stats.splits > 0 {
            info!(
                splits = stats.splits,
                individual = stats.individual_fallbacks,
                heuristic = stats.heuristic_fallbacks,
                "Batch recovered through fallback"
            );
        }

        Ok(BatchOutcome {
            batch: batch.index,
            assignments: group_assignments(&batch.tests, verdicts),
            stats,
        })
    }

    /// One batch-sized request under the retry policy.
    async fn attempt(
        &self,
        tests: &[TestRef],
        anchors: &[DomainSummary],
        cancel: &CancellationToken,
    ) -> Attempted<Vec<Classification>, AttemptError> {
        let prompt = self.prompts.batch_prompt(&BatchRequest {
            language: &self.language,
            tests,
            existing_domains: anchors,
        });
        let expected = tests.len();

        self.retry
            .execute(cancel, |_| {
                self.gateway
                    .call(&prompt, cancel, &self.meter, |text| parse_batch(text, expected))
            })
            .await
    }

    /// Verdicts aligned with `tests`. An `Err` is always irrecoverable.
    fn classify_group<'a>(
        &'a self,
        tests: &'a [TestRef],
        anchors: &'a [DomainSummary],
        cancel: &'a CancellationToken,
        stats: &'a mut BatchStats,
    ) -> BoxFuture<'a, Result<Vec<Classification>, AttemptError>> {
        Box::pin(async move {
            let attempted = self.attempt(tests, anchors, cancel).await;
            stats.attempts += attempted.attempts;
            stats.retries += attempted.retries();

            let err = match attempted.result {
                Ok(verdicts) => return Ok(verdicts),
                Err(err) if err.is_irrecoverable() => return Err(err),
                // Retry hands back the last failure when cancelled mid-backoff.
                Err(_) if cancel.is_cancelled() => return Err(ClassifierError::Cancelled.into()),
                Err(err) => err,
            };

            if tests.len() >= self.min_split_size {
                let (left, right) = tests.split_at(tests.len() / 2);
                debug!(size = tests.len(), error = %err, "Splitting batch");
                stats.splits += 1;

                let mut verdicts = self.classify_group(left, anchors, cancel, stats).await?;
                verdicts.extend(self.classify_group(right, anchors, cancel, stats).await?);
                return Ok(verdicts);
            }

            if let [test] = tests {
                // The failed call already was the individual one.
                stats.individual_fallbacks += 1;
                return Ok(vec![self.heuristic(test, &err, stats)]);
            }

            debug!(size = tests.len(), error = %err, "Falling back to individual classification");
            let mut verdicts = Vec::with_capacity(tests.len());
            for test in tests {
                stats.individual_fallbacks += 1;
                let attempted = self.attempt(std::slice::from_ref(test), anchors, cancel).await;
                stats.attempts += attempted.attempts;
                stats.retries += attempted.retries();

                match attempted.result {
                    Ok(mut single) if single.len() == 1 => verdicts.push(single.remove(0)),
                    Ok(_) => verdicts.push(self.heuristic(test, &err, stats)),
                    Err(err) if err.is_irrecoverable() => return Err(err),
                    Err(_) if cancel.is_cancelled() => return Err(ClassifierError::Cancelled.into()),
                    Err(err) => verdicts.push(self.heuristic(test, &err, stats)),
                }
            }
            Ok(verdicts)
        })
    }

    fn heuristic(&self, test: &TestRef, err: &AttemptError, stats: &mut BatchStats) -> Classification {
        stats.heuristic_fallbacks += 1;
        let verdict = path_heuristic::classify_test(test);
        warn!(
            test = test.index,
            path = %test.file_path,
            domain = %verdict.domain,
            error = %err,
            "Classified test by path heuristic"
        );
        verdict
    }
}

/// Collapse per-test verdicts into `(domain, feature) -> indices`, keeping
/// first-seen order.
fn group_assignments(tests: &[TestRef], verdicts: Vec<Classification>) -> Vec<AssignmentResult> {
    let mut grouped: Vec<AssignmentResult> = Vec::new();
    for (test, verdict) in tests.iter().zip(verdicts) {
        match grouped
            .iter_mut()
            .find(|a| a.domain == verdict.domain && a.feature == verdict.feature)
        {
            Some(existing) => existing.test_indices.push(test.index),
            None => grouped.push(AssignmentResult {
                domain: verdict.domain,
                feature: verdict.feature,
                test_indices: vec![test.index],
            }),
        }
    }
    grouped
}
