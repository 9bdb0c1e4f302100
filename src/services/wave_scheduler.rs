//! Bounded-width concurrent execution of planned batches.
//!
//! Batches run in waves of at most `wave_width` concurrent tasks. Waves are
//! strictly sequential: wave k+1 starts only after wave k completes, and it
//! sees every domain discovered so far as anchors. Batches in the same wave
//! never see each other's results.

use std::sync::Arc;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::domain::errors::{ClassifyError, ClassifyResult};
use crate::domain::models::DomainSummary;
use crate::services::batch_planner::Batch;
use crate::services::fallback_chain::{BatchOutcome, FallbackChain};

/// Anchor domains carried between waves, deduplicated case-insensitively.
#[derive(Debug, Clone, Default)]
pub struct AnchorSet {
    domains: Vec<DomainSummary>,
}

impl AnchorSet {
    pub fn new(seed: impl IntoIterator<Item = DomainSummary>) -> Self {
        let mut set = Self::default();
        for domain in seed {
            set.insert(domain);
        }
        set
    }

    /// Add a domain unless one with the same normalized name exists.
    pub fn insert(&mut self, domain: DomainSummary) -> bool {
        let key = domain.name.trim().to_lowercase();
        if key.is_empty() || self.domains.iter().any(|d| d.name.trim().to_lowercase() == key) {
            return false;
        }
        self.domains.push(domain);
        true
    }

    pub fn as_slice(&self) -> &[DomainSummary] {
        &self.domains
    }

    pub fn len(&self) -> usize {
        self.domains.len()
    }

    pub fn is_empty(&self) -> bool {
        self.domains.is_empty()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct WaveScheduler {
    wave_width: usize,
}

impl WaveScheduler {
    /// A `wave_width` of zero is treated as one.
    pub const fn new(wave_width: usize) -> Self {
        let wave_width = if wave_width == 0 { 1 } else { wave_width };
        Self { wave_width }
    }

    pub const fn wave_width(&self) -> usize {
        self.wave_width
    }

    /// Run every batch through `chain`. Outcomes come back ordered by batch
    /// index.
    ///
    /// The first batch to fail irrecoverably cancels its siblings and fails
    /// the whole run. Cancelling `cancel` stops the run the same way.
    pub async fn run(
        &self,
        chain: Arc<FallbackChain>,
        batches: Vec<Batch>,
        mut anchors: AnchorSet,
        cancel: &CancellationToken,
    ) -> ClassifyResult<Vec<BatchOutcome>> {
        let mut outcomes = Vec::with_capacity(batches.len());
        // Aborting a wave must not cancel the caller's token.
        let scope = cancel.child_token();

        for (wave, members) in batches.chunks(self.wave_width).enumerate() {
            if scope.is_cancelled() {
                return Err(ClassifyError::Cancelled);
            }
            debug!(wave, batches = members.len(), anchors = anchors.len(), "Starting wave");

            let wave_anchors: Arc<[DomainSummary]> = Arc::from(anchors.as_slice());
            let mut tasks = JoinSet::new();
            for batch in members.iter().cloned() {
                let chain = Arc::clone(&chain);
                let wave_anchors = Arc::clone(&wave_anchors);
                let scope = scope.clone();
                tasks.spawn(async move { chain.run(&batch, &wave_anchors, &scope).await });
            }

            let mut completed = Vec::with_capacity(members.len());
            while let Some(joined) = tasks.join_next().await {
                let failure = match joined {
                    Ok(Ok(outcome)) => {
                        completed.push(outcome);
                        continue;
                    }
                    Ok(Err(err)) => err,
                    Err(join_err) => ClassifyError::TaskFailed(join_err.to_string()),
                };

                warn!(wave, error = %failure, "Batch failed irrecoverably, cancelling wave");
                scope.cancel();
                tasks.abort_all();
                return Err(failure);
            }

            completed.sort_by_key(|outcome| outcome.batch);
            let mut discovered = 0;
            for outcome in &completed {
                for name in outcome.domain_names() {
                    if anchors.insert(DomainSummary::named(name)) {
                        discovered += 1;
                    }
                }
            }
            info!(wave, batches = completed.len(), discovered, "Wave completed");
            outcomes.extend(completed);
        }

        if scope.is_cancelled() {
            return Err(ClassifyError::Cancelled);
        }
        Ok(outcomes)
    }
}
