//! Single guarded classifier call: circuit breaker, cancellation, parsing.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::domain::errors::{AttemptError, ClassifierError, ResponseError};
use crate::domain::models::TokenUsage;
use crate::domain::ports::{ClassifierClient, Prompt};
use crate::services::circuit_breaker::{CircuitBreakerService, ClassifierPhase};

/// Lock-free token accumulator shared by concurrent batch tasks.
#[derive(Debug, Default)]
pub struct UsageMeter {
    input_tokens: AtomicU64,
    output_tokens: AtomicU64,
    calls: AtomicU64,
}

impl UsageMeter {
    pub fn record(&self, usage: TokenUsage) {
        self.input_tokens.fetch_add(usage.input_tokens, Ordering::Relaxed);
        self.output_tokens.fetch_add(usage.output_tokens, Ordering::Relaxed);
        self.calls.fetch_add(1, Ordering::Relaxed);
    }

    pub fn usage(&self) -> TokenUsage {
        TokenUsage::new(
            self.input_tokens.load(Ordering::Relaxed),
            self.output_tokens.load(Ordering::Relaxed),
        )
    }

    /// Classifier calls that returned a reply.
    pub fn calls(&self) -> u64 {
        self.calls.load(Ordering::Relaxed)
    }
}

/// A classifier bound to one phase's circuit breaker.
#[derive(Clone)]
pub struct ClassifierGateway {
    client: Arc<dyn ClassifierClient>,
    breaker: Arc<CircuitBreakerService>,
    phase: ClassifierPhase,
}

impl ClassifierGateway {
    pub fn new(
        client: Arc<dyn ClassifierClient>,
        breaker: Arc<CircuitBreakerService>,
        phase: ClassifierPhase,
    ) -> Self {
        Self {
            client,
            breaker,
            phase,
        }
    }

    pub fn model_id(&self) -> &str {
        self.client.model_id()
    }

    /// Make one call and parse the reply. Transport and parse failures both
    /// count against the phase breaker; cancellation does not.
    pub async fn call<T, P>(
        &self,
        prompt: &Prompt,
        cancel: &CancellationToken,
        meter: &UsageMeter,
        parse: P,
    ) -> Result<T, AttemptError>
    where
        P: FnOnce(&str) -> Result<T, ResponseError>,
    {
        if cancel.is_cancelled() {
            return Err(ClassifierError::Cancelled.into());
        }
        if !self.breaker.allow(&self.phase).await {
            return Err(ClassifierError::CircuitOpen {
                phase: self.phase.as_str().to_string(),
            }
            .into());
        }

        let reply = tokio::select! {
            () = cancel.cancelled() => return Err(ClassifierError::Cancelled.into()),
            reply = self.client.call(&prompt.system, &prompt.user) => reply,
        };

        let response = match reply {
            Ok(response) => response,
            Err(err) => {
                if err != ClassifierError::Cancelled {
                    self.breaker.record_failure(&self.phase).await;
                }
                return Err(err.into());
            }
        };
        meter.record(response.usage);

        match parse(&response.text) {
            Ok(parsed) => {
                self.breaker.record_success(&self.phase).await;
                Ok(parsed)
            }
            Err(err) => {
                debug!(phase = self.phase.as_str(), error = %err, "Unparseable classifier reply");
                self.breaker.record_failure(&self.phase).await;
                Err(err.into())
            }
        }
    }
}
