//! Circuit breaker pattern for classifier phases.
//!
//! One breaker exists per classifier phase, shared process-wide: repeated
//! failures anywhere in a phase open the circuit for every request using it.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{info, warn};

use crate::domain::models::CircuitBreakerSettings;
use crate::domain::ports::{Clock, SystemClock};

/// Configuration for circuit breakers.
#[derive(Debug, Clone)]
pub struct CircuitBreakerConfig {
    /// Number of failures before opening the circuit.
    pub failure_threshold: u32,
    /// Duration to keep circuit open before trying half-open.
    pub open_timeout: Duration,
    /// Number of successful calls in half-open state to close circuit.
    pub success_threshold: u32,
    /// Window size for tracking failures (older failures are forgotten).
    pub failure_window: Duration,
    /// Whether to enable circuit breakers.
    pub enabled: bool,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self::from(&CircuitBreakerSettings::default())
    }
}

impl CircuitBreakerConfig {
    /// A breaker that never opens.
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Default::default()
        }
    }
}

/// Saturating conversion from configured seconds.
pub(crate) fn seconds(secs: u64) -> Duration {
    i64::try_from(secs)
        .ok()
        .and_then(Duration::try_seconds)
        .unwrap_or(Duration::MAX)
}

impl From<&CircuitBreakerSettings> for CircuitBreakerConfig {
    fn from(settings: &CircuitBreakerSettings) -> Self {
        Self {
            failure_threshold: settings.failure_threshold,
            open_timeout: seconds(settings.open_timeout_secs),
            success_threshold: settings.success_threshold,
            failure_window: seconds(settings.failure_window_secs),
            enabled: settings.enabled,
        }
    }
}

/// State of a circuit breaker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CircuitState {
    /// Circuit is closed, requests flow normally.
    Closed,
    /// Circuit is open, requests are blocked.
    Open,
    /// Circuit is testing if the classifier has recovered.
    HalfOpen,
}

impl CircuitState {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Closed => "closed",
            Self::Open => "open",
            Self::HalfOpen => "half_open",
        }
    }
}

/// Classifier phase a breaker guards.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClassifierPhase {
    /// One-shot taxonomy extraction.
    Taxonomy,
    /// Per-batch test classification.
    Classification,
}

impl ClassifierPhase {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Taxonomy => "taxonomy",
            Self::Classification => "classification",
        }
    }
}

/// Individual circuit breaker state.
#[derive(Debug, Clone)]
pub struct CircuitBreaker {
    /// Current state.
    pub state: CircuitState,
    /// Timestamps of recent failures.
    pub failures: Vec<DateTime<Utc>>,
    /// Successful calls in half-open state.
    pub half_open_successes: u32,
    /// When the circuit was opened.
    pub opened_at: Option<DateTime<Utc>>,
    /// Total times circuit opened.
    pub open_count: u32,
}

impl CircuitBreaker {
    fn new() -> Self {
        Self {
            state: CircuitState::Closed,
            failures: Vec::new(),
            half_open_successes: 0,
            opened_at: None,
            open_count: 0,
        }
    }

    fn record_failure(&mut self, now: DateTime<Utc>, config: &CircuitBreakerConfig) {
        self.failures.push(now);

        let cutoff = now.checked_sub_signed(config.failure_window).unwrap_or(DateTime::<Utc>::MIN_UTC);
        self.failures.retain(|at| *at > cutoff);

        if self.state == CircuitState::Closed
            && self.failures.len() as u32 >= config.failure_threshold
        {
            self.open(now);
        } else if self.state == CircuitState::HalfOpen {
            // Any failure in half-open reopens the circuit
            self.open(now);
        }
    }

    fn record_success(&mut self, config: &CircuitBreakerConfig) {
        if self.state == CircuitState::HalfOpen {
            self.half_open_successes += 1;
            if self.half_open_successes >= config.success_threshold {
                self.close();
            }
        }
    }

    fn open(&mut self, now: DateTime<Utc>) {
        self.state = CircuitState::Open;
        self.opened_at = Some(now);
        self.half_open_successes = 0;
        self.open_count += 1;
    }

    fn close(&mut self) {
        self.state = CircuitState::Closed;
        self.opened_at = None;
        self.half_open_successes = 0;
        self.failures.clear();
    }

    fn allows(&mut self, now: DateTime<Utc>, config: &CircuitBreakerConfig) -> bool {
        match self.state {
            CircuitState::Closed | CircuitState::HalfOpen => true,
            CircuitState::Open => match self.opened_at {
                Some(opened_at) if opened_at.checked_add_signed(config.open_timeout).is_some_and(|t| now > t) => {
                    self.state = CircuitState::HalfOpen;
                    self.half_open_successes = 0;
                    true
                }
                _ => false,
            },
        }
    }
}

/// Statistics for a circuit breaker.
#[derive(Debug, Clone, Serialize)]
pub struct CircuitStats {
    pub phase: String,
    pub state: String,
    pub failure_count: usize,
    pub open_count: u32,
    pub opened_at: Option<DateTime<Utc>>,
}

/// Process-wide registry of per-phase circuit breakers.
pub struct CircuitBreakerService {
    config: CircuitBreakerConfig,
    clock: Arc<dyn Clock>,
    circuits: RwLock<HashMap<ClassifierPhase, CircuitBreaker>>,
}

impl CircuitBreakerService {
    /// Create a new circuit breaker service.
    pub fn new(config: CircuitBreakerConfig) -> Self {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    pub fn with_clock(config: CircuitBreakerConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            config,
            clock,
            circuits: RwLock::new(HashMap::new()),
        }
    }

    /// Whether a call in `phase` may proceed.
    pub async fn allow(&self, phase: &ClassifierPhase) -> bool {
        if !self.config.enabled {
            return true;
        }

        let now = self.clock.now();
        let mut circuits = self.circuits.write().await;
        let circuit = circuits.entry(phase.clone()).or_insert_with(CircuitBreaker::new);
        let was_open = circuit.state == CircuitState::Open;
        let allowed = circuit.allows(now, &self.config);
        if was_open && allowed {
            info!(phase = phase.as_str(), "Circuit half-open, allowing a trial call");
        }
        allowed
    }

    pub async fn record_failure(&self, phase: &ClassifierPhase) {
        if !self.config.enabled {
            return;
        }

        let now = self.clock.now();
        let mut circuits = self.circuits.write().await;
        let circuit = circuits.entry(phase.clone()).or_insert_with(CircuitBreaker::new);
        let was_open = circuit.state == CircuitState::Open;
        circuit.record_failure(now, &self.config);

        if !was_open && circuit.state == CircuitState::Open {
            warn!(
                phase = phase.as_str(),
                open_count = circuit.open_count,
                "Circuit breaker opened"
            );
        }
    }

    pub async fn record_success(&self, phase: &ClassifierPhase) {
        if !self.config.enabled {
            return;
        }

        let mut circuits = self.circuits.write().await;
        if let Some(circuit) = circuits.get_mut(phase) {
            circuit.record_success(&self.config);
        }
    }

    /// Get the state of a circuit.
    pub async fn state(&self, phase: &ClassifierPhase) -> CircuitState {
        let circuits = self.circuits.read().await;
        circuits.get(phase).map_or(CircuitState::Closed, |c| c.state)
    }

    /// Get statistics for all circuits, ordered by phase.
    pub async fn stats(&self) -> Vec<CircuitStats> {
        let circuits = self.circuits.read().await;
        let mut stats: Vec<CircuitStats> = circuits
            .iter()
            .map(|(phase, c)| CircuitStats {
                phase: phase.as_str().to_string(),
                state: c.state.as_str().to_string(),
                failure_count: c.failures.len(),
                open_count: c.open_count,
                opened_at: c.opened_at,
            })
            .collect();
        stats.sort_by(|a, b| a.phase.cmp(&b.phase));
        stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ports::ManualClock;

    fn service(threshold: u32, clock: Arc<ManualClock>) -> CircuitBreakerService {
        CircuitBreakerService::with_clock(
            CircuitBreakerConfig {
                failure_threshold: threshold,
                open_timeout: Duration::seconds(30),
                success_threshold: 1,
                failure_window: Duration::minutes(5),
                enabled: true,
            },
            clock,
        )
    }

    #[tokio::test]
    async fn test_opens_after_threshold() {
        let clock = Arc::new(ManualClock::default());
        let breaker = service(3, clock);
        let phase = ClassifierPhase::Classification;

        assert!(breaker.allow(&phase).await);
        breaker.record_failure(&phase).await;
        breaker.record_failure(&phase).await;
        assert!(breaker.allow(&phase).await);

        breaker.record_failure(&phase).await;
        assert_eq!(breaker.state(&phase).await, CircuitState::Open);
        assert!(!breaker.allow(&phase).await);
    }

    #[tokio::test]
    async fn test_phases_are_independent() {
        let clock = Arc::new(ManualClock::default());
        let breaker = service(1, clock);

        breaker.record_failure(&ClassifierPhase::Taxonomy).await;
        assert!(!breaker.allow(&ClassifierPhase::Taxonomy).await);
        assert!(breaker.allow(&ClassifierPhase::Classification).await);
    }

    #[tokio::test]
    async fn test_half_open_recovery() {
        let clock = Arc::new(ManualClock::default());
        let breaker = service(1, Arc::clone(&clock));
        let phase = ClassifierPhase::Taxonomy;

        breaker.record_failure(&phase).await;
        assert!(!breaker.allow(&phase).await);

        clock.advance(Duration::seconds(31));
        assert!(breaker.allow(&phase).await);
        assert_eq!(breaker.state(&phase).await, CircuitState::HalfOpen);

        breaker.record_success(&phase).await;
        assert_eq!(breaker.state(&phase).await, CircuitState::Closed);
    }

    #[tokio::test]
    async fn test_half_open_failure_reopens() {
        let clock = Arc::new(ManualClock::default());
        let breaker = service(1, Arc::clone(&clock));
        let phase = ClassifierPhase::Taxonomy;

        breaker.record_failure(&phase).await;
        clock.advance(Duration::seconds(31));
        assert!(breaker.allow(&phase).await);

        breaker.record_failure(&phase).await;
        assert_eq!(breaker.state(&phase).await, CircuitState::Open);
        let stats = breaker.stats().await;
        assert_eq!(stats[0].open_count, 2);
    }

    #[tokio::test]
    async fn test_old_failures_fall_out_of_window() {
        let clock = Arc::new(ManualClock::default());
        let breaker = service(2, Arc::clone(&clock));
        let phase = ClassifierPhase::Classification;

        breaker.record_failure(&phase).await;
        clock.advance(Duration::minutes(6));
        breaker.record_failure(&phase).await;
        assert_eq!(breaker.state(&phase).await, CircuitState::Closed);
    }

    #[tokio::test]
    async fn test_disabled_never_opens() {
        let breaker = CircuitBreakerService::new(CircuitBreakerConfig {
            failure_threshold: 1,
            ..CircuitBreakerConfig::disabled()
        });
        let phase = ClassifierPhase::Classification;

        for _ in 0..10 {
            breaker.record_failure(&phase).await;
        }
        assert!(breaker.allow(&phase).await);
    }

    #[tokio::test]
    async fn test_stats_report_each_phase() {
        let breaker = service(1, Arc::new(ManualClock::default()));

        breaker.record_failure(&ClassifierPhase::Taxonomy).await;
        assert!(breaker.allow(&ClassifierPhase::Classification).await);

        let stats = breaker.stats().await;
        assert_eq!(stats.len(), 2);
        assert_eq!(stats[0].phase, "classification");
        assert_eq!(stats[0].state, "closed");
        assert_eq!(stats[1].phase, "taxonomy");
        assert_eq!(stats[1].state, "open");
        assert_eq!(stats[1].failure_count, 1);
        assert!(stats[1].opened_at.is_some());
    }
}
