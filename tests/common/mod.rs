//! Common test utilities for integration tests
//!
//! Shared fixtures for building inputs, configs and services around the
//! scripted classifier.

use std::sync::Arc;

use taxonomist::adapters::classifiers::ScriptedClassifier;
use taxonomist::domain::models::{Config, Phase1Input};
use taxonomist::services::{
    CircuitBreakerConfig, CircuitBreakerService, ClassificationService, TaxonomyCache,
};

/// Setup test logging
///
/// Initializes tracing subscriber for test output.
/// Call this at the beginning of tests that need logging.
#[allow(dead_code)]
pub fn setup_test_logging() {
    use tracing_subscriber::fmt;

    let _ = fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
}

/// Config with zero backoff so retry paths run instantly.
#[allow(dead_code)]
pub fn fast_config() -> Config {
    let mut config = Config::default();
    config.retry.initial_backoff_ms = 0;
    config.retry.max_backoff_ms = 0;
    config.circuit_breaker.enabled = false;
    config
}

/// `tests_total` tests spread round-robin over `files` files in distinct
/// top-level directories.
#[allow(dead_code)]
pub fn spread_input(analysis_id: &str, files: usize, tests_total: usize) -> Phase1Input {
    let mut per_file: Vec<(String, Vec<String>)> = (0..files)
        .map(|f| (format!("module{f}/feature{f}_test.go"), Vec::new()))
        .collect();
    for t in 0..tests_total {
        per_file[t % files].1.push(format!("TestCase{t}"));
    }
    Phase1Input::from_files(analysis_id, "go", per_file)
}

#[allow(dead_code)]
pub fn service(client: Arc<ScriptedClassifier>, config: Config) -> ClassificationService {
    ClassificationService::from_config(client, config)
}

/// Service whose cache and breaker are supplied by the caller.
#[allow(dead_code)]
pub fn shared_service(
    client: Arc<ScriptedClassifier>,
    cache: Arc<TaxonomyCache>,
    breaker: Arc<CircuitBreakerService>,
    config: Config,
) -> ClassificationService {
    ClassificationService::new(client, cache, breaker, config)
}

#[allow(dead_code)]
pub fn breaker(config: &Config) -> Arc<CircuitBreakerService> {
    Arc::new(CircuitBreakerService::new(CircuitBreakerConfig::from(
        &config.circuit_breaker,
    )))
}
