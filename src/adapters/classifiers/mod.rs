//! Classifier adapter implementations.

pub mod anthropic_api;
pub mod mock;

pub use anthropic_api::AnthropicClassifier;
pub use mock::ScriptedClassifier;
