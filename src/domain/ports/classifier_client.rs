//! Classifier port - interface for the external generative classifier.

use async_trait::async_trait;

use crate::domain::errors::ClassifierError;
use crate::domain::models::TokenUsage;

/// Raw reply from a classifier call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClassifierResponse {
    pub text: String,
    pub usage: TokenUsage,
}

impl ClassifierResponse {
    pub fn new(text: impl Into<String>, usage: TokenUsage) -> Self {
        Self {
            text: text.into(),
            usage,
        }
    }
}

/// Trait for generative classifier backends.
///
/// Implementations perform exactly one call per invocation; retries, circuit
/// breaking and fallbacks live in the services layer.
#[async_trait]
pub trait ClassifierClient: Send + Sync {
    /// Identifier of the underlying model, part of the taxonomy cache key.
    fn model_id(&self) -> &str;

    /// Send one system/user prompt pair and return the raw text reply.
    async fn call(
        &self,
        system_prompt: &str,
        user_prompt: &str,
    ) -> Result<ClassifierResponse, ClassifierError>;
}
