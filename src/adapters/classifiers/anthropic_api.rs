//! Anthropic Messages API classifier.
//!
//! One HTTP request per call, throttled by a token-bucket limiter. Retries
//! are left to the services layer so attempt counts stay observable there.

use anyhow::{Context, Result};
use async_trait::async_trait;
use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use reqwest::{header, Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::num::NonZeroU32;
use std::time::Duration;
use tracing::{debug, instrument};

use crate::domain::errors::ClassifierError;
use crate::domain::models::{ClassifierConfig, TokenUsage};
use crate::domain::ports::{ClassifierClient, ClassifierResponse};

const API_VERSION: &str = "2023-06-01";

#[derive(Debug, Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    system: &'a str,
    messages: [Message<'a>; 1],
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct Message<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
enum ContentBlock {
    #[serde(rename = "text")]
    Text { text: String },
    #[serde(other)]
    Other,
}

#[derive(Debug, Default, Deserialize)]
struct Usage {
    #[serde(default)]
    input_tokens: u64,
    #[serde(default)]
    output_tokens: u64,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    content: Vec<ContentBlock>,
    #[serde(default)]
    usage: Usage,
}

/// Map a non-success HTTP status to a classifier error.
fn error_from_status(status: StatusCode, body: String) -> ClassifierError {
    match status.as_u16() {
        429 => ClassifierError::RateLimited,
        401 | 403 => ClassifierError::Authentication(body),
        code @ (500..=599) => ClassifierError::Server {
            status: code,
            message: body,
        },
        _ => ClassifierError::InvalidRequest(format!("{status}: {body}")),
    }
}

fn error_from_reqwest(err: &reqwest::Error) -> ClassifierError {
    if err.is_timeout() {
        ClassifierError::Timeout
    } else {
        ClassifierError::Network(err.to_string())
    }
}

pub struct AnthropicClassifier {
    http_client: Client,
    api_key: String,
    base_url: String,
    model: String,
    max_tokens: u32,
    temperature: f32,
    limiter: DefaultDirectRateLimiter,
}

impl AnthropicClassifier {
    /// Build a classifier from configuration.
    ///
    /// Fails when no API key is configured or the HTTP client cannot be built.
    pub fn from_config(config: &ClassifierConfig) -> Result<Self> {
        let api_key = config
            .resolve_api_key()
            .context("No API key configured; set classifier.api_key or ANTHROPIC_API_KEY")?;

        let http_client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .pool_max_idle_per_host(10)
            .tcp_nodelay(true)
            .build()
            .context("Failed to build HTTP client")?;

        let rate = NonZeroU32::new(config.requests_per_second).unwrap_or(NonZeroU32::MIN);
        let burst = NonZeroU32::new(config.burst_size).unwrap_or(rate);

        Ok(Self {
            http_client,
            api_key,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            max_tokens: config.max_tokens,
            temperature: config.temperature,
            limiter: RateLimiter::direct(Quota::per_second(rate).allow_burst(burst)),
        })
    }
}

#[async_trait]
impl ClassifierClient for AnthropicClassifier {
    fn model_id(&self) -> &str {
        &self.model
    }

    #[instrument(skip_all, fields(model = %self.model))]
    async fn call(
        &self,
        system_prompt: &str,
        user_prompt: &str,
    ) -> Result<ClassifierResponse, ClassifierError> {
        self.limiter.until_ready().await;

        let request = MessagesRequest {
            model: &self.model,
            max_tokens: self.max_tokens,
            system: system_prompt,
            messages: [Message {
                role: "user",
                content: user_prompt,
            }],
            temperature: self.temperature,
        };

        let response = self
            .http_client
            .post(format!("{}/v1/messages", self.base_url))
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", API_VERSION)
            .header(header::CONTENT_TYPE, "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|e| error_from_reqwest(&e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Failed to read error response".to_string());
            debug!(%status, "Classifier request rejected");
            return Err(error_from_status(status, body));
        }

        let body = response.text().await.map_err(|e| error_from_reqwest(&e))?;
        let parsed: MessagesResponse = serde_json::from_str(&body)
            .map_err(|e| ClassifierError::Network(format!("Unreadable API response: {e}")))?;

        let text = parsed
            .content
            .into_iter()
            .filter_map(|block| match block {
                ContentBlock::Text { text } => Some(text),
                ContentBlock::Other => None,
            })
            .collect::<Vec<_>>()
            .join("");

        Ok(ClassifierResponse::new(
            text,
            TokenUsage::new(parsed.usage.input_tokens, parsed.usage.output_tokens),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            error_from_status(StatusCode::TOO_MANY_REQUESTS, String::new()),
            ClassifierError::RateLimited
        );
        assert!(error_from_status(StatusCode::UNAUTHORIZED, "bad key".into()).is_permanent());
        assert!(error_from_status(StatusCode::BAD_REQUEST, "too long".into()).is_permanent());
        assert!(error_from_status(StatusCode::from_u16(529).unwrap(), "overloaded".into()).is_transient());
        assert!(error_from_status(StatusCode::BAD_GATEWAY, String::new()).is_transient());
    }

    #[test]
    fn test_missing_api_key_is_rejected() {
        temp_env::with_var_unset("ANTHROPIC_API_KEY", || {
            let config = ClassifierConfig {
                api_key: None,
                ..ClassifierConfig::default()
            };
            assert!(AnthropicClassifier::from_config(&config).is_err());
        });
    }

    #[test]
    fn test_request_serialization() {
        let request = MessagesRequest {
            model: "m",
            max_tokens: 10,
            system: "sys",
            messages: [Message {
                role: "user",
                content: "hi",
            }],
            temperature: 0.0,
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["messages"][0]["role"], "user");
        assert_eq!(json["system"], "sys");
    }
}
