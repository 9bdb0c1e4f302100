//! Scripted classifier for testing.
//!
//! Replies are produced by a responder closure that sees which kind of
//! request was made and which tests a batch request carried, so tests can
//! fail by batch size, by call number, or by test path.

use async_trait::async_trait;
use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::domain::errors::ClassifierError;
use crate::domain::models::TokenUsage;
use crate::domain::ports::{ClassifierClient, ClassifierResponse};

/// Which prompt a call carried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallKind {
    Taxonomy,
    Batch,
}

/// A test as it appeared in a batch prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptedTest {
    pub path: String,
    pub name: String,
}

/// What the responder gets to see about a call.
#[derive(Debug, Clone)]
pub struct ScriptedCall {
    /// Zero-based across all calls on this classifier
    pub number: usize,
    pub kind: CallKind,
    pub tests: Vec<PromptedTest>,
    pub user_prompt: String,
}

type Responder = dyn Fn(&ScriptedCall) -> Result<String, ClassifierError> + Send + Sync;

pub struct ScriptedClassifier {
    model: String,
    responder: Arc<Responder>,
    delay: Option<Duration>,
    usage: TokenUsage,
    calls: AtomicUsize,
    log: Mutex<Vec<ScriptedCall>>,
}

impl ScriptedClassifier {
    pub fn new<F>(responder: F) -> Self
    where
        F: Fn(&ScriptedCall) -> Result<String, ClassifierError> + Send + Sync + 'static,
    {
        Self {
            model: "scripted".to_string(),
            responder: Arc::new(responder),
            delay: None,
            usage: TokenUsage::new(100, 50),
            calls: AtomicUsize::new(0),
            log: Mutex::new(Vec::new()),
        }
    }

    /// Every test gets the same verdict; taxonomy requests get a one-domain
    /// taxonomy with that name.
    pub fn uniform(domain: &str, feature: &str) -> Self {
        let (domain, feature) = (domain.to_string(), feature.to_string());
        Self::new(move |call| {
            Ok(match call.kind {
                CallKind::Taxonomy => taxonomy_reply(&[(domain.as_str(), &[feature.as_str()][..])]),
                CallKind::Batch => batch_reply(call.tests.iter().map(|_| (domain.as_str(), feature.as_str()))),
            })
        })
    }

    /// Batches larger than `max_size` fail with a transient server error.
    pub fn failing_above(max_size: usize, domain: &str, feature: &str) -> Self {
        let uniform = Self::uniform(domain, feature).responder;
        Self::new(move |call| {
            if call.kind == CallKind::Batch && call.tests.len() > max_size {
                return Err(ClassifierError::Server {
                    status: 503,
                    message: "overloaded".to_string(),
                });
            }
            (*uniform)(call)
        })
    }

    /// Every reply is prose instead of JSON.
    pub fn always_malformed() -> Self {
        Self::new(|_| Ok("I'm sorry, I can't classify these tests.".to_string()))
    }

    pub fn always_failing(error: ClassifierError) -> Self {
        Self::new(move |_| Err(error.clone()))
    }

    /// Verdicts derived from the prompt: the first directory of the path is
    /// the domain and the test name is the feature.
    pub fn echo_paths() -> Self {
        Self::new(|call| match call.kind {
            CallKind::Taxonomy => Err(ClassifierError::Server {
                status: 500,
                message: "taxonomy unavailable".to_string(),
            }),
            CallKind::Batch => Ok(batch_reply(call.tests.iter().map(|t| {
                let domain = t.path.split('/').next().unwrap_or("root");
                (domain, t.name.as_str())
            }))),
        })
    }

    #[must_use]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    #[must_use]
    pub fn with_usage(mut self, usage: TokenUsage) -> Self {
        self.usage = usage;
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Calls of one kind made so far.
    pub fn calls_of(&self, kind: CallKind) -> usize {
        self.recorded().iter().filter(|c| c.kind == kind).count()
    }

    /// Test counts of batch calls, in call order.
    pub fn batch_sizes(&self) -> Vec<usize> {
        self.recorded()
            .iter()
            .filter(|c| c.kind == CallKind::Batch)
            .map(|c| c.tests.len())
            .collect()
    }

    pub fn recorded(&self) -> Vec<ScriptedCall> {
        self.log.lock().map(|log| log.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl ClassifierClient for ScriptedClassifier {
    fn model_id(&self) -> &str {
        &self.model
    }

    async fn call(
        &self,
        _system_prompt: &str,
        user_prompt: &str,
    ) -> Result<ClassifierResponse, ClassifierError> {
        let number = self.calls.fetch_add(1, Ordering::SeqCst);
        let call = parse_call(number, user_prompt);
        if let Ok(mut log) = self.log.lock() {
            log.push(call.clone());
        }

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        (*self.responder)(&call).map(|text| ClassifierResponse::new(text, self.usage))
    }
}

fn parse_call(number: usize, user_prompt: &str) -> ScriptedCall {
    let kind = if user_prompt.contains("## Test files") {
        CallKind::Taxonomy
    } else {
        CallKind::Batch
    };

    let mut tests = Vec::new();
    if kind == CallKind::Batch {
        let section = user_prompt
            .split_once("## Tests\n")
            .map_or("", |(_, rest)| rest);
        for line in section.lines() {
            let Some((position, rest)) = line.split_once(". ") else {
                continue;
            };
            if position.parse::<usize>().is_err() {
                continue;
            }
            if let Some((path, name)) = rest.split_once(" :: ") {
                tests.push(PromptedTest {
                    path: path.to_string(),
                    name: name.to_string(),
                });
            }
        }
    }

    ScriptedCall {
        number,
        kind,
        tests,
        user_prompt: user_prompt.to_string(),
    }
}

/// `[{"domain": .., "feature": ..}, ...]`
pub fn batch_reply<'a>(verdicts: impl IntoIterator<Item = (&'a str, &'a str)>) -> String {
    let items: Vec<_> = verdicts
        .into_iter()
        .map(|(domain, feature)| json!({ "domain": domain, "feature": feature }))
        .collect();
    serde_json::Value::Array(items).to_string()
}

/// `{"domains": [...]}` with every file index left empty.
pub fn taxonomy_reply(domains: &[(&str, &[&str])]) -> String {
    let domains: Vec<_> = domains
        .iter()
        .map(|(name, features)| {
            json!({
                "name": name,
                "description": format!("{name} tests"),
                "fileIndices": [],
                "features": features
                    .iter()
                    .map(|f| json!({ "name": f, "description": "", "fileIndices": [] }))
                    .collect::<Vec<_>>(),
            })
        })
        .collect();
    json!({ "domains": domains }).to_string()
}
