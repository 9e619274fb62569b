//! Scripted decision port for deterministic testing.
//!
//! Returns pre-configured decisions without making any HTTP calls.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use crate::decision::*;
use herald_core::{HeraldError, Result, ToolCall};

/// A scripted decision port.
///
/// # Example
/// ```
/// use herald_llm::mock::MockDecider;
/// let decider = MockDecider::new("test")
///     .with_classification("respond", "direct question")
///     .with_tool_call("Done", serde_json::json!({"done": true}));
/// ```
pub struct MockDecider {
    queue: Arc<Mutex<VecDeque<MockDecision>>>,
    /// Returned whenever the queue is empty.
    fallback: Option<MockDecision>,
    /// Every request received, in order (for assertions in tests).
    pub requests: Arc<Mutex<Vec<DecisionRequest>>>,
    latency: Option<Duration>,
    in_flight: Arc<AtomicUsize>,
    peak_in_flight: Arc<AtomicUsize>,
    name: String,
}

/// A pre-configured decision. Tool calls with an empty id get a fresh one
/// when the decision is served.
#[derive(Debug, Clone)]
pub enum MockDecision {
    Classify { category: String, reasoning: String },
    Act { text: String, tool_calls: Vec<ToolCall> },
    Error(String),
}

impl MockDecision {
    pub fn tool_call(name: &str, args: serde_json::Value) -> Self {
        Self::Act {
            text: String::new(),
            tool_calls: vec![ToolCall::new("", name, args)],
        }
    }
}

impl MockDecider {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            queue: Arc::new(Mutex::new(VecDeque::new())),
            fallback: None,
            requests: Arc::new(Mutex::new(vec![])),
            latency: None,
            in_flight: Arc::new(AtomicUsize::new(0)),
            peak_in_flight: Arc::new(AtomicUsize::new(0)),
            name: name.into(),
        }
    }

    /// Queue a classification answer. The category is passed through verbatim.
    pub fn with_classification(self, category: &str, reasoning: &str) -> Self {
        self.queue.lock().push_back(MockDecision::Classify {
            category: category.to_string(),
            reasoning: reasoning.to_string(),
        });
        self
    }

    /// Queue a single tool call.
    pub fn with_tool_call(self, name: &str, args: serde_json::Value) -> Self {
        self.queue.lock().push_back(MockDecision::tool_call(name, args));
        self
    }

    /// Queue one round with several tool calls, in order.
    pub fn with_tool_calls(self, calls: Vec<(&str, serde_json::Value)>) -> Self {
        let tool_calls = calls
            .into_iter()
            .map(|(name, args)| ToolCall::new("", name, args))
            .collect();
        self.queue.lock().push_back(MockDecision::Act {
            text: String::new(),
            tool_calls,
        });
        self
    }

    /// Queue an error.
    pub fn with_error(self, error: &str) -> Self {
        self.queue
            .lock()
            .push_back(MockDecision::Error(error.to_string()));
        self
    }

    /// Queue a fully custom decision.
    pub fn with_decision(self, decision: MockDecision) -> Self {
        self.queue.lock().push_back(decision);
        self
    }

    /// Decision served once the queue runs dry (repeated indefinitely).
    pub fn with_fallback(mut self, decision: MockDecision) -> Self {
        self.fallback = Some(decision);
        self
    }

    /// Sleep this long inside every `decide` call.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Queue a decision through a shared reference.
    pub fn push(&self, decision: MockDecision) {
        self.queue.lock().push_back(decision);
    }

    /// Number of requests made in the given mode.
    pub fn calls_in_mode(&self, mode: DecisionMode) -> usize {
        self.requests
            .lock()
            .iter()
            .filter(|r| r.mode == mode)
            .count()
    }

    /// Highest number of simultaneous `decide` calls observed.
    pub fn peak_in_flight(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }

    /// Decisions still queued.
    pub fn remaining(&self) -> usize {
        self.queue.lock().len()
    }

    fn next_decision(&self) -> Option<MockDecision> {
        self.queue
            .lock()
            .pop_front()
            .or_else(|| self.fallback.clone())
    }
}

#[async_trait]
impl DecisionPort for MockDecider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn decide(&self, request: &DecisionRequest) -> Result<Decision> {
        self.requests.lock().push(request.clone());

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(now, Ordering::SeqCst);
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        let decision = self.next_decision();
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        match decision {
            None => Err(HeraldError::DecisionPort(
                "mock: no more queued decisions".into(),
            )),
            Some(MockDecision::Error(e)) => Err(HeraldError::DecisionPort(e)),
            Some(MockDecision::Classify {
                category,
                reasoning,
            }) => Ok(Decision::Classify(RawClassification {
                reasoning,
                category,
            })),
            Some(MockDecision::Act { text, tool_calls }) => {
                let tool_calls = tool_calls
                    .into_iter()
                    .map(|mut call| {
                        if call.id.is_empty() {
                            call.id = format!("call_{}", uuid::Uuid::new_v4().simple());
                        }
                        call
                    })
                    .collect();
                Ok(Decision::Act { text, tool_calls })
            }
        }
    }
}
