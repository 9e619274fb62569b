use async_trait::async_trait;
use herald_core::{HeraldError, Result, Role, ToolCall, Turn, TurnContent};
use serde_json::{Value, json};
use std::time::Duration;
use tracing::{debug, info};

use crate::decision::*;

/// Name of the router function used to force a structured classification.
const CLASSIFY_FUNCTION: &str = "classify_email";

/// OpenAI-compatible chat-completions decider (works with OpenAI, Azure, vLLM, Ollama, etc.)
pub struct OpenAiDecider {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    provider_name: String,
}

impl OpenAiDecider {
    pub fn new(api_key: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key,
            base_url: "https://api.openai.com/v1".into(),
            provider_name: "openai".into(),
        }
    }

    /// Use a custom base URL (for Azure, vLLM, Ollama, etc.)
    pub fn with_base_url(mut self, url: String, name: String) -> Self {
        self.base_url = url.trim_end_matches('/').to_string();
        self.provider_name = name;
        self
    }

    /// Apply a per-request timeout. Zero leaves the client without one.
    pub fn with_timeout(mut self, timeout: Duration) -> Result<Self> {
        if timeout.is_zero() {
            return Ok(self);
        }
        self.client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| HeraldError::DecisionPort(e.to_string()))?;
        Ok(self)
    }

    /// Build the chat-completions body for a request.
    pub fn build_body(request: &DecisionRequest) -> Value {
        let mut messages = vec![json!({
            "role": "system",
            "content": request.system_context,
        })];
        messages.extend(request.conversation.iter().flat_map(turn_to_messages));

        let mut body = json!({
            "model": request.model,
            "temperature": request.temperature,
            "max_tokens": request.max_tokens,
            "messages": messages,
        });

        match request.mode {
            DecisionMode::Classify => {
                body["tools"] = json!([{
                    "type": "function",
                    "function": {
                        "name": CLASSIFY_FUNCTION,
                        "description": "Record the triage decision for this email.",
                        "parameters": {
                            "type": "object",
                            "properties": {
                                "reasoning": {
                                    "type": "string",
                                    "description": "Step-by-step reasoning behind the classification."
                                },
                                "classification": {
                                    "type": "string",
                                    "enum": ["ignore", "respond", "notify"],
                                    "description": "ignore: not worth responding or tracking; notify: important information, no response needed; respond: requires a reply."
                                }
                            },
                            "required": ["reasoning", "classification"]
                        }
                    }
                }]);
                body["tool_choice"] = json!({
                    "type": "function",
                    "function": { "name": CLASSIFY_FUNCTION }
                });
            }
            DecisionMode::Act => {
                let tools: Vec<Value> = request
                    .tools
                    .iter()
                    .map(|t| {
                        json!({
                            "type": "function",
                            "function": {
                                "name": t.name,
                                "description": t.description,
                                "parameters": t.parameters,
                            }
                        })
                    })
                    .collect();
                body["tools"] = json!(tools);
                body["tool_choice"] = json!("required");
            }
        }

        body
    }

    /// Interpret a chat-completions response for the given mode.
    pub fn parse_response(mode: DecisionMode, data: &Value) -> Result<Decision> {
        let message = &data["choices"][0]["message"];
        if message.is_null() {
            return Err(HeraldError::DecisionContractViolation(
                "response carried no choices".into(),
            ));
        }
        let text = message["content"].as_str().unwrap_or("").to_string();
        let raw_calls = message["tool_calls"].as_array().cloned().unwrap_or_default();

        let mut tool_calls = Vec::with_capacity(raw_calls.len());
        for c in &raw_calls {
            let id = c["id"].as_str().ok_or_else(|| {
                HeraldError::DecisionContractViolation("tool call without id".into())
            })?;
            let name = c["function"]["name"].as_str().ok_or_else(|| {
                HeraldError::DecisionContractViolation(format!("tool call {id} without a name"))
            })?;
            let raw_args = c["function"]["arguments"].as_str().unwrap_or("{}");
            let arguments: Value = serde_json::from_str(raw_args).map_err(|e| {
                HeraldError::DecisionContractViolation(format!(
                    "arguments for {name} are not valid JSON: {e}"
                ))
            })?;
            tool_calls.push(ToolCall::new(id, name, arguments));
        }

        match mode {
            DecisionMode::Act => Ok(Decision::Act { text, tool_calls }),
            DecisionMode::Classify => {
                let call = tool_calls
                    .into_iter()
                    .find(|c| c.tool_name == CLASSIFY_FUNCTION)
                    .ok_or_else(|| {
                        HeraldError::DecisionContractViolation(format!(
                            "classification did not call {CLASSIFY_FUNCTION}"
                        ))
                    })?;
                let field = |key: &str| {
                    call.arguments[key].as_str().map(String::from).ok_or_else(|| {
                        HeraldError::DecisionContractViolation(format!(
                            "classification is missing '{key}'"
                        ))
                    })
                };
                Ok(Decision::Classify(RawClassification {
                    reasoning: field("reasoning")?,
                    category: field("classification")?,
                }))
            }
        }
    }
}

/// Map one conversation turn to chat-completions messages.
fn turn_to_messages(turn: &Turn) -> Vec<Value> {
    match turn.role {
        Role::System => vec![json!({ "role": "system", "content": turn.text_content() })],
        Role::User => vec![json!({ "role": "user", "content": turn.text_content() })],
        Role::Assistant if turn.tool_calls.is_empty() => {
            vec![json!({ "role": "assistant", "content": turn.text_content() })]
        }
        Role::Assistant => {
            let calls: Vec<Value> = turn
                .tool_calls
                .iter()
                .map(|tc| {
                    json!({
                        "id": tc.id,
                        "type": "function",
                        "function": {
                            "name": tc.tool_name,
                            "arguments": tc.arguments.to_string(),
                        }
                    })
                })
                .collect();
            let text = turn.text_content();
            let content = if text.is_empty() { Value::Null } else { json!(text) };
            vec![json!({ "role": "assistant", "content": content, "tool_calls": calls })]
        }
        Role::Tool => turn
            .content
            .iter()
            .filter_map(|block| match block {
                TurnContent::ToolResult {
                    tool_call_id,
                    content,
                    ..
                } => Some(json!({
                    "role": "tool",
                    "tool_call_id": tool_call_id,
                    "content": content,
                })),
                TurnContent::Text { .. } => None,
            })
            .collect(),
    }
}

#[async_trait]
impl DecisionPort for OpenAiDecider {
    fn name(&self) -> &str {
        &self.provider_name
    }

    async fn decide(&self, request: &DecisionRequest) -> Result<Decision> {
        let body = Self::build_body(request);
        debug!(mode = ?request.mode, model = %request.model, turns = request.conversation.len(), "sending decision request");

        let resp = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&body)
            .send()
            .await
            .map_err(|e| HeraldError::DecisionPort(e.to_string()))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            return Err(HeraldError::DecisionPort(format!("HTTP {status}: {text}")));
        }

        let data: Value = resp
            .json()
            .await
            .map_err(|e| HeraldError::DecisionPort(e.to_string()))?;

        let decision = Self::parse_response(request.mode, &data)?;
        if let Decision::Act { ref tool_calls, .. } = decision {
            info!(
                provider = %self.provider_name,
                calls = tool_calls.len(),
                "decision received"
            );
        }
        Ok(decision)
    }
}
