use async_trait::async_trait;
use herald_core::{Result, ToolCall, ToolSpec, Turn};
use serde::{Deserialize, Serialize};

/// What the caller needs from the decision port.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionMode {
    /// Classify one email into ignore / notify / respond.
    Classify,
    /// Choose the next tool call(s). A plain-text answer is not acceptable.
    Act,
}

/// A request to the decision port.
#[derive(Debug, Clone)]
pub struct DecisionRequest {
    pub mode: DecisionMode,
    /// The model to use (provider-specific part).
    pub model: String,
    /// System context: instructions plus the preference documents in effect.
    pub system_context: String,
    /// Conversation so far, without system turns.
    pub conversation: Vec<Turn>,
    /// Tools the port may choose from. Empty for `Classify`.
    pub tools: Vec<ToolSpec>,
    pub max_tokens: u32,
    pub temperature: f32,
}

/// Structured triage answer as returned by the port. The category is left
/// unparsed here so the triage stage can reject values outside the enum.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawClassification {
    pub reasoning: String,
    pub category: String,
}

/// The port's answer.
#[derive(Debug, Clone, PartialEq)]
pub enum Decision {
    Classify(RawClassification),
    Act {
        /// Optional free text the model produced alongside its calls.
        text: String,
        tool_calls: Vec<ToolCall>,
    },
}

impl Decision {
    pub fn mode(&self) -> DecisionMode {
        match self {
            Self::Classify(_) => DecisionMode::Classify,
            Self::Act { .. } => DecisionMode::Act,
        }
    }
}

/// One call to the opaque reasoning function. No orchestration logic lives here.
#[async_trait]
pub trait DecisionPort: Send + Sync {
    /// Human-readable name, e.g. "openai", "mock".
    fn name(&self) -> &str;

    /// Make one decision.
    async fn decide(&self, request: &DecisionRequest) -> Result<Decision>;
}
