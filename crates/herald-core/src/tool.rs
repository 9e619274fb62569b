use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Name of the completion signal. Advertised like a tool, never executed.
pub const DONE_TOOL: &str = "Done";

/// Whether a tool may run unsupervised.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskTier {
    Safe,
    RequiresApproval,
}

impl RiskTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Safe => "safe",
            Self::RequiresApproval => "requires_approval",
        }
    }
}

/// Description of a tool that can be requested by the decision port.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolSpec {
    /// Unique name, e.g. "write_email", "check_calendar_availability".
    pub name: String,
    /// Human-readable description for the model.
    pub description: String,
    /// JSON Schema of the arguments object.
    pub parameters: Value,
    pub risk_tier: RiskTier,
}

impl ToolSpec {
    pub fn is_completion_signal(&self) -> bool {
        self.name == DONE_TOOL
    }
}

/// A request from the decision port to call a tool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    pub id: String,
    pub tool_name: String,
    pub arguments: Value,
}

impl ToolCall {
    pub fn new(id: impl Into<String>, tool_name: impl Into<String>, arguments: Value) -> Self {
        Self {
            id: id.into(),
            tool_name: tool_name.into(),
            arguments,
        }
    }

    pub fn is_done(&self) -> bool {
        self.tool_name == DONE_TOOL
    }
}

/// The result of executing (or refusing) a tool call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolResult {
    pub tool_call_id: String,
    pub content: String,
    pub is_error: bool,
    /// Executed with reviewer-edited arguments.
    #[serde(default)]
    pub edited: bool,
}

impl ToolResult {
    pub fn ok(tool_call_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            tool_call_id: tool_call_id.into(),
            content: content.into(),
            is_error: false,
            edited: false,
        }
    }

    pub fn error(tool_call_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            tool_call_id: tool_call_id.into(),
            content: content.into(),
            is_error: true,
            edited: false,
        }
    }

    pub fn edited(mut self) -> Self {
        self.edited = true;
        self
    }
}

/// Trait implemented by anything that can execute tool calls by name.
#[async_trait]
pub trait ToolExecutor: Send + Sync {
    /// Schemas of every tool, including the completion signal.
    fn specs(&self) -> Vec<ToolSpec>;

    /// Look up one tool's schema.
    fn spec(&self, name: &str) -> Option<ToolSpec>;

    /// Validate arguments against the tool's schema without executing.
    fn validate(&self, call: &ToolCall) -> crate::Result<()>;

    /// Execute a single tool call and return its raw textual result.
    async fn invoke(&self, call: &ToolCall) -> crate::Result<String>;
}
