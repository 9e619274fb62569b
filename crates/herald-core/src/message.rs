use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use uuid::Uuid;

use crate::error::{HeraldError, Result};
use crate::tool::{ToolCall, ToolResult};

/// Who produced a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
    Tool,
}

/// A single content block within a turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TurnContent {
    Text {
        text: String,
    },
    ToolResult {
        tool_call_id: String,
        content: String,
        is_error: bool,
        #[serde(default)]
        edited: bool,
    },
}

/// One turn of the conversation a run accumulates.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Turn {
    pub id: Uuid,
    pub role: Role,
    pub content: Vec<TurnContent>,
    pub timestamp: DateTime<Utc>,
    /// Tool calls requested by the assistant in this turn.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolCall>,
}

impl Turn {
    /// Create a simple text turn.
    pub fn text(role: Role, text: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            role,
            content: vec![TurnContent::Text { text: text.into() }],
            timestamp: Utc::now(),
            tool_calls: vec![],
        }
    }

    pub fn assistant(text: impl Into<String>, tool_calls: Vec<ToolCall>) -> Self {
        let text = text.into();
        let content = if text.is_empty() {
            vec![]
        } else {
            vec![TurnContent::Text { text }]
        };
        Self {
            id: Uuid::new_v4(),
            role: Role::Assistant,
            content,
            timestamp: Utc::now(),
            tool_calls,
        }
    }

    pub fn tool_result(result: ToolResult) -> Self {
        Self {
            id: Uuid::new_v4(),
            role: Role::Tool,
            content: vec![TurnContent::ToolResult {
                tool_call_id: result.tool_call_id,
                content: result.content,
                is_error: result.is_error,
                edited: result.edited,
            }],
            timestamp: Utc::now(),
            tool_calls: vec![],
        }
    }

    /// Extract all text content joined together. Tool results contribute their content.
    pub fn text_content(&self) -> String {
        self.content
            .iter()
            .map(|c| match c {
                TurnContent::Text { text } => text.as_str(),
                TurnContent::ToolResult { content, .. } => content.as_str(),
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// The tool call id this turn answers, if it is a tool-result turn.
    pub fn answered_call_id(&self) -> Option<&str> {
        self.content.iter().find_map(|c| match c {
            TurnContent::ToolResult { tool_call_id, .. } => Some(tool_call_id.as_str()),
            _ => None,
        })
    }

    pub fn is_error_result(&self) -> bool {
        self.content
            .iter()
            .any(|c| matches!(c, TurnContent::ToolResult { is_error: true, .. }))
    }

    pub fn is_edited_result(&self) -> bool {
        self.content
            .iter()
            .any(|c| matches!(c, TurnContent::ToolResult { edited: true, .. }))
    }
}

/// Ordered, append-only conversation owned by one run.
///
/// Every tool call id appears in at most one assistant turn and is answered by
/// at most one tool-result turn.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Conversation {
    turns: Vec<Turn>,
}

impl Conversation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn last(&self) -> Option<&Turn> {
        self.turns.last()
    }

    pub fn push_system(&mut self, text: impl Into<String>) {
        self.turns.push(Turn::text(Role::System, text));
    }

    pub fn push_user(&mut self, text: impl Into<String>) {
        self.turns.push(Turn::text(Role::User, text));
    }

    /// Append an assistant turn carrying requested tool calls.
    pub fn push_assistant(&mut self, text: impl Into<String>, tool_calls: Vec<ToolCall>) -> Result<()> {
        let mut seen: HashSet<&str> = HashSet::new();
        for call in &tool_calls {
            if !seen.insert(call.id.as_str()) || self.find_call(&call.id).is_some() {
                return Err(HeraldError::DecisionContractViolation(format!(
                    "tool call id '{}' is not unique within the run",
                    call.id
                )));
            }
        }
        self.turns.push(Turn::assistant(text, tool_calls));
        Ok(())
    }

    /// Append the final response text (no tool calls).
    pub fn push_final_response(&mut self, text: impl Into<String>) {
        self.turns.push(Turn::assistant(text, vec![]));
    }

    /// Append a tool-result turn. The call must have been requested and not yet answered.
    pub fn push_tool_result(&mut self, result: ToolResult) -> Result<()> {
        if self.find_call(&result.tool_call_id).is_none() {
            return Err(HeraldError::ConversationInvariant(format!(
                "tool result for unknown call '{}'",
                result.tool_call_id
            )));
        }
        if self.has_result(&result.tool_call_id) {
            return Err(HeraldError::ConversationInvariant(format!(
                "tool call '{}' already has a result",
                result.tool_call_id
            )));
        }
        self.turns.push(Turn::tool_result(result));
        Ok(())
    }

    pub fn find_call(&self, id: &str) -> Option<&ToolCall> {
        self.turns
            .iter()
            .flat_map(|t| t.tool_calls.iter())
            .find(|c| c.id == id)
    }

    pub fn has_result(&self, id: &str) -> bool {
        self.turns.iter().any(|t| t.answered_call_id() == Some(id))
    }

    /// Calls of the most recent assistant turn that still lack a result, in request order.
    pub fn unanswered_calls(&self) -> Vec<ToolCall> {
        let Some(last_assistant) = self
            .turns
            .iter()
            .rev()
            .find(|t| t.role == Role::Assistant && !t.tool_calls.is_empty())
        else {
            return vec![];
        };
        last_assistant
            .tool_calls
            .iter()
            .filter(|c| !self.has_result(&c.id))
            .cloned()
            .collect()
    }

    /// Text of the leading system turns.
    pub fn system_text(&self) -> String {
        self.turns
            .iter()
            .take_while(|t| t.role == Role::System)
            .map(Turn::text_content)
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    /// All non-system turns, in order.
    pub fn dialogue(&self) -> Vec<Turn> {
        self.turns
            .iter()
            .filter(|t| t.role != Role::System)
            .cloned()
            .collect()
    }

    /// Tool-result turns in the order they were recorded.
    pub fn tool_results(&self) -> impl Iterator<Item = &Turn> {
        self.turns.iter().filter(|t| t.role == Role::Tool)
    }

    /// Text of the last turn, if any.
    pub fn final_text(&self) -> Option<String> {
        self.turns.last().map(Turn::text_content)
    }
}
