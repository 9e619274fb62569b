use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use uuid::Uuid;

use crate::tool::{RiskTier, ToolCall};
use crate::types::RunId;

/// A risk-tiered tool call held for human review. Exists only while its run is suspended.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InterruptRequest {
    pub id: Uuid,
    pub run_id: RunId,
    pub tool_call: ToolCall,
    pub risk_tier: RiskTier,
    /// Human-readable rendering of the proposed action.
    pub proposed_preview: String,
    pub created_at: DateTime<Utc>,
}

impl InterruptRequest {
    pub fn new(run_id: RunId, tool_call: ToolCall, risk_tier: RiskTier, preview: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            run_id,
            tool_call,
            risk_tier,
            proposed_preview: preview,
            created_at: Utc::now(),
        }
    }
}

/// A reviewer's answer to an interrupt request. Consumed exactly once.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Verdict {
    /// Execute the proposed call unmodified.
    Approve,
    /// Execute with these arguments instead.
    Edit { arguments: Value },
    /// Do not execute; tell the agent why.
    Reject {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        reason: Option<String>,
    },
    /// Discard the call and finish the run with this text as the response.
    RespondInstead { text: String },
}

impl Verdict {
    pub fn kind(&self) -> VerdictKind {
        match self {
            Self::Approve => VerdictKind::Approve,
            Self::Edit { .. } => VerdictKind::Edit,
            Self::Reject { .. } => VerdictKind::Reject,
            Self::RespondInstead { .. } => VerdictKind::RespondInstead,
        }
    }

    /// Whether this verdict carries a preference correction.
    pub fn implies_correction(&self) -> bool {
        matches!(self, Self::Edit { .. } | Self::Reject { .. })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerdictKind {
    Approve,
    Edit,
    Reject,
    RespondInstead,
}

impl VerdictKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Approve => "approve",
            Self::Edit => "edit",
            Self::Reject => "reject",
            Self::RespondInstead => "respond_instead",
        }
    }
}

impl fmt::Display for VerdictKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
