use herald_config::ApprovalConfig;
use herald_core::{RiskTier, ToolSpec};
use tracing::debug;

/// What happens to a tool call before it runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Gate {
    /// Execute immediately.
    Proceed,
    /// Hold for a human verdict, with the reason shown to the reviewer.
    Review(String),
}

impl Gate {
    pub fn needs_review(&self) -> bool {
        matches!(self, Self::Review(_))
    }
}

/// Risk tier plus operator overrides.
///
/// Evaluation order: the completion signal always proceeds, then
/// `always_review`, then `never_review`, then the tool's declared tier.
#[derive(Debug, Clone, Default)]
pub struct ApprovalPolicy {
    always_review: Vec<String>,
    never_review: Vec<String>,
}

impl ApprovalPolicy {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(config: &ApprovalConfig) -> Self {
        Self {
            always_review: config.always_review.clone(),
            never_review: config.never_review.clone(),
        }
    }

    pub fn set_always_review(&mut self, tools: Vec<String>) {
        self.always_review = tools;
    }

    pub fn set_never_review(&mut self, tools: Vec<String>) {
        self.never_review = tools;
    }

    pub fn evaluate(&self, spec: &ToolSpec) -> Gate {
        if spec.is_completion_signal() {
            return Gate::Proceed;
        }
        if self.always_review.iter().any(|t| t == &spec.name) {
            debug!(tool = %spec.name, "tool is on always_review");
            return Gate::Review(format!("'{}' is configured to always require review", spec.name));
        }
        if self.never_review.iter().any(|t| t == &spec.name) {
            debug!(tool = %spec.name, "tool is on never_review");
            return Gate::Proceed;
        }
        match spec.risk_tier {
            RiskTier::Safe => Gate::Proceed,
            RiskTier::RequiresApproval => {
                Gate::Review(format!("'{}' has side effects outside the assistant", spec.name))
            }
        }
    }

    /// The tier a call is actually treated as.
    pub fn effective_tier(&self, spec: &ToolSpec) -> RiskTier {
        if self.evaluate(spec).needs_review() {
            RiskTier::RequiresApproval
        } else {
            RiskTier::Safe
        }
    }
}
