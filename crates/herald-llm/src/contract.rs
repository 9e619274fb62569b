//! Runtime validation of decision port output.

use herald_core::{Category, Classification, HeraldError, Result, ToolCall};

use crate::decision::{Decision, DecisionMode, DecisionRequest};

/// Check an `act` decision: at least one call, every call names an advertised tool.
pub fn validate_act(request: &DecisionRequest, decision: Decision) -> Result<(String, Vec<ToolCall>)> {
    let (text, tool_calls) = match decision {
        Decision::Act { text, tool_calls } => (text, tool_calls),
        other => {
            return Err(HeraldError::DecisionContractViolation(format!(
                "expected an act decision, got {:?}",
                other.mode()
            )));
        }
    };

    if request.mode != DecisionMode::Act {
        return Err(HeraldError::DecisionContractViolation(
            "act decision returned for a classify request".into(),
        ));
    }

    if tool_calls.is_empty() {
        return Err(HeraldError::DecisionContractViolation(
            "act decision carried no tool calls".into(),
        ));
    }

    for call in &tool_calls {
        if call.id.trim().is_empty() {
            return Err(HeraldError::DecisionContractViolation(format!(
                "tool call to '{}' has an empty id",
                call.tool_name
            )));
        }
        if !request.tools.iter().any(|t| t.name == call.tool_name) {
            return Err(HeraldError::DecisionContractViolation(format!(
                "tool '{}' was not offered",
                call.tool_name
            )));
        }
    }

    Ok((text, tool_calls))
}

/// Check a `classify` decision and map its category onto the fixed enum.
pub fn validate_classify(decision: Decision) -> Result<Classification> {
    match decision {
        Decision::Classify(raw) => {
            let category: Category = raw.category.parse()?;
            Ok(Classification {
                reasoning: raw.reasoning,
                category,
            })
        }
        other => Err(HeraldError::DecisionContractViolation(format!(
            "expected a classify decision, got {:?}",
            other.mode()
        ))),
    }
}
