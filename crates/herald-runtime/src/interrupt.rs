//! Turning a held call into an interrupt request, and folding a verdict back
//! into the run.

use tracing::info;

use herald_approval::render_preview;
use herald_core::{
    HeraldError, InterruptRequest, Result, RiskTier, RunStatus, ToolCall, ToolExecutor, ToolResult,
    Verdict,
};
use herald_memory::RunRecord;

use crate::agent_loop::{LoopOutcome, ToolLoop, execute_call};

/// Park `call` on the record. The caller persists it.
pub(crate) fn suspend(record: &mut RunRecord, call: ToolCall, tier: RiskTier) -> InterruptRequest {
    let preview = render_preview(&call);
    let interrupt = InterruptRequest::new(record.run_id, call, tier, preview);
    info!(
        run_id = %record.run_id,
        interrupt_id = %interrupt.id,
        tool = %interrupt.tool_call.tool_name,
        "run suspended for review"
    );
    record.pending = Some(interrupt.clone());
    record.status = RunStatus::Suspended;
    interrupt
}

/// Reject malformed verdicts before any state is touched.
pub(crate) fn check_verdict(tools: &dyn ToolExecutor, interrupt: &InterruptRequest, verdict: &Verdict) -> Result<()> {
    match verdict {
        Verdict::Approve | Verdict::Reject { .. } => Ok(()),
        Verdict::Edit { arguments } => {
            let edited = ToolCall {
                arguments: arguments.clone(),
                ..interrupt.tool_call.clone()
            };
            tools
                .validate(&edited)
                .map_err(|e| HeraldError::InvalidVerdict(format!("edited arguments rejected: {e}")))
        }
        Verdict::RespondInstead { text } if text.trim().is_empty() => Err(HeraldError::InvalidVerdict(
            "respond_instead needs a non-empty response".into(),
        )),
        Verdict::RespondInstead { .. } => Ok(()),
    }
}

fn rejection_text(reason: Option<&str>) -> String {
    match reason.map(str::trim).filter(|r| !r.is_empty()) {
        Some(reason) => format!(
            "The reviewer rejected this action and it was not executed. Reason: {reason}. \
             Choose a different action."
        ),
        None => "The reviewer rejected this action and it was not executed. Choose a different action.".into(),
    }
}

/// Apply a claimed verdict. `Completed` means the run is finished; `None` means keep looping.
pub(crate) async fn apply_verdict(
    tool_loop: &ToolLoop,
    record: &mut RunRecord,
    interrupt: &InterruptRequest,
    verdict: &Verdict,
) -> Result<Option<LoopOutcome>> {
    let call = &interrupt.tool_call;
    match verdict {
        Verdict::Approve => {
            let result = execute_call(tool_loop.tools.as_ref(), call).await?;
            tool_loop.record_result(record, result)?;
            Ok(None)
        }
        Verdict::Edit { arguments } => {
            let edited = ToolCall {
                arguments: arguments.clone(),
                ..call.clone()
            };
            let mut result = execute_call(tool_loop.tools.as_ref(), &edited).await?;
            if !result.is_error {
                result.content = format!(
                    "{}\n(The reviewer edited the arguments before execution: {})",
                    result.content, arguments
                );
            }
            tool_loop.record_result(record, result.edited())?;
            Ok(None)
        }
        Verdict::Reject { reason } => {
            let result = ToolResult::error(&call.id, rejection_text(reason.as_deref()));
            tool_loop.record_result(record, result)?;
            Ok(None)
        }
        Verdict::RespondInstead { text } => {
            record.conversation.push_final_response(text.clone());
            Ok(Some(LoopOutcome::Completed))
        }
    }
}
