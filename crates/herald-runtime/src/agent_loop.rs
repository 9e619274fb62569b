use futures::future::join_all;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use herald_approval::{ApprovalPolicy, Gate};
use herald_config::AgentConfig;
use herald_core::{
    Event, EventBus, HeraldError, InterruptRequest, Result, ToolCall, ToolExecutor, ToolResult,
};
use herald_llm::{DecisionMode, DecisionPort, DecisionRequest, validate_act};
use herald_memory::RunRecord;

use crate::interrupt;

/// Decision and dispatch knobs for one runtime.
#[derive(Debug, Clone)]
pub struct LoopSettings {
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f32,
    /// Upper bound on `act` decisions per run, across suspensions.
    pub max_rounds: u32,
    /// Run consecutive safe-tier calls of one round concurrently.
    pub parallel_safe_tools: bool,
}

impl LoopSettings {
    pub fn from_config(agent: &AgentConfig) -> Self {
        Self {
            model: agent.model_name().to_string(),
            max_tokens: agent.max_tokens,
            temperature: agent.temperature,
            max_rounds: agent.max_rounds,
            parallel_safe_tools: agent.parallel_safe_tools,
        }
    }
}

impl Default for LoopSettings {
    fn default() -> Self {
        Self::from_config(&AgentConfig::default())
    }
}

/// How a stretch of the loop ended.
#[derive(Debug, Clone, PartialEq)]
pub enum LoopOutcome {
    /// `Done` was requested, or a reviewer answered in the agent's place.
    Completed,
    /// A call needs review. The run must be persisted as suspended.
    Suspended(InterruptRequest),
}

/// Result of dispatching one batch of calls.
enum Dispatch {
    /// Every call answered; decide again.
    Exhausted,
    Completed,
    Suspended(InterruptRequest),
}

/// The Deciding/Dispatching state machine for one run at a time.
pub(crate) struct ToolLoop {
    pub(crate) decider: Arc<dyn DecisionPort>,
    pub(crate) tools: Arc<dyn ToolExecutor>,
    pub(crate) policy: Arc<ApprovalPolicy>,
    pub(crate) events: EventBus,
    pub(crate) settings: LoopSettings,
}

impl ToolLoop {
    /// Drive a run until it completes, suspends, or fails.
    ///
    /// Calls left unanswered in the latest batch (after a resume) are
    /// dispatched before the next decision.
    pub(crate) async fn run(
        &self,
        record: &mut RunRecord,
        system_context: &str,
        cancel: &CancellationToken,
    ) -> Result<LoopOutcome> {
        loop {
            if cancel.is_cancelled() {
                return Err(HeraldError::Cancelled(record.run_id));
            }

            let unanswered = record.conversation.unanswered_calls();
            if !unanswered.is_empty() {
                match self.dispatch(record, unanswered, cancel).await? {
                    Dispatch::Exhausted => {}
                    Dispatch::Completed => return Ok(LoopOutcome::Completed),
                    Dispatch::Suspended(interrupt) => return Ok(LoopOutcome::Suspended(interrupt)),
                }
                continue;
            }

            if record.rounds >= self.settings.max_rounds {
                warn!(run_id = %record.run_id, rounds = record.rounds, "round bound reached");
                return Err(HeraldError::BoundedLoopExceeded {
                    rounds: record.rounds,
                });
            }
            record.rounds += 1;

            let request = DecisionRequest {
                mode: DecisionMode::Act,
                model: self.settings.model.clone(),
                system_context: system_context.to_string(),
                conversation: record.conversation.dialogue(),
                tools: self.tools.specs(),
                max_tokens: self.settings.max_tokens,
                temperature: self.settings.temperature,
            };
            let decision = self.decider.decide(&request).await?;
            let (text, calls) = validate_act(&request, decision)?;

            debug!(
                run_id = %record.run_id,
                round = record.rounds,
                calls = calls.len(),
                "decision accepted"
            );
            for call in &calls {
                self.events.publish(Event::ToolCallRequested {
                    run_id: record.run_id,
                    tool_name: call.tool_name.clone(),
                    tool_call_id: call.id.clone(),
                });
            }
            record.conversation.push_assistant(text, calls)?;
        }
    }

    /// Dispatch calls in request order. Consecutive safe calls form a group that
    /// may run concurrently; results are still appended in request order.
    async fn dispatch(
        &self,
        record: &mut RunRecord,
        calls: Vec<ToolCall>,
        cancel: &CancellationToken,
    ) -> Result<Dispatch> {
        let mut group: Vec<ToolCall> = Vec::new();

        for call in calls {
            if call.is_done() {
                self.execute_group(record, std::mem::take(&mut group)).await?;
                info!(run_id = %record.run_id, rounds = record.rounds, "completion signal received");
                return Ok(Dispatch::Completed);
            }

            // Bad arguments are answered on the spot and never reach a reviewer.
            if let Err(e) = self.tools.validate(&call) {
                if !e.is_tool_local() {
                    return Err(e);
                }
                group.push(call);
                continue;
            }

            let spec = self
                .tools
                .spec(&call.tool_name)
                .ok_or_else(|| HeraldError::ToolNotFound(call.tool_name.clone()))?;

            match self.policy.evaluate(&spec) {
                Gate::Proceed => group.push(call),
                Gate::Review(reason) => {
                    self.execute_group(record, std::mem::take(&mut group)).await?;
                    if cancel.is_cancelled() {
                        return Err(HeraldError::Cancelled(record.run_id));
                    }
                    debug!(run_id = %record.run_id, tool = %call.tool_name, %reason, "holding call for review");
                    let tier = self.policy.effective_tier(&spec);
                    let interrupt = interrupt::suspend(record, call, tier);
                    return Ok(Dispatch::Suspended(interrupt));
                }
            }
        }

        self.execute_group(record, group).await?;
        Ok(Dispatch::Exhausted)
    }

    async fn execute_group(&self, record: &mut RunRecord, group: Vec<ToolCall>) -> Result<()> {
        if group.is_empty() {
            return Ok(());
        }
        let results = if self.settings.parallel_safe_tools && group.len() > 1 {
            join_all(group.iter().map(|call| execute_call(self.tools.as_ref(), call))).await
        } else {
            let mut results = Vec::with_capacity(group.len());
            for call in &group {
                results.push(execute_call(self.tools.as_ref(), call).await);
            }
            results
        };

        for result in results {
            let result = result?;
            self.record_result(record, result)?;
        }
        Ok(())
    }

    pub(crate) fn record_result(&self, record: &mut RunRecord, result: ToolResult) -> Result<()> {
        self.events.publish(Event::ToolResultRecorded {
            run_id: record.run_id,
            tool_call_id: result.tool_call_id.clone(),
            is_error: result.is_error,
        });
        record.conversation.push_tool_result(result)
    }
}

/// Execute one call. Failures local to the call become an error result the
/// model can react to; anything else aborts the run.
pub(crate) async fn execute_call(tools: &dyn ToolExecutor, call: &ToolCall) -> Result<ToolResult> {
    match tools.invoke(call).await {
        Ok(content) => Ok(ToolResult::ok(&call.id, content)),
        Err(e) if e.is_tool_local() => {
            warn!(tool = %call.tool_name, call_id = %call.id, error = %e, "tool call failed");
            Ok(ToolResult::error(&call.id, format!("Error: {e}")))
        }
        Err(e) => Err(e),
    }
}
