use futures::future::join_all;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use herald_approval::ApprovalPolicy;
use herald_config::HeraldConfig;
use herald_core::{
    Classification, Email, Event, EventBus, HeraldError, InterruptRequest, Result, RunId,
    RunStatus, ToolExecutor, Verdict,
};
use herald_llm::{DecisionPort, ThrottledDecider};
use herald_memory::{MemoryStore, RunRecord};

use crate::agent_loop::{LoopOutcome, LoopSettings, ToolLoop};
use crate::feedback::FeedbackAdapter;
use crate::interrupt;
use crate::prompts;
use crate::triage::TriageStage;

type ActiveRuns = Arc<Mutex<HashMap<RunId, CancellationToken>>>;

/// Cancellation handle for a run executing in this process. Unregisters on drop.
struct ActiveRun {
    runs: ActiveRuns,
    run_id: RunId,
    token: CancellationToken,
}

impl ActiveRun {
    fn register(runs: &ActiveRuns, run_id: RunId) -> Self {
        let token = CancellationToken::new();
        runs.lock().insert(run_id, token.clone());
        Self {
            runs: Arc::clone(runs),
            run_id,
            token,
        }
    }
}

impl Drop for ActiveRun {
    fn drop(&mut self) {
        self.runs.lock().remove(&self.run_id);
    }
}

/// Owns the run lifecycle: triage, the tool loop, suspension, verdicts,
/// cancellation and preference feedback.
pub struct Orchestrator {
    config: HeraldConfig,
    memory: Arc<MemoryStore>,
    triage: TriageStage,
    tool_loop: ToolLoop,
    feedback: FeedbackAdapter,
    events: EventBus,
    active: ActiveRuns,
}

impl Orchestrator {
    /// Decision calls from every run share one concurrency limit
    /// (`agent.max_concurrent_decisions`).
    pub fn new(
        config: HeraldConfig,
        decider: Arc<dyn DecisionPort>,
        tools: Arc<dyn ToolExecutor>,
        memory: Arc<MemoryStore>,
    ) -> Self {
        let settings = LoopSettings::from_config(&config.agent);
        let decider: Arc<dyn DecisionPort> = Arc::new(ThrottledDecider::new(
            decider,
            config.agent.max_concurrent_decisions,
        ));
        let events = EventBus::default();
        let tool_loop = ToolLoop {
            decider: Arc::clone(&decider),
            tools,
            policy: Arc::new(ApprovalPolicy::from_config(&config.approval)),
            events: events.clone(),
            settings: settings.clone(),
        };
        Self {
            triage: TriageStage::new(decider, settings),
            tool_loop,
            feedback: FeedbackAdapter::new(),
            events,
            active: Arc::new(Mutex::new(HashMap::new())),
            memory,
            config,
        }
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    pub fn memory(&self) -> &Arc<MemoryStore> {
        &self.memory
    }

    pub fn config(&self) -> &HeraldConfig {
        &self.config
    }

    /// Seed default rules into empty namespaces if `memory.seed_defaults` is set.
    pub fn seed_preferences(&self) -> Result<usize> {
        if !self.config.memory.seed_defaults {
            return Ok(0);
        }
        self.memory
            .preferences
            .seed_defaults(self.config.user.background.as_deref())
    }

    /// Classify an email without creating a run.
    pub async fn triage(&self, email: &Email) -> Result<Classification> {
        let prefs = self.memory.preferences.snapshot()?;
        self.triage.classify(email, &self.config.user, &prefs).await
    }

    /// Process one email end to end. Returns the run as completed or suspended;
    /// control-plane failures come back as `RunFailed` after the record is stored.
    pub async fn start(&self, email: Email) -> Result<RunRecord> {
        let mut record = RunRecord::new(email);
        self.memory.runs.save(&mut record)?;
        let active = ActiveRun::register(&self.active, record.run_id);
        info!(run_id = %record.run_id, subject = %record.email.subject, "run started");
        self.events.publish(Event::RunStarted {
            run_id: record.run_id,
            subject: record.email.subject.clone(),
        });

        let outcome = self.begin(&mut record, &active.token).await;
        self.settle(record, outcome)
    }

    async fn begin(&self, record: &mut RunRecord, cancel: &CancellationToken) -> Result<LoopOutcome> {
        // Read once: later preference commits never reach this run.
        let prefs = self.memory.preferences.snapshot()?;
        let classification = self
            .triage
            .classify(&record.email, &self.config.user, &prefs)
            .await?;
        let category = classification.category;
        record.classification = Some(classification);
        if cancel.is_cancelled() {
            return Err(HeraldError::Cancelled(record.run_id));
        }
        self.events.publish(Event::Triaged {
            run_id: record.run_id,
            category,
        });

        if category.is_terminal() {
            info!(run_id = %record.run_id, %category, "no response needed");
            return Ok(LoopOutcome::Completed);
        }

        let system = prompts::agent_system_context(&self.config.user, &prefs, &self.tool_loop.tools.specs());
        record.conversation.push_system(system.clone());
        record
            .conversation
            .push_user(prompts::respond_user_turn(&record.email));
        self.memory.runs.save(record)?;

        self.tool_loop.run(record, &system, cancel).await
    }

    /// Persist the outcome of a stretch of work.
    fn settle(&self, mut record: RunRecord, outcome: Result<LoopOutcome>) -> Result<RunRecord> {
        let run_id = record.run_id;
        match outcome {
            Ok(LoopOutcome::Completed) => {
                record.status = RunStatus::Completed;
                record.pending = None;
                if let Err(e) = self.memory.runs.save(&mut record) {
                    return self.fail(record, e);
                }
                info!(%run_id, rounds = record.rounds, "run completed");
                self.events.publish(Event::RunCompleted { run_id });
                Ok(record)
            }
            Ok(LoopOutcome::Suspended(interrupt)) => {
                if let Err(e) = self.memory.runs.save(&mut record) {
                    return self.fail(record, e);
                }
                self.events.publish(Event::RunSuspended {
                    run_id,
                    interrupt_id: interrupt.id,
                    tool_name: interrupt.tool_call.tool_name.clone(),
                });
                Ok(record)
            }
            Err(e) => self.fail(record, e),
        }
    }

    /// Mark the run failed, keeping its conversation for inspection.
    fn fail(&self, mut record: RunRecord, cause: HeraldError) -> Result<RunRecord> {
        let run_id = record.run_id;
        warn!(%run_id, error = %cause, "run failed");
        record.status = RunStatus::Failed;
        record.pending = None;
        record.error = Some(cause.to_string());
        if let Err(e) = self.memory.runs.save(&mut record) {
            error!(%run_id, error = %e, "could not persist failed run");
        }
        self.events.publish(Event::RunFailed {
            run_id,
            error: cause.to_string(),
        });
        Err(HeraldError::run_failed(run_id, cause))
    }

    /// Apply a reviewer's verdict to a suspended run and continue it.
    ///
    /// A verdict for an unknown or already-resolved interrupt is `StaleVerdict`
    /// and changes nothing. A malformed verdict is `InvalidVerdict` and leaves
    /// the interrupt pending.
    pub async fn submit_verdict(&self, run_id: RunId, interrupt_id: uuid::Uuid, verdict: Verdict) -> Result<RunRecord> {
        if let Some(stored) = self.memory.runs.get(run_id)?
            && let Some(pending) = stored.pending.as_ref().filter(|p| p.id == interrupt_id)
        {
            interrupt::check_verdict(self.tool_loop.tools.as_ref(), pending, &verdict)?;
        }

        let (mut record, pending) = match self.memory.runs.claim_interrupt(run_id, interrupt_id) {
            Ok(claimed) => claimed,
            Err(e @ HeraldError::StaleVerdict { .. }) => {
                warn!(%run_id, %interrupt_id, error = %e, "verdict discarded");
                self.events.publish(Event::VerdictDiscarded {
                    run_id,
                    reason: e.to_string(),
                });
                return Err(e);
            }
            Err(e) => return Err(e),
        };

        info!(%run_id, %interrupt_id, verdict = %verdict.kind(), "verdict accepted");
        self.events.publish(Event::VerdictApplied {
            run_id,
            interrupt_id,
            verdict: verdict.kind(),
        });

        let active = ActiveRun::register(&self.active, run_id);
        let outcome = self.resume(&mut record, &pending, &verdict, &active.token).await;
        self.settle(record, outcome)
    }

    async fn resume(
        &self,
        record: &mut RunRecord,
        pending: &InterruptRequest,
        verdict: &Verdict,
        cancel: &CancellationToken,
    ) -> Result<LoopOutcome> {
        let finished = interrupt::apply_verdict(&self.tool_loop, record, pending, verdict).await?;

        if verdict.implies_correction() {
            for correction in self
                .feedback
                .corrections(record.run_id, &record.email, pending, verdict)
            {
                match self.memory.preferences.merge(&correction) {
                    Ok(doc) => self.events.publish(Event::PreferenceUpdated {
                        namespace: doc.namespace,
                        rule_key: correction.rule_key.clone(),
                        version: doc.version,
                    }),
                    // Preference writes never fail the run that produced them.
                    Err(e) => warn!(run_id = %record.run_id, error = %e, "preference correction not stored"),
                }
            }
        }

        if cancel.is_cancelled() {
            return Err(HeraldError::Cancelled(record.run_id));
        }
        if let Some(outcome) = finished {
            return Ok(outcome);
        }
        let system = record.conversation.system_text();
        self.tool_loop.run(record, &system, cancel).await
    }

    /// Interrupt requests awaiting a verdict.
    pub fn pending(&self) -> Result<Vec<InterruptRequest>> {
        self.memory.runs.pending()
    }

    pub fn run(&self, run_id: RunId) -> Result<RunRecord> {
        self.memory.runs.load(run_id)
    }

    pub fn runs(&self, status: Option<RunStatus>, limit: usize) -> Result<Vec<RunRecord>> {
        self.memory.runs.list(status, limit)
    }

    /// Cancel a run.
    ///
    /// A run executing in this process is signalled and fails at its next
    /// boundary, after the in-flight decision or tool call returns. A suspended
    /// run has its interrupt discarded and is marked failed at once. A run
    /// executing elsewhere cannot be cancelled from here.
    pub fn cancel(&self, run_id: RunId) -> Result<()> {
        if let Some(token) = self.active.lock().get(&run_id) {
            info!(%run_id, "cancelling active run");
            token.cancel();
            return Ok(());
        }

        let reason = HeraldError::Cancelled(run_id).to_string();
        if self.memory.runs.discard_pending(run_id, &reason)? {
            info!(%run_id, "suspended run cancelled");
            self.events.publish(Event::RunFailed {
                run_id,
                error: reason,
            });
            return Ok(());
        }

        let record = self.memory.runs.load(run_id)?;
        Err(HeraldError::InvalidRunState {
            run_id,
            status: record.status.to_string(),
            expected: match record.status {
                RunStatus::Running => "running in this process".into(),
                _ => "running or suspended".into(),
            },
        })
    }

    /// Signal every run executing in this process. Returns how many were signalled.
    pub fn cancel_active(&self) -> usize {
        let active = self.active.lock();
        for token in active.values() {
            token.cancel();
        }
        active.len()
    }

    /// Mark a run failed whose owning process is gone. The operator asserts
    /// that nothing is still executing it; a live owner that later tries to
    /// save gets `InvalidRunState` and stops.
    pub fn abandon(&self, run_id: RunId) -> Result<()> {
        if self.active.lock().contains_key(&run_id) {
            return Err(HeraldError::InvalidRunState {
                run_id,
                status: "running in this process".into(),
                expected: "a run no live process owns".into(),
            });
        }
        let reason = format!("run {run_id} abandoned by operator");
        if self.memory.runs.abandon(run_id, &reason)? {
            warn!(%run_id, "run abandoned");
            self.events.publish(Event::RunFailed {
                run_id,
                error: reason,
            });
            return Ok(());
        }
        let record = self.memory.runs.load(run_id)?;
        Err(HeraldError::InvalidRunState {
            run_id,
            status: record.status.to_string(),
            expected: "running".into(),
        })
    }

    /// Process many emails concurrently. Each run is independent; results keep input order.
    pub async fn process_all(&self, emails: Vec<Email>) -> Vec<Result<RunRecord>> {
        info!(count = emails.len(), "processing batch");
        join_all(emails.into_iter().map(|email| self.start(email))).await
    }
}
