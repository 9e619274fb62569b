use serde_json::{Value, json};
use tracing::{debug, info, warn};
use uuid::Uuid;

use herald_core::{Email, HeraldError, InterruptRequest, Result, Role, RunStatus, Verdict};
use herald_memory::{MemoryStore, RunRecord};

use super::App;
use crate::input::apply_edits;
use crate::style;

pub(super) async fn cmd_triage(app: &App, emails: Vec<Email>, json: bool) -> Result<()> {
    for email in &emails {
        let classification = app.orchestrator.triage(email).await?;
        if json {
            println!(
                "{}",
                serde_json::to_string_pretty(&json!({
                    "subject": email.subject,
                    "category": classification.category,
                    "reasoning": classification.reasoning,
                }))?
            );
        } else {
            println!(
                "{}  {}",
                style::header(classification.category),
                email.subject
            );
            println!("   {}", style::dim(&classification.reasoning));
        }
    }
    Ok(())
}

pub(super) async fn cmd_run(app: &App, emails: Vec<Email>, json: bool) -> Result<()> {
    info!(count = emails.len(), "processing emails");
    let work = async {
        match <[Email; 1]>::try_from(emails) {
            Ok([email]) => vec![app.orchestrator.start(email).await],
            Err(emails) => app.orchestrator.process_all(emails).await,
        }
    };
    tokio::pin!(work);
    // Ctrl-C fails the runs at their next boundary instead of leaving them running.
    let results = tokio::select! {
        results = &mut work => results,
        Ok(()) = tokio::signal::ctrl_c() => {
            let cancelled = app.orchestrator.cancel_active();
            warn!(cancelled, "interrupted, cancelling active runs");
            work.await
        }
    };

    if json {
        let rendered: Vec<Value> = results
            .iter()
            .map(|r| match r {
                Ok(record) => serde_json::to_value(record).unwrap_or(Value::Null),
                Err(e) => json!({ "error": e.to_string() }),
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&rendered)?);
        return Ok(());
    }

    let total = results.len();
    let mut failed = 0;
    for result in results {
        match result {
            Ok(record) => print_outcome(&record),
            Err(e) => {
                failed += 1;
                println!("{} {e}", style::failure("failed"));
            }
        }
    }
    print_side_effects(app);
    if total > 1 {
        println!();
        println!("{} runs, {} failed", total, failed);
    }
    Ok(())
}

pub(super) fn cmd_pending(memory: &MemoryStore, json: bool) -> Result<()> {
    let pending = memory.runs.pending()?;
    if json {
        println!("{}", serde_json::to_string_pretty(&pending)?);
        return Ok(());
    }
    if pending.is_empty() {
        println!("Nothing waiting for review.");
        return Ok(());
    }
    for interrupt in &pending {
        print_interrupt(interrupt);
        println!();
    }
    Ok(())
}

/// The interrupt to answer: the explicit one, or the run's current one.
fn resolve_interrupt(app: &App, run_id: Uuid, explicit: Option<Uuid>) -> Result<(Uuid, Option<InterruptRequest>)> {
    let record = app.orchestrator.run(run_id)?;
    match (record.pending, explicit) {
        (Some(pending), None) => Ok((pending.id, Some(pending))),
        (Some(pending), Some(id)) if pending.id == id => Ok((id, Some(pending))),
        // Submitted as-is; the runtime reports it stale.
        (_, Some(id)) => Ok((id, None)),
        (None, None) => Err(HeraldError::InvalidRunState {
            run_id,
            status: record.status.to_string(),
            expected: "suspended".into(),
        }),
    }
}

async fn submit(app: &App, run_id: Uuid, interrupt_id: Uuid, verdict: Verdict) -> Result<()> {
    debug!(%run_id, %interrupt_id, verdict = %verdict.kind(), "submitting verdict");
    let record = app
        .orchestrator
        .submit_verdict(run_id, interrupt_id, verdict)
        .await?;
    print_outcome(&record);
    print_side_effects(app);
    Ok(())
}

pub(super) async fn cmd_approve(app: &App, run_id: Uuid, interrupt: Option<Uuid>) -> Result<()> {
    let (interrupt_id, _) = resolve_interrupt(app, run_id, interrupt)?;
    submit(app, run_id, interrupt_id, Verdict::Approve).await
}

pub(super) async fn cmd_edit(
    app: &App,
    run_id: Uuid,
    interrupt: Option<Uuid>,
    args: Option<String>,
    sets: Vec<(String, String)>,
) -> Result<()> {
    let (interrupt_id, pending) = resolve_interrupt(app, run_id, interrupt)?;
    let proposed = pending
        .map(|p| p.tool_call.arguments)
        .unwrap_or_else(|| Value::Object(Default::default()));
    let arguments = apply_edits(&proposed, args.as_deref(), &sets)?;
    submit(app, run_id, interrupt_id, Verdict::Edit { arguments }).await
}

pub(super) async fn cmd_reject(
    app: &App,
    run_id: Uuid,
    interrupt: Option<Uuid>,
    reason: Option<String>,
) -> Result<()> {
    let (interrupt_id, _) = resolve_interrupt(app, run_id, interrupt)?;
    submit(app, run_id, interrupt_id, Verdict::Reject { reason }).await
}

pub(super) async fn cmd_respond(app: &App, run_id: Uuid, interrupt: Option<Uuid>, text: String) -> Result<()> {
    let (interrupt_id, _) = resolve_interrupt(app, run_id, interrupt)?;
    submit(app, run_id, interrupt_id, Verdict::RespondInstead { text }).await
}

/// Only suspended runs can be cancelled from here; a running run belongs to
/// the process executing it, unless `abandon` says that process is gone.
pub(super) fn cmd_cancel(memory: &MemoryStore, run_id: Uuid, abandon: bool) -> Result<()> {
    let (changed, expected) = if abandon {
        let reason = format!("run {run_id} abandoned by operator");
        (memory.runs.abandon(run_id, &reason)?, "running")
    } else {
        let reason = HeraldError::Cancelled(run_id).to_string();
        (memory.runs.discard_pending(run_id, &reason)?, "suspended")
    };
    if changed {
        info!(%run_id, abandon, "run cancelled");
        println!("{} run {run_id}", style::success("cancelled"));
        return Ok(());
    }
    let record = memory.runs.load(run_id)?;
    Err(HeraldError::InvalidRunState {
        run_id,
        status: record.status.to_string(),
        expected: expected.into(),
    })
}

pub(super) fn cmd_runs(memory: &MemoryStore, status: Option<RunStatus>, limit: usize, json: bool) -> Result<()> {
    let records = memory.runs.list(status, limit)?;
    if json {
        println!("{}", serde_json::to_string_pretty(&records)?);
        return Ok(());
    }
    if records.is_empty() {
        println!("No runs.");
        return Ok(());
    }
    for record in &records {
        let category = record
            .classification
            .as_ref()
            .map(|c| c.category.to_string())
            .unwrap_or_else(|| "-".into());
        println!(
            "{}  {:<10} {:<8} {:>2} rounds  {}",
            style::dim(record.updated_at.format("%Y-%m-%d %H:%M")),
            status_label(record.status),
            category,
            record.rounds,
            record.email.subject
        );
        println!("   {}", style::dim(record.run_id));
    }
    Ok(())
}

pub(super) fn cmd_show(memory: &MemoryStore, run_id: Uuid, json: bool) -> Result<()> {
    let record = memory.runs.load(run_id)?;
    if json {
        println!("{}", serde_json::to_string_pretty(&record)?);
        return Ok(());
    }

    println!("{} {}", style::header("Run"), record.run_id);
    println!("{} {}", style::label("Status:"), status_label(record.status));
    println!("{} {}", style::label("Subject:"), record.email.subject);
    println!("{} {}", style::label("From:"), record.email.author);
    if let Some(c) = &record.classification {
        println!("{} {} ({})", style::label("Triage:"), c.category, c.reasoning);
    }
    println!("{} {}", style::label("Rounds:"), record.rounds);
    if let Some(error) = &record.error {
        println!("{} {}", style::label("Error:"), style::failure(error));
    }

    println!();
    for turn in record.conversation.turns() {
        if turn.role == Role::System {
            continue;
        }
        let role = match turn.role {
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::Tool if turn.is_error_result() => "tool (error)",
            Role::Tool if turn.is_edited_result() => "tool (edited)",
            _ => "tool",
        };
        println!("{}", style::label(format!("[{role}]")));
        let text = turn.text_content();
        if !text.is_empty() {
            println!("{}", truncate_output(&text, 400));
        }
        for call in &turn.tool_calls {
            println!("  -> {}({})", call.tool_name, call.arguments);
        }
    }

    if let Some(pending) = &record.pending {
        println!();
        print_interrupt(pending);
    }
    Ok(())
}

fn status_label(status: RunStatus) -> String {
    match status {
        RunStatus::Completed => style::success(status),
        RunStatus::Suspended => style::pending(status),
        RunStatus::Failed => style::failure(status),
        RunStatus::Running => status.to_string(),
    }
}

fn print_interrupt(interrupt: &InterruptRequest) {
    println!(
        "{} {} ({})",
        style::pending("Review"),
        interrupt.tool_call.tool_name,
        interrupt.risk_tier.as_str()
    );
    println!("{} {}", style::label("Run:"), interrupt.run_id);
    println!("{} {}", style::label("Interrupt:"), interrupt.id);
    println!();
    println!("{}", interrupt.proposed_preview);
}

fn print_outcome(record: &RunRecord) {
    match record.status {
        RunStatus::Completed => {
            println!("{} {}", style::success("completed"), record.email.subject);
            if let Some(c) = &record.classification {
                println!("   triage: {} ({})", c.category, style::dim(&c.reasoning));
            }
            if let Some(text) = record.final_response().filter(|t| !t.is_empty()) {
                println!("   {}", truncate_output(&text, 200));
            }
        }
        RunStatus::Suspended => {
            println!("{} {}", style::pending("waiting for review"), record.email.subject);
            if let Some(pending) = &record.pending {
                println!();
                print_interrupt(pending);
                println!();
                println!(
                    "   {}",
                    style::dim(format!(
                        "herald approve {id} | herald edit {id} --set key=value | herald reject {id} | herald respond {id} \"...\"",
                        id = record.run_id
                    ))
                );
            }
        }
        RunStatus::Failed => {
            println!(
                "{} {}: {}",
                style::failure("failed"),
                record.email.subject,
                record.error.as_deref().unwrap_or("unknown error")
            );
        }
        RunStatus::Running => println!("running {}", record.email.subject),
    }
}

/// What the simulated backends did during this invocation.
fn print_side_effects(app: &App) {
    for sent in app.outbox.sent() {
        println!("   {} to {}: {}", style::label("sent"), sent.to, sent.subject);
    }
    for meeting in app.calendar.meetings() {
        println!(
            "   {} {} on {} at {} ({} min)",
            style::label("booked"),
            meeting.subject,
            meeting.day,
            meeting.start_time,
            meeting.duration_minutes
        );
    }
}

/// Truncate to `max` characters, appending "..." if truncated.
fn truncate_output(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        format!("{}...", s.chars().take(max).collect::<String>())
    }
}
