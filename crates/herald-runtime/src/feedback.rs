//! Deterministic preference corrections derived from reviewer verdicts.
//!
//! No decision port calls happen here: a correction is a pure function of
//! the proposed call, the verdict and the email, so preference evolution can
//! be audited and replayed.

use serde_json::Value;

use herald_core::{Email, InterruptRequest, Namespace, RunId, Verdict};
use herald_memory::Correction;
use herald_memory::defaults::MEETING_DURATION_KEY;

/// Longest excerpt of a draft quoted in a correction.
const EXCERPT_CHARS: usize = 240;

#[derive(Debug, Clone, Copy, Default)]
pub struct FeedbackAdapter;

impl FeedbackAdapter {
    pub fn new() -> Self {
        Self
    }

    /// Corrections implied by `verdict`. Approvals and respond-instead yield none.
    pub fn corrections(
        &self,
        run_id: RunId,
        email: &Email,
        interrupt: &InterruptRequest,
        verdict: &Verdict,
    ) -> Vec<Correction> {
        let tool = interrupt.tool_call.tool_name.as_str();
        let proposed = &interrupt.tool_call.arguments;
        let corrections = match verdict {
            Verdict::Approve | Verdict::RespondInstead { .. } => return vec![],
            Verdict::Edit { arguments } => match tool {
                "schedule_meeting" => meeting_edit(proposed, arguments),
                "write_email" => email_edit(proposed, arguments),
                _ => generic_edit(tool, proposed, arguments),
            },
            Verdict::Reject { reason } => {
                let reason = reason.as_deref().map(str::trim).filter(|r| !r.is_empty());
                match tool {
                    "write_email" => vec![email_reject(email, reason)],
                    "schedule_meeting" => vec![meeting_reject(proposed, reason)],
                    _ => vec![generic_reject(tool, reason)],
                }
            }
        };
        corrections
            .into_iter()
            .map(|c| c.from_verdict(run_id, verdict.kind()))
            .collect()
    }
}

fn excerpt(text: &str) -> String {
    let mut out: String = text.chars().take(EXCERPT_CHARS).collect();
    if text.chars().count() > EXCERPT_CHARS {
        out.push_str("...");
    }
    out
}

fn str_field<'a>(args: &'a Value, key: &str) -> Option<&'a str> {
    args.get(key).and_then(Value::as_str)
}

fn changed(before: &Value, after: &Value, key: &str) -> bool {
    after.get(key).is_some() && before.get(key) != after.get(key)
}

fn meeting_edit(proposed: &Value, edited: &Value) -> Vec<Correction> {
    let mut out = Vec::new();
    if changed(proposed, edited, "duration_minutes")
        && let Some(minutes) = edited.get("duration_minutes").and_then(Value::as_u64)
    {
        out.push(Correction::rule(
            Namespace::Calendar,
            MEETING_DURATION_KEY,
            format!("Meetings default to {minutes} minutes."),
        ));
    }
    if changed(proposed, edited, "start_time")
        && let Some(start) = str_field(edited, "start_time")
    {
        out.push(Correction::rule(
            Namespace::Calendar,
            "schedule_meeting.start_time",
            format!("Prefer starting meetings at {start}."),
        ));
    }
    out
}

fn email_edit(proposed: &Value, edited: &Value) -> Vec<Correction> {
    let mut out = Vec::new();
    if changed(proposed, edited, "content") {
        out.push(Correction::rule(
            Namespace::ResponseStyle,
            "write_email.content",
            format!(
                "The reviewer rewrote a drafted reply. Write replies like the final version.\n\
                 Proposed: \"{}\"\nFinal: \"{}\"",
                excerpt(str_field(proposed, "content").unwrap_or_default()),
                excerpt(str_field(edited, "content").unwrap_or_default()),
            ),
        ));
    }
    if changed(proposed, edited, "subject")
        && let Some(subject) = str_field(edited, "subject")
    {
        out.push(Correction::rule(
            Namespace::ResponseStyle,
            "write_email.subject",
            format!(
                "Subject lines were corrected from \"{}\" to \"{subject}\"; follow that style.",
                str_field(proposed, "subject").unwrap_or_default()
            ),
        ));
    }
    out
}

fn generic_edit(tool: &str, proposed: &Value, edited: &Value) -> Vec<Correction> {
    if proposed == edited {
        return vec![];
    }
    vec![Correction::rule(
        Namespace::Background,
        format!("{tool}.edit"),
        format!("When using {tool}, the reviewer changed the arguments from {proposed} to {edited}."),
    )]
}

fn email_reject(email: &Email, reason: Option<&str>) -> Correction {
    let mut text = format!(
        "Emails from {} like \"{}\" should not get a reply.",
        email.author, email.subject
    );
    if let Some(reason) = reason {
        text.push_str(&format!(" Reviewer: {reason}"));
    }
    Correction::rule(Namespace::Triage, format!("sender:{}", email.author), text)
}

fn meeting_reject(proposed: &Value, reason: Option<&str>) -> Correction {
    let mut text = format!(
        "Do not book meetings like \"{}\" without confirming first.",
        str_field(proposed, "subject").unwrap_or("this one")
    );
    if let Some(reason) = reason {
        text.push_str(&format!(" Reviewer: {reason}"));
    }
    Correction::rule(Namespace::Calendar, "schedule_meeting.declined", text)
}

fn generic_reject(tool: &str, reason: Option<&str>) -> Correction {
    let text = match reason {
        Some(reason) => format!("The reviewer declined a {tool} action: {reason}"),
        None => format!("The reviewer declined a {tool} action."),
    };
    Correction::rule(Namespace::Background, format!("{tool}.rejected"), text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use herald_core::{RiskTier, ToolCall, VerdictKind};
    use serde_json::json;
    use uuid::Uuid;

    fn email() -> Email {
        Email::new("Joe <joe@example.com>", "lance@company.com", "Tax planning", "Can we meet?")
    }

    fn interrupt(tool: &str, args: Value) -> InterruptRequest {
        InterruptRequest::new(
            Uuid::new_v4(),
            ToolCall::new("c1", tool, args),
            RiskTier::RequiresApproval,
            String::new(),
        )
    }

    #[test]
    fn duration_edit_targets_calendar_key() {
        let run_id = Uuid::new_v4();
        let req = interrupt("schedule_meeting", json!({"duration_minutes": 30, "start_time": "2:00 PM"}));
        let out = FeedbackAdapter::new().corrections(
            run_id,
            &email(),
            &req,
            &Verdict::Edit {
                arguments: json!({"duration_minutes": 15, "start_time": "2:00 PM"}),
            },
        );
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].namespace, Namespace::Calendar);
        assert_eq!(out[0].rule_key.as_deref(), Some(MEETING_DURATION_KEY));
        assert_eq!(out[0].text, "Meetings default to 15 minutes.");
        assert_eq!(out[0].run_id, Some(run_id));
        assert_eq!(out[0].verdict, Some(VerdictKind::Edit));
    }

    #[test]
    fn same_inputs_same_corrections() {
        let req = interrupt("write_email", json!({"to": "a", "subject": "s", "content": "Hello there"}));
        let verdict = Verdict::Edit {
            arguments: json!({"to": "a", "subject": "s", "content": "Hi"}),
        };
        let run_id = Uuid::new_v4();
        let a = FeedbackAdapter::new().corrections(run_id, &email(), &req, &verdict);
        let b = FeedbackAdapter::new().corrections(run_id, &email(), &req, &verdict);
        assert_eq!(a, b);
        assert_eq!(a[0].namespace, Namespace::ResponseStyle);
    }

    #[test]
    fn email_reject_goes_to_triage() {
        let req = interrupt("write_email", json!({"to": "a", "subject": "s", "content": "c"}));
        let out = FeedbackAdapter::new().corrections(
            Uuid::new_v4(),
            &email(),
            &req,
            &Verdict::Reject {
                reason: Some("no reply needed".into()),
            },
        );
        assert_eq!(out[0].namespace, Namespace::Triage);
        assert_eq!(out[0].rule_key.as_deref(), Some("sender:Joe <joe@example.com>"));
        assert!(out[0].text.ends_with("Reviewer: no reply needed"));
    }

    #[test]
    fn approve_and_respond_instead_yield_nothing() {
        let req = interrupt("write_email", json!({}));
        let adapter = FeedbackAdapter::new();
        assert!(adapter.corrections(Uuid::new_v4(), &email(), &req, &Verdict::Approve).is_empty());
        assert!(
            adapter
                .corrections(
                    Uuid::new_v4(),
                    &email(),
                    &req,
                    &Verdict::RespondInstead { text: "x".into() }
                )
                .is_empty()
        );
    }

    #[test]
    fn long_drafts_are_truncated() {
        let long = "a".repeat(1000);
        let req = interrupt("write_email", json!({"content": long}));
        let out = FeedbackAdapter::new().corrections(
            Uuid::new_v4(),
            &email(),
            &req,
            &Verdict::Edit {
                arguments: json!({"content": "short"}),
            },
        );
        assert!(out[0].text.len() < 600);
    }
}
