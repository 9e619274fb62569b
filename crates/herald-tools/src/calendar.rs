use async_trait::async_trait;
use herald_core::{HeraldError, Result, RiskTier, ToolSpec};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::info;

use crate::registry::ToolHandler;

/// Slots offered on an otherwise empty day.
const DAY_SLOTS: &[&str] = &["9:00 AM", "2:00 PM", "4:00 PM"];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Meeting {
    pub attendees: Vec<String>,
    pub subject: String,
    pub duration_minutes: u32,
    pub day: String,
    pub start_time: String,
}

/// In-memory stand-in for a calendar backend.
#[derive(Debug, Default)]
pub struct Calendar {
    meetings: Mutex<Vec<Meeting>>,
    availability_checks: Mutex<Vec<String>>,
    offline: AtomicBool,
}

impl Calendar {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn meetings(&self) -> Vec<Meeting> {
        self.meetings.lock().clone()
    }

    /// Days queried through `check_calendar_availability`, in call order.
    pub fn availability_checks(&self) -> Vec<String> {
        self.availability_checks.lock().clone()
    }

    /// Simulate a backend outage: every call fails until switched back.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    fn ensure_online(&self, tool: &str) -> Result<()> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(HeraldError::ToolExecution {
                tool: tool.into(),
                reason: "calendar service is unavailable".into(),
            });
        }
        Ok(())
    }

    /// Free slots on `day`: the standard slots minus anything already booked.
    pub fn free_slots(&self, day: &str) -> Vec<String> {
        let meetings = self.meetings.lock();
        DAY_SLOTS
            .iter()
            .filter(|slot| {
                !meetings
                    .iter()
                    .any(|m| m.day == day && m.start_time.eq_ignore_ascii_case(slot))
            })
            .map(|s| s.to_string())
            .collect()
    }
}

fn text(tool: &str, args: &Value, key: &str) -> Result<String> {
    args.get(key)
        .and_then(Value::as_str)
        .map(String::from)
        .ok_or_else(|| HeraldError::InvalidArguments {
            tool: tool.into(),
            reason: format!("'{key}' must be a string"),
        })
}

// ── schedule_meeting ───────────────────────────────────────────

pub struct ScheduleMeeting {
    calendar: Arc<Calendar>,
}

impl ScheduleMeeting {
    pub fn new(calendar: Arc<Calendar>) -> Self {
        Self { calendar }
    }
}

#[async_trait]
impl ToolHandler for ScheduleMeeting {
    fn spec(&self) -> ToolSpec {
        ToolSpec {
            name: "schedule_meeting".into(),
            description: "Schedule a calendar meeting and send invites to the attendees.".into(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "attendees": {
                        "type": "array",
                        "items": { "type": "string" },
                        "description": "Attendee email addresses"
                    },
                    "subject": { "type": "string", "description": "Meeting title" },
                    "duration_minutes": { "type": "integer", "description": "Length in minutes" },
                    "preferred_day": { "type": "string", "description": "Day of the meeting, e.g. 2026-10-20" },
                    "start_time": { "type": "string", "description": "Start time, e.g. 2:00 PM" }
                },
                "required": ["attendees", "subject", "duration_minutes", "preferred_day", "start_time"]
            }),
            risk_tier: RiskTier::RequiresApproval,
        }
    }

    async fn invoke(&self, args: &Value) -> Result<String> {
        const TOOL: &str = "schedule_meeting";
        self.calendar.ensure_online(TOOL)?;

        let attendees: Vec<String> = args
            .get("attendees")
            .and_then(Value::as_array)
            .map(|list| list.iter().filter_map(Value::as_str).map(String::from).collect())
            .unwrap_or_default();
        if attendees.is_empty() {
            return Err(HeraldError::InvalidArguments {
                tool: TOOL.into(),
                reason: "at least one attendee is required".into(),
            });
        }
        let duration_minutes = args
            .get("duration_minutes")
            .and_then(Value::as_u64)
            .and_then(|d| u32::try_from(d).ok())
            .filter(|d| *d > 0)
            .ok_or_else(|| HeraldError::InvalidArguments {
                tool: TOOL.into(),
                reason: "'duration_minutes' must be a positive integer".into(),
            })?;

        let meeting = Meeting {
            attendees,
            subject: text(TOOL, args, "subject")?,
            duration_minutes,
            day: text(TOOL, args, "preferred_day")?,
            start_time: text(TOOL, args, "start_time")?,
        };
        let result = format!(
            "Meeting '{}' scheduled on {} at {} for {} minutes with {} attendees",
            meeting.subject,
            meeting.day,
            meeting.start_time,
            meeting.duration_minutes,
            meeting.attendees.len()
        );
        info!(subject = %meeting.subject, day = %meeting.day, minutes = meeting.duration_minutes, "meeting booked");
        self.calendar.meetings.lock().push(meeting);
        Ok(result)
    }
}

// ── check_calendar_availability ────────────────────────────────

pub struct CheckCalendarAvailability {
    calendar: Arc<Calendar>,
}

impl CheckCalendarAvailability {
    pub fn new(calendar: Arc<Calendar>) -> Self {
        Self { calendar }
    }
}

#[async_trait]
impl ToolHandler for CheckCalendarAvailability {
    fn spec(&self) -> ToolSpec {
        ToolSpec {
            name: "check_calendar_availability".into(),
            description: "Check calendar availability for a given day.".into(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "day": { "type": "string", "description": "Day to check, e.g. 2026-10-20" }
                },
                "required": ["day"]
            }),
            risk_tier: RiskTier::Safe,
        }
    }

    async fn invoke(&self, args: &Value) -> Result<String> {
        const TOOL: &str = "check_calendar_availability";
        self.calendar.ensure_online(TOOL)?;
        let day = text(TOOL, args, "day")?;
        self.calendar.availability_checks.lock().push(day.clone());

        let slots = self.calendar.free_slots(&day);
        if slots.is_empty() {
            return Ok(format!("No available times on {day}"));
        }
        Ok(format!("Available times on {day}: {}", slots.join(", ")))
    }
}
