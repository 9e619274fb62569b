use serde::{Deserialize, Serialize};
use uuid::Uuid;

use std::sync::Arc;
use tokio::sync::broadcast;

use crate::interrupt::VerdictKind;
use crate::types::{Category, Namespace, RunId};

/// Run lifecycle events, published for notification surfaces and reviewers.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Event {
    // ── Run lifecycle ──────────────────────────────────────────
    RunStarted {
        run_id: RunId,
        subject: String,
    },
    Triaged {
        run_id: RunId,
        category: Category,
    },
    RunCompleted {
        run_id: RunId,
    },
    RunFailed {
        run_id: RunId,
        error: String,
    },

    // ── Tool loop ──────────────────────────────────────────────
    ToolCallRequested {
        run_id: RunId,
        tool_name: String,
        tool_call_id: String,
    },
    ToolResultRecorded {
        run_id: RunId,
        tool_call_id: String,
        is_error: bool,
    },

    // ── Review ─────────────────────────────────────────────────
    RunSuspended {
        run_id: RunId,
        interrupt_id: Uuid,
        tool_name: String,
    },
    VerdictApplied {
        run_id: RunId,
        interrupt_id: Uuid,
        verdict: VerdictKind,
    },
    VerdictDiscarded {
        run_id: RunId,
        reason: String,
    },

    // ── Memory ─────────────────────────────────────────────────
    PreferenceUpdated {
        namespace: Namespace,
        rule_key: Option<String>,
        version: i64,
    },
}

/// A broadcast-based event bus for system-wide pub/sub.
#[derive(Clone)]
pub struct EventBus {
    sender: Arc<broadcast::Sender<Event>>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender: Arc::new(sender),
        }
    }

    pub fn publish(&self, event: Event) {
        // Ignore send errors (no subscribers).
        let _ = self.sender.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.sender.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(1024)
    }
}
