use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::error::HeraldError;

/// Unique identifier for a run (one inbound email, end to end).
pub type RunId = Uuid;

/// An inbound email. Immutable input; identity is its content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Email {
    /// Caller-supplied identifier, if any (message id, dataset row, ...).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub author: String,
    #[serde(alias = "to")]
    pub recipients: String,
    pub subject: String,
    #[serde(alias = "email_thread")]
    pub thread_text: String,
}

impl Email {
    pub fn new(
        author: impl Into<String>,
        recipients: impl Into<String>,
        subject: impl Into<String>,
        thread_text: impl Into<String>,
    ) -> Self {
        Self {
            id: None,
            author: author.into(),
            recipients: recipients.into(),
            subject: subject.into(),
            thread_text: thread_text.into(),
        }
    }

    /// Markdown rendering used in decision contexts and previews.
    pub fn to_markdown(&self) -> String {
        format!(
            "**Subject**: {}\n**From**: {}\n**To**: {}\n\n{}\n\n---",
            self.subject, self.author, self.recipients, self.thread_text
        )
    }
}

/// Triage routing outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Ignore,
    Notify,
    Respond,
}

impl Category {
    pub const ALL: [Category; 3] = [Category::Ignore, Category::Notify, Category::Respond];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ignore => "ignore",
            Self::Notify => "notify",
            Self::Respond => "respond",
        }
    }

    /// Whether this outcome ends the run without entering the tool loop.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Respond)
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = HeraldError;

    /// Strict parse: surrounding whitespace and ASCII case are tolerated, nothing else.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        Category::ALL
            .into_iter()
            .find(|c| c.as_str().eq_ignore_ascii_case(trimmed))
            .ok_or_else(|| {
                HeraldError::DecisionContractViolation(format!(
                    "category '{s}' is not one of ignore, notify, respond"
                ))
            })
    }
}

/// The recorded triage decision for one email.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Classification {
    pub reasoning: String,
    pub category: Category,
}

/// Lifecycle of a run. A run is in exactly one of these at any time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Running,
    Suspended,
    Completed,
    Failed,
}

impl RunStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Suspended => "suspended",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RunStatus {
    type Err = HeraldError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "running" => Ok(Self::Running),
            "suspended" => Ok(Self::Suspended),
            "completed" => Ok(Self::Completed),
            "failed" => Ok(Self::Failed),
            other => Err(HeraldError::Persistence(format!("unknown run status '{other}'"))),
        }
    }
}

/// Preference namespaces. Disjoint; each holds one ordered rule list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Namespace {
    Background,
    ResponseStyle,
    Calendar,
    Triage,
}

impl Namespace {
    pub const ALL: [Namespace; 4] = [
        Namespace::Background,
        Namespace::ResponseStyle,
        Namespace::Calendar,
        Namespace::Triage,
    ];

    /// Storage key.
    pub fn key(&self) -> &'static str {
        match self {
            Self::Background => "background",
            Self::ResponseStyle => "response_preferences",
            Self::Calendar => "cal_preferences",
            Self::Triage => "triage_preferences",
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            Self::Background => "Background",
            Self::ResponseStyle => "Response preferences",
            Self::Calendar => "Calendar preferences",
            Self::Triage => "Triage rules",
        }
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for Namespace {
    type Err = HeraldError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        match s {
            "background" => Ok(Self::Background),
            "response" | "response_style" | "response_preferences" => Ok(Self::ResponseStyle),
            "calendar" | "cal" | "cal_preferences" => Ok(Self::Calendar),
            "triage" | "triage_preferences" => Ok(Self::Triage),
            other => Err(HeraldError::Memory(format!("unknown namespace '{other}'"))),
        }
    }
}
