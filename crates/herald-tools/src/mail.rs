use async_trait::async_trait;
use chrono::{DateTime, Utc};
use herald_core::{HeraldError, Result, RiskTier, ToolSpec};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::sync::Arc;
use tracing::info;

use crate::registry::ToolHandler;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SentEmail {
    pub to: String,
    pub subject: String,
    pub content: String,
    pub sent_at: DateTime<Utc>,
}

/// In-memory stand-in for a mail backend.
#[derive(Debug, Default)]
pub struct Outbox {
    sent: Mutex<Vec<SentEmail>>,
}

impl Outbox {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sent(&self) -> Vec<SentEmail> {
        self.sent.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.sent.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.sent.lock().is_empty()
    }
}

pub struct WriteEmail {
    outbox: Arc<Outbox>,
}

impl WriteEmail {
    pub fn new(outbox: Arc<Outbox>) -> Self {
        Self { outbox }
    }
}

fn text_arg(args: &Value, key: &str) -> Result<String> {
    args.get(key)
        .and_then(Value::as_str)
        .map(String::from)
        .ok_or_else(|| HeraldError::InvalidArguments {
            tool: "write_email".into(),
            reason: format!("'{key}' must be a string"),
        })
}

#[async_trait]
impl ToolHandler for WriteEmail {
    fn spec(&self) -> ToolSpec {
        ToolSpec {
            name: "write_email".into(),
            description: "Write and send an email.".into(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "to": { "type": "string", "description": "Recipient email address" },
                    "subject": { "type": "string", "description": "Email subject line" },
                    "content": { "type": "string", "description": "Email body" }
                },
                "required": ["to", "subject", "content"]
            }),
            risk_tier: RiskTier::RequiresApproval,
        }
    }

    async fn invoke(&self, args: &Value) -> Result<String> {
        let email = SentEmail {
            to: text_arg(args, "to")?,
            subject: text_arg(args, "subject")?,
            content: text_arg(args, "content")?,
            sent_at: Utc::now(),
        };
        let result = format!("Email sent to {} with subject '{}'", email.to, email.subject);
        info!(to = %email.to, "email sent");
        self.outbox.sent.lock().push(email);
        Ok(result)
    }
}
