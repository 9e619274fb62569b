//! Parsing operator input: emails, edited arguments, rule files.

use clap::Args;
use serde_json::Value;
use std::path::{Path, PathBuf};

use herald_core::{Email, HeraldError, Namespace, Result, RunStatus};
use herald_memory::Rule;

/// Where the email(s) to process come from.
#[derive(Args, Debug, Clone, Default)]
pub struct EmailArgs {
    /// JSON file holding one email object or an array of them
    #[arg(short, long, conflicts_with_all = ["from", "subject", "body"])]
    pub file: Option<PathBuf>,

    /// Sender, e.g. "Alice Smith <alice@company.com>"
    #[arg(long)]
    pub from: Option<String>,

    /// Recipients (defaults to the configured user's address)
    #[arg(long)]
    pub to: Option<String>,

    #[arg(long)]
    pub subject: Option<String>,

    /// Thread text
    #[arg(long)]
    pub body: Option<String>,
}

impl EmailArgs {
    pub fn emails(&self, default_to: &str) -> Result<Vec<Email>> {
        if let Some(path) = &self.file {
            return read_emails(path);
        }
        match (&self.from, &self.subject, &self.body) {
            (Some(from), Some(subject), Some(body)) => Ok(vec![Email::new(
                from,
                self.to.as_deref().unwrap_or(default_to),
                subject,
                body,
            )]),
            _ => Err(HeraldError::Config(
                "pass --file, or all of --from, --subject and --body".into(),
            )),
        }
    }
}

pub fn read_emails(path: &Path) -> Result<Vec<Email>> {
    let raw = std::fs::read_to_string(path).map_err(|e| {
        HeraldError::Config(format!("cannot read {}: {e}", path.display()))
    })?;
    parse_emails(&raw)
}

/// Accepts `{author, to, subject, email_thread}` objects (field aliases
/// `recipients` and `thread_text` also work), singly or in an array.
pub fn parse_emails(raw: &str) -> Result<Vec<Email>> {
    let value: Value = serde_json::from_str(raw)?;
    let emails = match value {
        Value::Array(items) => items
            .into_iter()
            .map(serde_json::from_value)
            .collect::<std::result::Result<Vec<Email>, _>>()?,
        other => vec![serde_json::from_value(other)?],
    };
    if emails.is_empty() {
        return Err(HeraldError::Config("no emails in input".into()));
    }
    Ok(emails)
}

/// Parse "key=value" CLI arguments.
pub fn parse_key_val(s: &str) -> std::result::Result<(String, String), String> {
    let pos = s
        .find('=')
        .ok_or_else(|| format!("invalid KEY=VALUE: no `=` found in `{s}`"))?;
    Ok((s[..pos].to_string(), s[pos + 1..].to_string()))
}

pub fn parse_namespace(s: &str) -> std::result::Result<Namespace, String> {
    s.parse().map_err(|e: HeraldError| e.to_string())
}

pub fn parse_status(s: &str) -> std::result::Result<RunStatus, String> {
    s.trim()
        .to_ascii_lowercase()
        .parse()
        .map_err(|_| format!("unknown status '{s}' (running, suspended, completed, failed)"))
}

/// A `--set` value: JSON when it parses as JSON, otherwise a plain string.
fn loose_value(raw: &str) -> Value {
    serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}

/// Build edited arguments: start from `--args` (or the proposed arguments)
/// and apply each `--set key=value` on top.
pub fn apply_edits(proposed: &Value, args: Option<&str>, sets: &[(String, String)]) -> Result<Value> {
    let mut edited = match args {
        Some(raw) => serde_json::from_str(raw)?,
        None => proposed.clone(),
    };
    if sets.is_empty() && args.is_none() {
        return Err(HeraldError::InvalidVerdict(
            "an edit needs --args or at least one --set".into(),
        ));
    }
    let object = edited.as_object_mut().ok_or_else(|| {
        HeraldError::InvalidVerdict("edited arguments must be a JSON object".into())
    })?;
    for (key, value) in sets {
        object.insert(key.clone(), loose_value(value));
    }
    Ok(edited)
}

/// Rules for a full replacement: a JSON array of `{key?, text}`, or plain
/// text with one rule per line (a leading "- " is stripped).
pub fn parse_rules(raw: &str) -> Result<Vec<Rule>> {
    if raw.trim_start().starts_with('[') {
        return Ok(serde_json::from_str(raw)?);
    }
    Ok(raw
        .lines()
        .map(str::trim)
        .map(|line| line.strip_prefix("- ").unwrap_or(line))
        .filter(|line| !line.is_empty())
        .map(Rule::unkeyed)
        .collect())
}
