use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration, maps to `herald.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct HeraldConfig {
    pub agent: AgentConfig,
    pub user: UserConfig,
    pub approval: ApprovalConfig,
    pub memory: MemoryConfig,
    pub logging: LoggingConfig,
    pub services: ServicesConfig,
}

// ── Agent ──────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    /// Model identifier passed to the decision port, e.g. "openai/gpt-4.1".
    pub model: String,
    /// Temperature (0.0 - 2.0).
    pub temperature: f32,
    /// Maximum tokens per decision.
    pub max_tokens: u32,
    /// Maximum `act` decisions per run before the run fails.
    pub max_rounds: u32,
    /// Maximum simultaneous decision port calls across all runs.
    pub max_concurrent_decisions: usize,
    /// Execute consecutive safe-tier calls of one round concurrently.
    pub parallel_safe_tools: bool,
    /// Per-decision HTTP timeout. 0 = no timeout.
    pub request_timeout_secs: u64,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            model: "openai/gpt-4.1".into(),
            temperature: 0.0,
            max_tokens: 4096,
            max_rounds: 12,
            max_concurrent_decisions: 4,
            parallel_safe_tools: true,
            request_timeout_secs: 120,
        }
    }
}

impl AgentConfig {
    /// Model name without the "provider/" prefix.
    pub fn model_name(&self) -> &str {
        self.model
            .split_once('/')
            .map(|(_, m)| m)
            .unwrap_or(&self.model)
    }
}

// ── User ───────────────────────────────────────────────────────

/// The person the assistant triages and replies for.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UserConfig {
    pub name: String,
    pub full_name: String,
    pub email: String,
    /// Free-form background seeded into the background namespace.
    pub background: Option<String>,
}

impl Default for UserConfig {
    fn default() -> Self {
        Self {
            name: "Lance".into(),
            full_name: "Lance Martin".into(),
            email: "lance@company.com".into(),
            background: None,
        }
    }
}

// ── Approval ───────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ApprovalConfig {
    /// Tools that always pause for review regardless of their risk tier.
    pub always_review: Vec<String>,
    /// Tools that never pause for review regardless of their risk tier.
    pub never_review: Vec<String>,
}

// ── Memory ─────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MemoryConfig {
    /// Path to the SQLite database holding preferences and run records.
    pub db_path: PathBuf,
    /// Seed default preference rules into empty namespaces on startup.
    pub seed_defaults: bool,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from("herald.db"),
            seed_defaults: true,
        }
    }
}

// ── Logging ────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: "trace", "debug", "info", "warn", "error".
    pub level: String,
    /// Output format: "pretty", "json", "compact".
    pub format: String,
    /// Log file path (None = stderr only).
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
            format: "pretty".into(),
            file: None,
        }
    }
}

// ── Services ───────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ServicesConfig {
    pub openai_api_key: Option<String>,
    /// OpenAI-compatible endpoint (Azure, vLLM, Ollama, ...).
    pub openai_base_url: Option<String>,
}

// ── Validation ─────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct ConfigWarning {
    pub field: String,
    pub message: String,
    pub severity: WarningSeverity,
    pub hint: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WarningSeverity {
    Error,
    Warning,
    Info,
}

impl std::fmt::Display for ConfigWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self.severity {
            WarningSeverity::Error => "error",
            WarningSeverity::Warning => "warning",
            WarningSeverity::Info => "info",
        };
        write!(f, "{} {}: {}", label, self.field, self.message)?;
        if let Some(ref h) = self.hint {
            write!(f, "\n   ↳ {}", h)?;
        }
        Ok(())
    }
}

impl HeraldConfig {
    /// Validate the config and return a list of warnings/errors.
    /// Returns `Err` with all messages joined if any severity is Error.
    pub fn validate(&self) -> Result<Vec<ConfigWarning>, String> {
        let mut warnings = Vec::new();

        // ── Agent model ───
        if self.agent.model.is_empty() {
            warnings.push(ConfigWarning {
                field: "agent.model".into(),
                message: "model is empty".into(),
                severity: WarningSeverity::Error,
                hint: Some("Set to e.g. 'openai/gpt-4.1'".into()),
            });
        } else if !self.agent.model.contains('/') {
            warnings.push(ConfigWarning {
                field: "agent.model".into(),
                message: format!(
                    "model '{}' should be in 'provider/model' format",
                    self.agent.model
                ),
                severity: WarningSeverity::Warning,
                hint: Some("Use 'openai/gpt-4.1' or 'ollama/llama3'".into()),
            });
        }

        // ── Temperature ───
        if !(0.0..=2.0).contains(&self.agent.temperature) {
            warnings.push(ConfigWarning {
                field: "agent.temperature".into(),
                message: format!("temperature {} is out of range", self.agent.temperature),
                severity: WarningSeverity::Error,
                hint: Some("Temperature must be between 0.0 and 2.0".into()),
            });
        }

        // ── Loop bound ───
        if self.agent.max_rounds == 0 {
            warnings.push(ConfigWarning {
                field: "agent.max_rounds".into(),
                message: "max_rounds is 0; every respond run would fail immediately".into(),
                severity: WarningSeverity::Error,
                hint: Some("Set to e.g. 12".into()),
            });
        } else if self.agent.max_rounds > 100 {
            warnings.push(ConfigWarning {
                field: "agent.max_rounds".into(),
                message: format!("max_rounds {} is unusually high", self.agent.max_rounds),
                severity: WarningSeverity::Warning,
                hint: Some("A single email rarely needs more than a dozen rounds".into()),
            });
        }

        // ── Concurrency ───
        if self.agent.max_concurrent_decisions == 0 {
            warnings.push(ConfigWarning {
                field: "agent.max_concurrent_decisions".into(),
                message: "max_concurrent_decisions is 0; no decision could ever be made".into(),
                severity: WarningSeverity::Error,
                hint: Some("Set to at least 1".into()),
            });
        }

        // ── Approval overrides ───
        for tool in &self.approval.never_review {
            if self.approval.always_review.contains(tool) {
                warnings.push(ConfigWarning {
                    field: "approval".into(),
                    message: format!("'{tool}' is in both always_review and never_review"),
                    severity: WarningSeverity::Error,
                    hint: Some("Remove it from one of the lists".into()),
                });
            }
        }
        if !self.approval.never_review.is_empty() {
            warnings.push(ConfigWarning {
                field: "approval.never_review".into(),
                message: format!(
                    "{} tool(s) will act without review: {}",
                    self.approval.never_review.len(),
                    self.approval.never_review.join(", ")
                ),
                severity: WarningSeverity::Info,
                hint: None,
            });
        }

        // ── Logging ───
        let valid_formats = ["pretty", "json", "compact"];
        if !valid_formats.contains(&self.logging.format.as_str()) {
            warnings.push(ConfigWarning {
                field: "logging.format".into(),
                message: format!("unknown log format '{}'", self.logging.format),
                severity: WarningSeverity::Warning,
                hint: Some(format!("Valid values: {}", valid_formats.join(", "))),
            });
        }

        let errors: Vec<String> = warnings
            .iter()
            .filter(|w| w.severity == WarningSeverity::Error)
            .map(|w| w.to_string())
            .collect();
        if !errors.is_empty() {
            return Err(errors.join("\n"));
        }

        Ok(warnings)
    }
}
