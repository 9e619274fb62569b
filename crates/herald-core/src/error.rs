use thiserror::Error;
use uuid::Uuid;

/// Unified error type for the entire Herald runtime.
#[derive(Error, Debug)]
pub enum HeraldError {
    // ── Decision port errors ───────────────────────────────────
    #[error("decision contract violation: {0}")]
    DecisionContractViolation(String),

    #[error("decision port error: {0}")]
    DecisionPort(String),

    // ── Tool errors ────────────────────────────────────────────
    #[error("tool not found: {0}")]
    ToolNotFound(String),

    #[error("tool execution failed: {tool}: {reason}")]
    ToolExecution { tool: String, reason: String },

    #[error("invalid tool schema: {tool}: {reason}")]
    InvalidToolSchema { tool: String, reason: String },

    #[error("invalid arguments for {tool}: {reason}")]
    InvalidArguments { tool: String, reason: String },

    // ── Run / interrupt errors ─────────────────────────────────
    #[error("bounded loop exceeded after {rounds} rounds")]
    BoundedLoopExceeded { rounds: u32 },

    #[error("stale verdict for run {run_id}: {reason}")]
    StaleVerdict { run_id: Uuid, reason: String },

    #[error("invalid verdict: {0}")]
    InvalidVerdict(String),

    #[error("run not found: {0}")]
    RunNotFound(Uuid),

    #[error("run {run_id} is {status}, expected {expected}")]
    InvalidRunState {
        run_id: Uuid,
        status: String,
        expected: String,
    },

    #[error("conversation invariant violated: {0}")]
    ConversationInvariant(String),

    #[error("run cancelled: {0}")]
    Cancelled(Uuid),

    #[error("run {run_id} failed: {source}")]
    RunFailed {
        run_id: Uuid,
        #[source]
        source: Box<HeraldError>,
    },

    // ── Memory / persistence errors ────────────────────────────
    #[error("memory error: {0}")]
    Memory(String),

    #[error("merge conflict on namespace {namespace}")]
    MergeConflict { namespace: String },

    #[error("persistence error: {0}")]
    Persistence(String),

    // ── Config errors ──────────────────────────────────────────
    #[error("config error: {0}")]
    Config(String),

    #[error("config validation failed: {field}: {reason}")]
    ConfigValidation { field: String, reason: String },

    // ── Generic wrappers ───────────────────────────────────────
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

impl HeraldError {
    /// Wrap a control-plane failure with the run it terminated.
    pub fn run_failed(run_id: Uuid, source: HeraldError) -> Self {
        match source {
            already @ HeraldError::RunFailed { .. } => already,
            other => HeraldError::RunFailed {
                run_id,
                source: Box::new(other),
            },
        }
    }

    /// The underlying cause, looking through `RunFailed`.
    pub fn root(&self) -> &HeraldError {
        match self {
            HeraldError::RunFailed { source, .. } => source.root(),
            other => other,
        }
    }

    /// Errors local to a single tool call that are fed back to the model.
    pub fn is_tool_local(&self) -> bool {
        matches!(
            self,
            HeraldError::ToolExecution { .. } | HeraldError::InvalidArguments { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, HeraldError>;
