//! # herald-runtime
//!
//! The orchestration core around the decision port.
//!
//! ```text
//!   Email ──► Triage ──► ignore / notify ──► Completed
//!                │
//!                └─► respond ──► Tool loop ──► Done ──► Completed
//!                                 │    ▲
//!                    review tier  ▼    │ verdict
//!                              Suspended ──► feedback ──► preferences
//! ```
//!
//! Runs are independent units of work. Within one run, deciding and
//! dispatching never overlap. A suspended run lives only in its persisted
//! record and is resumed by rehydrating that record.

pub(crate) mod agent_loop;
pub mod feedback;
pub(crate) mod interrupt;
pub mod orchestrator;
pub mod prompts;
pub mod triage;

pub use agent_loop::{LoopOutcome, LoopSettings};
pub use feedback::FeedbackAdapter;
pub use orchestrator::Orchestrator;
pub use triage::TriageStage;
