//! # herald-memory
//!
//! Durable state shared by every run:
//!
//! - **Preferences**: four disjoint namespaces (background, response style,
//!   calendar, triage), each an ordered rule list versioned for compare-and-swap
//!   merges, plus an append-only correction history.
//! - **Runs**: one record per inbound email holding status, conversation
//!   snapshot and the pending interrupt, so suspension survives restarts.

pub mod defaults;
pub mod preferences;
pub mod runs;
pub mod store;

pub use preferences::{
    Correction, CorrectionRecord, PreferenceDocument, PreferenceSnapshot, PreferenceStore, Rule,
};
pub use runs::{RunRecord, RunStore};
pub use store::MemoryStore;
