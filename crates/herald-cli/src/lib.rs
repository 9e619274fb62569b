//! # herald-cli
//!
//! Command-line interface for the Herald email assistant.
//!
//! ## Commands
//!
//! - `herald triage`: Classify an email without starting a run
//! - `herald run`: Process one or more emails end to end
//! - `herald pending`: List actions waiting for review
//! - `herald approve` / `edit` / `reject` / `respond`: Answer a pending action
//! - `herald cancel`: Cancel a suspended run
//! - `herald runs` / `show`: Inspect run records
//! - `herald prefs`: Inspect and edit learned preferences
//! - `herald config` / `doctor`: Show and audit configuration

pub mod commands;
pub mod input;
pub mod style;

pub use commands::Cli;
