//! # herald-core
//!
//! Core types, traits, and primitives for the Herald email assistant.
//! This crate defines the shared vocabulary used by every other crate in the workspace:
//! inbound emails, conversation turns, tool calls, interrupt requests and verdicts.

pub mod error;
pub mod event;
pub mod interrupt;
pub mod message;
pub mod tool;
pub mod types;

pub use error::{HeraldError, Result};
pub use event::{Event, EventBus};
pub use interrupt::{InterruptRequest, Verdict, VerdictKind};
pub use message::{Conversation, Role, Turn, TurnContent};
pub use tool::{DONE_TOOL, RiskTier, ToolCall, ToolExecutor, ToolResult, ToolSpec};
pub use types::*;
