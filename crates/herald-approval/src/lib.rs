//! # herald-approval
//!
//! Decides which proposed tool calls must be held for a human reviewer, and
//! renders them in a form the reviewer can judge (an email draft, a calendar
//! invite, or the raw call).

pub mod policy;
pub mod preview;

pub use policy::{ApprovalPolicy, Gate};
pub use preview::render_preview;
