//! # herald-tools
//!
//! The tool registry maps a tool name to a handler with a declared argument
//! schema and risk tier. Schemas are checked when a tool is registered and
//! arguments are checked before every call.
//!
//! The built-in tools (`write_email`, `schedule_meeting`,
//! `check_calendar_availability`) run against in-memory backends that record
//! what they were asked to do. `Done` is advertised but never executed.

pub mod calendar;
pub mod mail;
pub mod registry;
pub mod schema;

pub use calendar::{Calendar, CheckCalendarAvailability, Meeting, ScheduleMeeting};
pub use mail::{Outbox, SentEmail, WriteEmail};
pub use registry::{ToolHandler, ToolRegistry, done_spec};
