//! # herald-config
//!
//! Configuration system for the Herald runtime. Reads from `herald.toml`, environment
//! variables, and CLI overrides, in that precedence order.
//!
//! Supports hot-reload via filesystem watcher.

pub mod loader;
pub mod schema;

pub use loader::ConfigLoader;
pub use schema::HeraldConfig;
pub use schema::{
    AgentConfig, ApprovalConfig, ConfigWarning, LoggingConfig, MemoryConfig, ServicesConfig,
    UserConfig, WarningSeverity,
};
