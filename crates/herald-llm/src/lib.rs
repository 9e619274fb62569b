//! # herald-llm
//!
//! The decision port: one call to an opaque reasoning function, either to
//! classify an email or to pick the next tool calls. Responses are validated
//! against a fixed contract and rejected on mismatch, never coerced.

pub mod contract;
pub mod decision;
pub mod mock;
pub mod openai;
pub mod throttle;

pub use contract::{validate_act, validate_classify};
pub use decision::{Decision, DecisionMode, DecisionPort, DecisionRequest, RawClassification};
pub use mock::{MockDecider, MockDecision};
pub use openai::OpenAiDecider;
pub use throttle::ThrottledDecider;
