//! HAProxy HTTP log decoding
//!
//! Turns raw HAProxy log lines into typed [`LogRecord`]s, one line at a time.
//!
//! # Architecture
//!
//! - `grammar.rs`: the anchored line pattern and its field-descriptor table
//! - `field.rs`: per-type coercion of captured substrings
//! - `termination.rs`: the 4-character session-state-at-disconnection code
//! - `haproxy.rs`: the line decoder tying grammar and field rules together
//! - `stage.rs`: async single-line stage and stream adapter
//! - `metrics.rs`: stage counters
//!
//! A line either decodes completely or is rejected with
//! [`DecodeError::MalformedLine`]; unknown codes inside the termination
//! state are values, never errors.

pub mod traits;
pub mod grammar;
pub mod field;
pub mod termination;
pub mod haproxy;
pub mod stage;
pub mod metrics;
pub mod model;
mod serde_utils;

// Re-export commonly used types
pub use traits::LineDecoder;
pub use model::{DecodeError, FieldDescriptor, FieldType, FieldValue, GrammarError, LogRecord};
pub use grammar::Grammar;
pub use haproxy::HaproxyLogDecoder;
pub use stage::DecodeStage;
pub use metrics::{MetricsSnapshot, StageMetrics};
pub use termination::{CookieStatus, StateAtClose, TerminationCause, TerminationState};
