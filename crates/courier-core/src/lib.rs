//! Core types: users, messages, wildcard matching, tracing

pub mod entity;
pub mod pattern;
pub mod tracing;

pub use entity::{Message, MessageId, User, unix_now};
pub use pattern::{PatternError, WildcardPattern};
pub use self::tracing::{LogFormat, TracingConfig, TracingError, init_tracing};
