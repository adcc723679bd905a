//! Operator-facing event log.
//!
//! [`EventLog`] keeps a bounded list of timestamped entries that can be
//! filtered and exported as text. [`EventLogLayer`] feeds it from
//! `tracing` so library diagnostics and operator messages end up in one
//! place.

mod layer;
mod log;

pub use layer::EventLogLayer;
pub use log::{
    DEFAULT_CAPACITY, DEFAULT_RETAIN, EventLog, LogEntry, LogLevel, SharedEventLog,
    default_export_name,
};
