//! Observability (structured logging is initialized in main, metrics here).

pub mod metrics;
