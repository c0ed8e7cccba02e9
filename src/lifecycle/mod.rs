//! Lifecycle management (startup order lives in main, shutdown here).

pub mod shutdown;

pub use shutdown::{listen_for_signals, Shutdown};
