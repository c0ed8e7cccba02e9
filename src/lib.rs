//! Edge Authentication Agent Library
//!
//! Synchronizes access control policies from a control plane and serves
//! them as forward-auth endpoints for a fronting reverse proxy.

pub mod acp;
pub mod auth;
pub mod config;
pub mod http;
pub mod lifecycle;
pub mod observability;

pub use acp::AcpWatcher;
pub use config::AgentConfig;
pub use http::AuthServer;
pub use lifecycle::Shutdown;
