//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the
//! agent. All types derive Serde traits for deserialization from config
//! files.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Root configuration for the agent.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct AgentConfig {
    /// Auth server settings (bind address, request timeout).
    pub server: ServerConfig,

    /// Control plane connection settings.
    pub platform: PlatformConfig,

    /// Local policy directory settings.
    pub acp: AcpSourceConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Auth server settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub listen_addr: String,

    /// Request timeout in seconds.
    pub request_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:8080".to_string(),
            request_timeout_secs: 30,
        }
    }
}

/// Control plane connection settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct PlatformConfig {
    /// Control plane base URL.
    pub url: String,

    /// Access token sent as a bearer credential.
    pub token: String,

    /// Policy poll interval in seconds.
    pub poll_interval_secs: u64,
}

impl Default for PlatformConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            token: String::new(),
            poll_interval_secs: 30,
        }
    }
}

/// Local policy directory settings.
///
/// When `dir` is set the agent polls the directory instead of the
/// control plane.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct AcpSourceConfig {
    /// Directory holding one JSON policy definition per file.
    pub dir: Option<PathBuf>,
}

/// Observability settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: true,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
