//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate address formats and value ranges
//! - Check that the configured policy source is usable
//!
//! # Design Decisions
//! - Returns all validation errors, not just the first
//! - Validation is a pure function over the parsed config
//! - Runs before the config is accepted into the system

use std::fmt;
use std::net::SocketAddr;

use url::Url;

use crate::config::schema::AgentConfig;

/// A single semantic configuration error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    InvalidListenAddr(String),
    InvalidMetricsAddr(String),
    ZeroPollInterval,
    InvalidPlatformUrl(String),
    MissingPlatformToken,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationError::InvalidListenAddr(addr) => {
                write!(f, "server.listen_addr {:?} is not a socket address", addr)
            }
            ValidationError::InvalidMetricsAddr(addr) => write!(
                f,
                "observability.metrics_address {:?} is not a socket address",
                addr
            ),
            ValidationError::ZeroPollInterval => {
                write!(f, "platform.poll_interval_secs must be greater than zero")
            }
            ValidationError::InvalidPlatformUrl(url) => {
                write!(f, "platform.url {:?} is not a valid URL", url)
            }
            ValidationError::MissingPlatformToken => {
                write!(f, "platform.token is required when no ACP directory is set")
            }
        }
    }
}

/// Validate semantic constraints on a parsed configuration.
pub fn validate_config(config: &AgentConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.server.listen_addr.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidListenAddr(
            config.server.listen_addr.clone(),
        ));
    }

    if config.observability.metrics_enabled
        && config
            .observability
            .metrics_address
            .parse::<SocketAddr>()
            .is_err()
    {
        errors.push(ValidationError::InvalidMetricsAddr(
            config.observability.metrics_address.clone(),
        ));
    }

    if config.platform.poll_interval_secs == 0 {
        errors.push(ValidationError::ZeroPollInterval);
    }

    // Platform settings only matter when no local directory overrides them.
    if config.acp.dir.is_none() {
        if Url::parse(&config.platform.url).is_err() {
            errors.push(ValidationError::InvalidPlatformUrl(
                config.platform.url.clone(),
            ));
        }
        if config.platform.token.is_empty() {
            errors.push(ValidationError::MissingPlatformToken);
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
