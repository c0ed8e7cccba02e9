//! Dispatch table construction.
//!
//! # Responsibilities
//! - Turn a policy set into a routable table of live handlers
//! - Reject malformed or unrecognized policy definitions
//!
//! # Design Decisions
//! - Build is atomic: one bad entry rejects the whole table, so a
//!   malformed table is never partially live
//! - Tables are immutable snapshots; the server swaps them wholesale
//! - Paths are `"/" + name`, matching the fronting proxy's wiring

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::acp::schema::AcpSet;
use crate::auth::{AcpHandler, AuthError, BasicAuthHandler, DigestAuthHandler, JwtHandler};

/// The handler family a policy resolved to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcpKind {
    Jwt,
    BasicAuth,
    DigestAuth,
}

impl fmt::Display for AcpKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AcpKind::Jwt => write!(f, "JWT"),
            AcpKind::BasicAuth => write!(f, "basic auth"),
            AcpKind::DigestAuth => write!(f, "digest auth"),
        }
    }
}

/// Error type for dispatch table builds.
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("ACP {name:?} matches no known policy kind")]
    UnknownPolicyKind { name: String },

    #[error("create {kind} handler for ACP {name:?}: {source}")]
    HandlerConstruction {
        name: String,
        kind: AcpKind,
        #[source]
        source: AuthError,
    },
}

/// Immutable mapping from request path to the handler serving it.
#[derive(Default)]
pub struct DispatchTable {
    routes: HashMap<String, Arc<dyn AcpHandler>>,
}

impl DispatchTable {
    /// Look up the handler registered at the given path.
    pub fn handler(&self, path: &str) -> Option<&Arc<dyn AcpHandler>> {
        self.routes.get(path)
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

/// Build a dispatch table from a policy set.
///
/// Each policy must populate exactly one handler family. The first
/// malformed or unbuildable entry fails the whole build; no partial
/// table is returned.
pub fn build_routes(cfgs: &AcpSet) -> Result<DispatchTable, BuildError> {
    let mut routes: HashMap<String, Arc<dyn AcpHandler>> = HashMap::new();

    for (name, cfg) in cfgs {
        let wrap = |kind: AcpKind| {
            move |source: AuthError| BuildError::HandlerConstruction {
                name: name.clone(),
                kind,
                source,
            }
        };

        let (kind, handler): (AcpKind, Arc<dyn AcpHandler>) =
            match (&cfg.jwt, &cfg.basic_auth, &cfg.digest_auth) {
                (Some(jwt), None, None) => (
                    AcpKind::Jwt,
                    Arc::new(JwtHandler::new(jwt, name).map_err(wrap(AcpKind::Jwt))?),
                ),
                (None, Some(basic), None) => (
                    AcpKind::BasicAuth,
                    Arc::new(BasicAuthHandler::new(basic, name).map_err(wrap(AcpKind::BasicAuth))?),
                ),
                (None, None, Some(digest)) => (
                    AcpKind::DigestAuth,
                    Arc::new(
                        DigestAuthHandler::new(digest, name).map_err(wrap(AcpKind::DigestAuth))?,
                    ),
                ),
                _ => {
                    return Err(BuildError::UnknownPolicyKind { name: name.clone() });
                }
            };

        let path = format!("/{}", name);
        tracing::debug!(acp_name = %name, path = %path, kind = %kind, "Registering ACP handler");
        routes.insert(path, handler);
    }

    Ok(DispatchTable { routes })
}
