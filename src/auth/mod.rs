//! Authentication handlers.
//!
//! # Responsibilities
//! - Define the handler contract the dispatch table stores
//! - Implement the JWT, basic auth and digest auth handler families
//!
//! # Design Decisions
//! - Handlers are built once per policy change and never mutated
//! - Construction validates config shape only, never remote reachability
//! - A handler answers with a full response: allow (200), deny (401/403)
//!   or challenge (401 + WWW-Authenticate)

pub mod basic;
pub mod digest;
pub mod jwt;

use axum::body::Body;
use axum::http::Request;
use axum::response::Response;

pub use basic::BasicAuthHandler;
pub use digest::DigestAuthHandler;
pub use jwt::JwtHandler;

/// Trait for request-time policy checks.
pub trait AcpHandler: Send + Sync {
    /// Decide whether the request is allowed.
    fn handle(&self, req: &Request<Body>) -> Response;
}

/// Error type for handler construction.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("no key material: one of signing_secret or public_key is required")]
    MissingKeyMaterial,

    #[error("invalid public key: {0}")]
    InvalidPublicKey(#[source] jsonwebtoken::errors::Error),

    #[error("invalid forward header name {header:?}")]
    InvalidForwardHeader { header: String },

    #[error("malformed user entry {entry:?}")]
    MalformedUser { entry: String },
}
