//! Access control policy definitions.
//!
//! This module defines the wire model for policies supplied by a policy
//! source. All types derive Serde traits plus `PartialEq`; the watcher
//! relies on structural equality to detect changes between fetches.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// The set of named policies observed at one point in time.
///
/// Produced fresh on every successful fetch and never mutated in place.
pub type AcpSet = HashMap<String, AcpConfig>;

/// A named access control policy.
///
/// Exactly one of the variant fields must be populated. The wire format
/// cannot enforce that, so the dispatch table builder rejects any config
/// where zero or several variants are set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct AcpConfig {
    /// JWT validation policy.
    pub jwt: Option<JwtConfig>,

    /// Basic auth policy.
    pub basic_auth: Option<BasicAuthConfig>,

    /// Digest auth policy.
    pub digest_auth: Option<DigestAuthConfig>,
}

/// JWT validation settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct JwtConfig {
    /// HMAC secret for HS256 tokens.
    pub signing_secret: Option<String>,

    /// PEM-encoded RSA or EC public key for asymmetric tokens.
    pub public_key: Option<String>,

    /// Query parameter to read the token from when the Authorization
    /// header is absent.
    pub token_query_key: Option<String>,

    /// Drop the client's Authorization header before the request is
    /// forwarded upstream.
    pub strip_authorization_header: bool,

    /// Response header name to token claim name. Matching claims are
    /// copied onto the allow response for the proxy to forward.
    pub forward_headers: HashMap<String, String>,
}

/// Basic auth settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct BasicAuthConfig {
    /// User entries, either `name:password` or `name:{SHA256}hexdigest`.
    pub users: Vec<String>,

    /// Realm announced in the challenge. Defaults to the policy name.
    pub realm: String,
}

/// Digest auth settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct DigestAuthConfig {
    /// User entries in htdigest format: `name:realm:md5(name:realm:password)`.
    pub users: Vec<String>,

    /// Realm announced in the challenge. Defaults to the policy name.
    pub realm: String,
}
