//! Digest auth handler (RFC 2617, MD5 with qop="auth").

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::response::{IntoResponse, Response};
use rand::RngCore;

use crate::acp::schema::DigestAuthConfig;
use crate::auth::{AcpHandler, AuthError};

/// Nonces kept before the oldest is evicted.
const MAX_TRACKED_NONCES: usize = 128;

/// Issues digest challenges and verifies the response hashes.
pub struct DigestAuthHandler {
    realm: String,
    opaque: String,
    /// User name to HA1, the MD5 of `name:realm:password`.
    users: HashMap<String, String>,
    /// Issued nonces, oldest first.
    nonces: Mutex<VecDeque<String>>,
}

impl DigestAuthHandler {
    /// Build a handler from a digest auth policy config.
    ///
    /// User entries follow the htdigest format:
    /// `name:realm:md5(name:realm:password)`.
    pub fn new(config: &DigestAuthConfig, name: &str) -> Result<Self, AuthError> {
        let mut users = HashMap::new();

        for entry in &config.users {
            let mut parts = entry.splitn(3, ':');
            let (user, _realm, ha1) = match (parts.next(), parts.next(), parts.next()) {
                (Some(user), Some(realm), Some(ha1)) if !user.is_empty() && !realm.is_empty() => {
                    (user, realm, ha1)
                }
                _ => {
                    return Err(AuthError::MalformedUser {
                        entry: entry.clone(),
                    })
                }
            };

            let valid = ha1.len() == 32 && ha1.chars().all(|c| c.is_ascii_hexdigit());
            if !valid {
                return Err(AuthError::MalformedUser {
                    entry: entry.clone(),
                });
            }

            users.insert(user.to_string(), ha1.to_lowercase());
        }

        let realm = if config.realm.is_empty() {
            name.to_string()
        } else {
            config.realm.clone()
        };

        Ok(Self {
            realm,
            opaque: random_hex(),
            users,
            nonces: Mutex::new(VecDeque::new()),
        })
    }

    fn challenge(&self, stale: bool) -> Response {
        let nonce = random_hex();
        {
            let mut nonces = self.nonces.lock().unwrap_or_else(|e| e.into_inner());
            nonces.push_back(nonce.clone());
            if nonces.len() > MAX_TRACKED_NONCES {
                nonces.pop_front();
            }
        }

        let mut challenge = format!(
            "Digest realm={:?}, qop=\"auth\", nonce={:?}, opaque={:?}",
            self.realm, nonce, self.opaque
        );
        if stale {
            challenge.push_str(", stale=true");
        }

        ([(header::WWW_AUTHENTICATE, challenge)], StatusCode::UNAUTHORIZED).into_response()
    }

    fn nonce_known(&self, nonce: &str) -> bool {
        let nonces = self.nonces.lock().unwrap_or_else(|e| e.into_inner());
        nonces.iter().any(|n| n == nonce)
    }

    fn verify(&self, method: &str, params: &HashMap<String, String>) -> bool {
        let (Some(username), Some(nonce), Some(uri), Some(response)) = (
            params.get("username"),
            params.get("nonce"),
            params.get("uri"),
            params.get("response"),
        ) else {
            return false;
        };

        let Some(ha1) = self.users.get(username) else {
            return false;
        };

        let ha2 = md5_hex(&format!("{}:{}", method, uri));

        let expected = match params.get("qop").map(String::as_str) {
            Some("auth") => {
                let (Some(nc), Some(cnonce)) = (params.get("nc"), params.get("cnonce")) else {
                    return false;
                };
                md5_hex(&format!("{}:{}:{}:{}:auth:{}", ha1, nonce, nc, cnonce, ha2))
            }
            Some(_) => return false,
            None => md5_hex(&format!("{}:{}:{}", ha1, nonce, ha2)),
        };

        expected == response.to_lowercase()
    }
}

impl AcpHandler for DigestAuthHandler {
    fn handle(&self, req: &Request<Body>) -> Response {
        let params = match req
            .headers()
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(parse_digest_params)
        {
            Some(params) => params,
            None => return self.challenge(false),
        };

        // A nonce this handler never issued (or already evicted) gets a
        // fresh challenge instead of a hard deny.
        match params.get("nonce") {
            Some(nonce) if self.nonce_known(nonce) => {}
            _ => return self.challenge(true),
        }

        if self.verify(req.method().as_str(), &params) {
            StatusCode::OK.into_response()
        } else {
            self.challenge(false)
        }
    }
}

fn random_hex() -> String {
    let mut bytes = [0u8; 16];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

fn md5_hex(input: &str) -> String {
    format!("{:x}", md5::compute(input))
}

/// Parse the key/value pairs of a `Digest` authorization header.
///
/// Values may be quoted or bare; quoted commas are not supported, which
/// matches the fields digest auth actually carries.
fn parse_digest_params(value: &str) -> Option<HashMap<String, String>> {
    let fields = value.strip_prefix("Digest ")?;

    let mut params = HashMap::new();
    for field in fields.split(',') {
        let (key, value) = field.trim().split_once('=')?;
        params.insert(key.to_string(), value.trim_matches('"').to_string());
    }
    Some(params)
}
