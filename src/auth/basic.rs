//! Basic auth handler.

use std::collections::HashMap;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::response::{IntoResponse, Response};
use base64::Engine as _;
use sha2::{Digest, Sha256};

use crate::acp::schema::BasicAuthConfig;
use crate::auth::{AcpHandler, AuthError};

const SHA256_PREFIX: &str = "{SHA256}";

/// Stored credential for one user.
enum StoredPassword {
    Plain(String),
    /// Lowercase hex SHA-256 digest of the password.
    Sha256(String),
}

/// Checks credentials from the `Authorization: Basic` header against the
/// configured user list.
pub struct BasicAuthHandler {
    realm: String,
    users: HashMap<String, StoredPassword>,
}

impl BasicAuthHandler {
    /// Build a handler from a basic auth policy config.
    ///
    /// User entries are `name:password` or `name:{SHA256}hexdigest`.
    pub fn new(config: &BasicAuthConfig, name: &str) -> Result<Self, AuthError> {
        let mut users = HashMap::new();

        for entry in &config.users {
            let (user, password) = entry.split_once(':').ok_or(AuthError::MalformedUser {
                entry: entry.clone(),
            })?;
            if user.is_empty() {
                return Err(AuthError::MalformedUser {
                    entry: entry.clone(),
                });
            }

            let stored = match password.strip_prefix(SHA256_PREFIX) {
                Some(digest) => {
                    let valid =
                        digest.len() == 64 && digest.chars().all(|c| c.is_ascii_hexdigit());
                    if !valid {
                        return Err(AuthError::MalformedUser {
                            entry: entry.clone(),
                        });
                    }
                    StoredPassword::Sha256(digest.to_lowercase())
                }
                None => StoredPassword::Plain(password.to_string()),
            };

            users.insert(user.to_string(), stored);
        }

        let realm = if config.realm.is_empty() {
            name.to_string()
        } else {
            config.realm.clone()
        };

        Ok(Self { realm, users })
    }

    fn verify(&self, user: &str, password: &str) -> bool {
        match self.users.get(user) {
            Some(StoredPassword::Plain(expected)) => expected == password,
            Some(StoredPassword::Sha256(digest)) => {
                hex::encode(Sha256::digest(password.as_bytes())) == *digest
            }
            None => false,
        }
    }

    fn challenge(&self) -> Response {
        let challenge = format!("Basic realm={:?}", self.realm);
        ([(header::WWW_AUTHENTICATE, challenge)], StatusCode::UNAUTHORIZED).into_response()
    }
}

impl AcpHandler for BasicAuthHandler {
    fn handle(&self, req: &Request<Body>) -> Response {
        let encoded = match req
            .headers()
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Basic "))
        {
            Some(encoded) => encoded,
            None => return self.challenge(),
        };

        let decoded = match base64::engine::general_purpose::STANDARD
            .decode(encoded)
            .ok()
            .and_then(|bytes| String::from_utf8(bytes).ok())
        {
            Some(decoded) => decoded,
            None => return self.challenge(),
        };

        match decoded.split_once(':') {
            Some((user, password)) if self.verify(user, password) => {
                StatusCode::OK.into_response()
            }
            _ => self.challenge(),
        }
    }
}

#[cfg(test)]
mod tests {
    use base64::Engine as _;

    use super::*;

    fn handler(users: &[&str]) -> BasicAuthHandler {
        let config = BasicAuthConfig {
            users: users.iter().map(|u| u.to_string()).collect(),
            realm: String::new(),
        };
        BasicAuthHandler::new(&config, "my-acp").unwrap()
    }

    fn request_with_credentials(user: &str, password: &str) -> Request<Body> {
        let encoded = base64::engine::general_purpose::STANDARD
            .encode(format!("{}:{}", user, password));
        Request::builder()
            .uri("http://agent/my-acp")
            .header("Authorization", format!("Basic {}", encoded))
            .body(Body::default())
            .unwrap()
    }

    #[test]
    fn test_plain_credentials_allowed() {
        let handler = handler(&["admin:secret"]);
        let response = handler.handle(&request_with_credentials("admin", "secret"));
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[test]
    fn test_hashed_credentials_allowed() {
        let digest = hex::encode(Sha256::digest(b"secret"));
        let entry = format!("admin:{{SHA256}}{}", digest);
        let handler = handler(&[entry.as_str()]);

        let response = handler.handle(&request_with_credentials("admin", "secret"));
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[test]
    fn test_wrong_password_challenged() {
        let handler = handler(&["admin:secret"]);
        let response = handler.handle(&request_with_credentials("admin", "nope"));
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let challenge = response.headers().get("www-authenticate").unwrap();
        assert!(challenge.to_str().unwrap().starts_with("Basic"));
    }

    #[test]
    fn test_missing_header_challenged() {
        let handler = handler(&["admin:secret"]);
        let req = Request::builder()
            .uri("http://agent/my-acp")
            .body(Body::default())
            .unwrap();

        let response = handler.handle(&req);
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn test_malformed_entry_rejected() {
        let config = BasicAuthConfig {
            users: vec!["no-colon-here".to_string()],
            realm: String::new(),
        };
        let err = BasicAuthHandler::new(&config, "my-acp").unwrap_err();
        assert!(matches!(err, AuthError::MalformedUser { .. }));
    }
}
