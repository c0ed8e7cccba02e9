//! JWT validation handler.

use axum::body::Body;
use axum::http::{header, HeaderName, HeaderValue, Request, StatusCode};
use axum::response::{IntoResponse, Response};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};

use crate::acp::schema::JwtConfig;
use crate::auth::{AcpHandler, AuthError};

/// Validates bearer tokens against configured key material.
///
/// Tokens are read from the `Authorization: Bearer` header, or from the
/// configured query parameter when the header is absent. On success the
/// configured claims are copied onto the response headers so the proxy
/// can forward them upstream.
pub struct JwtHandler {
    name: String,
    keys: Vec<(DecodingKey, Validation)>,
    token_query_key: Option<String>,
    strip_authorization_header: bool,
    forward_headers: Vec<(HeaderName, String)>,
}

impl JwtHandler {
    /// Build a handler from a JWT policy config.
    ///
    /// At least one of `signing_secret` or `public_key` must be set.
    pub fn new(config: &JwtConfig, name: &str) -> Result<Self, AuthError> {
        let mut keys = Vec::new();

        if let Some(secret) = config.signing_secret.as_deref().filter(|s| !s.is_empty()) {
            keys.push((
                DecodingKey::from_secret(secret.as_bytes()),
                Validation::new(Algorithm::HS256),
            ));
        }

        if let Some(pem) = config.public_key.as_deref().filter(|s| !s.is_empty()) {
            let key = DecodingKey::from_rsa_pem(pem.as_bytes())
                .map(|key| (key, Validation::new(Algorithm::RS256)))
                .or_else(|_| {
                    DecodingKey::from_ec_pem(pem.as_bytes())
                        .map(|key| (key, Validation::new(Algorithm::ES256)))
                })
                .map_err(AuthError::InvalidPublicKey)?;
            keys.push(key);
        }

        if keys.is_empty() {
            return Err(AuthError::MissingKeyMaterial);
        }

        let mut forward_headers = Vec::new();
        for (header, claim) in &config.forward_headers {
            let header_name = HeaderName::from_bytes(header.as_bytes()).map_err(|_| {
                AuthError::InvalidForwardHeader {
                    header: header.clone(),
                }
            })?;
            forward_headers.push((header_name, claim.clone()));
        }

        Ok(Self {
            name: name.to_string(),
            keys,
            token_query_key: config.token_query_key.clone(),
            strip_authorization_header: config.strip_authorization_header,
            forward_headers,
        })
    }

    fn extract_token<'a>(&self, req: &'a Request<Body>) -> Option<&'a str> {
        let from_header = req
            .headers()
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "));

        if from_header.is_some() {
            return from_header;
        }

        let query_key = self.token_query_key.as_deref()?;
        req.uri().query()?.split('&').find_map(|pair| {
            let (key, value) = pair.split_once('=')?;
            (key == query_key).then_some(value)
        })
    }

    fn decode_claims(&self, token: &str) -> Option<serde_json::Value> {
        for (key, validation) in &self.keys {
            match decode::<serde_json::Value>(token, key, validation) {
                Ok(data) => return Some(data.claims),
                Err(e) => {
                    tracing::debug!(acp_name = %self.name, error = %e, "JWT rejected by key");
                }
            }
        }
        None
    }
}

impl AcpHandler for JwtHandler {
    fn handle(&self, req: &Request<Body>) -> Response {
        let token = match self.extract_token(req) {
            Some(token) => token,
            None => {
                return (
                    [(header::WWW_AUTHENTICATE, "Bearer")],
                    StatusCode::UNAUTHORIZED,
                )
                    .into_response();
            }
        };

        let claims = match self.decode_claims(token) {
            Some(claims) => claims,
            None => return StatusCode::UNAUTHORIZED.into_response(),
        };

        let mut response = StatusCode::OK.into_response();

        for (header_name, claim) in &self.forward_headers {
            let value = match claims.get(claim) {
                Some(serde_json::Value::String(s)) => s.clone(),
                Some(serde_json::Value::Number(n)) => n.to_string(),
                Some(serde_json::Value::Bool(b)) => b.to_string(),
                _ => continue,
            };
            match HeaderValue::from_str(&value) {
                Ok(value) => {
                    response.headers_mut().insert(header_name.clone(), value);
                }
                Err(_) => {
                    tracing::debug!(acp_name = %self.name, claim = %claim, "Claim not representable as header");
                }
            }
        }

        if self.strip_authorization_header {
            // An empty Authorization response header tells the proxy to
            // drop the client's own before forwarding upstream.
            response
                .headers_mut()
                .insert(header::AUTHORIZATION, HeaderValue::from_static(""));
        }

        response
    }
}
