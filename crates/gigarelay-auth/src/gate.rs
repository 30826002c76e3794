//! The inbound authentication gate.
//!
//! ```text
//! verify(header)
//!   ├─ no Bearer secret configured      → Configuration      (500)
//!   ├─ header missing                   → Unauthenticated    (401, Bearer)
//!   ├─ not "<scheme> <credentials>"     → MalformedHeader    (401, Bearer, Basic)
//!   ├─ bearer: token != secret          → InvalidToken       (401, Bearer)
//!   ├─ basic:  not base64 "user:pass"   → MalformedCredentials (401, Basic)
//!   │          user/pass mismatch       → InvalidCredentials (401, Basic)
//!   └─ anything else                    → UnsupportedScheme  (401, Bearer, Basic)
//! ```

use std::sync::Arc;

use base64::{Engine, engine::general_purpose::STANDARD};

use crate::config::AuthConfig;
use crate::error::AuthError;

/// Authorization schemes accepted by the gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthScheme {
    Bearer,
    Basic,
}

impl AuthScheme {
    /// Parse a scheme token, case-insensitively.
    pub fn parse(token: &str) -> Option<Self> {
        if token.eq_ignore_ascii_case("bearer") {
            Some(Self::Bearer)
        } else if token.eq_ignore_ascii_case("basic") {
            Some(Self::Basic)
        } else {
            None
        }
    }
}

/// Verifies `Authorization` headers against the configured credentials.
///
/// The gate only decides pass/fail; it does not produce an identity for
/// downstream handlers.
#[derive(Debug, Clone)]
pub struct AuthGate {
    config: Arc<AuthConfig>,
}

impl AuthGate {
    pub fn new(config: AuthConfig) -> Self {
        Self {
            config: Arc::new(config),
        }
    }

    /// Check a raw `Authorization` header value.
    pub fn verify(&self, authorization: Option<&str>) -> Result<(), AuthError> {
        let api_key = self.config.api_key().ok_or(AuthError::Configuration)?;

        let header = authorization
            .filter(|h| !h.is_empty())
            .ok_or(AuthError::Unauthenticated)?;

        let (scheme, credentials) = split_header(header).ok_or(AuthError::MalformedHeader)?;

        match AuthScheme::parse(scheme) {
            Some(AuthScheme::Bearer) => {
                if credentials != api_key {
                    return Err(AuthError::InvalidToken);
                }
            }
            Some(AuthScheme::Basic) => {
                let (username, password) =
                    decode_basic(credentials).ok_or(AuthError::MalformedCredentials)?;
                let user_matches = self.config.basic_user() == Some(username.as_str());
                if !user_matches || password != self.config.basic_password() {
                    return Err(AuthError::InvalidCredentials);
                }
            }
            None => {
                return Err(AuthError::UnsupportedScheme {
                    scheme: scheme.to_string(),
                });
            }
        }

        Ok(())
    }
}

/// Split `<scheme> <credentials>` on the first whitespace run.
///
/// Leading whitespace is ignored; everything after the separator, including
/// further whitespace, belongs to the credentials.
fn split_header(header: &str) -> Option<(&str, &str)> {
    let (scheme, rest) = header.trim_start().split_once(char::is_whitespace)?;
    let credentials = rest.trim_start();
    if credentials.is_empty() {
        return None;
    }
    Some((scheme, credentials))
}

/// Decode Basic credentials into `(username, password)`.
///
/// Splits on the first `:` only, so the password may contain colons.
fn decode_basic(credentials: &str) -> Option<(String, String)> {
    let decoded = STANDARD.decode(credentials).ok()?;
    let decoded = String::from_utf8(decoded).ok()?;
    let (username, password) = decoded.split_once(':')?;
    Some((username.to_string(), password.to_string()))
}
