//! GigaChat connection settings.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Provider endpoints and credentials.
///
/// # Example (TOML)
///
/// ```toml
/// [gigachat]
/// auth_key = "base64-client-credentials"
/// scope = "GIGACHAT_API_PERS"
/// # Only with the provider's CA installed locally:
/// accept_invalid_certs = false
/// ```
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct GigaChatConfig {
    /// Authorization key used for the OAuth credential exchange. Required.
    pub auth_key: Option<String>,

    /// OAuth scope requested with the token.
    pub scope: String,

    /// OAuth token endpoint.
    pub oauth_url: String,

    /// Base URL of the chat API.
    pub api_url: String,

    /// Skip TLS certificate verification. On by default: the provider's
    /// certificates are issued by a private CA.
    pub accept_invalid_certs: bool,

    /// Per-request timeout in milliseconds.
    pub timeout_ms: u64,
}

impl Default for GigaChatConfig {
    fn default() -> Self {
        Self {
            auth_key: None,
            scope: "GIGACHAT_API_PERS".to_string(),
            oauth_url: "https://ngw.devices.sberbank.ru:9443/api/v2/oauth".to_string(),
            api_url: "https://gigachat.devices.sberbank.ru/api/v1".to_string(),
            accept_invalid_certs: true,
            timeout_ms: 30_000,
        }
    }
}

impl GigaChatConfig {
    /// The authorization key, if configured and non-empty.
    pub fn auth_key(&self) -> Option<&str> {
        self.auth_key.as_deref().filter(|k| !k.trim().is_empty())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}
