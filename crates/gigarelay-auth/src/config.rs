//! Accepted inbound credentials.

use serde::{Deserialize, Serialize};

/// Credentials accepted by the [`AuthGate`](crate::AuthGate).
///
/// Empty strings are treated as not configured.
///
/// # Example (TOML)
///
/// ```toml
/// [auth]
/// api_key = "s3cret"
/// basic_user = "relay"
/// basic_password = "hunter2"
/// ```
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Shared secret for `Authorization: Bearer <api_key>`. Required.
    pub api_key: Option<String>,

    /// Username for `Authorization: Basic ...`.
    pub basic_user: Option<String>,

    /// Password for `Authorization: Basic ...`.
    pub basic_password: Option<String>,
}

impl AuthConfig {
    /// Creates a config that only accepts the given Bearer token.
    #[must_use]
    pub fn bearer(api_key: impl Into<String>) -> Self {
        Self {
            api_key: Some(api_key.into()),
            ..Self::default()
        }
    }

    /// Adds Basic credentials.
    #[must_use]
    pub fn with_basic(mut self, user: impl Into<String>, password: impl Into<String>) -> Self {
        self.basic_user = Some(user.into());
        self.basic_password = Some(password.into());
        self
    }

    /// The Bearer secret, if configured and non-empty.
    pub fn api_key(&self) -> Option<&str> {
        non_empty(self.api_key.as_deref())
    }

    /// The Basic username, if configured and non-empty.
    pub fn basic_user(&self) -> Option<&str> {
        non_empty(self.basic_user.as_deref())
    }

    /// The Basic password (may be empty).
    pub fn basic_password(&self) -> &str {
        self.basic_password.as_deref().unwrap_or_default()
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}
