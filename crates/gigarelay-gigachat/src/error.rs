//! Upstream error types.

/// Errors returned by an [`UpstreamProvider`](crate::UpstreamProvider).
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    /// Transport failure, timeout, or undecodable response body.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The provider answered with a non-success status.
    #[error("Provider returned status {status}: {body}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Response body, for diagnostics.
        body: String,
    },

    /// The completion contained no message.
    #[error("Provider returned no message content")]
    EmptyResponse,
}

impl ProviderError {
    /// Creates a new `Status` error.
    #[must_use]
    pub fn status(status: u16, body: impl Into<String>) -> Self {
        Self::Status {
            status,
            body: body.into(),
        }
    }
}

/// Errors raised while obtaining an access token.
///
/// Never retried internally; the caller decides whether to retry.
#[derive(Debug, thiserror::Error)]
pub enum CredentialError {
    /// No authorization key is configured for the provider.
    #[error("GigaChat authorization key is not configured")]
    NotConfigured,

    /// The credential exchange call failed.
    #[error("Credential exchange failed: {0}")]
    Exchange(#[source] ProviderError),

    /// The exchange succeeded but returned an empty token.
    #[error("Access token is empty in response")]
    EmptyToken,
}
