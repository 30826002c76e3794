//! Authentication error types.
//!
//! Every rejection except [`AuthError::Configuration`] is a client fault and
//! carries the scheme list to advertise in `WWW-Authenticate`.

/// Reasons a request is refused by the [`AuthGate`](crate::AuthGate).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    /// No Bearer secret is configured; the server refuses to run open.
    #[error("API key is not configured")]
    Configuration,

    /// The `Authorization` header is missing.
    #[error("Authorization header is required")]
    Unauthenticated,

    /// The header is not `<scheme> <credentials>`.
    #[error("Invalid authorization header format")]
    MalformedHeader,

    /// The Bearer token does not match.
    #[error("Invalid API token")]
    InvalidToken,

    /// The Basic credentials are not base64 `user:password`.
    #[error("Invalid basic authorization credentials")]
    MalformedCredentials,

    /// The Basic username or password does not match.
    #[error("Invalid username or password")]
    InvalidCredentials,

    /// The scheme is neither Bearer nor Basic.
    #[error("Unsupported authorization scheme")]
    UnsupportedScheme {
        /// The scheme token as sent by the client.
        scheme: String,
    },
}

impl AuthError {
    /// Value of the `WWW-Authenticate` header for this rejection.
    ///
    /// `None` for [`AuthError::Configuration`], which is a server fault.
    #[must_use]
    pub fn challenge(&self) -> Option<&'static str> {
        match self {
            Self::Configuration => None,
            Self::Unauthenticated | Self::InvalidToken => Some("Bearer"),
            Self::MalformedCredentials | Self::InvalidCredentials => Some("Basic"),
            Self::MalformedHeader | Self::UnsupportedScheme { .. } => Some("Bearer, Basic"),
        }
    }

    /// Whether this error is caused by server misconfiguration.
    #[must_use]
    pub fn is_server_error(&self) -> bool {
        matches!(self, Self::Configuration)
    }
}
