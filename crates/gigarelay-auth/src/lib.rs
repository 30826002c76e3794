//! # gigarelay-auth
//!
//! Gate in front of the relay endpoints. Every request must present either
//! the configured Bearer token or the configured Basic username/password.
//!
//! ## Modules
//!
//! - [`config`] - Accepted credentials
//! - [`gate`] - Header parsing and verification ([`AuthGate`])
//! - [`error`] - Rejection reasons with their `WWW-Authenticate` challenge
//! - [`middleware`] - Axum middleware and error responses

pub mod config;
pub mod error;
pub mod gate;
pub mod middleware;

pub use config::AuthConfig;
pub use error::AuthError;
pub use gate::{AuthGate, AuthScheme};
pub use middleware::require_auth;
