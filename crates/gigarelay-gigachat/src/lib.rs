//! # gigarelay-gigachat
//!
//! Upstream side of the relay:
//!
//! - [`UpstreamProvider`] - credential exchange and message sending, with the
//!   HTTP implementation [`GigaChatClient`]
//! - [`CredentialManager`] - keeps a valid access token in the shared store
//!   and refreshes it when it is missing or expired
//! - [`Clock`] - epoch-millisecond time source used for expiry checks

pub mod client;
pub mod clock;
pub mod config;
pub mod credentials;
pub mod error;
pub mod model;

pub use client::{GigaChatClient, UpstreamProvider};
pub use clock::{Clock, SystemClock};
pub use config::GigaChatConfig;
pub use credentials::{CredentialManager, EXPIRES_AT_KEY, TOKEN_KEY};
pub use error::{CredentialError, ProviderError};
pub use model::{ChatModel, IssuedCredential, UnknownModel};
