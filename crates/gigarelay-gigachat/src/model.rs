//! Provider data types.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// GigaChat models the relay can forward to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChatModel {
    #[default]
    #[serde(rename = "GigaChat")]
    GigaChat,
    #[serde(rename = "GigaChat-Pro")]
    GigaChatPro,
    #[serde(rename = "GigaChat-Max")]
    GigaChatMax,
}

impl ChatModel {
    pub const ALL: [ChatModel; 3] = [Self::GigaChat, Self::GigaChatPro, Self::GigaChatMax];

    /// Wire name of the model.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::GigaChat => "GigaChat",
            Self::GigaChatPro => "GigaChat-Pro",
            Self::GigaChatMax => "GigaChat-Max",
        }
    }
}

impl fmt::Display for ChatModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when a model name is not one of [`ChatModel::ALL`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown model '{0}', expected one of: GigaChat, GigaChat-Pro, GigaChat-Max")]
pub struct UnknownModel(pub String);

impl FromStr for ChatModel {
    type Err = UnknownModel;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|model| model.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| UnknownModel(s.to_string()))
    }
}

/// An access token issued by the provider.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct IssuedCredential {
    /// Bearer token for the chat API. Empty if the provider omitted it.
    #[serde(default)]
    pub access_token: String,
    /// Expiry, in milliseconds since the Unix epoch.
    #[serde(default)]
    pub expires_at: i64,
}
