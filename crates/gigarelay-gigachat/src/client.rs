//! Provider abstraction and the GigaChat HTTP client.
//!
//! ## Calls
//!
//! - **Credential exchange**: `POST {oauth_url}` with
//!   `Authorization: Basic <auth_key>`, a fresh `RqUID` and form body
//!   `scope=<scope>`; the response carries `access_token` and `expires_at`
//!   (epoch milliseconds).
//! - **Chat completion**: `POST {api_url}/chat/completions` with
//!   `Authorization: Bearer <access_token>` and a single user message; the
//!   answer is `choices[0].message.content`.

use async_trait::async_trait;
use reqwest::header::{ACCEPT, AUTHORIZATION};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::GigaChatConfig;
use crate::error::ProviderError;
use crate::model::{ChatModel, IssuedCredential};

/// The external conversational-AI provider.
#[async_trait]
pub trait UpstreamProvider: Send + Sync {
    /// Trade the long-lived authorization secret for a short-lived access token.
    async fn exchange_credential(&self, secret: &str) -> Result<IssuedCredential, ProviderError>;

    /// Send one user message and return the reply text.
    async fn send_message(
        &self,
        access_token: &str,
        model: ChatModel,
        payload: &str,
    ) -> Result<String, ProviderError>;
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: ChatModel,
    messages: [ChatMessage<'a>; 1],
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatCompletion {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ReplyMessage,
}

#[derive(Deserialize)]
struct ReplyMessage {
    #[serde(default)]
    content: Option<String>,
}

/// HTTP client for the GigaChat API.
#[derive(Clone)]
pub struct GigaChatClient {
    http: reqwest::Client,
    config: GigaChatConfig,
}

impl GigaChatClient {
    /// Build a client with the configured timeout and TLS policy.
    pub fn new(config: GigaChatConfig) -> Result<Self, ProviderError> {
        if config.accept_invalid_certs {
            tracing::warn!("TLS certificate verification is disabled for GigaChat");
        }

        let http = reqwest::Client::builder()
            .timeout(config.timeout())
            .danger_accept_invalid_certs(config.accept_invalid_certs)
            .build()?;

        Ok(Self { http, config })
    }

    pub fn config(&self) -> &GigaChatConfig {
        &self.config
    }

    fn completions_url(&self) -> String {
        format!("{}/chat/completions", self.config.api_url.trim_end_matches('/'))
    }
}

#[async_trait]
impl UpstreamProvider for GigaChatClient {
    async fn exchange_credential(&self, secret: &str) -> Result<IssuedCredential, ProviderError> {
        let request_id = Uuid::new_v4().to_string();
        tracing::debug!(rq_uid = %request_id, scope = %self.config.scope, "Requesting GigaChat access token");

        let response = self
            .http
            .post(&self.config.oauth_url)
            .header(AUTHORIZATION, format!("Basic {secret}"))
            .header(ACCEPT, "application/json")
            .header("RqUID", request_id)
            .form(&[("scope", self.config.scope.as_str())])
            .send()
            .await?;

        let issued = ensure_success(response).await?.json().await?;
        Ok(issued)
    }

    async fn send_message(
        &self,
        access_token: &str,
        model: ChatModel,
        payload: &str,
    ) -> Result<String, ProviderError> {
        let body = ChatRequest {
            model,
            messages: [ChatMessage {
                role: "user",
                content: payload,
            }],
        };

        let response = self
            .http
            .post(self.completions_url())
            .bearer_auth(access_token)
            .header(ACCEPT, "application/json")
            .json(&body)
            .send()
            .await?;

        let completion: ChatCompletion = ensure_success(response).await?.json().await?;
        completion
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or(ProviderError::EmptyResponse)
    }
}

async fn ensure_success(response: reqwest::Response) -> Result<reqwest::Response, ProviderError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(ProviderError::status(status.as_u16(), body))
}
