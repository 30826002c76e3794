//! Chat relay: cache lookup, token acquisition and the upstream call.

use std::sync::Arc;
use std::time::Duration;

use gigarelay_cache::{CacheError, CacheLayer, ServiceId, compute_cache_key};
use gigarelay_gigachat::{
    ChatModel, CredentialError, CredentialManager, ProviderError, UpstreamProvider,
};
use serde::Serialize;

/// Cache identity of [`RelayService::chat`].
pub const CHAT_SERVICE: ServiceId = ServiceId::new("gigarelay.relay.chat");

#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    #[error(transparent)]
    Credential(#[from] CredentialError),

    #[error("GigaChat request failed: {0}")]
    Provider(#[from] ProviderError),

    #[error(transparent)]
    CacheKey(#[from] CacheError),
}

#[derive(Serialize)]
struct ChatCacheKey<'a> {
    service: ServiceId,
    model: ChatModel,
    payload: &'a str,
}

#[derive(Clone)]
pub struct RelayService {
    cache: CacheLayer,
    credentials: CredentialManager,
    provider: Arc<dyn UpstreamProvider>,
    response_ttl: Duration,
}

impl RelayService {
    pub fn new(
        cache: CacheLayer,
        credentials: CredentialManager,
        provider: Arc<dyn UpstreamProvider>,
        response_ttl: Duration,
    ) -> Self {
        Self {
            cache,
            credentials,
            provider,
            response_ttl,
        }
    }

    /// Send `payload` to `model` and return the reply.
    ///
    /// Replies are cached per `(operation, model, payload)` for the configured
    /// TTL. With `no_cache` the cache is neither read nor written.
    pub async fn chat(
        &self,
        payload: &str,
        model: ChatModel,
        no_cache: bool,
    ) -> Result<String, RelayError> {
        if no_cache {
            return self.send(payload, model).await;
        }

        let key = compute_cache_key(&ChatCacheKey {
            service: CHAT_SERVICE,
            model,
            payload,
        })?;

        self.cache
            .remember(key.as_str(), self.response_ttl, || self.send(payload, model))
            .await
    }

    async fn send(&self, payload: &str, model: ChatModel) -> Result<String, RelayError> {
        let access_token = self.credentials.get_or_refresh().await?;
        let reply = self
            .provider
            .send_message(&access_token, model, payload)
            .await?;
        tracing::debug!(model = %model, payload_len = payload.len(), "GigaChat replied");
        Ok(reply)
    }
}
