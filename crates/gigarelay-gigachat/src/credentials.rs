//! Access-token lifecycle.
//!
//! The token and its expiry live in the shared store as two plain keys,
//! [`TOKEN_KEY`] and [`EXPIRES_AT_KEY`], written without TTL. The two writes
//! are not atomic; a mismatched pair only causes one extra refresh.
//!
//! Concurrent callers that all find the token expired each refresh it; the
//! last write wins and every returned token is valid on its own.

use std::sync::Arc;

use gigarelay_cache::CacheLayer;

use crate::client::UpstreamProvider;
use crate::clock::{Clock, SystemClock};
use crate::error::CredentialError;

/// Store key holding the current access token.
pub const TOKEN_KEY: &str = "gigachat:access_token";

/// Store key holding the token expiry (epoch milliseconds, decimal string).
pub const EXPIRES_AT_KEY: &str = "gigachat:expires_at";

/// Provides a currently valid provider access token.
#[derive(Clone)]
pub struct CredentialManager {
    cache: CacheLayer,
    provider: Arc<dyn UpstreamProvider>,
    secret: Option<String>,
    clock: Arc<dyn Clock>,
}

impl CredentialManager {
    pub fn new(
        cache: CacheLayer,
        provider: Arc<dyn UpstreamProvider>,
        secret: Option<String>,
    ) -> Self {
        Self {
            cache,
            provider,
            secret,
            clock: Arc::new(SystemClock),
        }
    }

    /// Replace the time source used for expiry checks.
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Return the stored token if it is still valid, otherwise exchange the
    /// configured secret for a new one and store it.
    ///
    /// A token is reused only while `now < expires_at`.
    pub async fn get_or_refresh(&self) -> Result<String, CredentialError> {
        if let Some(token) = self.stored_token().await {
            return Ok(token);
        }

        self.refresh().await.inspect_err(|e| {
            tracing::error!(error = %e, "Failed to obtain GigaChat access token");
        })
    }

    async fn stored_token(&self) -> Option<String> {
        let token = self.cache.get(TOKEN_KEY).await.filter(|t| !t.is_empty())?;
        let expires_at = self.cache.get(EXPIRES_AT_KEY).await?;

        let Ok(expires_at) = expires_at.trim().parse::<i64>() else {
            tracing::warn!(value = %expires_at, "Stored token expiry is not a timestamp, refreshing");
            return None;
        };

        if self.clock.now_millis() < expires_at {
            Some(token)
        } else {
            tracing::debug!(expires_at, "Stored access token expired");
            None
        }
    }

    async fn refresh(&self) -> Result<String, CredentialError> {
        let secret = self
            .secret
            .as_deref()
            .filter(|s| !s.is_empty())
            .ok_or(CredentialError::NotConfigured)?;

        let issued = self
            .provider
            .exchange_credential(secret)
            .await
            .map_err(CredentialError::Exchange)?;

        if issued.access_token.is_empty() {
            return Err(CredentialError::EmptyToken);
        }

        self.cache.set(TOKEN_KEY, &issued.access_token, None).await;
        self.cache
            .set(EXPIRES_AT_KEY, &issued.expires_at.to_string(), None)
            .await;

        tracing::info!(expires_at = issued.expires_at, "GigaChat access token refreshed");
        Ok(issued.access_token)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use gigarelay_cache::MemoryStore;

    use super::*;
    use crate::clock::MockClock;
    use crate::error::ProviderError;
    use crate::model::{ChatModel, IssuedCredential};

    const NOW: i64 = 1_700_000_000_000;

    /// Issues `token-1`, `token-2`, ... valid for `lifetime_ms`.
    struct FakeProvider {
        exchanges: AtomicUsize,
        lifetime_ms: i64,
        clock: MockClock,
        response: Response,
    }

    enum Response {
        Token,
        EmptyToken,
        Failure,
    }

    impl FakeProvider {
        fn new(clock: MockClock, response: Response) -> Self {
            Self {
                exchanges: AtomicUsize::new(0),
                lifetime_ms: 30 * 60 * 1000,
                clock,
                response,
            }
        }

        fn exchanges(&self) -> usize {
            self.exchanges.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl UpstreamProvider for FakeProvider {
        async fn exchange_credential(&self, secret: &str) -> Result<IssuedCredential, ProviderError> {
            assert_eq!(secret, "auth-key");
            let n = self.exchanges.fetch_add(1, Ordering::SeqCst) + 1;
            match self.response {
                Response::Token => Ok(IssuedCredential {
                    access_token: format!("token-{n}"),
                    expires_at: self.clock.now_millis() + self.lifetime_ms,
                }),
                Response::EmptyToken => Ok(IssuedCredential {
                    access_token: String::new(),
                    expires_at: self.clock.now_millis() + self.lifetime_ms,
                }),
                Response::Failure => Err(ProviderError::status(401, "bad credentials")),
            }
        }

        async fn send_message(
            &self,
            _access_token: &str,
            _model: ChatModel,
            _payload: &str,
        ) -> Result<String, ProviderError> {
            unreachable!("not used by the credential manager")
        }
    }

    struct Fixture {
        cache: CacheLayer,
        clock: MockClock,
        provider: Arc<FakeProvider>,
        manager: CredentialManager,
    }

    fn fixture_with(response: Response, secret: Option<&str>) -> Fixture {
        let cache = CacheLayer::new(Arc::new(MemoryStore::new()));
        let clock = MockClock::at(NOW);
        let provider = Arc::new(FakeProvider::new(clock.clone(), response));
        let manager = CredentialManager::new(
            cache.clone(),
            provider.clone(),
            secret.map(str::to_string),
        )
        .with_clock(Arc::new(clock.clone()));
        Fixture {
            cache,
            clock,
            provider,
            manager,
        }
    }

    fn fixture() -> Fixture {
        fixture_with(Response::Token, Some("auth-key"))
    }

    #[tokio::test]
    async fn test_refreshes_when_store_is_empty() {
        let f = fixture();

        let token = f.manager.get_or_refresh().await.unwrap();

        assert_eq!(token, "token-1");
        assert_eq!(f.provider.exchanges(), 1);
        assert_eq!(f.cache.get(TOKEN_KEY).await.as_deref(), Some("token-1"));
        assert_eq!(
            f.cache.get(EXPIRES_AT_KEY).await,
            Some((NOW + f.provider.lifetime_ms).to_string())
        );
    }

    #[tokio::test]
    async fn test_reuses_valid_token() {
        let f = fixture();
        f.cache.set(TOKEN_KEY, "cached", None).await;
        f.cache.set(EXPIRES_AT_KEY, &(NOW + 1).to_string(), None).await;

        assert_eq!(f.manager.get_or_refresh().await.unwrap(), "cached");
        assert_eq!(f.manager.get_or_refresh().await.unwrap(), "cached");
        assert_eq!(f.provider.exchanges(), 0);
    }

    #[tokio::test]
    async fn test_expiry_equal_to_now_is_expired() {
        let f = fixture();
        f.cache.set(TOKEN_KEY, "cached", None).await;
        f.cache.set(EXPIRES_AT_KEY, &NOW.to_string(), None).await;

        assert_eq!(f.manager.get_or_refresh().await.unwrap(), "token-1");
        assert_eq!(f.provider.exchanges(), 1);
    }

    #[tokio::test]
    async fn test_refreshes_after_expiry() {
        let f = fixture();

        assert_eq!(f.manager.get_or_refresh().await.unwrap(), "token-1");
        f.clock.advance(f.provider.lifetime_ms - 1);
        assert_eq!(f.manager.get_or_refresh().await.unwrap(), "token-1");

        f.clock.advance(1);
        assert_eq!(f.manager.get_or_refresh().await.unwrap(), "token-2");
        assert_eq!(f.provider.exchanges(), 2);
    }

    #[tokio::test]
    async fn test_refreshes_when_expiry_missing() {
        let f = fixture();
        f.cache.set(TOKEN_KEY, "orphan", None).await;

        assert_eq!(f.manager.get_or_refresh().await.unwrap(), "token-1");
        assert_eq!(f.provider.exchanges(), 1);
    }

    #[tokio::test]
    async fn test_refreshes_when_token_missing() {
        let f = fixture();
        f.cache.set(EXPIRES_AT_KEY, &(NOW + 60_000).to_string(), None).await;

        assert_eq!(f.manager.get_or_refresh().await.unwrap(), "token-1");
        assert_eq!(f.provider.exchanges(), 1);
    }

    #[tokio::test]
    async fn test_refreshes_when_expiry_unparseable() {
        let f = fixture();
        f.cache.set(TOKEN_KEY, "cached", None).await;
        f.cache.set(EXPIRES_AT_KEY, "soon", None).await;

        assert_eq!(f.manager.get_or_refresh().await.unwrap(), "token-1");
    }

    #[tokio::test]
    async fn test_missing_secret() {
        for secret in [None, Some("")] {
            let f = fixture_with(Response::Token, secret);
            let result = f.manager.get_or_refresh().await;

            assert!(matches!(result, Err(CredentialError::NotConfigured)));
            assert_eq!(f.provider.exchanges(), 0);
        }
    }

    #[tokio::test]
    async fn test_missing_secret_still_serves_valid_token() {
        let f = fixture_with(Response::Token, None);
        f.cache.set(TOKEN_KEY, "cached", None).await;
        f.cache.set(EXPIRES_AT_KEY, &(NOW + 1).to_string(), None).await;

        assert_eq!(f.manager.get_or_refresh().await.unwrap(), "cached");
    }

    #[tokio::test]
    async fn test_exchange_failure_propagates() {
        let f = fixture_with(Response::Failure, Some("auth-key"));

        let result = f.manager.get_or_refresh().await;
        assert!(matches!(
            result,
            Err(CredentialError::Exchange(ProviderError::Status { status: 401, .. }))
        ));
        assert_eq!(f.cache.get(TOKEN_KEY).await, None);
    }

    #[tokio::test]
    async fn test_empty_token_is_rejected() {
        let f = fixture_with(Response::EmptyToken, Some("auth-key"));

        let result = f.manager.get_or_refresh().await;
        assert!(matches!(result, Err(CredentialError::EmptyToken)));
        assert_eq!(f.cache.get(TOKEN_KEY).await, None);
    }
}
