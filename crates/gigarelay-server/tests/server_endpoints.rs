use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use gigarelay_cache::MemoryStore;
use gigarelay_gigachat::{ChatModel, IssuedCredential, ProviderError, UpstreamProvider};
use gigarelay_server::{AppConfig, AppState, build_app};
use serde_json::Value;
use tokio::task::JoinHandle;

const API_KEY: &str = "test-key";

/// Answers every message with a numbered echo.
#[derive(Default)]
struct CountingProvider {
    exchanges: AtomicUsize,
    messages: AtomicUsize,
}

#[async_trait]
impl UpstreamProvider for CountingProvider {
    async fn exchange_credential(&self, secret: &str) -> Result<IssuedCredential, ProviderError> {
        assert_eq!(secret, "gigachat-secret");
        self.exchanges.fetch_add(1, Ordering::SeqCst);
        Ok(IssuedCredential {
            access_token: "upstream-token".into(),
            expires_at: i64::MAX,
        })
    }

    async fn send_message(
        &self,
        access_token: &str,
        model: ChatModel,
        payload: &str,
    ) -> Result<String, ProviderError> {
        assert_eq!(access_token, "upstream-token");
        let n = self.messages.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(format!("{model} #{n}: {payload}"))
    }
}

fn test_config() -> AppConfig {
    let mut cfg = AppConfig::default();
    cfg.auth.api_key = Some(API_KEY.into());
    cfg.auth.basic_user = Some("admin".into());
    cfg.auth.basic_password = Some("hunter2".into());
    cfg.gigachat.auth_key = Some("gigachat-secret".into());
    cfg
}

struct TestServer {
    base: String,
    provider: Arc<CountingProvider>,
    shutdown: tokio::sync::oneshot::Sender<()>,
    handle: JoinHandle<()>,
}

impl TestServer {
    async fn stop(self) {
        let _ = self.shutdown.send(());
        let _ = self.handle.await;
    }
}

async fn start_server() -> TestServer {
    let cfg = test_config();
    let provider = Arc::new(CountingProvider::default());
    let state = AppState::new(&cfg, Arc::new(MemoryStore::new()), provider.clone());
    let app = build_app(&cfg, state);

    // Bind to an ephemeral port
    let listener = tokio::net::TcpListener::bind((std::net::Ipv4Addr::LOCALHOST, 0))
        .await
        .expect("bind");
    let addr = listener.local_addr().unwrap();
    let (tx, rx) = tokio::sync::oneshot::channel::<()>();

    let handle = tokio::spawn(async move {
        let _ = axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = rx.await;
            })
            .await;
    });

    TestServer {
        base: format!("http://{addr}"),
        provider,
        shutdown: tx,
        handle,
    }
}

#[tokio::test]
async fn public_endpoints_work() {
    let server = start_server().await;
    let client = reqwest::Client::new();

    let resp = client.get(format!("{}/", server.base)).send().await.unwrap();
    assert!(resp.status().is_success());
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["status"], "ok");
    assert_eq!(body["message"], "Home endpoint stub");

    let resp = client
        .get(format!("{}/healthz", server.base))
        .send()
        .await
        .unwrap();
    assert!(resp.status().is_success());
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["status"], "ok");

    let resp = client
        .get(format!("{}/readyz", server.base))
        .send()
        .await
        .unwrap();
    assert!(resp.status().is_success());
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["status"], "ready");
    assert_eq!(body["cache"], "available");

    server.stop().await;
}

#[tokio::test]
async fn chat_requires_authorization() {
    let server = start_server().await;
    let client = reqwest::Client::new();
    let url = format!("{}/gigachat/chat", server.base);

    // No header
    let resp = client
        .get(&url)
        .query(&[("payload", "hi")])
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 401);
    assert_eq!(resp.headers()["www-authenticate"], "Bearer");
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["detail"], "Authorization header is required");

    // Wrong bearer token
    let resp = client
        .get(&url)
        .query(&[("payload", "hi")])
        .bearer_auth("wrong")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 401);
    assert_eq!(resp.headers()["www-authenticate"], "Bearer");

    // Wrong basic password
    let resp = client
        .get(&url)
        .query(&[("payload", "hi")])
        .basic_auth("admin", Some("nope"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 401);
    assert_eq!(resp.headers()["www-authenticate"], "Basic");

    // Nothing reached the provider
    assert_eq!(server.provider.messages.load(Ordering::SeqCst), 0);
    assert_eq!(server.provider.exchanges.load(Ordering::SeqCst), 0);

    server.stop().await;
}

#[tokio::test]
async fn chat_get_caches_replies() {
    let server = start_server().await;
    let client = reqwest::Client::new();
    let url = format!("{}/gigachat/chat", server.base);

    let first: String = client
        .get(&url)
        .query(&[("payload", "Привет")])
        .bearer_auth(API_KEY)
        .send()
        .await
        .unwrap()
        .error_for_status()
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(first, "GigaChat #1: Привет");

    // Same payload and model: served from cache
    let second: String = client
        .get(&url)
        .query(&[("payload", "Привет")])
        .basic_auth("admin", Some("hunter2"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(second, first);
    assert_eq!(server.provider.messages.load(Ordering::SeqCst), 1);

    // A different model is a different cache entry
    let pro: String = client
        .get(&url)
        .query(&[("payload", "Привет"), ("model", "GigaChat-Pro")])
        .bearer_auth(API_KEY)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(pro, "GigaChat-Pro #2: Привет");

    // no_cache forces an upstream call
    let fresh: String = client
        .get(&url)
        .query(&[("payload", "Привет"), ("no_cache", "true")])
        .bearer_auth(API_KEY)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(fresh, "GigaChat #3: Привет");
    assert_eq!(server.provider.messages.load(Ordering::SeqCst), 3);

    // The access token was exchanged once and reused
    assert_eq!(server.provider.exchanges.load(Ordering::SeqCst), 1);

    server.stop().await;
}

#[tokio::test]
async fn chat_post_uses_body_and_shares_cache() {
    let server = start_server().await;
    let client = reqwest::Client::new();
    let url = format!("{}/gigachat/chat", server.base);

    let posted: String = client
        .post(&url)
        .bearer_auth(API_KEY)
        .header("content-type", "text/plain")
        .body("hello there")
        .send()
        .await
        .unwrap()
        .error_for_status()
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(posted, "GigaChat #1: hello there");

    let fetched: String = client
        .get(&url)
        .query(&[("payload", "hello there")])
        .bearer_auth(API_KEY)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(fetched, posted);
    assert_eq!(server.provider.messages.load(Ordering::SeqCst), 1);

    server.stop().await;
}

#[tokio::test]
async fn chat_rejects_invalid_input() {
    let server = start_server().await;
    let client = reqwest::Client::new();
    let url = format!("{}/gigachat/chat", server.base);

    // Missing payload
    let resp = client.get(&url).bearer_auth(API_KEY).send().await.unwrap();
    assert_eq!(resp.status(), 422);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["detail"], "The 'payload' query parameter is required");

    // Empty body
    let resp = client
        .post(&url)
        .bearer_auth(API_KEY)
        .header("content-type", "text/plain")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 422);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["detail"], "The body is required");

    // Unknown model
    let resp = client
        .get(&url)
        .query(&[("payload", "hi"), ("model", "GPT-4")])
        .bearer_auth(API_KEY)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 422);
    let body: Value = resp.json().await.unwrap();
    assert!(body["detail"].as_str().unwrap().contains("GPT-4"));

    assert_eq!(server.provider.messages.load(Ordering::SeqCst), 0);

    server.stop().await;
}
