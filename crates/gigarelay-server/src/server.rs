use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    Router, middleware,
    routing::get,
};
use gigarelay_auth::{AuthGate, require_auth};
use gigarelay_cache::{CacheLayer, KeyValueStore, create_store};
use gigarelay_gigachat::{CredentialManager, GigaChatClient, UpstreamProvider};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{config::AppConfig, handlers, relay::RelayService};

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    pub relay: RelayService,
    pub cache: CacheLayer,
    pub auth_gate: AuthGate,
}

impl AppState {
    /// Wire the relay from an already opened store and provider.
    pub fn new(
        cfg: &AppConfig,
        store: Arc<dyn KeyValueStore>,
        provider: Arc<dyn UpstreamProvider>,
    ) -> Self {
        let cache = CacheLayer::new(store);
        let credentials = CredentialManager::new(
            cache.clone(),
            provider.clone(),
            cfg.gigachat.auth_key().map(str::to_owned),
        );
        let relay = RelayService::new(cache.clone(), credentials, provider, cfg.response_ttl());

        Self {
            relay,
            cache,
            auth_gate: AuthGate::new(cfg.auth.clone()),
        }
    }
}

/// Open the store and the GigaChat client described by `cfg`.
pub async fn build_state(cfg: &AppConfig) -> anyhow::Result<AppState> {
    let store = create_store(&cfg.redis).await;
    let client = GigaChatClient::new(cfg.gigachat.clone())?;
    Ok(AppState::new(cfg, store, Arc::new(client)))
}

pub struct GigaRelayServer {
    addr: SocketAddr,
    app: Router,
}

pub fn build_app(cfg: &AppConfig, state: AppState) -> Router {
    let body_limit = cfg.server.body_limit_bytes;

    let protected = Router::new()
        .route(
            "/gigachat/chat",
            get(handlers::chat_get).post(handlers::chat_post),
        )
        .route_layer(middleware::from_fn_with_state(
            state.auth_gate.clone(),
            require_auth,
        ));

    Router::new()
        // Health and info endpoints
        .route("/", get(handlers::root))
        .route("/healthz", get(handlers::healthz))
        .route("/readyz", get(handlers::readyz))
        .merge(protected)
        .with_state(state)
        // Middleware stack (order: cors/trace -> body limit)
        .layer(CorsLayer::permissive())
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|req: &axum::http::Request<_>| {
                    use tracing::field::Empty;
                    tracing::info_span!(
                        "http.request",
                        http.method = %req.method(),
                        http.target = %req.uri().path(),
                        http.status_code = Empty,
                    )
                })
                .on_response(
                    |res: &axum::http::Response<_>,
                     latency: std::time::Duration,
                     span: &tracing::Span| {
                        span.record(
                            "http.status_code",
                            tracing::field::display(res.status().as_u16()),
                        );
                        tracing::info!(
                            http.status = %res.status().as_u16(),
                            elapsed_ms = %latency.as_millis(),
                            "request handled"
                        );
                    },
                ),
        )
        .layer(axum::extract::DefaultBodyLimit::max(body_limit))
}

pub struct ServerBuilder {
    addr: SocketAddr,
    config: AppConfig,
}

impl Default for ServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ServerBuilder {
    pub fn new() -> Self {
        let cfg = AppConfig::default();
        Self {
            addr: cfg.addr(),
            config: cfg,
        }
    }

    pub fn with_addr(mut self, addr: SocketAddr) -> Self {
        self.addr = addr;
        self
    }

    pub fn with_config(mut self, cfg: AppConfig) -> Self {
        self.addr = cfg.addr();
        self.config = cfg;
        self
    }

    pub async fn build(self) -> anyhow::Result<GigaRelayServer> {
        let state = build_state(&self.config).await?;
        let app = build_app(&self.config, state);

        Ok(GigaRelayServer {
            addr: self.addr,
            app,
        })
    }
}

impl GigaRelayServer {
    pub async fn run(self) -> anyhow::Result<()> {
        let listener = tokio::net::TcpListener::bind(self.addr).await?;
        tracing::info!("listening on {}", self.addr);
        axum::serve(listener, self.app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;
        Ok(())
    }
}

async fn shutdown_signal() {
    // Wait for Ctrl+C
    let _ = tokio::signal::ctrl_c().await;
    tracing::info!("shutdown signal received");
}
