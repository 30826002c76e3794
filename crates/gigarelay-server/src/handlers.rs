use axum::{
    Json,
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use gigarelay_cache::CacheError;
use gigarelay_gigachat::{ChatModel, CredentialError, UnknownModel};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::relay::RelayError;
use crate::server::AppState;

#[derive(Serialize)]
pub struct HealthResponse<'a> {
    status: &'a str,
}

#[derive(Serialize)]
pub struct ReadyResponse<'a> {
    status: &'a str,
    cache: &'a str,
}

pub async fn root() -> impl IntoResponse {
    let body = json!({
        "status": "ok",
        "message": "Home endpoint stub",
    });
    (StatusCode::OK, Json(body))
}

pub async fn healthz() -> impl IntoResponse {
    (StatusCode::OK, Json(HealthResponse { status: "ok" }))
}

/// Readiness never fails on the store: the relay works without it.
pub async fn readyz(State(state): State<AppState>) -> impl IntoResponse {
    let cache = if state.cache.is_available().await {
        "available"
    } else {
        "unavailable"
    };
    (
        StatusCode::OK,
        Json(ReadyResponse {
            status: "ready",
            cache,
        }),
    )
}

// ---- Chat ----

/// Options shared by both chat routes.
#[derive(Debug, Default, Deserialize)]
pub struct ChatOptions {
    pub model: Option<String>,
    #[serde(default)]
    pub no_cache: bool,
}

impl ChatOptions {
    fn model(&self) -> Result<ChatModel, ApiError> {
        match self.model.as_deref() {
            None => Ok(ChatModel::default()),
            Some(name) => Ok(name.parse()?),
        }
    }
}

/// Query of `GET /gigachat/chat`. Not flattened over [`ChatOptions`]:
/// urlencoded values lose their types through `#[serde(flatten)]`.
#[derive(Debug, Deserialize)]
pub struct ChatQuery {
    pub payload: Option<String>,
    pub model: Option<String>,
    #[serde(default)]
    pub no_cache: bool,
}

impl ChatQuery {
    fn into_parts(self) -> (Option<String>, ChatOptions) {
        let options = ChatOptions {
            model: self.model,
            no_cache: self.no_cache,
        };
        (self.payload, options)
    }
}

/// `GET /gigachat/chat?payload=...`
pub async fn chat_get(
    State(state): State<AppState>,
    Query(query): Query<ChatQuery>,
) -> Result<Json<String>, ApiError> {
    let (payload, options) = query.into_parts();
    let payload = payload
        .filter(|p| !p.is_empty())
        .ok_or(ApiError::MissingPayload)?;
    let model = options.model()?;

    let reply = state.relay.chat(&payload, model, options.no_cache).await?;
    Ok(Json(reply))
}

/// `POST /gigachat/chat` with the message as a plain-text body.
pub async fn chat_post(
    State(state): State<AppState>,
    Query(options): Query<ChatOptions>,
    body: String,
) -> Result<Json<String>, ApiError> {
    if body.is_empty() {
        return Err(ApiError::MissingBody);
    }
    let model = options.model()?;

    let reply = state.relay.chat(&body, model, options.no_cache).await?;
    Ok(Json(reply))
}

// ---- Errors ----

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("The 'payload' query parameter is required")]
    MissingPayload,

    #[error("The body is required")]
    MissingBody,

    #[error(transparent)]
    UnknownModel(#[from] UnknownModel),

    #[error(transparent)]
    Relay(#[from] RelayError),
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::MissingPayload | Self::MissingBody | Self::UnknownModel(_) => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            Self::Relay(RelayError::Credential(CredentialError::NotConfigured)) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            Self::Relay(RelayError::Credential(_) | RelayError::Provider(_)) => {
                StatusCode::BAD_GATEWAY
            }
            Self::Relay(RelayError::CacheKey(CacheError::Serialization(_))) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, status = status.as_u16(), "Chat request failed");
        }
        (status, Json(json!({ "detail": self.to_string() }))).into_response()
    }
}
