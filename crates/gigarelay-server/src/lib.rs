pub mod config;
pub mod handlers;
pub mod observability;
pub mod relay;
pub mod server;

pub use config::{AppConfig, CacheConfig, ConfigError, LoggingConfig, ServerConfig};
pub use handlers::ApiError;
pub use observability::init_tracing;
pub use relay::{CHAT_SERVICE, RelayError, RelayService};
pub use server::{AppState, GigaRelayServer, ServerBuilder, build_app, build_state};
