use std::net::SocketAddr;
use std::time::Duration;

use gigarelay_auth::AuthConfig;
use gigarelay_cache::RedisConfig;
use gigarelay_gigachat::GigaChatConfig;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    /// Inbound authentication
    #[serde(default)]
    pub auth: AuthConfig,
    /// Upstream provider
    #[serde(default)]
    pub gigachat: GigaChatConfig,
    /// Shared key-value store
    #[serde(default)]
    pub redis: RedisConfig,
    /// Response cache
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Errors raised while loading or validating configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("config build error: {0}")]
    Build(#[from] config::ConfigError),

    #[error("{0}")]
    Invalid(String),
}

impl AppConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.port == 0 {
            return Err(ConfigError::Invalid("server.port must be > 0".into()));
        }
        if self.cache.response_ttl_secs == 0 {
            return Err(ConfigError::Invalid(
                "cache.response_ttl_secs must be > 0".into(),
            ));
        }
        let lvl = self.logging.level.to_ascii_lowercase();
        let valid_levels = ["trace", "debug", "info", "warn", "error", "off"];
        if !valid_levels.contains(&lvl.as_str()) {
            return Err(ConfigError::Invalid(format!(
                "logging.level must be one of {valid_levels:?}"
            )));
        }

        let mut missing = Vec::new();
        if self.gigachat.auth_key().is_none() {
            missing.push("gigachat.auth_key (GIGACHAT_AUTH_KEY): GigaChat authentication key");
        }
        if self.auth.api_key().is_none() {
            missing.push("auth.api_key (APP_API_KEY): API key for endpoint authorization");
        }
        if !missing.is_empty() {
            let list = missing
                .iter()
                .map(|m| format!("  - {m}"))
                .collect::<Vec<_>>()
                .join("\n");
            return Err(ConfigError::Invalid(format!(
                "Missing required settings:\n{list}"
            )));
        }
        Ok(())
    }

    pub fn addr(&self) -> SocketAddr {
        use std::net::{IpAddr, Ipv4Addr};
        let host: IpAddr = self
            .server
            .host
            .parse()
            .unwrap_or(IpAddr::V4(Ipv4Addr::new(0, 0, 0, 0)));
        SocketAddr::from((host, self.server.port))
    }

    pub fn response_ttl(&self) -> Duration {
        Duration::from_secs(self.cache.response_ttl_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_body_limit")]
    pub body_limit_bytes: usize,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8000
}

fn default_body_limit() -> usize {
    1024 * 1024
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            body_limit_bytes: default_body_limit(),
        }
    }
}

/// Response cache configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Lifetime of a cached chat response in seconds
    #[serde(default = "default_response_ttl_secs")]
    pub response_ttl_secs: u64,
}

fn default_response_ttl_secs() -> u64 {
    1800 // 30 minutes
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            response_ttl_secs: default_response_ttl_secs(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

pub mod loader {
    use super::{AppConfig, ConfigError};
    use config::{Config, ConfigBuilder, Environment, File, Map, builder::DefaultState};
    use std::path::PathBuf;

    /// Default configuration file, relative to the working directory.
    pub const DEFAULT_CONFIG_PATH: &str = "gigarelay.toml";

    /// Flat variables of older deployments and the settings they map to.
    const LEGACY_ENV: &[(&str, &str)] = &[
        ("APP_API_KEY", "auth.api_key"),
        ("APP_BASIC_USER", "auth.basic_user"),
        ("APP_BASIC_PASSWORD", "auth.basic_password"),
        ("AUTH_KEY", "gigachat.auth_key"),
        ("GIGACHAT_AUTH_KEY", "gigachat.auth_key"),
        ("REDIS_HOST", "redis.host"),
    ];

    pub fn load_config(path: Option<&str>) -> Result<AppConfig, ConfigError> {
        load_config_with_env(path, std::env::vars())
    }

    /// Load configuration against the given environment variables.
    ///
    /// Precedence (highest first): `GIGARELAY__*` variables, legacy flat
    /// variables (`APP_API_KEY`, `GIGACHAT_AUTH_KEY`, `REDIS_HOST`, ...),
    /// the TOML file, built-in defaults.
    pub fn load_config_with_env<I>(path: Option<&str>, vars: I) -> Result<AppConfig, ConfigError>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let env: Map<String, String> = vars.into_iter().collect();

        let mut builder = Config::builder();
        let pathbuf = PathBuf::from(path.unwrap_or(DEFAULT_CONFIG_PATH));
        if pathbuf.exists() {
            builder = builder.add_source(File::from(pathbuf));
        }
        builder = apply_legacy_env(builder, &env)?;
        // e.g. GIGARELAY__SERVER__PORT=9090
        builder = builder.add_source(
            Environment::with_prefix("GIGARELAY")
                .try_parsing(true)
                .separator("__")
                .source(Some(env)),
        );
        let merged: AppConfig = builder.build()?.try_deserialize()?;
        merged.validate()?;
        Ok(merged)
    }

    /// Overrides always beat regular sources, so a legacy variable is skipped
    /// when the prefixed variable for the same setting is present.
    fn apply_legacy_env(
        mut builder: ConfigBuilder<DefaultState>,
        env: &Map<String, String>,
    ) -> Result<ConfigBuilder<DefaultState>, ConfigError> {
        let mut redis_configured = false;

        for (name, key) in LEGACY_ENV {
            if let Some(value) = legacy_value(env, name, key) {
                builder = builder.set_override(*key, value)?;
                redis_configured |= key.starts_with("redis.");
            }
        }

        if let Some(port) = legacy_value(env, "REDIS_PORT", "redis.port") {
            let port: i64 = port
                .trim()
                .parse()
                .map_err(|_| ConfigError::Invalid(format!("REDIS_PORT is not a number: {port}")))?;
            builder = builder.set_override("redis.port", port)?;
            redis_configured = true;
        }

        if redis_configured && !env.contains_key("GIGARELAY__REDIS__ENABLED") {
            builder = builder.set_override("redis.enabled", true)?;
        }
        Ok(builder)
    }

    fn legacy_value(env: &Map<String, String>, name: &str, key: &str) -> Option<String> {
        let prefixed = format!("GIGARELAY__{}", key.replace('.', "__").to_ascii_uppercase());
        if env.contains_key(&prefixed) {
            return None;
        }
        env.get(name).filter(|v| !v.trim().is_empty()).cloned()
    }
}
