use gigarelay_server::ServerBuilder;
use gigarelay_server::config::loader::{DEFAULT_CONFIG_PATH, load_config};
use gigarelay_server::observability;

const CONFIG_ENV: &str = "GIGARELAY_CONFIG";

#[tokio::main]
async fn main() {
    // A missing .env is normal outside local development.
    match dotenvy::dotenv() {
        Err(dotenvy::Error::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => eprintln!("Warning: ignoring .env file: {e}"),
        Ok(_) => {}
    }

    observability::init_tracing();

    let (config_path, origin) =
        config_path(std::env::args().skip(1), std::env::var(CONFIG_ENV).ok());

    let cfg = load_config(Some(&config_path)).unwrap_or_else(|e| {
        eprintln!("Configuration error ({config_path}): {e}");
        std::process::exit(2);
    });
    observability::apply_logging_level(&cfg.logging.level);
    tracing::info!(path = %config_path, origin, addr = %cfg.addr(), "Configuration loaded");

    let server = ServerBuilder::new()
        .with_config(cfg)
        .build()
        .await
        .unwrap_or_else(|e| {
            eprintln!("Startup failed: {e}");
            std::process::exit(2);
        });

    if let Err(e) = server.run().await {
        tracing::error!(error = %e, "Server stopped with an error");
        std::process::exit(1);
    }
}

/// Pick the config file: `--config <path>` or `--config=<path>`, then
/// `GIGARELAY_CONFIG`, then `gigarelay.toml`. Also returns where it came from.
fn config_path(
    mut args: impl Iterator<Item = String>,
    from_env: Option<String>,
) -> (String, &'static str) {
    while let Some(arg) = args.next() {
        if let Some(path) = arg.strip_prefix("--config=") {
            return (path.to_string(), "--config");
        }
        if arg == "--config" {
            if let Some(path) = args.next() {
                return (path, "--config");
            }
        }
    }
    match from_env.filter(|p| !p.is_empty()) {
        Some(path) => (path, CONFIG_ENV),
        None => (DEFAULT_CONFIG_PATH.to_string(), "default"),
    }
}
