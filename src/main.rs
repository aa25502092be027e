use std::env;
use std::path::PathBuf;

use anyhow::anyhow;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

use voxbridge::{ServerConfig, routes, state::AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing, RUST_LOG overrides the default level
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    // Initialize crypto provider for TLS connections
    // This must be done before any TLS connections are attempted
    rustls::crypto::ring::default_provider()
        .install_default()
        .map_err(|_| anyhow!("Failed to install default crypto provider"))?;

    // Optional config file: `voxbridge -c config.yaml`
    let mut args = env::args().skip(1);
    let config_path = match (args.next().as_deref(), args.next()) {
        (None, _) => None,
        (Some("-c" | "--config"), Some(path)) => Some(PathBuf::from(path)),
        (Some("-c" | "--config"), None) => anyhow::bail!("--config requires a file path"),
        (Some(other), _) => {
            anyhow::bail!("Unknown argument '{other}'. Usage: voxbridge [--config <file>]")
        }
    };

    // Load configuration
    let config = match &config_path {
        Some(path) => ServerConfig::from_file(path),
        None => ServerConfig::from_env(),
    }
    .map_err(|e| anyhow!(e.to_string()))?;
    let address = config.address();

    // Create application state
    let app_state = AppState::new(config)?;
    let app = routes::create_router(app_state);

    // Create listener
    let listener = TcpListener::bind(&address).await?;
    info!("Server listening on {address}");

    // Start server
    axum::serve(listener, app).await?;

    Ok(())
}
