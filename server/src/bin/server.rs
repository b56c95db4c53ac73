use tracing::info;
use tracing_subscriber::EnvFilter;

use gpu_analyst_server::{build_state, serve, AppConfig};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Logging / tracing
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();

    // Defaults + .env + env + optional TOML overlay
    let config = AppConfig::load();
    info!(
        target: "api",
        provider = ?config.llm.provider,
        model = %config.llm.model,
        base_url = %config.llm.base_url,
        "Starting GPU analyst"
    );

    let state = build_state(&config)?;
    serve(&config, state).await?;
    Ok(())
}
