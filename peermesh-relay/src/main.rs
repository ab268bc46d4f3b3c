use anyhow::{Context, Result};
use clap::Parser;
use peermesh_relay::{RelayConfig, RelayService, router};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let config = RelayConfig::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let service = RelayService::new();
    let app = router(service);

    let listener = tokio::net::TcpListener::bind(config.bind)
        .await
        .with_context(|| format!("Failed to bind {}", config.bind))?;
    info!("Relay listening on ws://{}/ws", config.bind);

    axum::serve(listener, app).await.context("Relay server failed")?;
    Ok(())
}
