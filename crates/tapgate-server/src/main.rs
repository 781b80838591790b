use std::net::SocketAddr;

use tapgate_server::{ServerConfig, api};
use tracing::info;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("tapgate=info,tapgate_server=info")),
        )
        .with(fmt::layer())
        .init();

    let config = ServerConfig::from_env()?;

    let app = api::router();

    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    info!(%addr, "starting tapgate server");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to install ctrl-c handler");
        return;
    }
    info!("shutdown signal received");
}
