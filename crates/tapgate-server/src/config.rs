//! Server configuration from the environment.

use serde::Deserialize;

/// Listener and scan settings, read from `TAPGATE_*` environment variables.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Interface to bind (default `127.0.0.1`).
    pub host: String,

    /// Port to bind (default `3000`).
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3000,
        }
    }
}

impl ServerConfig {
    /// Load configuration, reading a `.env` file first when present.
    pub fn from_env() -> anyhow::Result<Self> {
        let _ = dotenvy::dotenv();

        let defaults = Self::default();
        let host = std::env::var("TAPGATE_HOST").unwrap_or(defaults.host);
        let port = match std::env::var("TAPGATE_PORT") {
            Ok(raw) => raw
                .parse()
                .map_err(|_| anyhow::anyhow!("TAPGATE_PORT is not a valid port: {raw}"))?,
            Err(_) => defaults.port,
        };

        Ok(Self { host, port })
    }
}
