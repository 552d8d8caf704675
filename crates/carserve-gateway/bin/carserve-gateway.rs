//! carserve gateway binary entry point.
//!
//! This is a thin wrapper around the carserve-gateway library that:
//! 1. Parses command-line arguments
//! 2. Initializes logging
//! 3. Loads configuration
//! 4. Starts the server
//!
//! For library usage, see the carserve-gateway crate documentation.

use anyhow::Result;
use carserve_gateway::{Server, ServerConfig};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing subscriber for logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    tracing::info!("carserve gateway starting...");

    // Parse configuration from CLI args and environment
    let config = ServerConfig::from_args();

    tracing::info!(
        "Configuration loaded: HTTP={}, mappings={:?}",
        config.http_bind,
        config.mappings
    );

    // Validate configuration
    config.validate()?;

    // Create and run server
    let server = Server::new(config)?;
    server.run().await?;

    Ok(())
}
