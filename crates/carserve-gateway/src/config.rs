//! Gateway configuration management.
//!
//! This module handles loading and validating configuration from CLI
//! arguments and environment variables.
//!
//! # Configuration Sources
//!
//! Configuration can be provided via:
//! - CLI arguments (`--http-bind`, `--mappings`)
//! - Environment variables (`CARSERVE_HTTP_BIND`, `CARSERVE_MAPPINGS`)
//!
//! The mappings database location has no default: starting the
//! process without it is a fatal condition, not a per-request error.
//!
//! # Example
//!
//! ```no_run
//! use carserve_gateway::ServerConfig;
//!
//! let config = ServerConfig::from_args();
//! config.validate().expect("Invalid configuration");
//!
//! println!("HTTP server will bind to: {}", config.http_bind);
//! ```

use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;

/// Server configuration loaded from CLI args and environment variables.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "carserve-gateway",
    about = "Range-aware retrieval gateway for sealed CAR archives",
    version
)]
pub struct ServerConfig {
    /// HTTP bind address
    #[arg(long, env = "CARSERVE_HTTP_BIND", default_value = "0.0.0.0:8080")]
    pub http_bind: SocketAddr,

    /// Path to the sealed archive mappings JSON database (required)
    #[arg(long, env = "CARSERVE_MAPPINGS")]
    pub mappings: PathBuf,
}

impl ServerConfig {
    /// Parse configuration from command-line arguments.
    #[must_use]
    pub fn from_args() -> Self {
        Self::parse()
    }

    /// Validate configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the mappings file doesn't exist.
    pub fn validate(&self) -> Result<(), crate::error::ConfigError> {
        use crate::error::ConfigError;

        if !self.mappings.exists() {
            return Err(ConfigError::MissingRequired(format!(
                "mappings file not found: {}",
                self.mappings.display()
            )));
        }

        Ok(())
    }
}
