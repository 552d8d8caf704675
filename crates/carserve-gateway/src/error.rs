//! Error types for the carserve gateway.
//!
//! All errors use thiserror for consistent error handling across the codebase.

use std::path::PathBuf;
use thiserror::Error;

/// Mapping-store errors.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Failed to load mappings from the JSON file
    #[error("Failed to load mappings from {path}: {source}")]
    LoadFailed {
        /// Path to the mappings file
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// Invalid JSON format in the mappings file
    #[error("Invalid JSON in mappings file: {0}")]
    InvalidJson(#[from] serde_json::Error),

    /// Empty store (no sealed archives loaded)
    #[error("Mapping store is empty: no sealed archives loaded")]
    EmptyStore,

    /// Invalid field value in a sealed archive record
    #[error("Invalid {field} in record {record_id}: {reason}")]
    InvalidField {
        /// Field name that failed validation
        field: String,
        /// Record ID where validation failed
        record_id: i64,
        /// Reason for validation failure
        reason: String,
    },

    /// The store backend failed to answer a lookup
    #[error("Mapping store lookup failed: {0}")]
    Unavailable(String),
}

/// Configuration-related errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Missing required configuration value
    #[error("Missing required configuration: {0}")]
    MissingRequired(String),
}

/// Server runtime errors.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Failed to bind HTTP server
    #[error("Failed to bind HTTP server to {addr}: {source}")]
    HttpBindFailed {
        /// Address that failed to bind
        addr: std::net::SocketAddr,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// Mapping store error
    #[error("Mapping store error: {0}")]
    Store(#[from] StoreError),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Server shutdown error
    #[error("Server shutdown error: {0}")]
    Shutdown(String),
}
