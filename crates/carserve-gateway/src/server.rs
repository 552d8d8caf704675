//! Server state management and orchestration.
//!
//! Manages the shared state handed to request handlers: the mapping
//! store handle, injected at construction time rather than reached
//! for through any ambient global.

use crate::config::ServerConfig;
use crate::error::ServerError;
use crate::store::{JsonMappingStore, MappingStore};
use std::sync::Arc;
use std::time::SystemTime;

/// Shared application state for the HTTP server.
#[derive(Clone)]
pub struct AppState {
    /// Mapping store (loaded once at startup)
    store: Arc<dyn MappingStore>,

    /// Server start time (for logging)
    started_at: SystemTime,
}

impl AppState {
    /// Create new application state from configuration.
    ///
    /// # Errors
    ///
    /// Returns `ServerError` if the mapping store cannot be loaded.
    pub fn new(config: &ServerConfig) -> Result<Self, ServerError> {
        tracing::info!("Loading sealed archive mappings from {:?}", config.mappings);

        let store = JsonMappingStore::from_file(&config.mappings)?;

        tracing::info!("Loaded {} sealed archive mappings", store.len());

        Ok(Self::with_store(Arc::new(store)))
    }

    /// Build state around an already-constructed mapping store.
    ///
    /// This is the dependency-injection seam: alternative store
    /// backends (and tests) plug in here.
    #[must_use]
    pub fn with_store(store: Arc<dyn MappingStore>) -> Self {
        Self {
            store,
            started_at: SystemTime::now(),
        }
    }

    /// Get a reference to the mapping store.
    #[must_use]
    pub fn store(&self) -> &Arc<dyn MappingStore> {
        &self.store
    }

    /// Get server uptime in seconds.
    #[must_use]
    pub fn uptime_seconds(&self) -> u64 {
        SystemTime::now()
            .duration_since(self.started_at)
            .unwrap_or_default()
            .as_secs()
    }
}

/// Server orchestration.
pub struct Server {
    /// Shared application state
    state: Arc<AppState>,
    /// Server configuration
    config: ServerConfig,
}

impl Server {
    /// Create new server with configuration.
    ///
    /// Loads the mapping store and prepares shared state.
    ///
    /// # Errors
    ///
    /// Returns `ServerError` if the mapping store cannot be loaded.
    pub fn new(config: ServerConfig) -> Result<Self, ServerError> {
        let state = AppState::new(&config)?;

        Ok(Self {
            state: Arc::new(state),
            config,
        })
    }

    /// Run the server until interrupted.
    ///
    /// # Errors
    ///
    /// Returns `ServerError` if server binding fails or the shutdown
    /// signal cannot be installed.
    pub async fn run(self) -> Result<(), ServerError> {
        tracing::info!("Starting carserve gateway");
        tracing::info!("HTTP server binding to: {}", self.config.http_bind);

        let http_state = self.state.clone();
        let http_bind = self.config.http_bind;

        let http_server = tokio::spawn(async move {
            if let Err(e) = crate::http::start_server(http_bind, http_state).await {
                tracing::error!("HTTP server failed: {e}");
            }
        });

        // Wait for shutdown signal
        tokio::signal::ctrl_c().await.map_err(|e| {
            ServerError::Shutdown(format!("Failed to listen for shutdown signal: {e}"))
        })?;

        tracing::info!("Shutdown signal received, stopping server");

        http_server.abort();

        Ok(())
    }

    /// Get shared application state (for testing).
    #[cfg(test)]
    #[must_use]
    pub fn state(&self) -> &Arc<AppState> {
        &self.state
    }
}
