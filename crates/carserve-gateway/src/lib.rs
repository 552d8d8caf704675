//! Range-aware retrieval gateway for sealed CAR archives.
//!
//! This crate resolves a content identifier to a region of bytes
//! inside a locally stored, immutable CAR archive and serves that
//! region over HTTP with partial-content semantics.
//!
//! # Architecture
//!
//! The gateway uses a library-first design with the following components:
//! - `server`: Server orchestration and shared state
//! - `config`: Configuration loading and validation
//! - `store`: Sealed archive mapping store (trait + JSON backend)
//! - `range`: Pure range expression resolution
//! - `stream`: Span-bounded response streaming
//! - `http`: HTTP server and the retrieval handlers
//!
//! # Example
//!
//! ```no_run
//! use carserve_gateway::{Server, ServerConfig};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     // Initialize logging
//!     tracing_subscriber::fmt::init();
//!
//!     // Load configuration from CLI args and environment
//!     let config = ServerConfig::from_args();
//!     config.validate()?;
//!
//!     // Create and run server
//!     let server = Server::new(config)?;
//!     server.run().await?;
//!
//!     Ok(())
//! }
//! ```
//!
//! # Request model
//!
//! - `GET /piece/{cid}` serves the whole sealed archive mapped to a
//!   root identifier as an opaque blob.
//! - `GET /block/{cid}` decodes the archive's framing and serves one
//!   addressed block's payload (`?first=true` serves the first
//!   decoded block without identifier matching).
//!
//! Both honor single-range `Range` headers with exact
//! `Content-Length`/`Content-Range` accounting. Archives are
//! immutable inputs, so repeated requests are byte-identical.

#![warn(missing_docs)]
#![cfg_attr(
    test,
    allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)
)]

// Module declarations
pub mod config;
pub mod error;
pub mod http;
pub mod range;
pub mod server;
pub mod store;
pub mod stream;

// Re-exports for public API
pub use config::ServerConfig;
pub use error::{ConfigError, ServerError, StoreError};
pub use range::{ByteSpan, RangeError, ResolvedRange};
pub use server::{AppState, Server};
pub use store::{JsonMappingStore, MappingStore, SealedArchiveRecord};
