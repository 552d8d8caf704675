//! Error types for CAR container decoding

use std::io;
use thiserror::Error;

/// Errors produced while decoding a CAR container.
#[derive(Error, Debug)]
pub enum CarError {
    /// Underlying read failure, propagated as-is
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// The stream violates the CAR framing invariants
    #[error("Malformed archive: {0}")]
    Malformed(String),

    /// An identifier token could not be parsed
    #[error("Invalid identifier: {0}")]
    InvalidCid(String),
}

impl CarError {
    /// Map an I/O error from a framed read: hitting end-of-stream in
    /// the middle of a declared structure is a framing violation, not
    /// an I/O failure.
    pub(crate) fn from_framed_read(err: io::Error, what: &str) -> Self {
        if err.kind() == io::ErrorKind::UnexpectedEof {
            Self::Malformed(format!("truncated {what}"))
        } else {
            Self::Io(err)
        }
    }
}

/// Convenience alias for decode results.
pub type Result<T> = std::result::Result<T, CarError>;
