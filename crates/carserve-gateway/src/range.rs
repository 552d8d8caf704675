//! Range expression resolution
//!
//! Pure translation of a client range expression plus the known total
//! length of the resource into an effective byte span. No I/O happens
//! here; the handlers decide what "total length" means (file size for
//! a root identifier, payload length for a block identifier).
//!
//! Recognised grammar: `bytes=<start>-<end>` and `bytes=<start>-`.
//! An over-long `end` is clamped to the last byte rather than
//! rejected; multi-range expressions are refused outright.

use thiserror::Error;

/// Errors from resolving a range expression.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RangeError {
    /// The expression is syntactically invalid or unsatisfiable
    #[error("Invalid range '{0}'")]
    Invalid(String),

    /// Multi-range expressions are not supported
    #[error("Unsupported range '{0}': multiple ranges are not supported")]
    Unsupported(String),
}

/// An inclusive byte span within a resource of known total length.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByteSpan {
    /// First byte offset (inclusive)
    pub start: u64,
    /// Last byte offset (inclusive)
    pub end: u64,
    /// Total length of the resource the span was resolved against
    pub total: u64,
}

impl ByteSpan {
    /// Number of bytes the span covers; exactly what gets transmitted.
    pub fn len(&self) -> u64 {
        self.end - self.start + 1
    }

    /// A resolved span always covers at least one byte.
    pub fn is_empty(&self) -> bool {
        false
    }

    /// The `Content-Range` descriptor for this span.
    pub fn content_range(&self) -> String {
        format!("bytes {}-{}/{}", self.start, self.end, self.total)
    }
}

/// Outcome of resolving an optional range expression.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolvedRange {
    /// No expression was supplied: serve the whole object
    Whole,
    /// A satisfiable subset of the resource
    Partial(ByteSpan),
}

/// Resolve an optional range expression against a total length.
///
/// # Errors
///
/// [`RangeError::Invalid`] when the start is missing or non-numeric,
/// when `start > end` after clamping, or when the resource is empty;
/// [`RangeError::Unsupported`] for comma-separated multi-range
/// expressions.
pub fn resolve(expression: Option<&str>, total_len: u64) -> Result<ResolvedRange, RangeError> {
    let Some(raw) = expression else {
        return Ok(ResolvedRange::Whole);
    };
    let raw = raw.trim();

    let Some(spec) = raw.strip_prefix("bytes=") else {
        return Err(RangeError::Invalid(raw.to_string()));
    };
    if spec.contains(',') {
        return Err(RangeError::Unsupported(raw.to_string()));
    }
    let Some((start_str, end_str)) = spec.split_once('-') else {
        return Err(RangeError::Invalid(raw.to_string()));
    };

    let start: u64 = start_str
        .trim()
        .parse()
        .map_err(|_| RangeError::Invalid(raw.to_string()))?;

    if total_len == 0 {
        // Nothing is satisfiable against an empty resource
        return Err(RangeError::Invalid(raw.to_string()));
    }

    let end = if end_str.trim().is_empty() {
        total_len - 1
    } else {
        let requested: u64 = end_str
            .trim()
            .parse()
            .map_err(|_| RangeError::Invalid(raw.to_string()))?;
        requested.min(total_len - 1)
    };

    if start > end {
        return Err(RangeError::Invalid(raw.to_string()));
    }

    Ok(ResolvedRange::Partial(ByteSpan {
        start,
        end,
        total: total_len,
    }))
}
