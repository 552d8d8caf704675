//! HTTP request handlers: the retrieval orchestrator.
//!
//! Each request walks one state machine, terminal on the first
//! failure or on stream completion: parse the identifier, resolve it
//! through the mapping store, open the archive, locate the addressed
//! bytes, resolve the range, stream the span. Headers are committed
//! only after the full span is known, so every failure up to that
//! point becomes a structured error response; a read failure after
//! that is logged and the connection terminated.

use crate::error::StoreError;
use crate::range::{self, RangeError, ResolvedRange};
use crate::server::AppState;
use crate::stream;
use axum::body::Body;
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use carserve_car::{CarError, CarReader, Cid};
use serde::Deserialize;
use std::io::BufReader;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::AsyncSeekExt;

/// How the requested identifier addresses content inside the archive.
///
/// Chosen at request-parse time from the route and query string; the
/// rest of the pipeline branches on this closed set, never on the
/// identifier text.
#[derive(Debug, Clone, PartialEq, Eq)]
enum RetrievalMode {
    /// Whole-archive root identifier: the file itself is the resource
    Root,
    /// Block identifier: decode frames until one matches
    Block(Cid),
    /// Serve the first decoded block regardless of identifier; a
    /// fallback for archives known to hold a single addressable block
    FirstBlock,
}

/// Query options for the block endpoint.
#[derive(Debug, Deserialize)]
pub struct BlockQuery {
    /// Serve the first decoded block without identifier matching
    #[serde(default)]
    first: bool,
}

/// Handle GET `/piece/{cid}`.
///
/// Serves the sealed archive mapped to the root identifier as an
/// opaque byte blob, honoring an optional `Range` header.
///
/// # Errors
///
/// Returns `AppError` for every terminal state of the retrieval state
/// machine reached before headers are committed.
pub async fn handle_piece(
    Path(cid): Path<String>,
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    retrieve(&state, &cid, RetrievalMode::Root, range_expression(&headers)?).await
}

/// Handle GET `/block/{cid}`.
///
/// Decodes the mapped archive and serves the payload of the block
/// whose identifier matches, honoring an optional `Range` header
/// against the payload length. With `?first=true` the first decoded
/// block is served without identifier matching.
///
/// # Errors
///
/// Returns `AppError` for every terminal state of the retrieval state
/// machine reached before headers are committed.
pub async fn handle_block(
    Path(cid): Path<String>,
    Query(query): Query<BlockQuery>,
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    let range = range_expression(&headers)?;

    let mode = if query.first {
        RetrievalMode::FirstBlock
    } else {
        match Cid::parse_str(&cid) {
            Ok(wanted) => RetrievalMode::Block(wanted),
            // An identifier that cannot name any block is unknown;
            // no store query or file open happens for it.
            Err(err) => {
                tracing::debug!(cid = %cid, error = %err, "unparseable block identifier");
                return Err(AppError::NotFound(format!(
                    "no block matching identifier '{}'",
                    cid.trim()
                )));
            }
        }
    };

    retrieve(&state, &cid, mode, range).await
}

/// Handle requests whose identifier segment is absent entirely.
pub async fn handle_missing_identifier() -> AppError {
    AppError::MissingIdentifier
}

/// Extract the raw range expression, if any.
fn range_expression(headers: &HeaderMap) -> Result<Option<String>, AppError> {
    match headers.get(header::RANGE) {
        None => Ok(None),
        Some(value) => value
            .to_str()
            .map(|raw| Some(raw.to_string()))
            .map_err(|_| {
                AppError::InvalidRange(RangeError::Invalid(
                    "range header is not valid ASCII".to_string(),
                ))
            }),
    }
}

/// The retrieval state machine.
async fn retrieve(
    state: &AppState,
    identifier: &str,
    mode: RetrievalMode,
    range: Option<String>,
) -> Result<Response, AppError> {
    // 1. Parse
    let identifier = identifier.trim();
    if identifier.is_empty() {
        return Err(AppError::MissingIdentifier);
    }

    tracing::info!(cid = %identifier, mode = mode_name(&mode), "retrieval request");

    // 2. Resolve
    let record = state
        .store()
        .lookup(identifier)
        .await
        .map_err(AppError::LookupFailure)?
        .ok_or_else(|| {
            AppError::NotFound(format!("no sealed archive for identifier '{identifier}'"))
        })?;

    tracing::info!(cid = %identifier, path = %record.car_path.display(), "resolved sealed archive");

    // 3+4. Open and locate
    let (mut file, base_offset, total_len) = match mode {
        RetrievalMode::Root => {
            let file = tokio::fs::File::open(&record.car_path)
                .await
                .map_err(AppError::ArchiveUnavailable)?;
            let total = file.metadata().await.map_err(AppError::Io)?.len();
            (file, 0u64, total)
        }
        RetrievalMode::Block(wanted) => locate_block(record.car_path, Some(wanted)).await?,
        RetrievalMode::FirstBlock => locate_block(record.car_path, None).await?,
    };

    // 5. Resolve range against the effective resource length
    let resolved = range::resolve(range.as_deref(), total_len)?;

    let (status, span_start, span_len, content_range) = match resolved {
        ResolvedRange::Whole => (StatusCode::OK, 0, total_len, None),
        ResolvedRange::Partial(span) => (
            StatusCode::PARTIAL_CONTENT,
            span.start,
            span.len(),
            Some(span.content_range()),
        ),
    };

    // 6. Stream
    file.seek(std::io::SeekFrom::Start(base_offset + span_start))
        .await
        .map_err(AppError::Io)?;

    tracing::info!(
        cid = %identifier,
        status = %status,
        content_length = span_len,
        content_range = content_range.as_deref().unwrap_or("-"),
        "streaming response"
    );

    let mut response = Response::builder()
        .status(status)
        .header(header::CONTENT_TYPE, "application/octet-stream")
        .header(header::CONTENT_LENGTH, span_len)
        .header(header::ACCEPT_RANGES, HeaderValue::from_static("bytes"));
    if let Some(descriptor) = content_range {
        response = response.header(header::CONTENT_RANGE, descriptor);
    }

    response
        .body(Body::from_stream(stream::span_stream(file, span_len)))
        .map_err(|e| AppError::Internal(format!("response assembly failed: {e}")))
}

/// Walk the archive's frames until the wanted block is found.
///
/// `wanted = None` selects the first decoded block. Returns the open
/// file together with the payload's offset and length; the same
/// handle is reused for streaming, so each request holds exactly one.
async fn locate_block(
    car_path: PathBuf,
    wanted: Option<Cid>,
) -> Result<(tokio::fs::File, u64, u64), AppError> {
    let located = tokio::task::spawn_blocking(move || -> Result<_, AppError> {
        let file = std::fs::File::open(&car_path).map_err(AppError::ArchiveUnavailable)?;
        let mut reader = CarReader::new(BufReader::new(file))?;

        while let Some(frame) = reader.next_frame()? {
            let matched = wanted.as_ref().is_none_or(|cid| *cid == frame.cid);
            if matched {
                tracing::info!(
                    cid = %frame.cid,
                    payload_len = frame.payload_len,
                    payload_offset = frame.payload_offset,
                    "located block"
                );
                let file = reader.into_inner().into_inner();
                return Ok((file, frame.payload_offset, frame.payload_len));
            }
        }

        Err(match wanted {
            Some(cid) => AppError::NotFound(format!("no block matching identifier '{cid}'")),
            None => AppError::NotFound("archive contains no blocks".to_string()),
        })
    })
    .await
    .map_err(|e| AppError::Internal(format!("block location task failed: {e}")))??;

    let (file, payload_offset, payload_len) = located;
    Ok((tokio::fs::File::from_std(file), payload_offset, payload_len))
}

fn mode_name(mode: &RetrievalMode) -> &'static str {
    match mode {
        RetrievalMode::Root => "root",
        RetrievalMode::Block(_) => "block",
        RetrievalMode::FirstBlock => "first-block",
    }
}

/// Application-level error type for HTTP handlers.
#[derive(Debug)]
pub enum AppError {
    /// No content identifier in the request target (400)
    MissingIdentifier,
    /// No mapping record, or no matching block in the archive (404)
    NotFound(String),
    /// Mapping store unreachable or errored (500)
    LookupFailure(StoreError),
    /// Archive file missing or unreadable (500)
    ArchiveUnavailable(std::io::Error),
    /// Archive violates the container framing invariants (500)
    MalformedArchive(CarError),
    /// Range expression invalid or unsatisfiable (416)
    InvalidRange(RangeError),
    /// Range expression recognised but not supported (416)
    UnsupportedRange(RangeError),
    /// Read failure after the archive was opened (500)
    Io(std::io::Error),
    /// Response assembly failure (500)
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            Self::MissingIdentifier => (
                StatusCode::BAD_REQUEST,
                "content identifier is required".to_string(),
            ),
            Self::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            Self::LookupFailure(err) => (StatusCode::INTERNAL_SERVER_ERROR, err.to_string()),
            Self::ArchiveUnavailable(err) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("failed to open archive: {err}"),
            ),
            Self::MalformedArchive(err) => (StatusCode::INTERNAL_SERVER_ERROR, err.to_string()),
            Self::InvalidRange(err) | Self::UnsupportedRange(err) => {
                (StatusCode::RANGE_NOT_SATISFIABLE, err.to_string())
            }
            Self::Io(err) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("archive read failed: {err}"),
            ),
            Self::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };

        if status.is_server_error() {
            tracing::error!(status = %status, message = %message, "request failed");
        } else {
            tracing::debug!(status = %status, message = %message, "request rejected");
        }

        (status, message).into_response()
    }
}

impl From<CarError> for AppError {
    fn from(err: CarError) -> Self {
        match err {
            CarError::Io(e) => Self::Io(e),
            other => Self::MalformedArchive(other),
        }
    }
}

impl From<RangeError> for AppError {
    fn from(err: RangeError) -> Self {
        match err {
            RangeError::Invalid(_) => Self::InvalidRange(err),
            RangeError::Unsupported(_) => Self::UnsupportedRange(err),
        }
    }
}
