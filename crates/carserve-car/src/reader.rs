//! Streaming reader for CAR v1 containers
//!
//! A CAR file is a header frame followed by any number of block
//! frames. Every frame is length-prefixed with an unsigned varint;
//! block frames carry a binary CID immediately followed by the raw
//! payload:
//!
//! ```text
//! | varint len | header bytes           |   <- consumed and discarded
//! | varint len | CID | payload          |
//! | varint len | CID | payload          |
//! | ...                                 |
//! ```
//!
//! The reader is lazy: it yields one frame at a time, skips payloads
//! that are never requested, and stops as soon as the caller stops
//! pulling. Restarting from the beginning means constructing a fresh
//! reader over a rewound stream.

use crate::cid::Cid;
use crate::varint::{read_varint, read_varint_or_eof};
use crate::{CarError, Result};
use std::io::{self, Read};
use tracing::debug;

/// Largest frame section buffered in memory (the header frame and any
/// payload read via [`CarReader::payload`]). Matches the usual CAR v1
/// section cap.
pub const MAX_SECTION_LEN: u64 = 32 * 1024 * 1024;

/// One framed block: its identifier plus the position of its payload
/// in the underlying stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockFrame {
    /// Identifier tagged onto this block
    pub cid: Cid,
    /// Byte offset of the payload, measured from the start of the stream
    pub payload_offset: u64,
    /// Payload length in bytes
    pub payload_len: u64,
}

/// Sequential frame reader over any byte stream.
#[derive(Debug)]
pub struct CarReader<R> {
    inner: R,
    /// Bytes consumed from the start of the stream
    position: u64,
    /// Payload bytes of the current frame not yet read or skipped
    pending: u64,
}

impl<R: Read> CarReader<R> {
    /// Open a CAR stream positioned at offset 0.
    ///
    /// Consumes and discards the header frame.
    ///
    /// # Errors
    ///
    /// `CarError::Malformed` if the stream is empty, the header frame
    /// is zero-length, oversized, or truncated; `CarError::Io` on
    /// underlying read failure.
    pub fn new(mut inner: R) -> Result<Self> {
        let Some((header_len, prefix_len)) = read_varint_or_eof(&mut inner)? else {
            return Err(CarError::Malformed("empty archive".to_string()));
        };
        if header_len == 0 {
            return Err(CarError::Malformed("zero-length header frame".to_string()));
        }
        if header_len > MAX_SECTION_LEN {
            return Err(CarError::Malformed(format!(
                "header frame of {header_len} bytes exceeds section limit"
            )));
        }

        // Root identifier list and version live here; nothing in the
        // serving path needs them, so the bytes are discarded.
        let mut header = vec![0u8; header_len as usize];
        inner
            .read_exact(&mut header)
            .map_err(|e| CarError::from_framed_read(e, "header frame"))?;

        debug!(header_len, "consumed archive header frame");

        Ok(Self {
            inner,
            position: prefix_len as u64 + header_len,
            pending: 0,
        })
    }

    /// Advance to the next block frame.
    ///
    /// Any unread payload from the previous frame is skipped first.
    /// Returns `None` at a clean end of the archive.
    ///
    /// # Errors
    ///
    /// `CarError::Malformed` on a zero-length frame, a frame shorter
    /// than its identifier, or truncation anywhere inside the frame;
    /// `CarError::Io` on underlying read failure.
    pub fn next_frame(&mut self) -> Result<Option<BlockFrame>> {
        self.skip_pending()?;

        let Some((frame_len, prefix_len)) = read_varint_or_eof(&mut self.inner)? else {
            return Ok(None);
        };
        if frame_len == 0 {
            return Err(CarError::Malformed("zero-length block frame".to_string()));
        }
        self.position += prefix_len as u64;

        let (cid, cid_len) = Cid::read_from(&mut self.inner)?;
        if frame_len < cid_len as u64 {
            return Err(CarError::Malformed(format!(
                "frame of {frame_len} bytes is shorter than its {cid_len}-byte identifier"
            )));
        }
        self.position += cid_len as u64;

        let payload_len = frame_len - cid_len as u64;
        self.pending = payload_len;

        debug!(cid = %cid, payload_len, offset = self.position, "decoded block frame");

        Ok(Some(BlockFrame {
            cid,
            payload_offset: self.position,
            payload_len,
        }))
    }

    /// Read the payload of the frame most recently returned by
    /// [`next_frame`](Self::next_frame).
    ///
    /// # Errors
    ///
    /// `CarError::Malformed` if the payload exceeds
    /// [`MAX_SECTION_LEN`] or the stream ends before the declared
    /// length; `CarError::Io` on underlying read failure.
    pub fn payload(&mut self) -> Result<Vec<u8>> {
        if self.pending > MAX_SECTION_LEN {
            return Err(CarError::Malformed(format!(
                "block payload of {} bytes exceeds section limit",
                self.pending
            )));
        }

        let mut payload = vec![0u8; self.pending as usize];
        self.inner
            .read_exact(&mut payload)
            .map_err(|e| CarError::from_framed_read(e, "block payload"))?;

        self.position += self.pending;
        self.pending = 0;
        Ok(payload)
    }

    /// Bytes consumed from the start of the stream so far.
    pub fn position(&self) -> u64 {
        self.position
    }

    /// Give back the underlying stream.
    ///
    /// The stream is positioned wherever decoding stopped; callers
    /// that want to serve a located payload seek using the offsets in
    /// the returned [`BlockFrame`].
    pub fn into_inner(self) -> R {
        self.inner
    }

    fn skip_pending(&mut self) -> Result<()> {
        if self.pending == 0 {
            return Ok(());
        }

        let copied = io::copy(
            &mut self.inner.by_ref().take(self.pending),
            &mut io::sink(),
        )?;
        if copied != self.pending {
            return Err(CarError::Malformed("truncated block payload".to_string()));
        }

        self.position += copied;
        self.pending = 0;
        Ok(())
    }
}
