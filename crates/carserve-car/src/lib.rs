//! CAR v1 container decoding.
//!
//! This crate provides the format layer of the carserve gateway: a
//! lazy, streaming decoder for content-addressed archive (CAR v1)
//! files as produced by a sealing pipeline.
//!
//! # Format
//!
//! A CAR file is a sequence of varint-length-prefixed frames. The
//! first frame is a header (root identifier list); every following
//! frame is a binary CID immediately followed by that block's raw
//! payload. See [`reader::CarReader`] for the frame walk and
//! [`cid::Cid`] for identifier handling.
//!
//! # Example
//!
//! ```no_run
//! use carserve_car::{CarReader, Cid};
//! use std::fs::File;
//! use std::io::BufReader;
//!
//! fn find_block(path: &str, wanted: &Cid) -> carserve_car::Result<Option<(u64, u64)>> {
//!     let mut reader = CarReader::new(BufReader::new(File::open(path)?))?;
//!     while let Some(frame) = reader.next_frame()? {
//!         if &frame.cid == wanted {
//!             return Ok(Some((frame.payload_offset, frame.payload_len)));
//!         }
//!     }
//!     Ok(None)
//! }
//! ```

#![warn(missing_docs)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod cid;
pub mod error;
pub mod reader;
pub mod varint;

pub use cid::Cid;
pub use error::{CarError, Result};
pub use reader::{BlockFrame, CarReader, MAX_SECTION_LEN};
pub use varint::{read_varint, write_varint};
