//! Unsigned varint primitives used by the CAR framing format
//!
//! Frame lengths and identifier fields are encoded as unsigned
//! variable-length integers: 7 bits of value per byte, with the high
//! bit as a continuation flag, least-significant group first. This is
//! the same encoding protobuf uses.

use crate::{CarError, Result};
use std::io::Read;

/// Maximum encoded length of a 64-bit unsigned varint.
pub const MAX_VARINT_LEN: usize = 10;

/// Read an unsigned varint from a byte stream.
///
/// Returns the decoded value and the number of bytes consumed.
///
/// # Errors
///
/// Returns `CarError::Malformed` if the stream ends mid-varint, the
/// encoding exceeds [`MAX_VARINT_LEN`] bytes, or the value overflows
/// 64 bits. Underlying read failures are returned as `CarError::Io`.
pub fn read_varint<R: Read>(reader: &mut R) -> Result<(u64, usize)> {
    match read_varint_or_eof(reader)? {
        Some(decoded) => Ok(decoded),
        None => Err(CarError::Malformed("truncated varint".to_string())),
    }
}

/// Read an unsigned varint, treating end-of-stream before the first
/// byte as a clean end rather than an error.
///
/// This is the form frame iteration uses: a CAR archive ends exactly
/// where the next frame's length prefix would begin.
///
/// # Errors
///
/// Same as [`read_varint`], except a clean end-of-stream yields
/// `Ok(None)`.
pub fn read_varint_or_eof<R: Read>(reader: &mut R) -> Result<Option<(u64, usize)>> {
    let mut result = 0u64;
    let mut shift = 0u32;
    let mut consumed = 0usize;
    let mut byte = [0u8; 1];

    loop {
        let n = reader.read(&mut byte)?;
        if n == 0 {
            if consumed == 0 {
                return Ok(None);
            }
            return Err(CarError::Malformed("truncated varint".to_string()));
        }
        consumed += 1;

        // Extract 7-bit value
        let value = u64::from(byte[0] & 0x7F);

        // Check for overflow: byte 10 may only carry the final bit
        if shift >= 63 && value > 1 {
            return Err(CarError::Malformed(
                "varint exceeds 64-bit range".to_string(),
            ));
        }

        result |= value << shift;

        // Check continuation bit
        if byte[0] & 0x80 == 0 {
            return Ok(Some((result, consumed)));
        }

        shift += 7;

        if consumed >= MAX_VARINT_LEN {
            return Err(CarError::Malformed(
                "varint exceeds maximum length".to_string(),
            ));
        }
    }
}

/// Encode a value as an unsigned varint.
///
/// The decoder only ever reads archives, but fixture builders and the
/// identifier canonicalisation path need the encoding.
pub fn write_varint(mut value: u64) -> Vec<u8> {
    let mut result = Vec::new();

    loop {
        let mut byte = (value & 0x7F) as u8;
        value >>= 7;

        if value != 0 {
            byte |= 0x80; // Set continuation bit
            result.push(byte);
        } else {
            result.push(byte);
            break;
        }
    }

    result
}
