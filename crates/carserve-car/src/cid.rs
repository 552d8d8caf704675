//! Binary content identifiers (CIDs) as they appear in CAR frames
//!
//! The gateway treats identifiers as opaque tokens: a CID is parsed
//! only far enough to know where it ends inside a frame, and two CIDs
//! are equal exactly when their binary forms are byte-identical. The
//! text form is multibase base32 (the `b…` prefix CIDv1 encoding).

use crate::varint::{read_varint, write_varint};
use crate::{CarError, Result};
use data_encoding::BASE32_NOPAD;
use std::fmt;
use std::io::Read;

/// Multicodec code for raw binary payloads.
pub const CODEC_RAW: u64 = 0x55;

/// Multicodec code for dag-pb payloads (the common `bafy…` identifiers).
pub const CODEC_DAG_PB: u64 = 0x70;

/// Multihash code for sha2-256.
const SHA2_256: u64 = 0x12;

/// Digest length of the sha2-256 multihash implied by CIDv0.
const SHA2_256_LEN: usize = 32;

/// Upper bound on multihash digest length. Anything larger is rejected
/// as malformed rather than allocated.
const MAX_DIGEST_LEN: u64 = 128;

/// A content identifier in its binary, self-delimiting form.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Cid {
    bytes: Vec<u8>,
}

impl Cid {
    /// Build a CIDv1 with a sha2-256 multihash over the given digest
    /// bytes. Used by fixture builders and tests; the serving path
    /// never constructs identifiers.
    pub fn new_v1(codec: u64, digest: &[u8]) -> Self {
        let mut bytes = Vec::with_capacity(4 + digest.len());
        bytes.extend_from_slice(&write_varint(1));
        bytes.extend_from_slice(&write_varint(codec));
        bytes.extend_from_slice(&write_varint(SHA2_256));
        bytes.extend_from_slice(&write_varint(digest.len() as u64));
        bytes.extend_from_slice(digest);
        Self { bytes }
    }

    /// Parse a binary CID from the front of a byte stream.
    ///
    /// Returns the identifier and the number of bytes consumed from
    /// the stream. Both CIDv0 (a bare sha2-256 multihash) and CIDv1
    /// are recognised; CIDv1 fields are re-encoded canonically.
    ///
    /// # Errors
    ///
    /// `CarError::Malformed` if the stream ends inside the identifier,
    /// the version is unsupported, or the digest length exceeds
    /// [`MAX_DIGEST_LEN`]; `CarError::Io` on underlying read failure.
    pub fn read_from<R: Read>(reader: &mut R) -> Result<(Self, usize)> {
        let mut prefix = [0u8; 2];
        reader
            .read_exact(&mut prefix)
            .map_err(|e| CarError::from_framed_read(e, "identifier"))?;

        // CIDv0 is a bare sha2-256 multihash with no version prefix
        if prefix == [0x12, 0x20] {
            let mut digest = [0u8; SHA2_256_LEN];
            reader
                .read_exact(&mut digest)
                .map_err(|e| CarError::from_framed_read(e, "identifier digest"))?;

            let mut bytes = Vec::with_capacity(2 + SHA2_256_LEN);
            bytes.extend_from_slice(&prefix);
            bytes.extend_from_slice(&digest);
            let consumed = bytes.len();
            return Ok((Self { bytes }, consumed));
        }

        // CIDv1: the two buffered bytes are the start of <version><codec>
        let mut chained = prefix.as_slice().chain(reader);

        let (version, n_version) = read_varint(&mut chained)?;
        if version != 1 {
            return Err(CarError::Malformed(format!(
                "unsupported CID version {version}"
            )));
        }
        let (codec, n_codec) = read_varint(&mut chained)?;
        let (hash_code, n_hash) = read_varint(&mut chained)?;
        let (digest_len, n_len) = read_varint(&mut chained)?;
        if digest_len > MAX_DIGEST_LEN {
            return Err(CarError::Malformed(format!(
                "multihash digest of {digest_len} bytes exceeds limit"
            )));
        }

        let mut digest = vec![0u8; digest_len as usize];
        chained
            .read_exact(&mut digest)
            .map_err(|e| CarError::from_framed_read(e, "identifier digest"))?;

        let consumed = n_version + n_codec + n_hash + n_len + digest.len();
        let mut bytes = Vec::with_capacity(consumed);
        bytes.extend_from_slice(&write_varint(version));
        bytes.extend_from_slice(&write_varint(codec));
        bytes.extend_from_slice(&write_varint(hash_code));
        bytes.extend_from_slice(&write_varint(digest_len));
        bytes.extend_from_slice(&digest);

        Ok((Self { bytes }, consumed))
    }

    /// Parse a binary CID that must span exactly the given bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let mut cursor = bytes;
        let (cid, consumed) = Self::read_from(&mut cursor).map_err(|e| match e {
            CarError::Malformed(msg) => CarError::InvalidCid(msg),
            other => other,
        })?;
        if consumed != bytes.len() {
            return Err(CarError::InvalidCid(
                "trailing bytes after identifier".to_string(),
            ));
        }
        Ok(cid)
    }

    /// Parse the multibase text form of an identifier (`b…`, base32
    /// lowercase, the canonical CIDv1 encoding).
    ///
    /// # Errors
    ///
    /// `CarError::InvalidCid` for an empty token, an unsupported
    /// multibase prefix (including the base58 `Qm…` CIDv0 form), or a
    /// token that does not decode to a well-formed binary CID.
    pub fn parse_str(input: &str) -> Result<Self> {
        let input = input.trim();
        if input.is_empty() {
            return Err(CarError::InvalidCid("empty identifier".to_string()));
        }
        if input.starts_with("Qm") {
            return Err(CarError::InvalidCid(
                "base58 CIDv0 text form is not supported; use the base32 CIDv1 form".to_string(),
            ));
        }
        let Some(body) = input.strip_prefix('b') else {
            return Err(CarError::InvalidCid(format!(
                "unsupported multibase prefix in '{input}'"
            )));
        };
        let decoded = BASE32_NOPAD
            .decode(body.to_ascii_uppercase().as_bytes())
            .map_err(|e| CarError::InvalidCid(format!("invalid base32 identifier: {e}")))?;
        Self::from_bytes(&decoded)
    }

    /// The binary, self-delimiting form.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Encoded length in bytes.
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// A CID is never empty; provided for slice-like API completeness.
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

impl fmt::Display for Cid {
    /// Multibase base32 text form. CIDv0 has no such canonical text
    /// form; it is shown in the same encoding for logging purposes.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut encoded = BASE32_NOPAD.encode(&self.bytes);
        encoded.make_ascii_lowercase();
        write!(f, "b{encoded}")
    }
}
