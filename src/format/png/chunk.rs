//! PNG chunk types and the chunk iterator.
//!
//! # Chunk Layout
//! ```text
//! length (4, BE) | type (4 ASCII letters) | data (length) | CRC (4)
//! ```
//!
//! Bit 5 of each type letter (lower case when set) carries a property:
//! ancillary, private, reserved, safe-to-copy, in that order. CRCs are
//! skipped, not verified.

use std::collections::HashSet;
use std::fmt;

use bytes::Bytes;
use tracing::{debug, warn};

use crate::error::PngError;
use crate::io::{ByteOrder, SequentialReader};

/// The eight-byte PNG file signature
pub const PNG_SIGNATURE: [u8; 8] = [0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A];

/// Chunk types that may legally appear more than once
const MULTIPLE_ALLOWED: &[&[u8; 4]] = &[b"IDAT", b"sPLT", b"iTXt", b"tEXt", b"zTXt"];

// =============================================================================
// PngChunkType
// =============================================================================

/// A validated four-letter chunk type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PngChunkType {
    bytes: [u8; 4],
    multiple_allowed: bool,
}

impl PngChunkType {
    pub const IHDR: PngChunkType = PngChunkType::known(*b"IHDR", false);
    pub const PLTE: PngChunkType = PngChunkType::known(*b"PLTE", false);
    pub const IDAT: PngChunkType = PngChunkType::known(*b"IDAT", true);
    pub const IEND: PngChunkType = PngChunkType::known(*b"IEND", false);
    pub const CHRM: PngChunkType = PngChunkType::known(*b"cHRM", false);
    pub const GAMA: PngChunkType = PngChunkType::known(*b"gAMA", false);
    pub const ICCP: PngChunkType = PngChunkType::known(*b"iCCP", false);
    pub const SBIT: PngChunkType = PngChunkType::known(*b"sBIT", false);
    pub const SRGB: PngChunkType = PngChunkType::known(*b"sRGB", false);
    pub const BKGD: PngChunkType = PngChunkType::known(*b"bKGD", false);
    pub const HIST: PngChunkType = PngChunkType::known(*b"hIST", false);
    pub const TRNS: PngChunkType = PngChunkType::known(*b"tRNS", false);
    pub const PHYS: PngChunkType = PngChunkType::known(*b"pHYs", false);
    pub const SPLT: PngChunkType = PngChunkType::known(*b"sPLT", true);
    pub const TIME: PngChunkType = PngChunkType::known(*b"tIME", false);
    pub const ITXT: PngChunkType = PngChunkType::known(*b"iTXt", true);
    pub const TEXT: PngChunkType = PngChunkType::known(*b"tEXt", true);
    pub const ZTXT: PngChunkType = PngChunkType::known(*b"zTXt", true);
    pub const EXIF: PngChunkType = PngChunkType::known(*b"eXIf", false);

    const fn known(bytes: [u8; 4], multiple_allowed: bool) -> Self {
        Self {
            bytes,
            multiple_allowed,
        }
    }

    /// Validate a chunk type. Repetition is allowed for the standard
    /// chunks that permit it.
    ///
    /// # Errors
    /// - `InvalidChunkTypeLength` unless exactly four bytes are given
    /// - `InvalidChunkTypeCharacter` if any byte is not an ASCII letter
    pub fn new(bytes: &[u8]) -> Result<Self, PngError> {
        let bytes: [u8; 4] = bytes
            .try_into()
            .map_err(|_| PngError::InvalidChunkTypeLength)?;
        let multiple_allowed = MULTIPLE_ALLOWED.contains(&&bytes);
        Self::with_multiples(bytes, multiple_allowed)
    }

    /// Validate a chunk type with an explicit repetition rule.
    pub fn with_multiples(bytes: [u8; 4], multiple_allowed: bool) -> Result<Self, PngError> {
        if !bytes.iter().all(u8::is_ascii_alphabetic) {
            return Err(PngError::InvalidChunkTypeCharacter);
        }
        Ok(Self::known(bytes, multiple_allowed))
    }

    /// Critical chunks have an upper-case first letter.
    pub fn is_critical(&self) -> bool {
        is_upper(self.bytes[0])
    }

    /// Public chunks have an upper-case second letter.
    pub fn is_public(&self) -> bool {
        is_upper(self.bytes[1])
    }

    /// Conforming chunks have an upper-case third letter.
    pub fn is_conforming(&self) -> bool {
        is_upper(self.bytes[2])
    }

    /// Safe-to-copy chunks have a lower-case fourth letter.
    pub fn is_safe_to_copy(&self) -> bool {
        !is_upper(self.bytes[3])
    }

    pub fn are_multiple_allowed(&self) -> bool {
        self.multiple_allowed
    }

    pub fn bytes(&self) -> [u8; 4] {
        self.bytes
    }

    pub fn identifier(&self) -> String {
        self.bytes.iter().map(|&b| b as char).collect()
    }
}

#[inline]
fn is_upper(b: u8) -> bool {
    b & (1 << 5) == 0
}

impl fmt::Display for PngChunkType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.identifier())
    }
}

// =============================================================================
// Chunk Reader
// =============================================================================

/// One chunk's type and data, CRC dropped.
#[derive(Debug, Clone)]
pub struct PngChunk {
    pub chunk_type: PngChunkType,
    pub data: Bytes,
}

/// The chunks read from a PNG stream, plus the structural fault that
/// stopped the read early, if any.
#[derive(Debug, Clone, Default)]
pub struct PngChunks {
    pub chunks: Vec<PngChunk>,
    pub error: Option<PngError>,
}

/// Read chunks up to and including IEND, keeping those that pass `filter`
/// (all of them when `filter` is `None`).
///
/// Data that ends early yields the chunks read so far. A structural fault
/// after the first kept chunk also ends the read; the chunks already
/// collected are returned with the fault in [`PngChunks::error`].
///
/// # Errors
/// Returned only when no chunk was kept before the fault:
/// - `SignatureMismatch` if the first eight bytes are not the PNG signature
/// - `MissingHeader` if the first chunk is not IHDR
/// - `DuplicateChunk` for a repeated chunk that must be unique
/// - `ChunkLengthExceedsMaximum` for a length with the high bit set
/// - `InvalidChunkTypeLength` / `InvalidChunkTypeCharacter` for a bad type
pub fn read_chunks<R: SequentialReader + ?Sized>(
    reader: &mut R,
    filter: Option<&[PngChunkType]>,
) -> Result<PngChunks, PngError> {
    reader.set_byte_order(ByteOrder::BigEndian);

    let signature = reader.get_bytes(PNG_SIGNATURE.len())?;
    if signature[..] != PNG_SIGNATURE {
        return Err(PngError::SignatureMismatch);
    }

    let mut result = PngChunks::default();
    let mut seen = SeenChunks::default();
    loop {
        match next_chunk(reader, filter, &mut seen) {
            Ok(Some((chunk_type, data))) => {
                if let Some(data) = data {
                    result.chunks.push(PngChunk { chunk_type, data });
                }
                if chunk_type == PngChunkType::IEND {
                    break;
                }
            }
            Ok(None) => break,
            Err(PngError::Reader(e)) => {
                debug!(position = reader.position(), "PNG data ended early: {e}");
                break;
            }
            Err(e) if result.chunks.is_empty() => return Err(e),
            Err(e) => {
                warn!(position = reader.position(), "PNG chunk stream stopped: {e}");
                result.error = Some(e);
                break;
            }
        }
    }
    Ok(result)
}

/// Unique chunk types met so far, and whether IHDR opened the stream.
#[derive(Default)]
struct SeenChunks {
    any: bool,
    unique: HashSet<PngChunkType>,
}

type ChunkRead = Option<(PngChunkType, Option<Bytes>)>;

fn next_chunk<R: SequentialReader + ?Sized>(
    reader: &mut R,
    filter: Option<&[PngChunkType]>,
    seen: &mut SeenChunks,
) -> Result<ChunkRead, PngError> {
    if reader.available() == Some(0) {
        return Ok(None);
    }

    let length = reader.get_u32()?;
    if length > i32::MAX as u32 {
        return Err(PngError::ChunkLengthExceedsMaximum);
    }
    let chunk_type = PngChunkType::new(&reader.get_bytes(4)?)?;

    if !seen.any && chunk_type != PngChunkType::IHDR {
        return Err(PngError::MissingHeader(chunk_type.identifier()));
    }
    seen.any = true;
    if !chunk_type.are_multiple_allowed() && !seen.unique.insert(chunk_type) {
        return Err(PngError::DuplicateChunk(chunk_type.identifier()));
    }

    let wanted = filter.map_or(true, |f| f.contains(&chunk_type));
    let data = if wanted {
        Some(reader.get_bytes(length as usize)?)
    } else {
        reader.skip(u64::from(length))?;
        None
    };

    // CRC; a missing trailer on the last chunk is tolerated
    if !reader.try_skip(4) {
        debug!(chunk = %chunk_type, "PNG chunk has no CRC");
    }
    Ok(Some((chunk_type, data)))
}

// =============================================================================
// Tests
// =============================================================================
