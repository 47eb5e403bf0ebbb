//! TIFF header parsing.
//!
//! The header decides byte order, offset width and where IFD0 starts, which
//! is everything needed before the first directory can be read.
//!
//! # TIFF Header Structure
//!
//! ## Classic TIFF (8 bytes)
//! ```text
//! Bytes 0-1: Byte order (0x4949 = little-endian "II", 0x4D4D = big-endian "MM")
//! Bytes 2-3: Marker (42 = 0x002A, or a raw-format variant)
//! Bytes 4-7: Offset to first IFD (4 bytes)
//! ```
//!
//! ## BigTIFF (16 bytes)
//! ```text
//! Bytes 0-1: Byte order
//! Bytes 2-3: Marker (43 = 0x002B)
//! Bytes 4-5: Offset byte size (must be 8)
//! Bytes 6-7: Reserved
//! Bytes 8-15: Offset to first IFD (8 bytes)
//! ```
//!
//! Olympus ORF (0x4F52, 0x5352) and Panasonic RW2 (0x0055) use the classic
//! layout with their own marker.

use crate::error::TiffError;
use crate::io::{ByteOrder, RandomAccessReader};

// =============================================================================
// Constants
// =============================================================================

/// Magic bytes indicating little-endian byte order ("II" for Intel)
const BYTE_ORDER_LITTLE_ENDIAN: u16 = 0x4949;

/// Magic bytes indicating big-endian byte order ("MM" for Motorola)
const BYTE_ORDER_BIG_ENDIAN: u16 = 0x4D4D;

/// Marker for classic TIFF and Exif
pub const MARKER_TIFF: u16 = 0x002A;

/// Marker for BigTIFF
pub const MARKER_BIGTIFF: u16 = 0x002B;

/// Olympus ORF markers
pub const MARKER_OLYMPUS_ORF: u16 = 0x4F52;
pub const MARKER_OLYMPUS_ORF_ALT: u16 = 0x5352;

/// Panasonic RW2 marker
pub const MARKER_PANASONIC_RW2: u16 = 0x0055;

/// Size of classic TIFF header in bytes
pub const TIFF_HEADER_SIZE: usize = 8;

/// Size of BigTIFF header in bytes
pub const BIGTIFF_HEADER_SIZE: usize = 16;

// =============================================================================
// TiffHeader
// =============================================================================

/// Parsed TIFF header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TiffHeader {
    /// Byte order for all multi-byte values
    pub byte_order: ByteOrder,

    /// The two bytes after the byte order, read in that order
    pub marker: u16,

    /// Whether this is a BigTIFF file (64-bit offsets)
    pub is_bigtiff: bool,

    /// Offset to the first IFD, relative to the start of the header
    pub first_ifd_offset: u64,
}

impl TiffHeader {
    /// Parse the header at index zero of `reader`.
    ///
    /// The first IFD offset is not range checked here; see
    /// [`TiffHeader::resolved_first_ifd_offset`].
    ///
    /// # Errors
    /// - `InvalidByteOrder` if the first two bytes are not II or MM
    /// - `UnexpectedMarker` for markers other than TIFF, BigTIFF, ORF and RW2
    /// - `InvalidBigTiffOffsetSize` if the BigTIFF offset size is not 8
    /// - `Reader` if the data is too short for the header
    pub fn parse<R: RandomAccessReader + ?Sized>(reader: &R) -> Result<Self, TiffError> {
        let order_bytes = reader.bytes_at(0, 2)?;
        let magic = u16::from_be_bytes([order_bytes[0], order_bytes[1]]);
        let byte_order = match magic {
            BYTE_ORDER_LITTLE_ENDIAN => ByteOrder::LittleEndian,
            BYTE_ORDER_BIG_ENDIAN => ByteOrder::BigEndian,
            _ => return Err(TiffError::InvalidByteOrder(magic)),
        };

        let bytes = reader.bytes_at(2, 2)?;
        let marker = byte_order.read_u16(bytes);

        match marker {
            MARKER_TIFF | MARKER_OLYMPUS_ORF | MARKER_OLYMPUS_ORF_ALT | MARKER_PANASONIC_RW2 => {
                let first_ifd_offset = byte_order.read_u32(reader.bytes_at(4, 4)?) as u64;
                Ok(TiffHeader {
                    byte_order,
                    marker,
                    is_bigtiff: false,
                    first_ifd_offset,
                })
            }
            MARKER_BIGTIFF => {
                // Bytes 4-5: offset byte size (must be 8)
                let offset_size = byte_order.read_u16(reader.bytes_at(4, 2)?);
                if offset_size != 8 {
                    return Err(TiffError::InvalidBigTiffOffsetSize(offset_size));
                }

                // Bytes 6-7 are reserved and ignored

                let first_ifd_offset = byte_order.read_u64(reader.bytes_at(8, 8)?);
                Ok(TiffHeader {
                    byte_order,
                    marker,
                    is_bigtiff: true,
                    first_ifd_offset,
                })
            }
            _ => Err(TiffError::UnexpectedMarker(marker)),
        }
    }

    /// Size of the header itself.
    #[inline]
    pub const fn header_size(&self) -> usize {
        if self.is_bigtiff {
            BIGTIFF_HEADER_SIZE
        } else {
            TIFF_HEADER_SIZE
        }
    }

    /// The first IFD offset, or the offset straight after the header when
    /// the declared one points past the data. The flag reports the fallback.
    pub fn resolved_first_ifd_offset(&self, data_len: u64) -> (u64, bool) {
        if self.first_ifd_offset >= data_len.saturating_sub(1) {
            (self.header_size() as u64, true)
        } else {
            (self.first_ifd_offset, false)
        }
    }

    /// Get the size of an IFD entry in bytes.
    ///
    /// - Classic TIFF: 12 bytes (2 tag + 2 type + 4 count + 4 value/offset)
    /// - BigTIFF: 20 bytes (2 tag + 2 type + 8 count + 8 value/offset)
    #[inline]
    pub const fn ifd_entry_size(&self) -> usize {
        if self.is_bigtiff {
            20
        } else {
            12
        }
    }

    /// Get the size of the IFD entry count field in bytes.
    #[inline]
    pub const fn ifd_count_size(&self) -> usize {
        if self.is_bigtiff {
            8
        } else {
            2
        }
    }

    /// Get the size of the next IFD offset field in bytes.
    #[inline]
    pub const fn ifd_next_offset_size(&self) -> usize {
        if self.is_bigtiff {
            8
        } else {
            4
        }
    }

    /// Get the size of the value/offset field in an IFD entry.
    ///
    /// Values this size or smaller are stored inline in the entry.
    #[inline]
    pub const fn value_offset_size(&self) -> usize {
        if self.is_bigtiff {
            8
        } else {
            4
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
