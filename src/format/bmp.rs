//! BMP metadata.
//!
//! # Layout (little-endian)
//! ```text
//! file header (14): type (2) | file size (4) | reserved (4) | pixel offset (4)
//! DIB header: size (4) | fields by header version ...
//! ```
//!
//! DIB header versions are told apart by their size:
//!
//! | Size    | Header                    |
//! |---------|---------------------------|
//! | 12      | OS/2 1.x BITMAPCOREHEADER |
//! | 16, 64  | OS/2 2.x                  |
//! | 40      | BITMAPINFOHEADER          |
//! | 52, 56  | V2 / V3 (colour masks)    |
//! | 108     | BITMAPV4HEADER            |
//! | 124     | BITMAPV5HEADER            |
//!
//! OS/2 bitmap arrays (`BA`) chain several bitmaps; each one gets its own
//! header directory.

use std::collections::HashSet;

use bytes::Bytes;
use tracing::{debug, warn};

use super::icc;
use crate::charset::Charset;
use crate::error::ReaderError;
use crate::io::{ByteArrayReader, ByteOrder, RandomAccessReader};
use crate::metadata::{Directory, DirectoryKind, Metadata};

// =============================================================================
// Tag Ids
// =============================================================================

pub const TAG_BITMAP_TYPE: u32 = 100;
pub const TAG_HEADER_SIZE: u32 = 101;

pub const TAG_IMAGE_HEIGHT: u32 = 1;
pub const TAG_IMAGE_WIDTH: u32 = 2;
pub const TAG_COLOUR_PLANES: u32 = 3;
pub const TAG_BITS_PER_PIXEL: u32 = 4;
pub const TAG_COMPRESSION: u32 = 5;
pub const TAG_X_PIXELS_PER_METER: u32 = 6;
pub const TAG_Y_PIXELS_PER_METER: u32 = 7;
pub const TAG_PALETTE_COLOUR_COUNT: u32 = 8;
pub const TAG_IMPORTANT_COLOUR_COUNT: u32 = 9;
pub const TAG_RENDERING: u32 = 10;
pub const TAG_COLOR_ENCODING: u32 = 11;
pub const TAG_RED_MASK: u32 = 12;
pub const TAG_GREEN_MASK: u32 = 13;
pub const TAG_BLUE_MASK: u32 = 14;
pub const TAG_ALPHA_MASK: u32 = 15;
pub const TAG_COLOR_SPACE_TYPE: u32 = 16;
pub const TAG_GAMMA_RED: u32 = 17;
pub const TAG_GAMMA_GREEN: u32 = 18;
pub const TAG_GAMMA_BLUE: u32 = 19;
pub const TAG_INTENT: u32 = 20;
pub const TAG_LINKED_PROFILE: u32 = 21;

// =============================================================================
// Constants
// =============================================================================

/// Two-letter type codes read as big-endian integers
pub const BITMAP: u16 = 0x424D; // BM
pub const OS2_BITMAP_ARRAY: u16 = 0x4241; // BA
pub const OS2_ICON: u16 = 0x4943; // IC
pub const OS2_COLOR_ICON: u16 = 0x4349; // CI
pub const OS2_COLOR_POINTER: u16 = 0x4350; // CP
pub const OS2_POINTER: u16 = 0x5054; // PT

const FILE_HEADER_LEN: i64 = 14;
const BITMAP_ARRAY_HEADER_LEN: i64 = 14;

const BI_BITFIELDS: u32 = 3;
const BI_ALPHABITFIELDS: u32 = 6;

const PROFILE_LINKED: u32 = 0x4C49_4E4B; // LINK
const PROFILE_EMBEDDED: u32 = 0x4D42_4544; // MBED

/// What reading one bitmap leaves for the caller.
#[derive(Debug, Default)]
struct Bitmap {
    icc_profile: Option<Bytes>,
}

/// Read a BMP (or OS/2 bitmap array) into `metadata`.
pub fn read_bmp(data: Bytes, metadata: &mut Metadata) {
    let reader = ByteArrayReader::with_byte_order(data, ByteOrder::LittleEndian);
    let mut visited = HashSet::new();
    let mut offset = 0i64;

    loop {
        let mut directory = Directory::new(DirectoryKind::BmpHeader);
        if !visited.insert(offset) {
            warn!(offset, "BMP bitmap array loops back on itself");
            directory.add_error(format!("Bitmap array entry at offset {offset} was already read"));
            metadata.add_directory(directory);
            return;
        }

        let mut next = None;
        let mut bitmap_at = offset;
        if let Ok(OS2_BITMAP_ARRAY) = read_type(&reader, offset) {
            match reader.get_u32(offset + 6) {
                Ok(n) => {
                    next = (n != 0).then_some(i64::from(n));
                    bitmap_at = offset + BITMAP_ARRAY_HEADER_LEN;
                }
                Err(e) => {
                    directory.add_error(format!("Exception reading BMP data: {e}"));
                    metadata.add_directory(directory);
                    return;
                }
            }
        }

        let bitmap = match read_bitmap(&reader, bitmap_at, &mut directory) {
            Ok(bitmap) => bitmap,
            Err(e) => {
                directory.add_error(format!("Exception reading BMP data: {e}"));
                Bitmap::default()
            }
        };
        metadata.add_directory(directory);
        if let Some(profile) = bitmap.icc_profile {
            icc::read_icc(profile, metadata);
        }

        match next {
            Some(n) => offset = n,
            None => return,
        }
    }
}

fn read_type(reader: &ByteArrayReader, offset: i64) -> Result<u16, ReaderError> {
    Ok(u16::from_be_bytes([reader.get_u8(offset)?, reader.get_u8(offset + 1)?]))
}

fn read_bitmap(reader: &ByteArrayReader, offset: i64, dir: &mut Directory) -> Result<Bitmap, ReaderError> {
    let bitmap_type = read_type(reader, offset)?;
    match bitmap_type {
        BITMAP | OS2_ICON | OS2_COLOR_ICON | OS2_COLOR_POINTER | OS2_POINTER => {}
        other => {
            dir.add_error(format!("Invalid BMP magic number 0x{other:04X}"));
            return Ok(Bitmap::default());
        }
    }
    dir.set(TAG_BITMAP_TYPE, bitmap_type);

    let dib = offset + FILE_HEADER_LEN;
    let header_size = reader.get_u32(dib)?;
    dir.set(TAG_HEADER_SIZE, header_size);
    debug!(header_size, "BMP DIB header");

    match header_size {
        12 => {
            dir.set(TAG_IMAGE_WIDTH, reader.get_u16(dib + 4)?);
            dir.set(TAG_IMAGE_HEIGHT, reader.get_u16(dib + 6)?);
            dir.set(TAG_COLOUR_PLANES, reader.get_u16(dib + 8)?);
            dir.set(TAG_BITS_PER_PIXEL, reader.get_u16(dib + 10)?);
            Ok(Bitmap::default())
        }
        16 | 64 => {
            read_os2_v2(reader, dib, header_size, dir)?;
            Ok(Bitmap::default())
        }
        40 | 52 | 56 | 108 | 124 => read_info_header(reader, dib, header_size, dir),
        other => {
            dir.add_error(format!("Unexpected DIB header size: {other}"));
            Ok(Bitmap::default())
        }
    }
}

fn read_os2_v2(reader: &ByteArrayReader, dib: i64, size: u32, dir: &mut Directory) -> Result<(), ReaderError> {
    dir.set(TAG_IMAGE_WIDTH, reader.get_i32(dib + 4)?);
    dir.set(TAG_IMAGE_HEIGHT, reader.get_i32(dib + 8)?);
    dir.set(TAG_COLOUR_PLANES, reader.get_u16(dib + 12)?);
    dir.set(TAG_BITS_PER_PIXEL, reader.get_u16(dib + 14)?);
    if size == 16 {
        return Ok(());
    }

    dir.set(TAG_COMPRESSION, reader.get_u32(dib + 16)?);
    // dib + 20: image size
    dir.set(TAG_X_PIXELS_PER_METER, reader.get_u32(dib + 24)?);
    dir.set(TAG_Y_PIXELS_PER_METER, reader.get_u32(dib + 28)?);
    dir.set(TAG_PALETTE_COLOUR_COUNT, reader.get_u32(dib + 32)?);
    dir.set(TAG_IMPORTANT_COLOUR_COUNT, reader.get_u32(dib + 36)?);
    // dib + 40: units, dib + 42: reserved, dib + 44: recording algorithm
    dir.set(TAG_RENDERING, reader.get_u16(dib + 46)?);
    // dib + 48, 52: halftoning parameters
    dir.set(TAG_COLOR_ENCODING, reader.get_u32(dib + 56)?);
    Ok(())
}

fn read_info_header(
    reader: &ByteArrayReader,
    dib: i64,
    size: u32,
    dir: &mut Directory,
) -> Result<Bitmap, ReaderError> {
    dir.set(TAG_IMAGE_WIDTH, reader.get_i32(dib + 4)?);
    dir.set(TAG_IMAGE_HEIGHT, reader.get_i32(dib + 8)?);
    dir.set(TAG_COLOUR_PLANES, reader.get_u16(dib + 12)?);
    dir.set(TAG_BITS_PER_PIXEL, reader.get_u16(dib + 14)?);
    let compression = reader.get_u32(dib + 16)?;
    dir.set(TAG_COMPRESSION, compression);
    // dib + 20: image size
    dir.set(TAG_X_PIXELS_PER_METER, reader.get_i32(dib + 24)?);
    dir.set(TAG_Y_PIXELS_PER_METER, reader.get_i32(dib + 28)?);
    dir.set(TAG_PALETTE_COLOUR_COUNT, reader.get_u32(dib + 32)?);
    dir.set(TAG_IMPORTANT_COLOUR_COUNT, reader.get_u32(dib + 36)?);

    if size == 40 {
        // BITFIELDS masks follow a plain info header
        if compression == BI_BITFIELDS || compression == BI_ALPHABITFIELDS {
            dir.set(TAG_RED_MASK, reader.get_u32(dib + 40)?);
            dir.set(TAG_GREEN_MASK, reader.get_u32(dib + 44)?);
            dir.set(TAG_BLUE_MASK, reader.get_u32(dib + 48)?);
            if compression == BI_ALPHABITFIELDS {
                dir.set(TAG_ALPHA_MASK, reader.get_u32(dib + 52)?);
            }
        }
        return Ok(Bitmap::default());
    }

    dir.set(TAG_RED_MASK, reader.get_u32(dib + 40)?);
    dir.set(TAG_GREEN_MASK, reader.get_u32(dib + 44)?);
    dir.set(TAG_BLUE_MASK, reader.get_u32(dib + 48)?);
    if size == 52 {
        return Ok(Bitmap::default());
    }
    dir.set(TAG_ALPHA_MASK, reader.get_u32(dib + 52)?);
    if size == 56 {
        return Ok(Bitmap::default());
    }

    let color_space = reader.get_u32(dib + 56)?;
    dir.set(TAG_COLOR_SPACE_TYPE, color_space);
    // dib + 60: CIEXYZTRIPLE endpoints, 36 bytes
    dir.set(TAG_GAMMA_RED, reader.get_u32(dib + 96)?);
    dir.set(TAG_GAMMA_GREEN, reader.get_u32(dib + 100)?);
    dir.set(TAG_GAMMA_BLUE, reader.get_u32(dib + 104)?);
    if size == 108 {
        return Ok(Bitmap::default());
    }

    dir.set(TAG_INTENT, reader.get_u32(dib + 108)?);
    let profile_offset = i64::from(reader.get_u32(dib + 112)?);
    let profile_size = reader.get_u32(dib + 116)?;

    let mut bitmap = Bitmap::default();
    match color_space {
        PROFILE_EMBEDDED => match reader.get_bytes(dib + profile_offset, u64::from(profile_size)) {
            Ok(profile) => bitmap.icc_profile = Some(Bytes::from(profile)),
            Err(e) => dir.add_error(format!("Invalid embedded ICC profile: {e}")),
        },
        PROFILE_LINKED => {
            let name = reader.get_null_terminated_string_value(
                dib + profile_offset,
                u64::from(profile_size),
                Some(Charset::Iso8859_1),
            )?;
            dir.set(TAG_LINKED_PROFILE, name);
        }
        _ => {}
    }
    Ok(bitmap)
}

// =============================================================================
// Tests
// =============================================================================
