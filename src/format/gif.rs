//! GIF metadata.
//!
//! # Structure
//! ```text
//! "GIF87a" | "GIF89a"
//! logical screen descriptor (7)
//! [global colour table]
//! blocks ...  (0x21 extension, 0x2C image, 0x3B trailer)
//! ```
//!
//! Extensions and image data are carried in sub-blocks: a length byte
//! followed by that many bytes, ending with a zero length.
//!
//! Each graphic control extension, comment and image descriptor adds its
//! own directory, so an animation produces one of each per frame.

use bytes::Bytes;
use tracing::{debug, warn};

use super::{icc, xmp};
use crate::charset::Charset;
use crate::error::ReaderError;
use crate::io::{ByteOrder, SequentialByteArrayReader, SequentialReader};
use crate::metadata::{Directory, DirectoryKind, Metadata, StringValue};

/// Header tags
pub mod header_tags {
    pub const GIF_FORMAT_VERSION: u32 = 1;
    pub const IMAGE_WIDTH: u32 = 2;
    pub const IMAGE_HEIGHT: u32 = 3;
    pub const COLOR_TABLE_SIZE: u32 = 4;
    pub const IS_COLOR_TABLE_SORTED: u32 = 5;
    pub const BITS_PER_PIXEL: u32 = 6;
    pub const HAS_GLOBAL_COLOR_TABLE: u32 = 7;
    pub const BACKGROUND_COLOR_INDEX: u32 = 8;
    pub const PIXEL_ASPECT_RATIO: u32 = 9;
}

/// Graphic control extension tags
pub mod control_tags {
    pub const DELAY: u32 = 1;
    pub const DISPOSAL_METHOD: u32 = 2;
    pub const USER_INPUT_FLAG: u32 = 3;
    pub const TRANSPARENT_COLOR_FLAG: u32 = 4;
    pub const TRANSPARENT_COLOR_INDEX: u32 = 5;
}

/// Image descriptor tags
pub mod image_tags {
    pub const LEFT: u32 = 1;
    pub const TOP: u32 = 2;
    pub const WIDTH: u32 = 3;
    pub const HEIGHT: u32 = 4;
    pub const HAS_LOCAL_COLOR_TABLE: u32 = 5;
    pub const IS_INTERLACED: u32 = 6;
    pub const IS_COLOR_TABLE_SORTED: u32 = 7;
    pub const LOCAL_COLOR_TABLE_BITS_PER_PIXEL: u32 = 8;
}

pub const TAG_ITERATION_COUNT: u32 = 1;
pub const TAG_COMMENT: u32 = 1;

const GIF_87A: &[u8] = b"87a";
const GIF_89A: &[u8] = b"89a";

const EXTENSION_INTRODUCER: u8 = 0x21;
const IMAGE_SEPARATOR: u8 = 0x2C;
const TRAILER: u8 = 0x3B;

const LABEL_PLAIN_TEXT: u8 = 0x01;
const LABEL_GRAPHIC_CONTROL: u8 = 0xF9;
const LABEL_COMMENT: u8 = 0xFE;
const LABEL_APPLICATION: u8 = 0xFF;

/// The XMP "magic trailer" that lets sub-block readers skip raw XMP text:
/// 0x01, 0xFF down to 0x01, before the zero terminator
const XMP_TRAILER_LEN: usize = 256;

/// Read a GIF file into `metadata`.
///
/// A bad signature or unknown version leaves a GIF Header directory holding
/// only the error. Truncation and unknown blocks stop the walk with an error
/// on the header directory; everything read before that is kept.
pub fn read_gif(data: Bytes, metadata: &mut Metadata) {
    let mut reader = SequentialByteArrayReader::with_byte_order(data, ByteOrder::LittleEndian);

    let header_index = metadata.add_directory(Directory::new(DirectoryKind::GifHeader));
    let result = read_header(&mut reader, metadata, header_index).and_then(|ok| {
        if ok {
            read_blocks(&mut reader, metadata, header_index)
        } else {
            Ok(())
        }
    });

    if let Err(e) = result {
        warn!("GIF data truncated: {e}");
        add_header_error(metadata, header_index, format!("Exception reading GIF data: {e}"));
    }
}

fn add_header_error(metadata: &mut Metadata, index: usize, message: impl Into<String>) {
    if let Some(dir) = metadata.directory_mut(index) {
        dir.add_error(message);
    }
}

/// Returns `false` when the signature or version rules out further reading.
fn read_header(
    reader: &mut SequentialByteArrayReader,
    metadata: &mut Metadata,
    index: usize,
) -> Result<bool, ReaderError> {
    use header_tags::*;

    let signature = reader.get_bytes(3)?;
    if &signature[..] != b"GIF" {
        add_header_error(metadata, index, "Invalid GIF file signature");
        return Ok(false);
    }
    let version = reader.get_bytes(3)?;
    if &version[..] != GIF_87A && &version[..] != GIF_89A {
        add_header_error(metadata, index, "Unexpected GIF version");
        return Ok(false);
    }

    let width = reader.get_u16()?;
    let height = reader.get_u16()?;
    let flags = reader.get_u8()?;
    let background = reader.get_u8()?;
    let aspect = reader.get_u8()?;

    let table_bits = u32::from(flags & 0x07) + 1;
    let has_global_table = flags & 0x80 != 0;

    let Some(dir) = metadata.directory_mut(index) else {
        return Ok(false);
    };
    dir.set(GIF_FORMAT_VERSION, StringValue::new(version.to_vec(), Some(Charset::Ascii)));
    dir.set(IMAGE_WIDTH, width);
    dir.set(IMAGE_HEIGHT, height);
    dir.set(COLOR_TABLE_SIZE, 1i32 << table_bits);
    dir.set(BITS_PER_PIXEL, i32::from((flags & 0x70) >> 4) + 1);
    dir.set(IS_COLOR_TABLE_SORTED, flags & 0x08 != 0);
    dir.set(HAS_GLOBAL_COLOR_TABLE, has_global_table);
    dir.set(BACKGROUND_COLOR_INDEX, background);
    if aspect != 0 {
        dir.set(PIXEL_ASPECT_RATIO, (f32::from(aspect) + 15.0) / 64.0);
    }

    if has_global_table {
        reader.skip(3 * (1u64 << table_bits))?;
    }
    Ok(true)
}

fn read_blocks(
    reader: &mut SequentialByteArrayReader,
    metadata: &mut Metadata,
    header_index: usize,
) -> Result<(), ReaderError> {
    loop {
        // a missing trailer is common enough to accept silently
        if reader.available() == Some(0) {
            return Ok(());
        }
        match reader.get_u8()? {
            EXTENSION_INTRODUCER => read_extension(reader, metadata)?,
            IMAGE_SEPARATOR => read_image(reader, metadata)?,
            TRAILER => return Ok(()),
            marker => {
                debug!(marker, position = reader.position(), "unknown GIF block");
                add_header_error(metadata, header_index, "Unknown GIF block marker found.");
                return Ok(());
            }
        }
    }
}

// =============================================================================
// Extensions
// =============================================================================

fn read_extension(reader: &mut SequentialByteArrayReader, metadata: &mut Metadata) -> Result<(), ReaderError> {
    let label = reader.get_u8()?;
    match label {
        LABEL_GRAPHIC_CONTROL => read_graphic_control(reader, metadata),
        LABEL_COMMENT => {
            let comment = gather_sub_blocks(reader)?;
            let mut dir = Directory::new(DirectoryKind::GifComment);
            dir.set(TAG_COMMENT, StringValue::new(comment, Some(Charset::Iso8859_1)));
            metadata.add_directory(dir);
            Ok(())
        }
        LABEL_APPLICATION => read_application(reader, metadata),
        LABEL_PLAIN_TEXT => skip_sub_blocks(reader),
        other => {
            debug!(label = other, "skipping unknown GIF extension");
            skip_sub_blocks(reader)
        }
    }
}

fn read_graphic_control(reader: &mut SequentialByteArrayReader, metadata: &mut Metadata) -> Result<(), ReaderError> {
    use control_tags::*;

    let block_size = reader.get_u8()?;
    let mut dir = Directory::new(DirectoryKind::GifControl);
    if block_size != 4 {
        dir.add_error(format!("Invalid GIF control extension block size: {block_size}"));
        reader.skip(u64::from(block_size))?;
    } else {
        let flags = reader.get_u8()?;
        dir.set(DISPOSAL_METHOD, (flags >> 2) & 0x07);
        dir.set(USER_INPUT_FLAG, flags & 0x02 != 0);
        dir.set(TRANSPARENT_COLOR_FLAG, flags & 0x01 != 0);
        dir.set(DELAY, reader.get_u16()?);
        dir.set(TRANSPARENT_COLOR_INDEX, reader.get_u8()?);
    }
    metadata.add_directory(dir);
    skip_sub_blocks(reader)
}

fn read_application(reader: &mut SequentialByteArrayReader, metadata: &mut Metadata) -> Result<(), ReaderError> {
    let block_size = reader.get_u8()?;
    if block_size != 11 {
        debug!(block_size, "unexpected GIF application block size");
        reader.skip(u64::from(block_size))?;
        return skip_sub_blocks(reader);
    }
    let identifier = reader.get_bytes(11)?;

    match &identifier[..] {
        b"XMP DataXMP" => {
            let mut packet = reader.get_null_terminated_bytes(usize::MAX)?;
            let tail = packet.len().saturating_sub(XMP_TRAILER_LEN);
            if packet.len() >= XMP_TRAILER_LEN && packet[tail] == 0x01 && packet[tail + 1] == 0xFF {
                packet.truncate(tail);
            }
            xmp::read_xmp(&packet, metadata);
            skip_sub_blocks(reader)
        }
        b"ICCRGBG1012" => {
            let profile = gather_sub_blocks(reader)?;
            icc::read_icc(Bytes::from(profile), metadata);
            Ok(())
        }
        b"NETSCAPE2.0" => {
            let data = gather_sub_blocks(reader)?;
            // sub-block id 1 carries the loop count
            if data.len() >= 3 && data[0] == 1 {
                let mut dir = Directory::new(DirectoryKind::GifAnimation);
                dir.set(TAG_ITERATION_COUNT, u16::from_le_bytes([data[1], data[2]]));
                metadata.add_directory(dir);
            }
            Ok(())
        }
        _ => skip_sub_blocks(reader),
    }
}

// =============================================================================
// Images
// =============================================================================

fn read_image(reader: &mut SequentialByteArrayReader, metadata: &mut Metadata) -> Result<(), ReaderError> {
    use image_tags::*;

    let mut dir = Directory::new(DirectoryKind::GifImage);
    dir.set(LEFT, reader.get_u16()?);
    dir.set(TOP, reader.get_u16()?);
    dir.set(WIDTH, reader.get_u16()?);
    dir.set(HEIGHT, reader.get_u16()?);

    let flags = reader.get_u8()?;
    let has_local_table = flags & 0x80 != 0;
    let table_bits = u32::from(flags & 0x07) + 1;
    dir.set(HAS_LOCAL_COLOR_TABLE, has_local_table);
    dir.set(IS_INTERLACED, flags & 0x40 != 0);
    if has_local_table {
        dir.set(IS_COLOR_TABLE_SORTED, flags & 0x20 != 0);
        dir.set(LOCAL_COLOR_TABLE_BITS_PER_PIXEL, table_bits);
    }
    metadata.add_directory(dir);

    if has_local_table {
        reader.skip(3 * (1u64 << table_bits))?;
    }
    // LZW minimum code size, then the image data sub-blocks
    reader.get_u8()?;
    skip_sub_blocks(reader)
}

// =============================================================================
// Sub-blocks
// =============================================================================

fn gather_sub_blocks(reader: &mut SequentialByteArrayReader) -> Result<Vec<u8>, ReaderError> {
    let mut out = Vec::new();
    loop {
        let len = reader.get_u8()?;
        if len == 0 {
            return Ok(out);
        }
        out.extend_from_slice(&reader.get_bytes(usize::from(len))?);
    }
}

fn skip_sub_blocks(reader: &mut SequentialByteArrayReader) -> Result<(), ReaderError> {
    loop {
        let len = reader.get_u8()?;
        if len == 0 {
            return Ok(());
        }
        reader.skip(u64::from(len))?;
    }
}

// =============================================================================
// Tests
// =============================================================================
