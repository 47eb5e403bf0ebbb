//! Per-chunk metadata decoders.
//!
//! Each recognised chunk yields a `PNG-xxxx` directory named after its
//! type. Textual chunks of one type share a single directory whose
//! key/value list grows in file order. Compressed text and ICC profiles
//! are inflated with `miniz_oxide`.

use bytes::Bytes;
use chrono::NaiveDate;
use tracing::{debug, warn};

use super::chunk::{PngChunk, PngChunkType};
use crate::charset::Charset;
use crate::config::ExtractOptions;
use crate::error::ReaderError;
use crate::format::{icc, tiff, xmp};
use crate::io::{ByteArrayReader, SequentialByteArrayReader, SequentialReader};
use crate::metadata::{Directory, DirectoryKind, KeyValuePair, Metadata, StringValue, TagValue};

// =============================================================================
// Tag Ids
// =============================================================================

pub const TAG_IMAGE_WIDTH: u32 = 1;
pub const TAG_IMAGE_HEIGHT: u32 = 2;
pub const TAG_BITS_PER_SAMPLE: u32 = 3;
pub const TAG_COLOR_TYPE: u32 = 4;
pub const TAG_COMPRESSION_TYPE: u32 = 5;
pub const TAG_FILTER_METHOD: u32 = 6;
pub const TAG_INTERLACE_METHOD: u32 = 7;
pub const TAG_PALETTE_SIZE: u32 = 8;
pub const TAG_PALETTE_HAS_TRANSPARENCY: u32 = 9;
pub const TAG_SRGB_RENDERING_INTENT: u32 = 10;
pub const TAG_GAMMA: u32 = 11;
pub const TAG_ICC_PROFILE_NAME: u32 = 12;
pub const TAG_TEXTUAL_DATA: u32 = 13;
pub const TAG_LAST_MODIFICATION_TIME: u32 = 14;
pub const TAG_BACKGROUND_COLOR: u32 = 15;
pub const TAG_PIXELS_PER_UNIT_X: u32 = 16;
pub const TAG_PIXELS_PER_UNIT_Y: u32 = 17;
pub const TAG_UNIT_SPECIFIER: u32 = 18;
pub const TAG_SIGNIFICANT_BITS: u32 = 19;

/// cHRM values, in chunk order
pub mod chromaticities {
    pub const TAG_WHITE_POINT_X: u32 = 1;
    pub const TAG_WHITE_POINT_Y: u32 = 2;
    pub const TAG_RED_X: u32 = 3;
    pub const TAG_RED_Y: u32 = 4;
    pub const TAG_GREEN_X: u32 = 5;
    pub const TAG_GREEN_Y: u32 = 6;
    pub const TAG_BLUE_X: u32 = 7;
    pub const TAG_BLUE_Y: u32 = 8;
}

/// Chunks with a decoder
pub const METADATA_CHUNKS: &[PngChunkType] = &[
    PngChunkType::IHDR,
    PngChunkType::PLTE,
    PngChunkType::TRNS,
    PngChunkType::CHRM,
    PngChunkType::GAMA,
    PngChunkType::ICCP,
    PngChunkType::SRGB,
    PngChunkType::TEXT,
    PngChunkType::ZTXT,
    PngChunkType::ITXT,
    PngChunkType::TIME,
    PngChunkType::PHYS,
    PngChunkType::SBIT,
    PngChunkType::BKGD,
    PngChunkType::EXIF,
];

/// Keyword of a textual chunk holding an XMP packet
const XMP_KEYWORD: &str = "XML:com.adobe.xmp";

/// Upper bound for inflated text and profiles
const MAX_INFLATED_LEN: usize = 16 * 1024 * 1024;

/// gAMA and cHRM values are scaled by this factor
const FIXED_POINT_SCALE: f64 = 100_000.0;

const KEYWORD_MAX_LEN: usize = 79;

/// Leading bytes some writers copy from JPEG APP1 into eXIf
const EXIF_PREAMBLE: &[u8] = b"Exif\0\0";

/// Decode one chunk into `metadata`.
pub fn process_chunk(chunk: &PngChunk, metadata: &mut Metadata, options: &ExtractOptions) {
    let chunk_type = chunk.chunk_type;
    debug!(chunk = %chunk_type, len = chunk.data.len(), "PNG chunk");

    match chunk_type {
        PngChunkType::ICCP => return read_iccp(chunk, metadata),
        PngChunkType::EXIF => return read_exif(chunk.data.clone(), metadata, options),
        PngChunkType::TEXT | PngChunkType::ZTXT | PngChunkType::ITXT => {
            return read_textual(chunk, metadata)
        }
        _ => {}
    }

    let mut directory = Directory::new(DirectoryKind::Png(chunk_type));
    let mut reader = SequentialByteArrayReader::new(chunk.data.clone());
    let result = match chunk_type {
        PngChunkType::IHDR => read_ihdr(&mut reader, &mut directory),
        PngChunkType::PLTE => {
            directory.set(TAG_PALETTE_SIZE, (chunk.data.len() / 3) as i32);
            Ok(())
        }
        PngChunkType::TRNS => {
            directory.set(TAG_PALETTE_HAS_TRANSPARENCY, true);
            Ok(())
        }
        PngChunkType::SRGB => reader
            .get_u8()
            .map(|intent| directory.set(TAG_SRGB_RENDERING_INTENT, intent)),
        PngChunkType::GAMA => reader.get_i32().map(|gamma| {
            directory.set(TAG_GAMMA, f64::from(gamma) / FIXED_POINT_SCALE)
        }),
        PngChunkType::CHRM => read_chrm(&mut reader, &mut directory),
        PngChunkType::TIME => read_time(&mut reader, &mut directory),
        PngChunkType::PHYS => read_phys(&mut reader, &mut directory),
        PngChunkType::SBIT => {
            directory.set(TAG_SIGNIFICANT_BITS, chunk.data.to_vec());
            Ok(())
        }
        PngChunkType::BKGD => {
            directory.set(TAG_BACKGROUND_COLOR, chunk.data.to_vec());
            Ok(())
        }
        _ => return,
    };
    if let Err(e) = result {
        warn!(chunk = %chunk_type, "PNG chunk unreadable: {e}");
        directory.add_error(format!("Exception reading PNG chunk {chunk_type}: {e}"));
    }
    metadata.add_directory(directory);
}

// =============================================================================
// Fixed-layout chunks
// =============================================================================

fn read_ihdr(reader: &mut SequentialByteArrayReader, dir: &mut Directory) -> Result<(), ReaderError> {
    dir.set(TAG_IMAGE_WIDTH, reader.get_i32()?);
    dir.set(TAG_IMAGE_HEIGHT, reader.get_i32()?);
    dir.set(TAG_BITS_PER_SAMPLE, reader.get_u8()?);
    dir.set(TAG_COLOR_TYPE, reader.get_u8()?);
    dir.set(TAG_COMPRESSION_TYPE, reader.get_u8()?);
    dir.set(TAG_FILTER_METHOD, reader.get_u8()?);
    dir.set(TAG_INTERLACE_METHOD, reader.get_u8()?);
    Ok(())
}

fn read_chrm(reader: &mut SequentialByteArrayReader, dir: &mut Directory) -> Result<(), ReaderError> {
    use chromaticities::*;
    for tag in [
        TAG_WHITE_POINT_X,
        TAG_WHITE_POINT_Y,
        TAG_RED_X,
        TAG_RED_Y,
        TAG_GREEN_X,
        TAG_GREEN_Y,
        TAG_BLUE_X,
        TAG_BLUE_Y,
    ] {
        dir.set(tag, f64::from(reader.get_i32()?) / FIXED_POINT_SCALE);
    }
    Ok(())
}

fn read_time(reader: &mut SequentialByteArrayReader, dir: &mut Directory) -> Result<(), ReaderError> {
    let year = reader.get_u16()?;
    let month = reader.get_u8()?;
    let day = reader.get_u8()?;
    let hour = reader.get_u8()?;
    let minute = reader.get_u8()?;
    let second = reader.get_u8()?;

    // leap seconds (60) are legal in tIME but not in chrono
    let date = NaiveDate::from_ymd_opt(i32::from(year), u32::from(month), u32::from(day))
        .and_then(|d| d.and_hms_opt(u32::from(hour), u32::from(minute), u32::from(second.min(59))));
    match date {
        Some(_) => dir.set(
            TAG_LAST_MODIFICATION_TIME,
            format!("{year:04}:{month:02}:{day:02} {hour:02}:{minute:02}:{second:02}"),
        ),
        None => dir.add_error(format!(
            "PNG tIME chunk has an invalid date: {year:04}-{month:02}-{day:02} {hour:02}:{minute:02}:{second:02}"
        )),
    }
    Ok(())
}

fn read_phys(reader: &mut SequentialByteArrayReader, dir: &mut Directory) -> Result<(), ReaderError> {
    dir.set(TAG_PIXELS_PER_UNIT_X, reader.get_i32()?);
    dir.set(TAG_PIXELS_PER_UNIT_Y, reader.get_i32()?);
    dir.set(TAG_UNIT_SPECIFIER, reader.get_u8()?);
    Ok(())
}

// =============================================================================
// Embedded payloads
// =============================================================================

fn read_iccp(chunk: &PngChunk, metadata: &mut Metadata) {
    let mut directory = Directory::new(DirectoryKind::Png(chunk.chunk_type));
    let mut reader = SequentialByteArrayReader::new(chunk.data.clone());

    match iccp_profile(&mut reader, &mut directory) {
        Ok(profile) => {
            metadata.add_directory(directory);
            icc::read_icc(Bytes::from(profile), metadata);
        }
        Err(message) => {
            directory.add_error(message);
            metadata.add_directory(directory);
        }
    }
}

/// `name \0 method(1) zlib-profile`
fn iccp_profile(
    reader: &mut SequentialByteArrayReader,
    directory: &mut Directory,
) -> Result<Vec<u8>, String> {
    let truncated = |e: ReaderError| format!("Exception reading PNG iCCP chunk: {e}");

    let name = reader
        .get_null_terminated_bytes(KEYWORD_MAX_LEN + 1)
        .map_err(truncated)?;
    directory.set(TAG_ICC_PROFILE_NAME, StringValue::new(name, Some(Charset::Iso8859_1)));
    let method = reader.get_u8().map_err(truncated)?;
    if method != 0 {
        return Err(format!("Unknown PNG iCCP compression method: {method}"));
    }
    let len = reader.available().unwrap_or(0) as usize;
    let compressed = reader.get_bytes(len).map_err(truncated)?;
    inflate(&compressed)
}

fn read_exif(data: Bytes, metadata: &mut Metadata, options: &ExtractOptions) {
    let data = if data.starts_with(EXIF_PREAMBLE) {
        data.slice(EXIF_PREAMBLE.len()..)
    } else {
        data
    };
    if let Err(e) = tiff::read_tiff(&ByteArrayReader::new(data), metadata, options) {
        let mut directory = Directory::new(DirectoryKind::ExifIfd0);
        directory.add_error(format!("Exception processing TIFF data: {e}"));
        metadata.add_directory(directory);
    }
}

// =============================================================================
// Textual chunks
// =============================================================================

/// One decoded tEXt, zTXt or iTXt entry.
struct TextEntry {
    keyword: String,
    text: Vec<u8>,
    charset: Charset,
}

fn read_textual(chunk: &PngChunk, metadata: &mut Metadata) {
    let kind = DirectoryKind::Png(chunk.chunk_type);
    let entry = match chunk.chunk_type {
        PngChunkType::TEXT => parse_text(&chunk.data),
        PngChunkType::ZTXT => parse_ztxt(&chunk.data),
        _ => parse_itxt(&chunk.data),
    };

    let entry = match entry {
        Ok(entry) => entry,
        Err(message) => {
            let index = metadata.first_or_insert(kind);
            if let Some(dir) = metadata.directory_mut(index) {
                dir.add_error(message);
            }
            return;
        }
    };

    if entry.keyword == XMP_KEYWORD {
        xmp::read_xmp(&entry.text, metadata);
        return;
    }

    let index = metadata.first_or_insert(kind);
    if let Some(dir) = metadata.directory_mut(index) {
        let pair = KeyValuePair::new(entry.keyword, StringValue::new(entry.text, Some(entry.charset)));
        match dir.get_mut(TAG_TEXTUAL_DATA) {
            Some(TagValue::KeyValuePairs(pairs)) => pairs.push(pair),
            _ => dir.set(TAG_TEXTUAL_DATA, vec![pair]),
        }
    }
}

/// `keyword \0 text`, Latin-1
fn parse_text(data: &[u8]) -> Result<TextEntry, String> {
    let mut reader = SequentialByteArrayReader::new(data.to_vec());
    let keyword = read_keyword(&mut reader)?;
    let text = remaining(&mut reader)?;
    Ok(TextEntry {
        keyword,
        text: text.to_vec(),
        charset: Charset::Iso8859_1,
    })
}

/// `keyword \0 method(1) zlib-text`, Latin-1
fn parse_ztxt(data: &[u8]) -> Result<TextEntry, String> {
    let mut reader = SequentialByteArrayReader::new(data.to_vec());
    let keyword = read_keyword(&mut reader)?;
    let method = reader.get_u8().map_err(|e| e.to_string())?;
    if method != 0 {
        return Err(format!("Invalid compression method value: {method}"));
    }
    let text = inflate(&remaining(&mut reader)?)?;
    Ok(TextEntry {
        keyword,
        text,
        charset: Charset::Iso8859_1,
    })
}

/// `keyword \0 flag(1) method(1) language \0 translated-keyword \0 text`, UTF-8
fn parse_itxt(data: &[u8]) -> Result<TextEntry, String> {
    let mut reader = SequentialByteArrayReader::new(data.to_vec());
    let keyword = read_keyword(&mut reader)?;
    let compressed = reader.get_u8().map_err(|e| e.to_string())? != 0;
    let method = reader.get_u8().map_err(|e| e.to_string())?;
    let _language = reader
        .get_null_terminated_bytes(data.len())
        .map_err(|e| e.to_string())?;
    let _translated = reader
        .get_null_terminated_bytes(data.len())
        .map_err(|e| e.to_string())?;

    let raw = remaining(&mut reader)?;
    let text = match (compressed, method) {
        (false, _) => raw.to_vec(),
        (true, 0) => inflate(&raw)?,
        (true, _) => return Err(format!("Invalid compression method value: {method}")),
    };
    Ok(TextEntry {
        keyword,
        text,
        charset: Charset::Utf8,
    })
}

fn read_keyword(reader: &mut SequentialByteArrayReader) -> Result<String, String> {
    let bytes = reader
        .get_null_terminated_bytes(KEYWORD_MAX_LEN + 1)
        .map_err(|e| e.to_string())?;
    if bytes.is_empty() {
        return Err("PNG textual chunk has an empty keyword".to_string());
    }
    Ok(Charset::Iso8859_1.decode(&bytes))
}

fn remaining(reader: &mut SequentialByteArrayReader) -> Result<Bytes, String> {
    let len = reader.available().unwrap_or(0) as usize;
    reader.get_bytes(len).map_err(|e| e.to_string())
}

fn inflate(data: &[u8]) -> Result<Vec<u8>, String> {
    miniz_oxide::inflate::decompress_to_vec_zlib_with_limit(data, MAX_INFLATED_LEN)
        .map_err(|e| format!("Unable to inflate compressed PNG data: {:?}", e.status))
}

// =============================================================================
// Tests
// =============================================================================
