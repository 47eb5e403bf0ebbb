//! Decoders for individual JPEG segments.
//!
//! Each [`SegmentHandler`] names the segment types it wants and a function
//! that receives every payload of one such type. Handlers recognise their
//! own payloads by preamble, so several can share APP1 or APP13. A handler
//! that fails records the failure on its own directory and never affects
//! its siblings.

use bytes::{Bytes, BytesMut};
use tracing::{debug, warn};

use super::segment::{JpegSegmentData, JpegSegmentType};
use crate::config::ExtractOptions;
use crate::error::ReaderError;
use crate::format::{icc, iptc, photoshop, tiff, xmp};
use crate::io::{ByteArrayReader, RandomAccessReader, SequentialByteArrayReader, SequentialReader};
use crate::metadata::{Directory, DirectoryKind, Metadata, StringValue};

// =============================================================================
// Preambles
// =============================================================================

pub const JFIF_PREAMBLE: &[u8] = b"JFIF";
pub const JFXX_PREAMBLE: &[u8] = b"JFXX";
pub const EXIF_PREAMBLE: &[u8] = b"Exif\0\0";
pub const XMP_PREAMBLE: &[u8] = b"http://ns.adobe.com/xap/1.0/\0";
pub const ICC_PREAMBLE: &[u8] = b"ICC_PROFILE\0";
pub const PHOTOSHOP_PREAMBLE: &[u8] = b"Photoshop 3.0\0";
pub const ADOBE_PREAMBLE: &[u8] = b"Adobe";

/// Bytes before the profile data in an ICC segment: preamble, then chunk
/// number and chunk count.
const ICC_HEADER_LEN: usize = 14;

/// Exact length of an Adobe APP14 payload
const ADOBE_SEGMENT_LEN: usize = 12;

// =============================================================================
// Tag Ids
// =============================================================================

/// Jpeg directory tags
pub mod jpeg_tags {
    /// SOF marker minus 0xC0
    pub const COMPRESSION_TYPE: u32 = 0xFFFD;
    pub const DATA_PRECISION: u32 = 0;
    pub const IMAGE_HEIGHT: u32 = 1;
    pub const IMAGE_WIDTH: u32 = 3;
    pub const NUMBER_OF_COMPONENTS: u32 = 5;
    /// First of one tag per component: `[id, h sampling, v sampling, quantization table]`
    pub const COMPONENT_DATA_1: u32 = 6;
}

/// JFIF and JFXX directory tags; ids are offsets into the segment
pub mod jfif_tags {
    pub const VERSION: u32 = 5;
    pub const UNITS: u32 = 7;
    pub const RESX: u32 = 8;
    pub const RESY: u32 = 10;
    pub const THUMB_WIDTH: u32 = 12;
    pub const THUMB_HEIGHT: u32 = 13;
    pub const EXTENSION_CODE: u32 = 5;
}

/// Adobe JPEG directory tags
pub mod adobe_tags {
    pub const DCT_ENCODE_VERSION: u32 = 0;
    pub const APP14_FLAGS0: u32 = 1;
    pub const APP14_FLAGS1: u32 = 2;
    pub const COLOR_TRANSFORM: u32 = 3;
}

pub const COMMENT_TAG: u32 = 0;
pub const HUFFMAN_TABLE_COUNT_TAG: u32 = 1;

// =============================================================================
// Handler Table
// =============================================================================

/// Decoder for all payloads of one segment type.
pub type SegmentReadFn = fn(JpegSegmentType, &[Bytes], &mut Metadata, &ExtractOptions);

/// One entry of the segment dispatch table.
pub struct SegmentHandler {
    pub name: &'static str,
    pub segment_types: &'static [JpegSegmentType],
    pub read: SegmentReadFn,
}

const APP0: &[JpegSegmentType] = &[JpegSegmentType::App0];
const APP1: &[JpegSegmentType] = &[JpegSegmentType::App1];
const APP2: &[JpegSegmentType] = &[JpegSegmentType::App2];
const APPD: &[JpegSegmentType] = &[JpegSegmentType::AppD];
const APPE: &[JpegSegmentType] = &[JpegSegmentType::AppE];

/// Segment decoders, in the order their directories are produced.
pub const SEGMENT_HANDLERS: &[SegmentHandler] = &[
    SegmentHandler { name: "jpeg", segment_types: JpegSegmentType::SOF, read: read_frame },
    SegmentHandler { name: "comment", segment_types: &[JpegSegmentType::Com], read: read_comment },
    SegmentHandler { name: "jfif", segment_types: APP0, read: read_jfif },
    SegmentHandler { name: "jfxx", segment_types: APP0, read: read_jfxx },
    SegmentHandler { name: "exif", segment_types: APP1, read: read_exif },
    SegmentHandler { name: "xmp", segment_types: APP1, read: read_xmp },
    SegmentHandler { name: "icc", segment_types: APP2, read: read_icc },
    SegmentHandler { name: "photoshop", segment_types: APPD, read: read_photoshop },
    SegmentHandler { name: "iptc", segment_types: APPD, read: read_iptc },
    SegmentHandler { name: "adobe", segment_types: APPE, read: read_adobe },
    SegmentHandler { name: "huffman", segment_types: &[JpegSegmentType::Dht], read: read_huffman },
];

/// Every segment type some handler consumes.
pub fn handled_segment_types() -> Vec<JpegSegmentType> {
    let mut types: Vec<JpegSegmentType> = Vec::new();
    for handler in SEGMENT_HANDLERS {
        for t in handler.segment_types {
            if !types.contains(t) {
                types.push(*t);
            }
        }
    }
    types
}

/// Run every handler over the segments it asked for.
pub fn process_segments(data: &JpegSegmentData, metadata: &mut Metadata, options: &ExtractOptions) {
    for handler in SEGMENT_HANDLERS {
        for &segment_type in handler.segment_types {
            let payloads = data.segments(segment_type);
            if !payloads.is_empty() {
                debug!(handler = handler.name, count = payloads.len(), "Decoding JPEG segments");
                (handler.read)(segment_type, payloads, metadata, options);
            }
        }
    }
}

fn starts_with_ignore_case(payload: &[u8], preamble: &[u8]) -> bool {
    payload.len() >= preamble.len() && payload[..preamble.len()].eq_ignore_ascii_case(preamble)
}

// =============================================================================
// SOF
// =============================================================================

fn read_frame(segment_type: JpegSegmentType, payloads: &[Bytes], metadata: &mut Metadata, _: &ExtractOptions) {
    for payload in payloads {
        let mut directory = Directory::new(DirectoryKind::Jpeg);
        directory.set(
            jpeg_tags::COMPRESSION_TYPE,
            i32::from(segment_type.as_u8() - JpegSegmentType::Sof0.as_u8()),
        );
        if let Err(e) = frame_tags(payload, &mut directory) {
            directory.add_error(e.to_string());
        }
        metadata.add_directory(directory);
    }
}

fn frame_tags(payload: &Bytes, directory: &mut Directory) -> Result<(), ReaderError> {
    let mut reader = SequentialByteArrayReader::new(payload.clone());
    directory.set(jpeg_tags::DATA_PRECISION, reader.get_u8()?);
    directory.set(jpeg_tags::IMAGE_HEIGHT, reader.get_u16()?);
    directory.set(jpeg_tags::IMAGE_WIDTH, reader.get_u16()?);
    let components = reader.get_u8()?;
    directory.set(jpeg_tags::NUMBER_OF_COMPONENTS, components);

    for i in 0..u32::from(components) {
        let id = reader.get_u8()? as i32;
        let sampling = reader.get_u8()? as i32;
        let table = reader.get_u8()? as i32;
        directory.set(
            jpeg_tags::COMPONENT_DATA_1 + i,
            vec![id, sampling >> 4, sampling & 0x0F, table],
        );
    }
    Ok(())
}

// =============================================================================
// COM, JFIF, JFXX
// =============================================================================

fn read_comment(_: JpegSegmentType, payloads: &[Bytes], metadata: &mut Metadata, _: &ExtractOptions) {
    for payload in payloads {
        let mut directory = Directory::new(DirectoryKind::JpegComment);
        directory.set(COMMENT_TAG, StringValue::new(payload.to_vec(), None));
        metadata.add_directory(directory);
    }
}

fn read_jfif(_: JpegSegmentType, payloads: &[Bytes], metadata: &mut Metadata, _: &ExtractOptions) {
    for payload in payloads.iter().filter(|p| p.starts_with(JFIF_PREAMBLE)) {
        let mut directory = Directory::new(DirectoryKind::Jfif);
        if let Err(e) = jfif_fields(&ByteArrayReader::new(payload.clone()), &mut directory) {
            directory.add_error(e.to_string());
        }
        metadata.add_directory(directory);
    }
}

fn jfif_fields(reader: &ByteArrayReader, directory: &mut Directory) -> Result<(), ReaderError> {
    directory.set(jfif_tags::VERSION, reader.get_u16(5)?);
    directory.set(jfif_tags::UNITS, reader.get_u8(7)?);
    directory.set(jfif_tags::RESX, reader.get_u16(8)?);
    directory.set(jfif_tags::RESY, reader.get_u16(10)?);
    directory.set(jfif_tags::THUMB_WIDTH, reader.get_u8(12)?);
    directory.set(jfif_tags::THUMB_HEIGHT, reader.get_u8(13)?);
    Ok(())
}

fn read_jfxx(_: JpegSegmentType, payloads: &[Bytes], metadata: &mut Metadata, _: &ExtractOptions) {
    for payload in payloads.iter().filter(|p| p.starts_with(JFXX_PREAMBLE)) {
        let mut directory = Directory::new(DirectoryKind::Jfxx);
        match ByteArrayReader::new(payload.clone()).get_u8(5) {
            Ok(code) => directory.set(jfif_tags::EXTENSION_CODE, code),
            Err(e) => directory.add_error(e.to_string()),
        }
        metadata.add_directory(directory);
    }
}

// =============================================================================
// APP1: Exif, XMP
// =============================================================================

fn read_exif(_: JpegSegmentType, payloads: &[Bytes], metadata: &mut Metadata, options: &ExtractOptions) {
    for payload in payloads.iter().filter(|p| p.starts_with(EXIF_PREAMBLE)) {
        let reader = ByteArrayReader::new(payload.clone()).shifted(EXIF_PREAMBLE.len());
        if let Err(e) = tiff::read_tiff(&reader, metadata, options) {
            warn!("Exif segment could not be read: {e}");
            let mut directory = Directory::new(DirectoryKind::ExifIfd0);
            directory.add_error(format!("Exception processing TIFF data: {e}"));
            metadata.add_directory(directory);
        }
    }
}

fn read_xmp(_: JpegSegmentType, payloads: &[Bytes], metadata: &mut Metadata, _: &ExtractOptions) {
    for payload in payloads.iter().filter(|p| p.starts_with(XMP_PREAMBLE)) {
        xmp::read_xmp(&payload[XMP_PREAMBLE.len()..], metadata);
    }
}

// =============================================================================
// APP2: ICC
// =============================================================================

/// Profiles larger than one segment are split into numbered chunks; join
/// them in file order before decoding.
fn read_icc(_: JpegSegmentType, payloads: &[Bytes], metadata: &mut Metadata, _: &ExtractOptions) {
    let chunks: Vec<&Bytes> = payloads
        .iter()
        .filter(|p| p.len() > ICC_HEADER_LEN && starts_with_ignore_case(p, ICC_PREAMBLE))
        .collect();

    let profile = match chunks.as_slice() {
        [] => return,
        [single] => single.slice(ICC_HEADER_LEN..),
        many => {
            let total = many.iter().map(|c| c.len() - ICC_HEADER_LEN).sum();
            let mut joined = BytesMut::with_capacity(total);
            for chunk in many {
                joined.extend_from_slice(&chunk[ICC_HEADER_LEN..]);
            }
            joined.freeze()
        }
    };
    icc::read_icc(profile, metadata);
}

// =============================================================================
// APP13: Photoshop, IPTC
// =============================================================================

fn read_photoshop(_: JpegSegmentType, payloads: &[Bytes], metadata: &mut Metadata, options: &ExtractOptions) {
    for payload in payloads.iter().filter(|p| p.starts_with(PHOTOSHOP_PREAMBLE)) {
        photoshop::read_photoshop(payload.slice(PHOTOSHOP_PREAMBLE.len()..), metadata, options);
    }
}

/// Some writers put bare IPTC records in APP13 with no Photoshop wrapper.
fn read_iptc(_: JpegSegmentType, payloads: &[Bytes], metadata: &mut Metadata, _: &ExtractOptions) {
    for payload in payloads.iter().filter(|p| p.first() == Some(&iptc::TAG_MARKER)) {
        iptc::read_iptc(payload, metadata);
    }
}

// =============================================================================
// APP14: Adobe
// =============================================================================

fn read_adobe(_: JpegSegmentType, payloads: &[Bytes], metadata: &mut Metadata, _: &ExtractOptions) {
    for payload in payloads
        .iter()
        .filter(|p| starts_with_ignore_case(p, ADOBE_PREAMBLE))
    {
        let mut directory = Directory::new(DirectoryKind::AdobeJpeg);
        if payload.len() != ADOBE_SEGMENT_LEN {
            directory.add_error("Invalid Adobe JPEG data header.");
        } else {
            let mut reader = SequentialByteArrayReader::new(payload.slice(ADOBE_PREAMBLE.len()..));
            if let Err(e) = adobe_fields(&mut reader, &mut directory) {
                directory.add_error(e.to_string());
            }
        }
        metadata.add_directory(directory);
    }
}

fn adobe_fields(
    reader: &mut SequentialByteArrayReader,
    directory: &mut Directory,
) -> Result<(), ReaderError> {
    directory.set(adobe_tags::DCT_ENCODE_VERSION, reader.get_u16()?);
    directory.set(adobe_tags::APP14_FLAGS0, reader.get_u16()?);
    directory.set(adobe_tags::APP14_FLAGS1, reader.get_u16()?);
    directory.set(adobe_tags::COLOR_TRANSFORM, i32::from(reader.get_i8()?));
    Ok(())
}

// =============================================================================
// DHT
// =============================================================================

/// One directory counting the Huffman tables across all DHT segments.
fn read_huffman(_: JpegSegmentType, payloads: &[Bytes], metadata: &mut Metadata, _: &ExtractOptions) {
    let mut directory = Directory::new(DirectoryKind::HuffmanTables);
    let mut tables = 0i32;
    for payload in payloads {
        match count_huffman_tables(payload) {
            Ok(n) => tables += n,
            Err(e) => {
                directory.add_error(e.to_string());
                break;
            }
        }
    }
    directory.set(HUFFMAN_TABLE_COUNT_TAG, tables);
    metadata.add_directory(directory);
}

fn count_huffman_tables(payload: &Bytes) -> Result<i32, ReaderError> {
    let mut reader = SequentialByteArrayReader::new(payload.clone());
    let mut tables = 0;
    while reader.available().unwrap_or(0) > 0 {
        let _class_and_id = reader.get_u8()?;
        let lengths = reader.get_bytes(16)?;
        let values: u64 = lengths.iter().map(|&n| u64::from(n)).sum();
        reader.skip(values)?;
        tables += 1;
    }
    Ok(tables)
}

// =============================================================================
// Tests
// =============================================================================
