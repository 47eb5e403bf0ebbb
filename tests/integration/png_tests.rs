//! PNG integration tests.

use image_metadata::format::png::{
    PngChunkType, TAG_GAMMA, TAG_ICC_PROFILE_NAME, TAG_IMAGE_HEIGHT, TAG_IMAGE_WIDTH,
    TAG_LAST_MODIFICATION_TIME, TAG_TEXTUAL_DATA,
};
use image_metadata::format::{icc, xmp};
use image_metadata::{read_metadata, DirectoryKind, TagValue};
use miniz_oxide::deflate::compress_to_vec_zlib;

use super::test_utils::{all_errors, kinds, single, IfdBuilder, PngBuilder, TiffBuilder};

fn png(chunk_type: PngChunkType) -> DirectoryKind {
    DirectoryKind::Png(chunk_type)
}

// =============================================================================
// Chunks
// =============================================================================

#[test]
fn test_png_metadata_chunks() {
    let tiff = TiffBuilder::new()
        .with_byte_order(super::test_utils::ByteOrderType::BigEndian)
        .add_ifd(IfdBuilder::new().add_ascii(0x010F, "Acme"))
        .build();

    let data = PngBuilder::new(320, 200)
        .add_chunk(b"gAMA", &45455u32.to_be_bytes())
        .add_text("Title", "Sunset")
        .add_text("Software", "by hand")
        .add_chunk(b"tIME", &[0x07, 0xE8, 12, 31, 23, 59, 58])
        .add_chunk(b"eXIf", &tiff)
        .build();

    let metadata = read_metadata(data).unwrap();
    assert!(all_errors(&metadata).is_empty(), "{:?}", all_errors(&metadata));
    assert_eq!(
        kinds(&metadata),
        [
            png(PngChunkType::IHDR),
            png(PngChunkType::GAMA),
            png(PngChunkType::TEXT),
            png(PngChunkType::TIME),
            DirectoryKind::ExifIfd0,
            DirectoryKind::FileType,
        ]
    );

    let ihdr = single(&metadata, &png(PngChunkType::IHDR));
    assert_eq!(ihdr.name(), "PNG-IHDR");
    assert_eq!(ihdr.get_int(TAG_IMAGE_WIDTH), Some(320));
    assert_eq!(ihdr.get_int(TAG_IMAGE_HEIGHT), Some(200));

    let gamma = single(&metadata, &png(PngChunkType::GAMA));
    assert_eq!(gamma.get_double(TAG_GAMMA), Some(0.45455));

    let text = single(&metadata, &png(PngChunkType::TEXT));
    assert_eq!(
        text.get_string(TAG_TEXTUAL_DATA).as_deref(),
        Some("Title: Sunset; Software: by hand")
    );
    match text.get(TAG_TEXTUAL_DATA) {
        Some(TagValue::KeyValuePairs(pairs)) => assert_eq!(pairs.len(), 2),
        other => panic!("unexpected value {other:?}"),
    }

    let time = single(&metadata, &png(PngChunkType::TIME));
    assert_eq!(
        time.get_string(TAG_LAST_MODIFICATION_TIME).as_deref(),
        Some("2024:12:31 23:59:58")
    );

    let ifd0 = single(&metadata, &DirectoryKind::ExifIfd0);
    assert_eq!(ifd0.get_string(0x010F).as_deref(), Some("Acme"));
}

#[test]
fn test_compressed_profile_and_xmp() {
    let mut profile = vec![0u8; 132];
    profile[0..4].copy_from_slice(&132u32.to_be_bytes());
    profile[16..20].copy_from_slice(b"GRAY");
    let mut iccp = b"Gray Gamma 2.2\0\0".to_vec();
    iccp.extend(compress_to_vec_zlib(&profile, 6));

    let mut itxt = b"XML:com.adobe.xmp\0\0\0\0\0".to_vec();
    itxt.extend_from_slice(b"<x:xmpmeta xmlns:x='adobe:ns:meta/'/>");

    let data = PngBuilder::new(1, 1)
        .add_chunk(b"iCCP", &iccp)
        .add_chunk(b"iTXt", &itxt)
        .build();

    let metadata = read_metadata(data).unwrap();
    assert!(all_errors(&metadata).is_empty(), "{:?}", all_errors(&metadata));
    assert_eq!(
        kinds(&metadata),
        [
            png(PngChunkType::IHDR),
            png(PngChunkType::ICCP),
            DirectoryKind::Icc,
            DirectoryKind::Xmp,
            DirectoryKind::FileType,
        ]
    );

    let iccp_dir = single(&metadata, &png(PngChunkType::ICCP));
    assert_eq!(iccp_dir.get_string(TAG_ICC_PROFILE_NAME).as_deref(), Some("Gray Gamma 2.2"));
    let icc_dir = single(&metadata, &DirectoryKind::Icc);
    assert_eq!(icc_dir.get_string(icc::TAG_COLOR_SPACE).as_deref(), Some("GRAY"));
    let xmp_dir = single(&metadata, &DirectoryKind::Xmp);
    assert!(xmp_dir
        .get_string(xmp::TAG_XMP_PACKET)
        .unwrap()
        .starts_with("<x:xmpmeta"));
}

#[test]
fn test_bad_text_chunk_is_isolated() {
    let data = PngBuilder::new(8, 8)
        .add_chunk(b"zTXt", b"Comment\0\x00not a zlib stream")
        .add_chunk(b"sRGB", &[0])
        .build();

    let metadata = read_metadata(data).unwrap();
    let ztxt = single(&metadata, &png(PngChunkType::ZTXT));
    assert_eq!(ztxt.errors().len(), 1);
    assert!(ztxt.errors()[0].starts_with("Unable to inflate compressed PNG data"));
    assert!(!single(&metadata, &png(PngChunkType::SRGB)).has_errors());
}

#[test]
fn test_ancillary_chunks_not_buffered() {
    let data = PngBuilder::new(8, 8)
        .add_chunk(b"prVt", b"private data")
        .build();

    let metadata = read_metadata(data).unwrap();
    assert_eq!(kinds(&metadata), [png(PngChunkType::IHDR), DirectoryKind::FileType]);
}

// =============================================================================
// Structural Errors
// =============================================================================

#[test]
fn test_duplicate_header_keeps_earlier_chunks() {
    let mut ihdr = 1u32.to_be_bytes().to_vec();
    ihdr.extend_from_slice(&1u32.to_be_bytes());
    ihdr.extend_from_slice(&[8, 0, 0, 0, 0]);
    let data = PngBuilder::new(7, 9)
        .add_text("Title", "First")
        .add_chunk(b"IHDR", &ihdr)
        .add_text("Title", "Second")
        .build();

    let metadata = read_metadata(data).unwrap();
    assert_eq!(
        kinds(&metadata),
        [png(PngChunkType::IHDR), png(PngChunkType::TEXT), DirectoryKind::FileType]
    );

    let header = single(&metadata, &png(PngChunkType::IHDR));
    assert_eq!(header.get_int(TAG_IMAGE_WIDTH), Some(7));
    assert_eq!(
        header.errors(),
        ["Observed multiple instances of PNG chunk 'IHDR', for which multiples are not allowed"]
    );
    let text = single(&metadata, &png(PngChunkType::TEXT));
    assert_eq!(text.get_string(TAG_TEXTUAL_DATA).as_deref(), Some("Title: First"));
}

#[test]
fn test_corrupt_chunk_type_keeps_earlier_chunks() {
    let data = PngBuilder::new(4, 4)
        .add_text("Comment", "kept")
        .add_chunk(b"ab1d", &[1, 2, 3])
        .build();

    let metadata = read_metadata(data).unwrap();
    let header = single(&metadata, &png(PngChunkType::IHDR));
    assert_eq!(header.get_int(TAG_IMAGE_HEIGHT), Some(4));
    assert_eq!(
        header.errors(),
        ["PNG chunk type identifier may only contain alphabet characters"]
    );
    let text = single(&metadata, &png(PngChunkType::TEXT));
    assert_eq!(text.get_string(TAG_TEXTUAL_DATA).as_deref(), Some("Comment: kept"));
}

#[test]
fn test_header_must_come_first() {
    let mut data = vec![0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A];
    data.extend_from_slice(&4u32.to_be_bytes());
    data.extend_from_slice(b"gAMA");
    data.extend_from_slice(&45455u32.to_be_bytes());
    data.extend_from_slice(&[0; 4]);

    let err = read_metadata(data).unwrap_err();
    assert_eq!(err.to_string(), "PNG error: First chunk should be 'IHDR', but 'gAMA' was observed");
}
