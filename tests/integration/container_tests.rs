//! GIF, BMP and PSD integration tests, plus detection and dispatch.

use image_metadata::format::detect::{
    TAG_DETECTED_FILE_MIME_TYPE, TAG_DETECTED_FILE_TYPE_LONG_NAME, TAG_DETECTED_FILE_TYPE_NAME,
    TAG_EXPECTED_FILE_NAME_EXTENSION,
};
use image_metadata::format::gif::{control_tags, header_tags, image_tags, TAG_COMMENT, TAG_ITERATION_COUNT};
use image_metadata::format::{bmp, photoshop, psd};
use image_metadata::{
    detect_file_type, read_metadata, read_metadata_as, read_metadata_from_path, DirectoryKind,
    ExtractError, ExtractOptions, FileType,
};

use super::test_utils::{
    all_errors, bmp_file, gif_file, iptc_dataset, kinds, photoshop_resource, psd_file, single,
    IfdBuilder, JpegBuilder, PngBuilder, TiffBuilder,
};

// =============================================================================
// GIF
// =============================================================================

#[test]
fn test_animated_gif() {
    let control: &[u8] = &[0x21, 0xF9, 4, 0x05, 10, 0, 3, 0];
    let comment: &[u8] = &[0x21, 0xFE, 5, b'h', b'e', b'l', b'l', b'o', 0];
    let mut netscape = vec![0x21, 0xFF, 11];
    netscape.extend_from_slice(b"NETSCAPE2.0");
    netscape.extend_from_slice(&[3, 1, 0, 0, 0]);
    let image: &[u8] = &[
        0x2C, 0, 0, 0, 0, 0x40, 0x01, 0xF0, 0x00, 0x00, 2, 2, 0x4C, 0x01, 0,
    ];

    let data = gif_file(320, 240, &[control, comment, &netscape, image]);
    let metadata = read_metadata(data).unwrap();
    assert!(all_errors(&metadata).is_empty(), "{:?}", all_errors(&metadata));
    assert_eq!(
        kinds(&metadata),
        [
            DirectoryKind::GifHeader,
            DirectoryKind::GifControl,
            DirectoryKind::GifComment,
            DirectoryKind::GifAnimation,
            DirectoryKind::GifImage,
            DirectoryKind::FileType,
        ]
    );

    let header = single(&metadata, &DirectoryKind::GifHeader);
    assert_eq!(header.get_string(header_tags::GIF_FORMAT_VERSION).as_deref(), Some("89a"));
    assert_eq!(header.get_int(header_tags::IMAGE_WIDTH), Some(320));
    assert_eq!(header.get_int(header_tags::IMAGE_HEIGHT), Some(240));
    assert_eq!(header.get_bool(header_tags::HAS_GLOBAL_COLOR_TABLE), Some(true));
    assert_eq!(header.get_int(header_tags::COLOR_TABLE_SIZE), Some(2));

    let control = single(&metadata, &DirectoryKind::GifControl);
    assert_eq!(control.get_int(control_tags::DELAY), Some(10));
    assert_eq!(control.get_int(control_tags::DISPOSAL_METHOD), Some(1));
    assert_eq!(control.get_bool(control_tags::TRANSPARENT_COLOR_FLAG), Some(true));
    assert_eq!(control.get_int(control_tags::TRANSPARENT_COLOR_INDEX), Some(3));

    let comment = single(&metadata, &DirectoryKind::GifComment);
    assert_eq!(comment.get_string(TAG_COMMENT).as_deref(), Some("hello"));

    let animation = single(&metadata, &DirectoryKind::GifAnimation);
    assert_eq!(animation.get_int(TAG_ITERATION_COUNT), Some(0));

    let image = single(&metadata, &DirectoryKind::GifImage);
    assert_eq!(image.get_int(image_tags::WIDTH), Some(320));
    assert_eq!(image.get_int(image_tags::HEIGHT), Some(240));
    assert_eq!(image.get_bool(image_tags::IS_INTERLACED), Some(false));
}

#[test]
fn test_truncated_gif_keeps_header() {
    let mut data = gif_file(16, 16, &[&[0x21, 0xFE, 40, b'c', b'u', b't']]);
    data.pop();

    let metadata = read_metadata(data).unwrap();
    let header = single(&metadata, &DirectoryKind::GifHeader);
    assert_eq!(header.get_int(header_tags::IMAGE_WIDTH), Some(16));
    assert_eq!(header.errors().len(), 1);
    assert!(header.errors()[0].starts_with("Exception reading GIF data: "));
}

// =============================================================================
// BMP
// =============================================================================

#[test]
fn test_windows_bitmap() {
    let metadata = read_metadata(bmp_file(640, -480, 24)).unwrap();
    assert!(all_errors(&metadata).is_empty(), "{:?}", all_errors(&metadata));
    assert_eq!(kinds(&metadata), [DirectoryKind::BmpHeader, DirectoryKind::FileType]);

    let header = single(&metadata, &DirectoryKind::BmpHeader);
    assert_eq!(header.get_int(bmp::TAG_BITMAP_TYPE), Some(i32::from(bmp::BITMAP)));
    assert_eq!(header.get_int(bmp::TAG_HEADER_SIZE), Some(40));
    assert_eq!(header.get_int(bmp::TAG_IMAGE_WIDTH), Some(640));
    assert_eq!(header.get_int(bmp::TAG_IMAGE_HEIGHT), Some(-480));
    assert_eq!(header.get_int(bmp::TAG_BITS_PER_PIXEL), Some(24));
    assert_eq!(header.get_int(bmp::TAG_X_PIXELS_PER_METER), Some(2835));
}

#[test]
fn test_bitmap_with_unknown_header_size() {
    let mut data = bmp_file(1, 1, 8);
    data[14..18].copy_from_slice(&99u32.to_le_bytes());

    let metadata = read_metadata(data).unwrap();
    let header = single(&metadata, &DirectoryKind::BmpHeader);
    assert_eq!(header.errors(), ["Unexpected DIB header size: 99"]);
}

// =============================================================================
// PSD
// =============================================================================

#[test]
fn test_psd_header_and_resources() {
    let mut resources = photoshop_resource(0x0406, &[0, 8, 0, 1, 0, 1]);
    resources.extend(photoshop_resource(0x0404, &iptc_dataset(2, 80, b"A. Photographer")));

    let metadata = read_metadata(psd_file(1024, 768, &resources)).unwrap();
    assert!(all_errors(&metadata).is_empty(), "{:?}", all_errors(&metadata));
    assert_eq!(
        kinds(&metadata),
        [
            DirectoryKind::PsdHeader,
            DirectoryKind::Photoshop,
            DirectoryKind::Iptc,
            DirectoryKind::FileType,
        ]
    );

    let header = single(&metadata, &DirectoryKind::PsdHeader);
    assert_eq!(header.get_int(psd::TAG_IMAGE_WIDTH), Some(1024));
    assert_eq!(header.get_int(psd::TAG_IMAGE_HEIGHT), Some(768));
    assert_eq!(header.get_int(psd::TAG_CHANNEL_COUNT), Some(3));
    assert_eq!(header.get_int(psd::TAG_BITS_PER_CHANNEL), Some(8));

    let resources = single(&metadata, &DirectoryKind::Photoshop);
    assert_eq!(
        resources.get_byte_array(photoshop::TAG_JPEG_QUALITY),
        Some(vec![0, 8, 0, 1, 0, 1])
    );

    let iptc = single(&metadata, &DirectoryKind::Iptc);
    assert_eq!(iptc.get_string(0x0250).as_deref(), Some("A. Photographer"));
}

#[test]
fn test_psd_with_bad_version() {
    let mut data = psd_file(1, 1, &[]);
    data[4..6].copy_from_slice(&7u16.to_be_bytes());

    let metadata = read_metadata(data).unwrap();
    assert_eq!(kinds(&metadata), [DirectoryKind::PsdHeader, DirectoryKind::FileType]);
    assert_eq!(
        single(&metadata, &DirectoryKind::PsdHeader).errors(),
        ["Invalid PSD file version (must be 1 or 2)"]
    );
}

// =============================================================================
// Detection and Dispatch
// =============================================================================

#[test]
fn test_detection_matches_builders() {
    assert_eq!(detect_file_type(&JpegBuilder::new().build()), FileType::Jpeg);
    assert_eq!(
        detect_file_type(&TiffBuilder::new().add_ifd(IfdBuilder::new()).build()),
        FileType::Tiff
    );
    assert_eq!(detect_file_type(&PngBuilder::new(1, 1).build()), FileType::Png);
    assert_eq!(detect_file_type(&gif_file(1, 1, &[])), FileType::Gif);
    assert_eq!(detect_file_type(&bmp_file(1, 1, 1)), FileType::Bmp);
    assert_eq!(detect_file_type(&psd_file(1, 1, &[])), FileType::Psd);
}

#[test]
fn test_file_type_directory() {
    let metadata = read_metadata(gif_file(1, 1, &[])).unwrap();
    let file_type = metadata.directories().last().unwrap();
    assert_eq!(file_type.kind(), &DirectoryKind::FileType);
    assert_eq!(file_type.get_string(TAG_DETECTED_FILE_TYPE_NAME).as_deref(), Some("GIF"));
    assert_eq!(
        file_type.get_string(TAG_DETECTED_FILE_TYPE_LONG_NAME).as_deref(),
        Some("Graphics Interchange Format")
    );
    assert_eq!(file_type.get_string(TAG_DETECTED_FILE_MIME_TYPE).as_deref(), Some("image/gif"));
    assert_eq!(file_type.get_string(TAG_EXPECTED_FILE_NAME_EXTENSION).as_deref(), Some("gif"));
}

#[test]
fn test_unknown_and_unsupported_types() {
    let err = read_metadata(b"plain text, not an image".to_vec()).unwrap_err();
    assert!(matches!(err, ExtractError::UnknownFileType));
    assert_eq!(err.to_string(), "File format could not be determined");

    let err = read_metadata(vec![0x00, 0x00, 0x01, 0x00, 0x01, 0x00]).unwrap_err();
    assert!(matches!(err, ExtractError::UnsupportedFileType("ICO")));

    let err = read_metadata(Vec::new()).unwrap_err();
    assert!(matches!(err, ExtractError::UnknownFileType));
}

#[test]
fn test_forced_type_reports_container_error() {
    let png = PngBuilder::new(1, 1).build();
    let err = read_metadata_as(png, FileType::Jpeg, &ExtractOptions::default()).unwrap_err();
    assert!(matches!(err, ExtractError::Jpeg(_)));
    assert_eq!(
        err.to_string(),
        "JPEG error: JPEG data is expected to begin with 0xFFD8 not 0x8950"
    );
}

#[test]
fn test_read_from_path() {
    let path = std::env::temp_dir().join(format!("image-metadata-{}.png", std::process::id()));
    std::fs::write(&path, PngBuilder::new(5, 7).build()).unwrap();

    let result = read_metadata_from_path(&path, &ExtractOptions::default());
    std::fs::remove_file(&path).unwrap();

    let metadata = result.unwrap();
    assert_eq!(metadata.first(&DirectoryKind::FileType).unwrap().get_string(1).as_deref(), Some("PNG"));

    let missing = std::env::temp_dir().join("image-metadata-does-not-exist.jpg");
    let err = read_metadata_from_path(&missing, &ExtractOptions::default()).unwrap_err();
    assert!(matches!(err, ExtractError::Io(_)));
}

#[test]
fn test_json_output_shape() {
    let metadata = read_metadata(bmp_file(2, 3, 32)).unwrap();
    let json = serde_json::to_value(&metadata).unwrap();

    let directories = json["directories"].as_array().unwrap();
    assert_eq!(directories.len(), 2);
    assert_eq!(directories[0]["kind"], "BMP Header");
    assert_eq!(directories[1]["kind"], "File Type");
    assert!(directories[0]["errors"].as_array().unwrap().is_empty());

    let width = directories[0]["tags"]
        .as_array()
        .unwrap()
        .iter()
        .find(|t| t["id"] == bmp::TAG_IMAGE_WIDTH)
        .unwrap();
    assert_eq!(width["value"], 2);
}
