//! JPEG integration tests.

use bytes::Bytes;
use image_metadata::format::jpeg::{self, jfif_tags, jpeg_tags, COMMENT_TAG};
use image_metadata::format::{icc, iptc, photoshop, xmp};
use image_metadata::{read_metadata, DirectoryKind, ExtractOptions, Metadata};

use super::test_utils::{
    all_errors, iptc_dataset, kinds, photoshop_resource, single, IfdBuilder, JpegBuilder,
    TiffBuilder,
};

const JFIF: &[u8] = b"JFIF\0\x01\x01\x01\x00\x48\x00\x48\x00\x00";
const XMP_PACKET: &str = "<x:xmpmeta xmlns:x='adobe:ns:meta/'/>";

fn exif_tiff() -> Vec<u8> {
    TiffBuilder::new()
        .add_ifd(IfdBuilder::new().add_ascii(0x010F, "Acme").add_pointer(0x8769, 1))
        .add_ifd(IfdBuilder::new().add_short(0x8827, 80))
        .build()
}

/// An ICC header with no tags: monitor class, RGB data, XYZ connection space.
fn icc_profile() -> Vec<u8> {
    let mut profile = vec![0u8; 132];
    profile[0..4].copy_from_slice(&132u32.to_be_bytes());
    profile[4..8].copy_from_slice(b"lcms");
    profile[8..12].copy_from_slice(&0x0430_0000u32.to_be_bytes());
    profile[12..16].copy_from_slice(b"mntr");
    profile[16..20].copy_from_slice(b"RGB ");
    profile[20..24].copy_from_slice(b"XYZ ");
    profile[36..40].copy_from_slice(b"acsp");
    profile
}

fn icc_segment(sequence: u8, count: u8, chunk: &[u8]) -> Vec<u8> {
    let mut payload = b"ICC_PROFILE\0".to_vec();
    payload.extend_from_slice(&[sequence, count]);
    payload.extend_from_slice(chunk);
    payload
}

fn photoshop_segment(resources: &[u8]) -> Vec<u8> {
    let mut payload = b"Photoshop 3.0\0".to_vec();
    payload.extend_from_slice(resources);
    payload
}

fn read_segments_only(data: Vec<u8>) -> Metadata {
    let mut metadata = Metadata::new();
    jpeg::read_jpeg(Bytes::from(data), &mut metadata, &ExtractOptions::default()).unwrap();
    metadata
}

// =============================================================================
// Full Files
// =============================================================================

#[test]
fn test_every_segment_reader() {
    let profile = icc_profile();
    let mut iptc_data = iptc_dataset(2, 5, b"Sunset");
    iptc_data.extend(iptc_dataset(2, 25, b"sky"));
    iptc_data.extend(iptc_dataset(2, 25, b"sea"));
    let mut resources = photoshop_resource(0x040A, &[1]);
    resources.extend(photoshop_resource(0x0404, &iptc_data));

    let mut xmp_payload = b"http://ns.adobe.com/xap/1.0/\0".to_vec();
    xmp_payload.extend_from_slice(XMP_PACKET.as_bytes());

    let data = JpegBuilder::new()
        .add_segment(0xE0, JFIF)
        .add_exif(&exif_tiff())
        .add_segment(0xE1, &xmp_payload)
        .add_segment(0xE2, &icc_segment(1, 2, &profile[..70]))
        .add_segment(0xE2, &icc_segment(2, 2, &profile[70..]))
        .add_segment(0xED, &photoshop_segment(&resources))
        .add_comment("made by hand")
        .add_frame(640, 480)
        .with_scan()
        .build();

    let metadata = read_metadata(data).unwrap();
    assert!(all_errors(&metadata).is_empty(), "{:?}", all_errors(&metadata));
    assert_eq!(
        kinds(&metadata),
        [
            DirectoryKind::Jpeg,
            DirectoryKind::JpegComment,
            DirectoryKind::Jfif,
            DirectoryKind::ExifIfd0,
            DirectoryKind::ExifSubIfd,
            DirectoryKind::Xmp,
            DirectoryKind::Icc,
            DirectoryKind::Photoshop,
            DirectoryKind::Iptc,
            DirectoryKind::FileType,
        ]
    );

    let frame = single(&metadata, &DirectoryKind::Jpeg);
    assert_eq!(frame.get_int(jpeg_tags::IMAGE_WIDTH), Some(640));
    assert_eq!(frame.get_int(jpeg_tags::IMAGE_HEIGHT), Some(480));
    assert_eq!(frame.get_int(jpeg_tags::COMPRESSION_TYPE), Some(0));

    let comment = single(&metadata, &DirectoryKind::JpegComment);
    assert_eq!(comment.get_string(COMMENT_TAG).as_deref(), Some("made by hand"));

    let jfif = single(&metadata, &DirectoryKind::Jfif);
    assert_eq!(jfif.get_int(jfif_tags::VERSION), Some(0x0101));
    assert_eq!(jfif.get_int(jfif_tags::RESX), Some(72));

    let sub = single(&metadata, &DirectoryKind::ExifSubIfd);
    assert_eq!(sub.get_string(0x8827).as_deref(), Some("80"));

    let xmp_dir = single(&metadata, &DirectoryKind::Xmp);
    assert_eq!(xmp_dir.get_string(xmp::TAG_XMP_PACKET).as_deref(), Some(XMP_PACKET));

    let icc_dir = single(&metadata, &DirectoryKind::Icc);
    assert_eq!(icc_dir.get_int(icc::TAG_PROFILE_BYTE_COUNT), Some(132));
    assert_eq!(icc_dir.get_string(icc::TAG_PROFILE_CLASS).as_deref(), Some("mntr"));
    assert_eq!(icc_dir.get_string(icc::TAG_COLOR_SPACE).as_deref(), Some("RGB "));
    assert_eq!(icc_dir.get_int(icc::TAG_TAG_COUNT), Some(0));

    let ps = single(&metadata, &DirectoryKind::Photoshop);
    assert_eq!(ps.get_byte_array(photoshop::TAG_COPYRIGHT), Some(vec![1]));
    assert!(!ps.contains_tag(photoshop::TAG_IPTC));

    let iptc_dir = single(&metadata, &DirectoryKind::Iptc);
    assert_eq!(iptc_dir.get_string(iptc::TAG_OBJECT_NAME).as_deref(), Some("Sunset"));
    assert_eq!(
        iptc_dir.get_string_array(iptc::TAG_KEYWORDS),
        Some(vec!["sky".to_string(), "sea".to_string()])
    );
}

#[test]
fn test_jpeg_without_metadata_segments() {
    let data = JpegBuilder::new().with_scan().build();

    let metadata = read_segments_only(data.clone());
    assert_eq!(metadata.directory_count(), 0);

    let metadata = read_metadata(data).unwrap();
    assert_eq!(kinds(&metadata), [DirectoryKind::FileType]);
    assert!(!metadata.has_errors());
}

#[test]
fn test_segments_after_scan_are_ignored() {
    let mut data = JpegBuilder::new().add_comment("before").with_scan().build();
    // a comment after EOI must not be picked up either
    data.extend_from_slice(&[0xFF, 0xFE, 0x00, 0x07, b'a', b'f', b't', b'e', b'r']);

    let metadata = read_segments_only(data);
    assert_eq!(kinds(&metadata), [DirectoryKind::JpegComment]);
}

// =============================================================================
// Failure Isolation
// =============================================================================

#[test]
fn test_broken_exif_does_not_hide_other_segments() {
    let data = JpegBuilder::new()
        .add_exif(b"XX*\0\x08\0\0\0")
        .add_comment("still here")
        .build();

    let metadata = read_segments_only(data);
    let exif = single(&metadata, &DirectoryKind::ExifIfd0);
    assert_eq!(exif.errors().len(), 1);
    assert!(exif.errors()[0].starts_with("Exception processing TIFF data: "));

    let comment = single(&metadata, &DirectoryKind::JpegComment);
    assert_eq!(comment.get_string(COMMENT_TAG).as_deref(), Some("still here"));
}

#[test]
fn test_truncated_file_keeps_earlier_segments() {
    let mut data = JpegBuilder::new().add_frame(16, 16).build();
    // APP1 claiming more bytes than remain
    data.extend_from_slice(&[0xFF, 0xE1, 0x10, 0x00, b'E', b'x', b'i', b'f']);

    let metadata = read_segments_only(data);
    assert_eq!(kinds(&metadata), [DirectoryKind::Jpeg]);
    assert!(!metadata.has_errors());
}

#[test]
fn test_bad_segment_length_keeps_earlier_segments() {
    let mut data = JpegBuilder::new()
        .add_comment("before")
        .add_frame(32, 24)
        .build();
    data.extend_from_slice(&[0xFF, 0xE1, 0x00, 0x01]);
    data.extend_from_slice(b"Exif\0\0");

    let metadata = read_metadata(data).unwrap();
    assert_eq!(
        kinds(&metadata),
        [DirectoryKind::Jpeg, DirectoryKind::JpegComment, DirectoryKind::FileType]
    );

    let frame = single(&metadata, &DirectoryKind::Jpeg);
    assert_eq!(frame.get_int(jpeg_tags::IMAGE_WIDTH), Some(32));
    assert_eq!(frame.errors(), ["JPEG segment size would be less than zero"]);
    let comment = single(&metadata, &DirectoryKind::JpegComment);
    assert_eq!(comment.get_string(COMMENT_TAG).as_deref(), Some("before"));
    assert!(comment.errors().is_empty());
}

#[test]
fn test_bad_segment_length_without_frame() {
    let mut data = JpegBuilder::new().add_comment("only").build();
    data.extend_from_slice(&[0xFF, 0xFE, 0x00, 0x00]);

    let metadata = read_segments_only(data);
    assert_eq!(kinds(&metadata), [DirectoryKind::JpegComment, DirectoryKind::Jpeg]);
    assert_eq!(
        single(&metadata, &DirectoryKind::Jpeg).errors(),
        ["JPEG segment size would be less than zero"]
    );
}

#[test]
fn test_bare_iptc_in_app13() {
    let data = JpegBuilder::new()
        .add_segment(0xED, &iptc_dataset(2, 120, b"A caption"))
        .build();

    let metadata = read_segments_only(data);
    assert_eq!(kinds(&metadata), [DirectoryKind::Iptc]);
    let iptc_dir = single(&metadata, &DirectoryKind::Iptc);
    assert_eq!(iptc_dir.get_string(iptc::TAG_CAPTION).as_deref(), Some("A caption"));
}

#[test]
fn test_exif_inside_photoshop_resources() {
    let resources = photoshop_resource(0x0422, &exif_tiff());
    let data = JpegBuilder::new()
        .add_segment(0xED, &photoshop_segment(&resources))
        .build();

    let metadata = read_segments_only(data);
    assert_eq!(
        kinds(&metadata),
        [DirectoryKind::Photoshop, DirectoryKind::ExifIfd0, DirectoryKind::ExifSubIfd]
    );
    let ifd0 = single(&metadata, &DirectoryKind::ExifIfd0);
    assert_eq!(ifd0.get_string(0x010F).as_deref(), Some("Acme"));
}
