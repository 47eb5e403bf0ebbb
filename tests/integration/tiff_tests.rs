//! Exif and TIFF integration tests.

use image_metadata::{
    decode_user_comment, read_metadata, read_metadata_with, DirectoryKind, ExtractOptions,
    MakernoteVendor, Rational,
};

use super::test_utils::{
    all_errors, kinds, single, ByteOrderType, IfdBuilder, TiffBuilder, ASCII, BYTE,
};

const TAG_MAKE: u16 = 0x010F;
const TAG_MODEL: u16 = 0x0110;
const TAG_X_RESOLUTION: u16 = 0x011A;
const TAG_COMPRESSION: u16 = 0x0103;
const TAG_SUB_IFDS: u16 = 0x014A;
const TAG_EXIF_OFFSET: u16 = 0x8769;
const TAG_GPS_INFO: u16 = 0x8825;
const TAG_INTEROP_OFFSET: u16 = 0xA005;
const TAG_EXPOSURE_TIME: u16 = 0x829A;
const TAG_F_NUMBER: u16 = 0x829D;
const TAG_ISO_EQUIVALENT: u16 = 0x8827;
const TAG_DATETIME_ORIGINAL: u16 = 0x9003;
const TAG_USER_COMMENT: u16 = 0x9286;
const TAG_MAKERNOTE: u16 = 0x927C;
const TAG_GPS_LATITUDE_REF: u16 = 0x0001;
const TAG_GPS_LATITUDE: u16 = 0x0002;

// =============================================================================
// Directory Tree
// =============================================================================

#[test]
fn test_iso_speed_reported_as_text() {
    let tiff = TiffBuilder::new()
        .add_ifd(IfdBuilder::new().add_pointer(TAG_EXIF_OFFSET, 1))
        .add_ifd(IfdBuilder::new().add_short(TAG_ISO_EQUIVALENT, 80))
        .build();

    let metadata = read_metadata(tiff).unwrap();
    let sub = single(&metadata, &DirectoryKind::ExifSubIfd);
    assert_eq!(sub.get_string(u32::from(TAG_ISO_EQUIVALENT)).as_deref(), Some("80"));
    assert_eq!(sub.get_int(u32::from(TAG_ISO_EQUIVALENT)), Some(80));
}

#[test]
fn test_big_endian_exif_tree() {
    let tiff = TiffBuilder::new()
        .with_byte_order(ByteOrderType::BigEndian)
        .add_ifd(
            IfdBuilder::new()
                .add_ascii(TAG_MAKE, "Acme")
                .add_ascii(TAG_MODEL, "Pinhole 2000")
                .add_rational(TAG_X_RESOLUTION, 300, 1)
                .add_pointer(TAG_EXIF_OFFSET, 1)
                .add_pointer(TAG_GPS_INFO, 3)
                .with_next(4),
        )
        .add_ifd(
            IfdBuilder::new()
                .add_rational(TAG_EXPOSURE_TIME, 1, 250)
                .add_rational(TAG_F_NUMBER, 28, 10)
                .add_ascii(TAG_DATETIME_ORIGINAL, "2024:01:02 03:04:05")
                .add_pointer(TAG_INTEROP_OFFSET, 2),
        )
        .add_ifd(IfdBuilder::new().add_ascii(0x0001, "R98"))
        .add_ifd(
            IfdBuilder::new()
                .add_ascii(TAG_GPS_LATITUDE_REF, "N")
                .add_rationals(TAG_GPS_LATITUDE, &[(51, 1), (30, 1), (2640, 100)]),
        )
        .add_ifd(IfdBuilder::new().add_short(TAG_COMPRESSION, 6))
        .build();

    let metadata = read_metadata(tiff).unwrap();
    assert!(all_errors(&metadata).is_empty(), "{:?}", all_errors(&metadata));
    assert_eq!(
        kinds(&metadata),
        [
            DirectoryKind::ExifIfd0,
            DirectoryKind::ExifSubIfd,
            DirectoryKind::ExifInterop,
            DirectoryKind::Gps,
            DirectoryKind::ExifThumbnail,
            DirectoryKind::FileType,
        ]
    );

    let ifd0 = single(&metadata, &DirectoryKind::ExifIfd0);
    assert_eq!(ifd0.get_string(u32::from(TAG_MAKE)).as_deref(), Some("Acme"));
    assert_eq!(ifd0.get_string(u32::from(TAG_MODEL)).as_deref(), Some("Pinhole 2000"));
    assert_eq!(ifd0.get_rational(u32::from(TAG_X_RESOLUTION)), Some(Rational::new(300, 1)));

    let sub = single(&metadata, &DirectoryKind::ExifSubIfd);
    assert_eq!(sub.get_rational(u32::from(TAG_EXPOSURE_TIME)), Some(Rational::new(1, 250)));
    assert_eq!(sub.get_double(u32::from(TAG_F_NUMBER)), Some(2.8));
    assert_eq!(
        sub.get_string(u32::from(TAG_DATETIME_ORIGINAL)).as_deref(),
        Some("2024:01:02 03:04:05")
    );

    let interop = single(&metadata, &DirectoryKind::ExifInterop);
    assert_eq!(interop.get_string(0x0001).as_deref(), Some("R98"));

    let gps = single(&metadata, &DirectoryKind::Gps);
    assert_eq!(gps.get_string(u32::from(TAG_GPS_LATITUDE_REF)).as_deref(), Some("N"));
    assert_eq!(
        gps.get_rational_array(u32::from(TAG_GPS_LATITUDE)),
        Some(vec![Rational::new(51, 1), Rational::new(30, 1), Rational::new(2640, 100)])
    );

    let thumbnail = single(&metadata, &DirectoryKind::ExifThumbnail);
    assert_eq!(thumbnail.get_int(u32::from(TAG_COMPRESSION)), Some(6));
}

#[test]
fn test_user_comment_kept_as_bytes() {
    let tiff = TiffBuilder::new()
        .add_ifd(IfdBuilder::new().add_pointer(TAG_EXIF_OFFSET, 1))
        .add_ifd(IfdBuilder::new().add_undefined(TAG_USER_COMMENT, b"ASCII\0\0\0Hello, world  "))
        .build();

    let metadata = read_metadata(tiff).unwrap();
    let sub = single(&metadata, &DirectoryKind::ExifSubIfd);
    let bytes = sub.get_byte_array(u32::from(TAG_USER_COMMENT)).unwrap();
    assert_eq!(decode_user_comment(&bytes), "Hello, world");
}

// =============================================================================
// Cycles and Malformed IFDs
// =============================================================================

#[test]
fn test_sub_ifd_cycle_is_reported_once() {
    let tiff = TiffBuilder::new()
        .add_ifd(IfdBuilder::new().add_ascii(TAG_MAKE, "Acme").add_pointer(TAG_EXIF_OFFSET, 1))
        .add_ifd(IfdBuilder::new().add_pointer(TAG_SUB_IFDS, 0))
        .build();

    let metadata = read_metadata(tiff).unwrap();
    assert_eq!(
        kinds(&metadata),
        [DirectoryKind::ExifIfd0, DirectoryKind::ExifSubIfd, DirectoryKind::FileType]
    );
    let sub = single(&metadata, &DirectoryKind::ExifSubIfd);
    assert_eq!(sub.errors(), ["Ignored cyclic reference to IFD at offset 8"]);
}

#[test]
fn test_full_tree_with_interop_pointing_back_to_root() {
    let tiff = TiffBuilder::new()
        .add_ifd(
            IfdBuilder::new()
                .add_ascii(TAG_MAKE, "Acme")
                .add_pointer(TAG_EXIF_OFFSET, 1)
                .add_pointer(TAG_GPS_INFO, 3)
                .with_next(4),
        )
        .add_ifd(
            IfdBuilder::new()
                .add_rational(TAG_EXPOSURE_TIME, 1, 60)
                .add_pointer(TAG_INTEROP_OFFSET, 2),
        )
        .add_ifd(
            IfdBuilder::new()
                .add_ascii(0x0001, "R98")
                .add_pointer(TAG_SUB_IFDS, 0),
        )
        .add_ifd(IfdBuilder::new().add_ascii(TAG_GPS_LATITUDE_REF, "S"))
        .add_ifd(IfdBuilder::new().add_short(TAG_COMPRESSION, 6))
        .build();

    let metadata = read_metadata(tiff).unwrap();
    assert_eq!(
        kinds(&metadata),
        [
            DirectoryKind::ExifIfd0,
            DirectoryKind::ExifSubIfd,
            DirectoryKind::ExifInterop,
            DirectoryKind::Gps,
            DirectoryKind::ExifThumbnail,
            DirectoryKind::FileType,
        ]
    );
    assert_eq!(all_errors(&metadata).len(), 1);

    let interop = single(&metadata, &DirectoryKind::ExifInterop);
    assert_eq!(interop.get_string(0x0001).as_deref(), Some("R98"));
    assert_eq!(interop.errors(), ["Ignored cyclic reference to IFD at offset 8"]);

    assert_eq!(
        single(&metadata, &DirectoryKind::ExifIfd0).get_string(u32::from(TAG_MAKE)).as_deref(),
        Some("Acme")
    );
    assert_eq!(
        single(&metadata, &DirectoryKind::Gps).get_string(u32::from(TAG_GPS_LATITUDE_REF)).as_deref(),
        Some("S")
    );
    assert_eq!(
        single(&metadata, &DirectoryKind::ExifThumbnail).get_int(u32::from(TAG_COMPRESSION)),
        Some(6)
    );
}

#[test]
fn test_self_chained_thumbnail_terminates() {
    let tiff = TiffBuilder::new()
        .add_ifd(IfdBuilder::new().add_short(0x0100, 64).with_next(1))
        .add_ifd(IfdBuilder::new().add_short(TAG_COMPRESSION, 6).with_next(1))
        .build();

    let metadata = read_metadata(tiff).unwrap();
    assert_eq!(
        kinds(&metadata),
        [DirectoryKind::ExifIfd0, DirectoryKind::ExifThumbnail, DirectoryKind::FileType]
    );
    assert!(single(&metadata, &DirectoryKind::ExifThumbnail).has_errors());
}

#[test]
fn test_bad_entry_keeps_siblings() {
    let tiff = TiffBuilder::new()
        .add_ifd(
            IfdBuilder::new()
                .add_raw(0x0001, 99, 1, &[0, 0, 0, 0])
                .add_ascii(TAG_MAKE, "Acme")
                .add_raw(0x0002, BYTE, 1, &[7]),
        )
        .build();

    let metadata = read_metadata(tiff).unwrap();
    let ifd0 = single(&metadata, &DirectoryKind::ExifIfd0);
    assert_eq!(ifd0.errors(), ["Invalid TIFF tag format code 99 for tag 0x0001"]);
    assert_eq!(ifd0.get_string(u32::from(TAG_MAKE)).as_deref(), Some("Acme"));
    assert_eq!(ifd0.get_int(0x0002), Some(7));
}

#[test]
fn test_value_past_end_is_an_error() {
    let mut tiff = TiffBuilder::new()
        .add_ifd(IfdBuilder::new().add_short(0x0100, 10).add_ascii(TAG_MODEL, "a long model name"))
        .build();
    // drop the out-of-line string
    tiff.truncate(tiff.len() - 10);

    let metadata = read_metadata(tiff).unwrap();
    let ifd0 = single(&metadata, &DirectoryKind::ExifIfd0);
    assert_eq!(ifd0.get_int(0x0100), Some(10));
    assert!(!ifd0.contains_tag(u32::from(TAG_MODEL)));
    assert_eq!(ifd0.errors(), ["Illegal TIFF tag pointer offset"]);
}

#[test]
fn test_depth_limit_from_options() {
    let tiff = TiffBuilder::new()
        .add_ifd(IfdBuilder::new().add_pointer(TAG_EXIF_OFFSET, 1))
        .add_ifd(IfdBuilder::new().add_short(TAG_ISO_EQUIVALENT, 100))
        .build();
    let options = ExtractOptions {
        max_ifd_depth: 0,
        ..ExtractOptions::default()
    };

    let metadata = read_metadata_with(tiff, &options).unwrap();
    assert!(metadata.first(&DirectoryKind::ExifSubIfd).is_none());
    assert_eq!(
        single(&metadata, &DirectoryKind::ExifIfd0).errors(),
        ["Ignored IFD nested deeper than 0 levels"]
    );
}

// =============================================================================
// Makernotes
// =============================================================================

/// A one-entry little-endian IFD storing a 3-character ASCII value inline.
fn inline_ifd(tag: u16, text: &[u8; 3]) -> Vec<u8> {
    let mut ifd = 1u16.to_le_bytes().to_vec();
    ifd.extend_from_slice(&tag.to_le_bytes());
    ifd.extend_from_slice(&ASCII.to_le_bytes());
    ifd.extend_from_slice(&4u32.to_le_bytes());
    ifd.extend_from_slice(text);
    ifd.push(0);
    ifd.extend_from_slice(&0u32.to_le_bytes());
    ifd
}

fn with_makernote(make: &str, makernote: &[u8]) -> Vec<u8> {
    TiffBuilder::new()
        .add_ifd(IfdBuilder::new().add_ascii(TAG_MAKE, make).add_pointer(TAG_EXIF_OFFSET, 1))
        .add_ifd(IfdBuilder::new().add_undefined(TAG_MAKERNOTE, makernote))
        .build()
}

#[test]
fn test_canon_makernote_by_make() {
    let metadata = read_metadata(with_makernote("Canon", &inline_ifd(0x0006, b"EOS"))).unwrap();

    let canon = DirectoryKind::Makernote(MakernoteVendor::Canon);
    assert_eq!(
        kinds(&metadata),
        [
            DirectoryKind::ExifIfd0,
            DirectoryKind::ExifSubIfd,
            canon.clone(),
            DirectoryKind::FileType,
        ]
    );
    let makernote = single(&metadata, &canon);
    assert_eq!(makernote.name(), "Canon Makernote");
    assert_eq!(makernote.get_string(0x0006).as_deref(), Some("EOS"));
    assert!(!single(&metadata, &DirectoryKind::ExifSubIfd).contains_tag(u32::from(TAG_MAKERNOTE)));
}

#[test]
fn test_nikon_makernote_with_embedded_big_endian_header() {
    let mut makernote = b"Nikon\0\x02\x10\0\0".to_vec();
    makernote.extend_from_slice(b"MM\0\x2A\0\0\0\x08");
    // ISO: SHORT[2] = 0, 200
    makernote.extend_from_slice(&[0x00, 0x01, 0x00, 0x02, 0x00, 0x03, 0x00, 0x00, 0x00, 0x02]);
    makernote.extend_from_slice(&[0x00, 0x00, 0x00, 0xC8, 0x00, 0x00, 0x00, 0x00]);

    let metadata = read_metadata(with_makernote("NIKON CORPORATION", &makernote)).unwrap();
    let nikon = single(&metadata, &DirectoryKind::Makernote(MakernoteVendor::NikonType2));
    assert!(!nikon.has_errors(), "{:?}", nikon.errors());
    assert_eq!(nikon.get_int_array(0x0002), Some(vec![0, 200]));
}

#[test]
fn test_unrecognised_makernote_kept_raw() {
    let makernote = b"\x07\x07 vendor private data";
    let metadata = read_metadata(with_makernote("Acme", makernote)).unwrap();

    let unknown = single(&metadata, &DirectoryKind::Makernote(MakernoteVendor::Unknown));
    assert_eq!(unknown.errors(), ["Unsupported makernote data ignored."]);
    assert_eq!(
        unknown.get_byte_array(u32::from(TAG_MAKERNOTE)).as_deref(),
        Some(&makernote[..])
    );
}

#[test]
fn test_makernote_decoding_can_be_disabled() {
    let options = ExtractOptions {
        decode_makernotes: false,
        ..ExtractOptions::default()
    };
    let metadata =
        read_metadata_with(with_makernote("Canon", &inline_ifd(0x0006, b"EOS")), &options).unwrap();

    assert!(metadata.iter().all(|d| !matches!(d.kind(), DirectoryKind::Makernote(_))));
    let sub = single(&metadata, &DirectoryKind::ExifSubIfd);
    assert_eq!(sub.get_byte_array(u32::from(TAG_MAKERNOTE)).map(|b| b.len()), Some(18));
}

// =============================================================================
// Raw Formats
// =============================================================================

#[test]
fn test_cr2_header_dispatches_to_tiff_walker() {
    let mut data = b"II\x2A\x00\x10\x00\x00\x00CR\x02\x00\x00\x00\x00\x00".to_vec();
    data.extend_from_slice(&inline_ifd(TAG_MAKE, b"CAN"));

    let metadata = read_metadata(data).unwrap();
    let ifd0 = single(&metadata, &DirectoryKind::ExifIfd0);
    assert_eq!(ifd0.get_string(u32::from(TAG_MAKE)).as_deref(), Some("CAN"));

    let file_type = single(&metadata, &DirectoryKind::FileType);
    assert_eq!(file_type.get_string(1).as_deref(), Some("CR2"));
}
