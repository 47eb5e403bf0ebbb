//! TIFF data formats and the tag ids the IFD walker acts on.
//!
//! This module defines the vocabulary for IFD decoding:
//! - Data formats that determine how entry values are encoded
//! - Tag IDs that point at nested IFDs or embedded payloads
//!
//! Tag ids not listed here are still stored, just never interpreted.

// =============================================================================
// TIFF Data Formats
// =============================================================================

/// Encoding of an IFD entry's value.
///
/// Each format has a fixed component size, which decides whether a value
/// fits inline in the entry or lives at an offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u16)]
pub enum DataFormat {
    /// Unsigned 8-bit integer
    Byte = 1,

    /// 8-bit text, null terminated
    Ascii = 2,

    /// Unsigned 16-bit integer
    Short = 3,

    /// Unsigned 32-bit integer
    Long = 4,

    /// Two unsigned 32-bit integers
    Rational = 5,

    /// Signed 8-bit integer
    SByte = 6,

    /// Opaque bytes
    Undefined = 7,

    /// Signed 16-bit integer
    SShort = 8,

    /// Signed 32-bit integer
    SLong = 9,

    /// Two signed 32-bit integers
    SRational = 10,

    /// IEEE single
    Float = 11,

    /// IEEE double
    Double = 12,

    /// 32-bit offset of a nested IFD
    Ifd = 13,

    /// Unsigned 64-bit integer - BigTIFF only
    Long8 = 16,

    /// Signed 64-bit integer - BigTIFF only
    SLong8 = 17,

    /// 64-bit offset of a nested IFD - BigTIFF only
    Ifd8 = 18,
}

impl DataFormat {
    /// Size of a single component of this format in bytes.
    #[inline]
    pub const fn size_in_bytes(self) -> usize {
        match self {
            DataFormat::Byte | DataFormat::Ascii | DataFormat::SByte | DataFormat::Undefined => 1,
            DataFormat::Short | DataFormat::SShort => 2,
            DataFormat::Long | DataFormat::SLong | DataFormat::Float | DataFormat::Ifd => 4,
            DataFormat::Rational
            | DataFormat::SRational
            | DataFormat::Double
            | DataFormat::Long8
            | DataFormat::SLong8
            | DataFormat::Ifd8 => 8,
        }
    }

    /// Map a format code to a format.
    ///
    /// The 64-bit codes only exist in BigTIFF; in classic TIFF they are as
    /// invalid as any unknown code.
    pub fn from_u16(value: u16, is_bigtiff: bool) -> Option<Self> {
        match value {
            1 => Some(DataFormat::Byte),
            2 => Some(DataFormat::Ascii),
            3 => Some(DataFormat::Short),
            4 => Some(DataFormat::Long),
            5 => Some(DataFormat::Rational),
            6 => Some(DataFormat::SByte),
            7 => Some(DataFormat::Undefined),
            8 => Some(DataFormat::SShort),
            9 => Some(DataFormat::SLong),
            10 => Some(DataFormat::SRational),
            11 => Some(DataFormat::Float),
            12 => Some(DataFormat::Double),
            13 => Some(DataFormat::Ifd),
            16 if is_bigtiff => Some(DataFormat::Long8),
            17 if is_bigtiff => Some(DataFormat::SLong8),
            18 if is_bigtiff => Some(DataFormat::Ifd8),
            _ => None,
        }
    }

    /// Whether this format holds IFD offsets.
    #[inline]
    pub const fn is_ifd(self) -> bool {
        matches!(self, DataFormat::Ifd | DataFormat::Ifd8)
    }

    /// Maximum bytes that can be stored inline in a classic TIFF IFD entry.
    pub const INLINE_THRESHOLD_TIFF: u64 = 4;

    /// Maximum bytes that can be stored inline in a BigTIFF IFD entry.
    pub const INLINE_THRESHOLD_BIGTIFF: u64 = 8;

    /// Check if `count` components of this format fit inline in an entry.
    #[inline]
    pub fn fits_inline(self, count: u64, is_bigtiff: bool) -> bool {
        let threshold = if is_bigtiff {
            Self::INLINE_THRESHOLD_BIGTIFF
        } else {
            Self::INLINE_THRESHOLD_TIFF
        };
        match (self.size_in_bytes() as u64).checked_mul(count) {
            Some(total) => total <= threshold,
            None => false,
        }
    }
}

// =============================================================================
// TIFF / Exif Tags
// =============================================================================

/// Tag ids with structural meaning to the walker, plus the few common tags
/// other modules look up by name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum ExifTag {
    // -------------------------------------------------------------------------
    // Image Description
    // -------------------------------------------------------------------------
    /// Image width in pixels
    ImageWidth = 0x0100,

    /// Image height in pixels
    ImageHeight = 0x0101,

    /// Camera manufacturer; selects the makernote layout
    Make = 0x010F,

    /// Camera model
    Model = 0x0110,

    /// Image orientation
    Orientation = 0x0112,

    /// File change date and time
    DateTime = 0x0132,

    /// Present in multi-page files; makes the next IFD an image, not a thumbnail
    PageNumber = 0x0129,

    // -------------------------------------------------------------------------
    // IFD Pointers
    // -------------------------------------------------------------------------
    /// Offsets of child IFDs
    SubIfdOffset = 0x014A,

    /// Exif SubIFD (from IFD0)
    ExifSubIfdOffset = 0x8769,

    /// GPS IFD (from IFD0)
    GpsInfoOffset = 0x8825,

    /// Interoperability IFD (from the Exif SubIFD)
    InteropOffset = 0xA005,

    // -------------------------------------------------------------------------
    // Embedded Payloads
    // -------------------------------------------------------------------------
    /// XMP packet
    ApplicationNotes = 0x02BC,

    /// IPTC-NAA records
    IptcNaa = 0x83BB,

    /// Photoshop image resources
    PhotoshopSettings = 0x8649,

    /// ICC profile
    InterColorProfile = 0x8773,

    /// Vendor makernote
    Makernote = 0x927C,

    // -------------------------------------------------------------------------
    // Exif SubIFD
    // -------------------------------------------------------------------------
    /// ISO speed
    IsoEquivalent = 0x8827,

    /// Date and time of capture
    DateTimeOriginal = 0x9003,

    /// Encoded user comment with an 8-byte charset header
    UserComment = 0x9286,

    /// Fractional seconds of [`ExifTag::DateTimeOriginal`]
    SubSecTimeOriginal = 0x9291,
}

impl ExifTag {
    /// Create an ExifTag from its numeric value.
    ///
    /// Returns `None` for tags the walker has no special knowledge of.
    pub fn from_u16(value: u16) -> Option<Self> {
        match value {
            0x0100 => Some(ExifTag::ImageWidth),
            0x0101 => Some(ExifTag::ImageHeight),
            0x010F => Some(ExifTag::Make),
            0x0110 => Some(ExifTag::Model),
            0x0112 => Some(ExifTag::Orientation),
            0x0129 => Some(ExifTag::PageNumber),
            0x0132 => Some(ExifTag::DateTime),
            0x014A => Some(ExifTag::SubIfdOffset),
            0x02BC => Some(ExifTag::ApplicationNotes),
            0x83BB => Some(ExifTag::IptcNaa),
            0x8649 => Some(ExifTag::PhotoshopSettings),
            0x8769 => Some(ExifTag::ExifSubIfdOffset),
            0x8773 => Some(ExifTag::InterColorProfile),
            0x8825 => Some(ExifTag::GpsInfoOffset),
            0x8827 => Some(ExifTag::IsoEquivalent),
            0x9003 => Some(ExifTag::DateTimeOriginal),
            0x927C => Some(ExifTag::Makernote),
            0x9286 => Some(ExifTag::UserComment),
            0x9291 => Some(ExifTag::SubSecTimeOriginal),
            0xA005 => Some(ExifTag::InteropOffset),
            _ => None,
        }
    }

    /// Get the numeric tag ID.
    #[inline]
    pub const fn as_u16(self) -> u16 {
        self as u16
    }

    /// Tag id as stored in a [`crate::Directory`].
    #[inline]
    pub const fn id(self) -> u32 {
        self as u32
    }
}

// =============================================================================
// Tests
// =============================================================================
