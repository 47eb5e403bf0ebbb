//! JPEG marker segments.
//!
//! A JPEG file is a sequence of marker segments: `FF xx` followed, for most
//! markers, by a two-byte big-endian length that counts itself. Metadata
//! lives in the segments before the first scan (SOS), so reading stops
//! there.

use std::collections::HashMap;

use bytes::Bytes;
use tracing::{debug, warn};

use crate::error::JpegError;
use crate::io::{ByteOrder, SequentialReader};

// =============================================================================
// Segment Types
// =============================================================================

macro_rules! segment_types {
    ($($(#[$doc:meta])* $name:ident = $byte:literal, $metadata:literal;)*) => {
        /// JPEG marker codes, keyed by the byte following `0xFF`.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        #[repr(u8)]
        pub enum JpegSegmentType {
            $($(#[$doc])* $name = $byte,)*
        }

        impl JpegSegmentType {
            /// Every known segment type.
            pub const ALL: &'static [JpegSegmentType] = &[$(JpegSegmentType::$name),*];

            pub fn from_u8(value: u8) -> Option<Self> {
                match value {
                    $($byte => Some(JpegSegmentType::$name),)*
                    _ => None,
                }
            }

            /// Whether segments of this type are ever decoded into metadata.
            pub const fn can_contain_metadata(self) -> bool {
                match self {
                    $(JpegSegmentType::$name => $metadata,)*
                }
            }
        }
    };
}

segment_types! {
    /// Start of image
    Soi = 0xD8, false;
    /// End of image
    Eoi = 0xD9, false;
    /// Start of scan
    Sos = 0xDA, false;
    /// Define quantization table
    Dqt = 0xDB, false;
    /// Define number of lines
    Dnl = 0xDC, false;
    /// Define restart interval
    Dri = 0xDD, false;
    /// Define hierarchical progression
    Dhp = 0xDE, false;
    /// Expand reference components
    Exp = 0xDF, false;
    /// Define Huffman table
    Dht = 0xC4, true;
    /// Define arithmetic coding conditioning
    Dac = 0xCC, false;

    Sof0 = 0xC0, true;
    Sof1 = 0xC1, true;
    Sof2 = 0xC2, true;
    Sof3 = 0xC3, true;
    Sof5 = 0xC5, true;
    Sof6 = 0xC6, true;
    Sof7 = 0xC7, true;
    /// Reserved for JPEG extensions
    Jpg = 0xC8, false;
    Sof9 = 0xC9, true;
    Sof10 = 0xCA, true;
    Sof11 = 0xCB, true;
    Sof13 = 0xCD, true;
    Sof14 = 0xCE, true;
    Sof15 = 0xCF, true;

    /// JFIF, JFXX
    App0 = 0xE0, true;
    /// Exif, XMP
    App1 = 0xE1, true;
    /// ICC profile
    App2 = 0xE2, true;
    App3 = 0xE3, true;
    App4 = 0xE4, true;
    App5 = 0xE5, true;
    App6 = 0xE6, true;
    App7 = 0xE7, true;
    App8 = 0xE8, true;
    App9 = 0xE9, true;
    AppA = 0xEA, true;
    AppB = 0xEB, true;
    AppC = 0xEC, true;
    /// Photoshop resources, IPTC
    AppD = 0xED, true;
    /// Adobe
    AppE = 0xEE, true;
    AppF = 0xEF, true;

    /// Comment
    Com = 0xFE, true;

    Rst0 = 0xD0, false;
    Rst1 = 0xD1, false;
    Rst2 = 0xD2, false;
    Rst3 = 0xD3, false;
    Rst4 = 0xD4, false;
    Rst5 = 0xD5, false;
    Rst6 = 0xD6, false;
    Rst7 = 0xD7, false;
}

impl JpegSegmentType {
    /// Start-of-frame markers (all but DHT, JPG and DAC in 0xC0..=0xCF).
    pub const SOF: &'static [JpegSegmentType] = &[
        JpegSegmentType::Sof0,
        JpegSegmentType::Sof1,
        JpegSegmentType::Sof2,
        JpegSegmentType::Sof3,
        JpegSegmentType::Sof5,
        JpegSegmentType::Sof6,
        JpegSegmentType::Sof7,
        JpegSegmentType::Sof9,
        JpegSegmentType::Sof10,
        JpegSegmentType::Sof11,
        JpegSegmentType::Sof13,
        JpegSegmentType::Sof14,
        JpegSegmentType::Sof15,
    ];

    #[inline]
    pub const fn as_u8(self) -> u8 {
        self as u8
    }

    /// Markers that stand alone with no length field.
    pub const fn is_standalone(self) -> bool {
        matches!(
            self,
            JpegSegmentType::Soi
                | JpegSegmentType::Rst0
                | JpegSegmentType::Rst1
                | JpegSegmentType::Rst2
                | JpegSegmentType::Rst3
                | JpegSegmentType::Rst4
                | JpegSegmentType::Rst5
                | JpegSegmentType::Rst6
                | JpegSegmentType::Rst7
        )
    }
}

/// Start Of Image magic
pub const SOI: u16 = 0xFFD8;

/// Temporary arithmetic coding marker, standalone
const TEM: u8 = 0x01;

// =============================================================================
// JpegSegmentData
// =============================================================================

/// Segment payloads grouped by type, each group in file order, plus the
/// structural fault that ended the read early, if any.
#[derive(Debug, Clone, Default)]
pub struct JpegSegmentData {
    segments: HashMap<JpegSegmentType, Vec<Bytes>>,
    error: Option<JpegError>,
}

impl JpegSegmentData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_segment(&mut self, segment_type: JpegSegmentType, payload: Bytes) {
        self.segments.entry(segment_type).or_default().push(payload);
    }

    /// All payloads of one type, in the order they appeared.
    pub fn segments(&self, segment_type: JpegSegmentType) -> &[Bytes] {
        self.segments
            .get(&segment_type)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// The `occurrence`th payload of one type.
    pub fn segment(&self, segment_type: JpegSegmentType, occurrence: usize) -> Option<&Bytes> {
        self.segments(segment_type).get(occurrence)
    }

    pub fn segment_count(&self, segment_type: JpegSegmentType) -> usize {
        self.segments(segment_type).len()
    }

    pub fn contains(&self, segment_type: JpegSegmentType) -> bool {
        self.segment_count(segment_type) > 0
    }

    /// Types with at least one payload, in no particular order.
    pub fn segment_types(&self) -> impl Iterator<Item = JpegSegmentType> + '_ {
        self.segments.keys().copied()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// The fault that stopped segment reading before SOS or EOI.
    pub fn error(&self) -> Option<&JpegError> {
        self.error.as_ref()
    }

    pub fn set_error(&mut self, error: JpegError) {
        self.error = Some(error);
    }
}

// =============================================================================
// Segment Reader
// =============================================================================

/// Split a JPEG stream into segments, keeping those whose type passes
/// `filter` (all of them when `filter` is `None`).
///
/// Reading stops at the first SOS or EOI marker. Running out of data part
/// way through is not an error; whatever was read so far is returned. A
/// structural fault after at least one kept segment also ends the read, and
/// is kept in [`JpegSegmentData::error`] next to the segments.
///
/// # Errors
/// - `InvalidMagic` if the stream does not start with `FF D8`
/// - `NegativeSegmentLength` for a length field below 2 met before any
///   segment was kept
/// - `Reader` if the stream is too short to hold the magic
pub fn read_segments<R: SequentialReader + ?Sized>(
    reader: &mut R,
    filter: Option<&[JpegSegmentType]>,
) -> Result<JpegSegmentData, JpegError> {
    reader.set_byte_order(ByteOrder::BigEndian);

    let magic = reader.get_u16()?;
    if magic != SOI {
        return Err(JpegError::InvalidMagic(magic));
    }

    let mut data = JpegSegmentData::new();
    loop {
        match next_segment(reader, filter, &mut data) {
            Ok(true) => {}
            Ok(false) => break,
            Err(JpegError::Reader(e)) => {
                debug!(position = reader.position(), "JPEG data ended early: {e}");
                break;
            }
            Err(e) if data.is_empty() => return Err(e),
            Err(e) => {
                warn!(position = reader.position(), "JPEG segment stream stopped: {e}");
                data.set_error(e);
                break;
            }
        }
    }
    Ok(data)
}

/// Read one segment. Returns `false` once there is nothing more to read.
fn next_segment<R: SequentialReader + ?Sized>(
    reader: &mut R,
    filter: Option<&[JpegSegmentType]>,
    data: &mut JpegSegmentData,
) -> Result<bool, JpegError> {
    // Seek to the next 0xFF, then past any fill bytes
    let mut skipped = 0u64;
    while reader.get_u8()? != 0xFF {
        skipped += 1;
    }
    if skipped > 0 {
        debug!(skipped, "Skipped bytes between JPEG segments");
    }
    let mut marker = reader.get_u8()?;
    while marker == 0xFF {
        marker = reader.get_u8()?;
    }
    if marker == 0x00 || marker == TEM {
        return Ok(true);
    }

    let segment_type = JpegSegmentType::from_u8(marker);
    match segment_type {
        Some(JpegSegmentType::Sos) | Some(JpegSegmentType::Eoi) => return Ok(false),
        Some(t) if t.is_standalone() => return Ok(true),
        _ => {}
    }

    let length = reader.get_u16()?;
    let payload_len = length
        .checked_sub(2)
        .ok_or(JpegError::NegativeSegmentLength)? as usize;

    match segment_type {
        Some(t) if filter.map_or(true, |f| f.contains(&t)) => {
            let payload = reader.get_bytes(payload_len)?;
            debug!(marker = format_args!("0x{marker:02X}"), len = payload_len, "JPEG segment");
            data.add_segment(t, payload);
        }
        _ => {
            if !reader.try_skip(payload_len as u64) {
                return Ok(false);
            }
        }
    }
    Ok(true)
}

// =============================================================================
// Tests
// =============================================================================
