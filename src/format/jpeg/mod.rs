//! JPEG metadata.
//!
//! Reading is two passes: [`read_segments`] splits the stream into marker
//! segments, then [`process_segments`] hands each group of segments to the
//! decoders in [`SEGMENT_HANDLERS`].
//!
//! # Segments Decoded
//!
//! | Marker | Preamble | Directory |
//! |--------|----------|-----------|
//! | SOFn | | JPEG |
//! | COM | | JPEG comment |
//! | APP0 | `JFIF`, `JFXX` | JFIF, JFXX |
//! | APP1 | `Exif\0\0` | Exif IFDs via the TIFF walker |
//! | APP1 | XMP namespace URI | XMP |
//! | APP2 | `ICC_PROFILE` | ICC (chunks joined) |
//! | APP13 | `Photoshop 3.0` | Photoshop resources |
//! | APP14 | `Adobe` | Adobe JPEG |
//! | DHT | | Huffman tables |

mod readers;
mod segment;

use bytes::Bytes;

use crate::config::ExtractOptions;
use crate::error::JpegError;
use crate::io::SequentialByteArrayReader;
use crate::metadata::{DirectoryKind, Metadata};

pub use readers::{
    adobe_tags, handled_segment_types, jfif_tags, jpeg_tags, process_segments, SegmentHandler,
    SegmentReadFn, ADOBE_PREAMBLE, COMMENT_TAG, EXIF_PREAMBLE, HUFFMAN_TABLE_COUNT_TAG,
    ICC_PREAMBLE, JFIF_PREAMBLE, JFXX_PREAMBLE, PHOTOSHOP_PREAMBLE, SEGMENT_HANDLERS,
    XMP_PREAMBLE,
};
pub use segment::{read_segments, JpegSegmentData, JpegSegmentType, SOI};

/// Read all metadata from a complete JPEG file.
///
/// A structural fault after some segments were read keeps those segments
/// and is recorded on the JPEG directory.
///
/// # Errors
/// Only structural problems met before any segment was kept are errors; see
/// [`read_segments`]. Problems inside a segment land on its directory.
pub fn read_jpeg(
    data: Bytes,
    metadata: &mut Metadata,
    options: &ExtractOptions,
) -> Result<(), JpegError> {
    let mut reader = SequentialByteArrayReader::new(data);
    let segments = read_segments(&mut reader, Some(&handled_segment_types()))?;
    process_segments(&segments, metadata, options);
    if let Some(e) = segments.error() {
        let idx = metadata.first_or_insert(DirectoryKind::Jpeg);
        if let Some(directory) = metadata.directory_mut(idx) {
            directory.add_error(e.to_string());
        }
    }
    Ok(())
}
