//! PNG metadata.
//!
//! # Structure
//! ```text
//! signature (8) | IHDR chunk | ... | IEND chunk
//! ```
//!
//! Only chunks in [`METADATA_CHUNKS`] are buffered; image data is skipped.
//! A structural fault before any chunk is kept is returned to the caller.
//! Later structural faults end the chunk stream and are recorded on the IHDR
//! directory, and faults inside a chunk's payload become errors on that
//! chunk's directory.

mod chunk;
mod reader;

pub use chunk::{read_chunks, PngChunk, PngChunkType, PngChunks, PNG_SIGNATURE};
pub use reader::{chromaticities, process_chunk, METADATA_CHUNKS};
pub use reader::{
    TAG_BACKGROUND_COLOR, TAG_BITS_PER_SAMPLE, TAG_COLOR_TYPE, TAG_COMPRESSION_TYPE,
    TAG_FILTER_METHOD, TAG_GAMMA, TAG_ICC_PROFILE_NAME, TAG_IMAGE_HEIGHT, TAG_IMAGE_WIDTH,
    TAG_INTERLACE_METHOD, TAG_LAST_MODIFICATION_TIME, TAG_PALETTE_HAS_TRANSPARENCY,
    TAG_PALETTE_SIZE, TAG_PIXELS_PER_UNIT_X, TAG_PIXELS_PER_UNIT_Y, TAG_SIGNIFICANT_BITS,
    TAG_SRGB_RENDERING_INTENT, TAG_TEXTUAL_DATA, TAG_UNIT_SPECIFIER,
};

use bytes::Bytes;
use tracing::debug;

use crate::config::ExtractOptions;
use crate::error::PngError;
use crate::io::SequentialByteArrayReader;
use crate::metadata::{DirectoryKind, Metadata};

/// Read every metadata chunk of a PNG file into `metadata`.
///
/// # Errors
/// Returns the chunk reader's error when nothing could be read, such as a
/// bad signature or a first chunk other than IHDR.
pub fn read_png(data: Bytes, metadata: &mut Metadata, options: &ExtractOptions) -> Result<(), PngError> {
    let mut reader = SequentialByteArrayReader::new(data);
    let chunks = read_chunks(&mut reader, Some(METADATA_CHUNKS))?;
    debug!(chunks = chunks.chunks.len(), "PNG metadata chunks");

    for chunk in &chunks.chunks {
        process_chunk(chunk, metadata, options);
    }
    if let Some(e) = chunks.error {
        let idx = metadata.first_or_insert(DirectoryKind::Png(PngChunkType::IHDR));
        if let Some(directory) = metadata.directory_mut(idx) {
            directory.add_error(e.to_string());
        }
    }
    Ok(())
}
