use thiserror::Error;

/// Errors raised by the random-access and sequential binary readers.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReaderError {
    /// Requested range extends past the end of the underlying data
    #[error(
        "Attempt to read from beyond end of underlying data source \
         (requested index: {index}, requested count: {count}, max index: {max_index})"
    )]
    BufferBounds {
        index: i64,
        count: i64,
        max_index: i64,
    },

    /// Random-access read with a negative index
    #[error("Attempt to read from buffer using a negative index ({0})")]
    NegativeIndex(i64),

    /// Index plus count does not fit in the address space
    #[error(
        "Number of requested bytes summed with starting index exceed maximum range \
         (requested index: {index}, requested count: {count})"
    )]
    Overflow { index: i64, count: u64 },

    /// Sequential read or skip past the end of the data
    #[error("End of data reached (requested {requested} bytes, {available} available)")]
    EndOfData { requested: u64, available: u64 },

    /// Underlying stream failed for a reason other than running dry
    #[error("I/O error while reading: {0}")]
    Io(String),
}

/// Errors raised while building a [`crate::ByteTrie`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ByteTrieError {
    /// A path with no bytes cannot identify a node
    #[error("Parts must contain at least one byte.")]
    EmptyPath,
}

/// Errors that can occur when splitting a JPEG stream into segments
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum JpegError {
    /// Stream does not start with the SOI marker
    #[error("JPEG data is expected to begin with 0xFFD8 not 0x{0:04X}")]
    InvalidMagic(u16),

    /// Segment length field smaller than its own two bytes
    #[error("JPEG segment size would be less than zero")]
    NegativeSegmentLength,

    /// Underlying read failed
    #[error(transparent)]
    Reader(#[from] ReaderError),
}

/// Errors that can occur when reading PNG chunks
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PngError {
    /// Chunk type identifier has the wrong number of bytes
    #[error("PNG chunk type identifier must be four bytes in length")]
    InvalidChunkTypeLength,

    /// Chunk type identifier contains a non-alphabetic byte
    #[error("PNG chunk type identifier may only contain alphabet characters")]
    InvalidChunkTypeCharacter,

    /// First eight bytes are not the PNG signature
    #[error("PNG signature mismatch")]
    SignatureMismatch,

    /// Chunk length with the high bit set
    #[error("PNG chunk length exceeds maximum")]
    ChunkLengthExceedsMaximum,

    /// A chunk that may appear once appeared again
    #[error("Observed multiple instances of PNG chunk '{0}', for which multiples are not allowed")]
    DuplicateChunk(String),

    /// Some chunk arrived before IHDR
    #[error("First chunk should be 'IHDR', but '{0}' was observed")]
    MissingHeader(String),

    /// Underlying read failed
    #[error(transparent)]
    Reader(#[from] ReaderError),
}

/// Errors that can occur when parsing a TIFF header
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TiffError {
    /// Byte order bytes are neither II nor MM
    #[error("Unclear distinction between Motorola/Intel byte ordering: 0x{0:04X}")]
    InvalidByteOrder(u16),

    /// Marker after the byte order is not a known TIFF variant
    #[error("Unexpected TIFF marker: 0x{0:04X}")]
    UnexpectedMarker(u16),

    /// BigTIFF offset byte size other than 8
    #[error("Invalid BigTIFF offset byte size: expected 8, got {0}")]
    InvalidBigTiffOffsetSize(u16),

    /// Makernote signature table could not be built
    #[error("Invalid makernote signature: {0}")]
    Signature(#[from] ByteTrieError),

    /// Underlying read failed
    #[error(transparent)]
    Reader(#[from] ReaderError),
}

/// Top-level failures of an extraction call.
///
/// These are only returned when no directory exists yet to carry the
/// problem; everything after that point is recorded as a directory error.
#[derive(Debug, Clone, Error)]
pub enum ExtractError {
    /// Leading bytes match no known signature
    #[error("File format could not be determined")]
    UnknownFileType,

    /// Format was recognised but has no reader
    #[error("File format is not supported: {0}")]
    UnsupportedFileType(&'static str),

    /// Reading the byte source failed
    #[error("I/O error: {0}")]
    Io(String),

    /// The signature table behind file type detection is malformed
    #[error("File type detector could not be built: {0}")]
    Detector(#[from] ByteTrieError),

    /// JPEG structure error
    #[error("JPEG error: {0}")]
    Jpeg(#[from] JpegError),

    /// PNG structure error
    #[error("PNG error: {0}")]
    Png(#[from] PngError),

    /// TIFF structure error
    #[error("TIFF error: {0}")]
    Tiff(#[from] TiffError),

    /// Read past the available data
    #[error("Read error: {0}")]
    Reader(#[from] ReaderError),
}

impl From<std::io::Error> for ExtractError {
    fn from(e: std::io::Error) -> Self {
        ExtractError::Io(e.to_string())
    }
}
