//! Top-level extraction entry points.
//!
//! A file is identified from its leading bytes, handed to the reader for
//! its container format, and finished with a File Type directory. Only
//! failures that leave no directory to carry them are returned as
//! [`ExtractError`]; everything else is recorded on the directory concerned.
//!
//! # Example
//!
//! ```
//! use image_metadata::{read_metadata, DirectoryKind};
//!
//! // A TIFF with one IFD0 entry: ImageWidth = 32
//! let tiff = [
//!     0x4D, 0x4D, 0x00, 0x2A, 0x00, 0x00, 0x00, 0x08, 0x00, 0x01, 0x01, 0x00, 0x00, 0x03,
//!     0x00, 0x00, 0x00, 0x01, 0x00, 0x20, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
//! ];
//! let metadata = read_metadata(tiff.to_vec()).unwrap();
//! let ifd0 = metadata.first(&DirectoryKind::ExifIfd0).unwrap();
//! assert_eq!(ifd0.get_int(0x0100), Some(32));
//! ```

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use bytes::Bytes;
use tracing::{debug, info};

use crate::config::ExtractOptions;
use crate::error::ExtractError;
use crate::format::{bmp, gif, jpeg, png, psd, tiff, FileType, FileTypeDetector};
use crate::io::ByteArrayReader;
use crate::metadata::Metadata;

/// Reads one container format into the metadata being built.
pub type ReadFn = fn(Bytes, &mut Metadata, &ExtractOptions) -> Result<(), ExtractError>;

/// Reader for each supported file type. Types not listed are detected but
/// unsupported.
pub const READERS: &[(FileType, ReadFn)] = &[
    (FileType::Jpeg, read_jpeg),
    (FileType::Tiff, read_tiff),
    (FileType::Cr2, read_tiff),
    (FileType::Orf, read_tiff),
    (FileType::Rw2, read_tiff),
    (FileType::Png, read_png),
    (FileType::Gif, read_gif),
    (FileType::Bmp, read_bmp),
    (FileType::Psd, read_psd),
];

fn read_jpeg(data: Bytes, metadata: &mut Metadata, options: &ExtractOptions) -> Result<(), ExtractError> {
    Ok(jpeg::read_jpeg(data, metadata, options)?)
}

fn read_tiff(data: Bytes, metadata: &mut Metadata, options: &ExtractOptions) -> Result<(), ExtractError> {
    Ok(tiff::read_tiff(&ByteArrayReader::new(data), metadata, options)?)
}

fn read_png(data: Bytes, metadata: &mut Metadata, options: &ExtractOptions) -> Result<(), ExtractError> {
    Ok(png::read_png(data, metadata, options)?)
}

fn read_gif(data: Bytes, metadata: &mut Metadata, _options: &ExtractOptions) -> Result<(), ExtractError> {
    gif::read_gif(data, metadata);
    Ok(())
}

fn read_bmp(data: Bytes, metadata: &mut Metadata, _options: &ExtractOptions) -> Result<(), ExtractError> {
    bmp::read_bmp(data, metadata);
    Ok(())
}

fn read_psd(data: Bytes, metadata: &mut Metadata, options: &ExtractOptions) -> Result<(), ExtractError> {
    psd::read_psd(data, metadata, options);
    Ok(())
}

fn reader_for(file_type: FileType) -> Option<ReadFn> {
    READERS
        .iter()
        .find(|(t, _)| *t == file_type)
        .map(|(_, read)| *read)
}

// =============================================================================
// Entry Points
// =============================================================================

/// Read metadata from a complete file held in memory, with default options.
///
/// # Errors
/// See [`read_metadata_with`].
pub fn read_metadata(data: impl Into<Bytes>) -> Result<Metadata, ExtractError> {
    read_metadata_with(data, &ExtractOptions::default())
}

/// Detect the file type and read its metadata.
///
/// # Errors
/// - `UnknownFileType` if the leading bytes match no signature
/// - `UnsupportedFileType` if the type is recognised but has no reader
/// - `Detector` if the signature table could not be built
/// - a container error if the file's outer structure is broken
pub fn read_metadata_with(
    data: impl Into<Bytes>,
    options: &ExtractOptions,
) -> Result<Metadata, ExtractError> {
    let data = data.into();
    let detector = FileTypeDetector::shared()?;
    let file_type = detector.detect(&data);
    debug!(%file_type, len = data.len(), "detected file type");
    read_metadata_as(data, file_type, options)
}

/// Read metadata treating the data as `file_type`, skipping detection.
///
/// # Errors
/// As [`read_metadata_with`].
pub fn read_metadata_as(
    data: impl Into<Bytes>,
    file_type: FileType,
    options: &ExtractOptions,
) -> Result<Metadata, ExtractError> {
    if file_type == FileType::Unknown {
        return Err(ExtractError::UnknownFileType);
    }
    let read = reader_for(file_type).ok_or(ExtractError::UnsupportedFileType(file_type.name()))?;

    let mut metadata = Metadata::new();
    read(data.into(), &mut metadata, options)?;
    metadata.add_directory(file_type.directory());

    info!(
        %file_type,
        directories = metadata.directory_count(),
        errors = metadata.has_errors(),
        "metadata read"
    );
    Ok(metadata)
}

/// Read a whole stream into memory, then extract as [`read_metadata_with`].
///
/// TIFF-based formats need random access, so the stream is buffered in
/// full regardless of format.
///
/// # Errors
/// `Io` if reading the stream fails, otherwise as [`read_metadata_with`].
pub fn read_metadata_from_reader(
    mut reader: impl Read,
    options: &ExtractOptions,
) -> Result<Metadata, ExtractError> {
    let mut buf = Vec::new();
    reader.read_to_end(&mut buf)?;
    read_metadata_with(buf, options)
}

/// Open and read a file from disk.
///
/// # Errors
/// As [`read_metadata_from_reader`].
pub fn read_metadata_from_path(
    path: impl AsRef<Path>,
    options: &ExtractOptions,
) -> Result<Metadata, ExtractError> {
    let file = File::open(path.as_ref())?;
    read_metadata_from_reader(BufReader::new(file), options)
}

// =============================================================================
// Tests
// =============================================================================
