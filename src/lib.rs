//! # Image Metadata
//!
//! Extracts camera, GPS, colour-profile and container metadata from image
//! files without decoding any pixel data.
//!
//! ## Features
//!
//! - **Container formats**: JPEG, TIFF (and TIFF-based raw formats), PNG,
//!   GIF, BMP and PSD
//! - **Embedded payloads**: Exif, IPTC, ICC profiles, XMP packets and
//!   Photoshop image resources, wherever a container carries them
//! - **Makernotes**: vendor blocks are recognised by signature and walked
//!   with the right byte order and offset base
//! - **Partial results**: a damaged segment or IFD is recorded as an error
//!   on its directory; everything else is still returned
//!
//! ## Architecture
//!
//! - [`io`] - bounds-checked random-access and sequential readers
//! - [`metadata`] - the [`Metadata`] / [`Directory`] result model
//! - [`mod@format`] - container splitters and payload decoders
//! - [`extract`] - file type detection and dispatch
//! - [`config`] - options and the dump tool's command line
//!
//! ## Example
//!
//! ```rust,no_run
//! use image_metadata::{read_metadata_from_path, ExtractOptions};
//!
//! let metadata = read_metadata_from_path("photo.jpg", &ExtractOptions::default())?;
//! for directory in metadata.iter() {
//!     for tag in directory.tags() {
//!         println!("[{}] 0x{:04X} = {}", directory.name(), tag.id, tag.value);
//!     }
//!     for error in directory.errors() {
//!         eprintln!("[{}] error: {}", directory.name(), error);
//!     }
//! }
//! # Ok::<(), image_metadata::ExtractError>(())
//! ```

pub mod byte_trie;
pub mod charset;
pub mod config;
pub mod error;
pub mod extract;
pub mod format;
pub mod io;
pub mod metadata;
pub mod rational;

// Re-export commonly used types
pub use byte_trie::ByteTrie;
pub use charset::{decode_user_comment, Charset};
pub use config::{Cli, ExtractOptions, OutputFormat};
pub use error::{ByteTrieError, ExtractError, JpegError, PngError, ReaderError, TiffError};
pub use extract::{
    read_metadata, read_metadata_as, read_metadata_from_path, read_metadata_from_reader,
    read_metadata_with,
};
pub use format::{detect_file_type, FileType};
pub use io::{ByteArrayReader, ByteOrder, RandomAccessReader, SequentialByteArrayReader, SequentialReader};
pub use metadata::{
    Directory, DirectoryKind, KeyValuePair, MakernoteVendor, Metadata, StringValue, Tag, TagValue,
};
pub use rational::Rational;
