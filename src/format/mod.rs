//! Container formats and the metadata payloads they carry.
//!
//! Containers ([`jpeg`], [`tiff`], [`png`], [`gif`], [`bmp`], [`psd`]) split
//! a file into segments or chunks. Payload readers ([`iptc`], [`icc`],
//! [`photoshop`], [`xmp`]) decode blocks that several containers embed.
//!
//! # Format Detection
//!
//! Use [`detect::detect_file_type`] to identify a file from its leading
//! bytes before choosing a reader.

pub mod bmp;
pub mod detect;
pub mod gif;
pub mod icc;
pub mod iptc;
pub mod jpeg;
pub mod photoshop;
pub mod png;
pub mod psd;
pub mod tiff;
pub mod xmp;

pub use detect::{detect_file_type, FileType, FileTypeDetector};
