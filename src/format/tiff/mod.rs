//! TIFF and Exif decoding.
//!
//! Exif data is a TIFF structure in its own right, so one walker serves
//! standalone TIFF files, raw camera formats built on TIFF, and Exif blocks
//! embedded in JPEG, PNG, PSD and Photoshop resources.
//!
//! # Key Concepts
//!
//! - **Byte order**: TIFF data declares its endianness (II = little-endian,
//!   MM = big-endian) in the header. Individual IFDs written in the other
//!   order are detected and read correctly.
//!
//! - **Classic TIFF vs BigTIFF**: Classic TIFF uses 32-bit offsets while
//!   BigTIFF uses 64-bit offsets. The walker handles both.
//!
//! - **IFD (Image File Directory)**: A list of tagged values plus a link to
//!   the next IFD. Some tags point at further IFDs (Exif SubIFD, GPS,
//!   Interop, makernotes), which become directories of their own.
//!
//! - **Inline vs offset values**: Values of up to four bytes (eight in
//!   BigTIFF) are stored in the entry itself, larger ones at an offset.

mod header;
mod makernote;
mod tags;
mod walker;

pub use header::{
    TiffHeader, BIGTIFF_HEADER_SIZE, MARKER_BIGTIFF, MARKER_OLYMPUS_ORF, MARKER_OLYMPUS_ORF_ALT,
    MARKER_PANASONIC_RW2, MARKER_TIFF, TIFF_HEADER_SIZE,
};
pub use makernote::{
    IfdStart, LayoutByteOrder, MakernoteAction, MakernoteLayout, MakernoteSignatures, OffsetBase,
};
pub use tags::{DataFormat, ExifTag};
pub use walker::read_tiff;
