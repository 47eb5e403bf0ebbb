//! Directory kinds.

use std::fmt;

use serde::{Serialize, Serializer};

use crate::format::png::PngChunkType;

/// Vendor-specific makernote layouts the IFD walker can decode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MakernoteVendor {
    Olympus,
    NikonType1,
    NikonType2,
    SonyType1,
    SonyType6,
    Sigma,
    Kodak,
    Canon,
    CasioType1,
    CasioType2,
    Fujifilm,
    Kyocera,
    LeicaType5,
    Leica,
    Panasonic,
    Pentax,
    Sanyo,
    Ricoh,
    Apple,
    Samsung,
    Dji,
    /// Signature matched nothing known; raw bytes are kept
    Unknown,
}

impl MakernoteVendor {
    pub fn name(&self) -> &'static str {
        match self {
            MakernoteVendor::Olympus => "Olympus Makernote",
            MakernoteVendor::NikonType1 => "Nikon Makernote",
            MakernoteVendor::NikonType2 => "Nikon Makernote",
            MakernoteVendor::SonyType1 => "Sony Makernote",
            MakernoteVendor::SonyType6 => "Sony Makernote",
            MakernoteVendor::Sigma => "Sigma Makernote",
            MakernoteVendor::Kodak => "Kodak Makernote",
            MakernoteVendor::Canon => "Canon Makernote",
            MakernoteVendor::CasioType1 => "Casio Makernote",
            MakernoteVendor::CasioType2 => "Casio Makernote",
            MakernoteVendor::Fujifilm => "Fujifilm Makernote",
            MakernoteVendor::Kyocera => "Kyocera/Contax Makernote",
            MakernoteVendor::LeicaType5 => "Leica Makernote",
            MakernoteVendor::Leica => "Leica Makernote",
            MakernoteVendor::Panasonic => "Panasonic Makernote",
            MakernoteVendor::Pentax => "Pentax Makernote",
            MakernoteVendor::Sanyo => "Sanyo Makernote",
            MakernoteVendor::Ricoh => "Ricoh Makernote",
            MakernoteVendor::Apple => "Apple Makernote",
            MakernoteVendor::Samsung => "Samsung Makernote",
            MakernoteVendor::Dji => "DJI Makernote",
            MakernoteVendor::Unknown => "Unknown Makernote",
        }
    }
}

/// The logical group a [`super::Directory`] belongs to.
///
/// "First directory of type X" lookups on [`super::Metadata`] compare
/// against this value.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DirectoryKind {
    FileType,

    // JPEG
    Jpeg,
    Jfif,
    Jfxx,
    AdobeJpeg,
    JpegComment,
    HuffmanTables,

    // Exif / TIFF
    ExifIfd0,
    ExifSubIfd,
    ExifInterop,
    ExifThumbnail,
    ExifImage,
    Gps,
    Makernote(MakernoteVendor),

    // Embedded payloads
    Iptc,
    Icc,
    Photoshop,
    Xmp,

    // Other containers
    Png(PngChunkType),
    GifHeader,
    GifControl,
    GifAnimation,
    GifComment,
    GifImage,
    BmpHeader,
    PsdHeader,
}

impl DirectoryKind {
    pub fn name(&self) -> String {
        let name = match self {
            DirectoryKind::FileType => "File Type",
            DirectoryKind::Jpeg => "JPEG",
            DirectoryKind::Jfif => "JFIF",
            DirectoryKind::Jfxx => "JFXX",
            DirectoryKind::AdobeJpeg => "Adobe JPEG",
            DirectoryKind::JpegComment => "JpegComment",
            DirectoryKind::HuffmanTables => "Huffman",
            DirectoryKind::ExifIfd0 => "Exif IFD0",
            DirectoryKind::ExifSubIfd => "Exif SubIFD",
            DirectoryKind::ExifInterop => "Interoperability",
            DirectoryKind::ExifThumbnail => "Exif Thumbnail",
            DirectoryKind::ExifImage => "Exif Image",
            DirectoryKind::Gps => "GPS",
            DirectoryKind::Makernote(vendor) => vendor.name(),
            DirectoryKind::Iptc => "IPTC",
            DirectoryKind::Icc => "ICC Profile",
            DirectoryKind::Photoshop => "Photoshop",
            DirectoryKind::Xmp => "XMP",
            DirectoryKind::Png(chunk_type) => return format!("PNG-{chunk_type}"),
            DirectoryKind::GifHeader => "GIF Header",
            DirectoryKind::GifControl => "GIF Control",
            DirectoryKind::GifAnimation => "GIF Animation",
            DirectoryKind::GifComment => "GIF Comment",
            DirectoryKind::GifImage => "GIF Image",
            DirectoryKind::BmpHeader => "BMP Header",
            DirectoryKind::PsdHeader => "PSD Header",
        };
        name.to_string()
    }

    /// Directories produced by the IFD walker.
    pub fn is_exif(&self) -> bool {
        matches!(
            self,
            DirectoryKind::ExifIfd0
                | DirectoryKind::ExifSubIfd
                | DirectoryKind::ExifInterop
                | DirectoryKind::ExifThumbnail
                | DirectoryKind::ExifImage
                | DirectoryKind::Gps
                | DirectoryKind::Makernote(_)
        )
    }
}

impl fmt::Display for DirectoryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name())
    }
}

impl Serialize for DirectoryKind {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.name())
    }
}
