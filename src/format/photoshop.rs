//! Photoshop image resource blocks.
//!
//! Found in JPEG APP13 segments, PSD files and the TIFF Photoshop tag.
//! Each block is laid out as:
//!
//! ```text
//! signature (4) | resource id (2) | Pascal name, padded to even | size (4) | data, padded to even
//! ```
//!
//! Blocks carrying IPTC, ICC, Exif or XMP are handed to those decoders;
//! everything else is stored raw under its resource id.

use bytes::Bytes;
use tracing::{debug, warn};

use super::{icc, iptc, tiff, xmp};
use crate::config::ExtractOptions;
use crate::error::ReaderError;
use crate::io::{ByteArrayReader, SequentialByteArrayReader, SequentialReader};
use crate::metadata::{Directory, DirectoryKind, Metadata};

// =============================================================================
// Resource Ids
// =============================================================================

pub const TAG_RESOLUTION_INFO: u32 = 0x03ED;
pub const TAG_IPTC: u32 = 0x0404;
pub const TAG_JPEG_QUALITY: u32 = 0x0406;
pub const TAG_COPYRIGHT: u32 = 0x040A;
pub const TAG_URL: u32 = 0x040B;
pub const TAG_THUMBNAIL: u32 = 0x040C;
pub const TAG_ICC_PROFILE_BYTES: u32 = 0x040F;
pub const TAG_VERSION: u32 = 0x0421;
pub const TAG_EXIF_DATA_1: u32 = 0x0422;
pub const TAG_EXIF_DATA_3: u32 = 0x0423;
pub const TAG_XMP_DATA: u32 = 0x0424;

/// Signatures used by Photoshop and other Adobe products
const VALID_SIGNATURES: &[&[u8; 4]] = &[b"8BIM", b"MeSa", b"PHUT", b"AgHg", b"DCSR"];

/// Resources that carry another metadata format.
#[derive(Debug)]
enum Embedded {
    Iptc(Bytes),
    Icc(Bytes),
    Exif(Bytes),
    Xmp(Bytes),
}

/// Decode a run of image resource blocks.
///
/// The Photoshop directory is added first, followed by any directories
/// produced from embedded payloads in block order.
pub fn read_photoshop(data: Bytes, metadata: &mut Metadata, options: &ExtractOptions) {
    let mut directory = Directory::new(DirectoryKind::Photoshop);
    let mut embedded = Vec::new();

    let mut reader = SequentialByteArrayReader::new(data);
    while reader.available().unwrap_or(0) > 0 {
        if let Err(e) = read_block(&mut reader, &mut directory, &mut embedded) {
            warn!("Photoshop resource block unreadable: {e}");
            directory.add_error(e.to_string());
            break;
        }
    }
    metadata.add_directory(directory);

    for payload in embedded {
        debug!(?payload, "Photoshop embedded payload");
        match payload {
            Embedded::Iptc(bytes) => iptc::read_iptc(&bytes, metadata),
            Embedded::Icc(bytes) => icc::read_icc(bytes, metadata),
            Embedded::Xmp(bytes) => xmp::read_xmp(&bytes, metadata),
            Embedded::Exif(bytes) => {
                if let Err(e) = tiff::read_tiff(&ByteArrayReader::new(bytes), metadata, options) {
                    let mut exif = Directory::new(DirectoryKind::ExifIfd0);
                    exif.add_error(format!("Exception processing TIFF data: {e}"));
                    metadata.add_directory(exif);
                }
            }
        }
    }
}

fn read_block(
    reader: &mut SequentialByteArrayReader,
    directory: &mut Directory,
    embedded: &mut Vec<Embedded>,
) -> Result<(), ReaderError> {
    let signature = reader.get_bytes(4)?;
    let resource_id = reader.get_u16()?;

    // Pascal string: length byte plus text, the pair padded to even length
    let name_len = reader.get_u8()?;
    reader.skip(u64::from(name_len))?;
    if name_len % 2 == 0 {
        reader.skip(1)?;
    }

    let size = reader.get_u32()?;
    let data = reader.get_bytes(size as usize)?;
    if size % 2 != 0 {
        // final pad byte is often missing at the very end
        reader.try_skip(1);
    }

    if !VALID_SIGNATURES.iter().any(|s| signature[..] == s[..]) {
        debug!(resource_id, "Skipping resource with unknown signature");
        return Ok(());
    }

    let tag = u32::from(resource_id);
    match tag {
        TAG_IPTC => embedded.push(Embedded::Iptc(data)),
        TAG_ICC_PROFILE_BYTES => embedded.push(Embedded::Icc(data)),
        TAG_EXIF_DATA_1 | TAG_EXIF_DATA_3 => embedded.push(Embedded::Exif(data)),
        TAG_XMP_DATA => embedded.push(Embedded::Xmp(data)),
        _ => directory.set(tag, data.to_vec()),
    }
    Ok(())
}

// =============================================================================
// Tests
// =============================================================================
