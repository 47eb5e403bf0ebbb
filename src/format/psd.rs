//! Photoshop PSD / PSB files.
//!
//! ```text
//! "8BPS" | version (2) | reserved (6) | channels (2) | height (4) | width (4)
//! bits per channel (2) | colour mode (2)
//! colour mode data: length (4) | data
//! image resources:  length (4) | resource blocks
//! ```
//!
//! Image resources are handed to the Photoshop resource reader.

use bytes::Bytes;

use super::photoshop;
use crate::config::ExtractOptions;
use crate::error::ReaderError;
use crate::io::{SequentialByteArrayReader, SequentialReader};
use crate::metadata::{Directory, DirectoryKind, Metadata};

pub const TAG_CHANNEL_COUNT: u32 = 1;
pub const TAG_IMAGE_HEIGHT: u32 = 2;
pub const TAG_IMAGE_WIDTH: u32 = 3;
pub const TAG_BITS_PER_CHANNEL: u32 = 4;
pub const TAG_COLOR_MODE: u32 = 5;

const SIGNATURE: &[u8] = b"8BPS";

/// Read a PSD (version 1) or PSB (version 2) file into `metadata`.
pub fn read_psd(data: Bytes, metadata: &mut Metadata, options: &ExtractOptions) {
    let mut reader = SequentialByteArrayReader::new(data);
    let mut directory = Directory::new(DirectoryKind::PsdHeader);

    let resources = match read_header(&mut reader, &mut directory) {
        Ok(true) => read_resources(&mut reader)
            .map_err(|e| directory.add_error(format!("Exception reading PSD image resources: {e}")))
            .ok(),
        Ok(false) => None,
        Err(e) => {
            directory.add_error(format!("Exception reading PSD header: {e}"));
            None
        }
    };
    metadata.add_directory(directory);

    if let Some(resources) = resources {
        photoshop::read_photoshop(resources, metadata, options);
    }
}

fn read_header(reader: &mut SequentialByteArrayReader, dir: &mut Directory) -> Result<bool, ReaderError> {
    if &reader.get_bytes(4)?[..] != SIGNATURE {
        dir.add_error("Invalid PSD file signature");
        return Ok(false);
    }
    let version = reader.get_u16()?;
    if version != 1 && version != 2 {
        dir.add_error("Invalid PSD file version (must be 1 or 2)");
        return Ok(false);
    }
    reader.skip(6)?;

    dir.set(TAG_CHANNEL_COUNT, reader.get_u16()?);
    dir.set(TAG_IMAGE_HEIGHT, reader.get_u32()?);
    dir.set(TAG_IMAGE_WIDTH, reader.get_u32()?);
    dir.set(TAG_BITS_PER_CHANNEL, reader.get_u16()?);
    dir.set(TAG_COLOR_MODE, reader.get_u16()?);
    Ok(true)
}

fn read_resources(reader: &mut SequentialByteArrayReader) -> Result<Bytes, ReaderError> {
    let colour_mode_len = reader.get_u32()?;
    reader.skip(u64::from(colour_mode_len))?;
    let resources_len = reader.get_u32()?;
    reader.get_bytes(resources_len as usize)
}
