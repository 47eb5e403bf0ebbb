//! IPTC-IIM records.
//!
//! IPTC data is a flat list of datasets, each introduced by the `0x1C` tag
//! marker:
//!
//! ```text
//! 0x1C | record (1) | dataset (1) | length (2, BE) | data
//! ```
//!
//! A length with the high bit set is an extended length: its low 15 bits
//! give the size of a following big-endian length field. Record 1 dataset
//! 90 declares the text encoding for everything that follows.
//!
//! Tags are stored as `record << 8 | dataset`. Datasets that repeat
//! (keywords, by-lines) accumulate into a string array.

use tracing::debug;

use crate::charset::{charset_from_iso2022, Charset};
use crate::error::ReaderError;
use crate::io::{SequentialByteArrayReader, SequentialReader};
use crate::metadata::{Directory, DirectoryKind, Metadata, StringValue, TagValue};

/// Byte that starts every dataset
pub const TAG_MARKER: u8 = 0x1C;

// =============================================================================
// Tag Ids
// =============================================================================

pub const TAG_ENVELOPE_RECORD_VERSION: u32 = 0x0100;
pub const TAG_FILE_VERSION: u32 = 0x0116;
pub const TAG_CODED_CHARACTER_SET: u32 = 0x015A;
pub const TAG_ARM_VERSION: u32 = 0x0178;
pub const TAG_APPLICATION_RECORD_VERSION: u32 = 0x0200;
pub const TAG_OBJECT_NAME: u32 = 0x0205;
pub const TAG_URGENCY: u32 = 0x020A;
pub const TAG_KEYWORDS: u32 = 0x0219;
pub const TAG_DATE_CREATED: u32 = 0x0237;
pub const TAG_TIME_CREATED: u32 = 0x023C;
pub const TAG_BY_LINE: u32 = 0x0250;
pub const TAG_CAPTION: u32 = 0x0278;

/// Size of marker, record, dataset and length
const DATASET_HEADER_LEN: usize = 5;

/// Decode IPTC datasets into a new IPTC directory.
pub fn read_iptc(data: &[u8], metadata: &mut Metadata) {
    let mut directory = Directory::new(DirectoryKind::Iptc);
    if let Err(e) = read_datasets(data, &mut directory) {
        directory.add_error(format!("Exception reading IPTC data: {e}"));
    }
    metadata.add_directory(directory);
}

fn read_datasets(data: &[u8], directory: &mut Directory) -> Result<(), ReaderError> {
    let mut reader = SequentialByteArrayReader::new(data.to_vec());
    let mut charset: Option<Charset> = None;
    let mut offset = 0usize;

    while offset < data.len() {
        let marker = reader.get_u8()?;
        offset += 1;
        if marker != TAG_MARKER {
            // Trailing padding after the last dataset is common
            if data[offset - 1..].iter().all(|&b| b == 0) {
                break;
            }
            directory.add_error(format!(
                "Invalid IPTC tag marker at offset {}. Expected '0x{TAG_MARKER:02x}' but got '0x{marker:02x}'.",
                offset - 1
            ));
            return Ok(());
        }

        if offset + DATASET_HEADER_LEN - 1 > data.len() {
            directory.add_error("Too few bytes remain for a valid IPTC tag");
            return Ok(());
        }

        let record = reader.get_u8()?;
        let dataset = reader.get_u8()?;
        let mut length = reader.get_u16()? as usize;
        offset += 4;

        if length & 0x8000 != 0 {
            let size = length & 0x7FFF;
            if size > 4 || offset + size > data.len() {
                directory.add_error(format!("Invalid IPTC extended length field size {size}"));
                return Ok(());
            }
            length = 0;
            for _ in 0..size {
                length = (length << 8) | reader.get_u8()? as usize;
            }
            offset += size;
        }

        if offset + length > data.len() {
            directory.add_error("Data for tag extends beyond end of IPTC segment");
            return Ok(());
        }

        let tag = (u32::from(record) << 8) | u32::from(dataset);
        let bytes = reader.get_bytes(length)?;
        offset += length;
        store_dataset(directory, tag, &bytes, &mut charset);
    }
    Ok(())
}

fn store_dataset(directory: &mut Directory, tag: u32, bytes: &[u8], charset: &mut Option<Charset>) {
    if bytes.is_empty() {
        directory.set(tag, "");
        return;
    }

    match tag {
        TAG_CODED_CHARACTER_SET => match charset_from_iso2022(bytes) {
            Some(declared) => {
                debug!(charset = declared.name(), "IPTC coded character set");
                *charset = Some(declared);
                directory.set(tag, declared.name());
            }
            None => directory.set(tag, bytes.to_vec()),
        },
        TAG_ENVELOPE_RECORD_VERSION
        | TAG_APPLICATION_RECORD_VERSION
        | TAG_FILE_VERSION
        | TAG_ARM_VERSION
            if bytes.len() >= 2 =>
        {
            directory.set(tag, u16::from_be_bytes([bytes[0], bytes[1]]));
        }
        TAG_URGENCY => directory.set(tag, bytes[0]),
        _ => {
            let value = StringValue::new(bytes.to_vec(), *charset);
            match directory.get(tag) {
                Some(TagValue::String(existing)) => {
                    let values = vec![existing.clone(), value];
                    directory.set(tag, values);
                }
                Some(TagValue::StringArray(existing)) => {
                    let mut values = existing.clone();
                    values.push(value);
                    directory.set(tag, values);
                }
                _ => directory.set(tag, value),
            }
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
