//! ICC colour profiles.
//!
//! A profile starts with a fixed 128-byte header, followed by a tag count
//! and a table of `(signature, offset, length)` triples. Header fields are
//! decoded; each tagged element is stored raw under its four-byte
//! signature, read as a big-endian integer.

use bytes::Bytes;
use chrono::NaiveDate;

use crate::error::ReaderError;
use crate::io::{ByteArrayReader, ByteOrder, RandomAccessReader};
use crate::metadata::{Directory, DirectoryKind, Metadata};

// =============================================================================
// Header Tags
// =============================================================================

pub const TAG_PROFILE_BYTE_COUNT: u32 = 0;
pub const TAG_CMM_TYPE: u32 = 4;
pub const TAG_PROFILE_VERSION: u32 = 8;
pub const TAG_PROFILE_CLASS: u32 = 12;
pub const TAG_COLOR_SPACE: u32 = 16;
pub const TAG_PROFILE_CONNECTION_SPACE: u32 = 20;
pub const TAG_PROFILE_DATETIME: u32 = 24;
pub const TAG_SIGNATURE: u32 = 36;
pub const TAG_PLATFORM: u32 = 40;
pub const TAG_CMM_FLAGS: u32 = 44;
pub const TAG_DEVICE_MAKE: u32 = 48;
pub const TAG_DEVICE_MODEL: u32 = 52;
pub const TAG_DEVICE_ATTR: u32 = 56;
pub const TAG_RENDERING_INTENT: u32 = 64;
pub const TAG_XYZ_VALUES: u32 = 68;
pub const TAG_PROFILE_CREATOR: u32 = 80;
pub const TAG_TAG_COUNT: u32 = 128;

/// Tag table entries start after the header and the count
const TAG_TABLE_OFFSET: i64 = 132;
const TAG_TABLE_ENTRY_LEN: i64 = 12;

/// Decode an ICC profile into a new ICC directory.
pub fn read_icc(data: Bytes, metadata: &mut Metadata) {
    let reader = ByteArrayReader::with_byte_order(data, ByteOrder::BigEndian);
    let mut directory = Directory::new(DirectoryKind::Icc);
    if let Err(e) = read_profile(&reader, &mut directory) {
        directory.add_error(format!("Exception reading ICC profile: {e}"));
    }
    metadata.add_directory(directory);
}

fn read_profile(reader: &ByteArrayReader, directory: &mut Directory) -> Result<(), ReaderError> {
    directory.set(TAG_PROFILE_BYTE_COUNT, reader.get_i32(0)?);

    set_signature(reader, directory, TAG_CMM_TYPE)?;
    directory.set(TAG_PROFILE_VERSION, reader.get_i32(8)?);
    set_signature(reader, directory, TAG_PROFILE_CLASS)?;
    set_signature(reader, directory, TAG_COLOR_SPACE)?;
    set_signature(reader, directory, TAG_PROFILE_CONNECTION_SPACE)?;
    set_date(reader, directory)?;
    set_signature(reader, directory, TAG_SIGNATURE)?;
    set_signature(reader, directory, TAG_PLATFORM)?;
    directory.set(TAG_CMM_FLAGS, reader.get_i32(44)?);
    set_signature(reader, directory, TAG_DEVICE_MAKE)?;

    let model = reader.get_i32(52)?;
    if model != 0 {
        if model <= 0x20202020 {
            directory.set(TAG_DEVICE_MODEL, model);
        } else {
            set_signature(reader, directory, TAG_DEVICE_MODEL)?;
        }
    }

    directory.set(TAG_DEVICE_ATTR, reader.get_i64(56)?);
    directory.set(TAG_RENDERING_INTENT, reader.get_i32(64)?);
    directory.set(
        TAG_XYZ_VALUES,
        vec![
            reader.get_s15_fixed16(68)?,
            reader.get_s15_fixed16(72)?,
            reader.get_s15_fixed16(76)?,
        ],
    );
    set_signature(reader, directory, TAG_PROFILE_CREATOR)?;

    let tag_count = reader.get_i32(128)?;
    directory.set(TAG_TAG_COUNT, tag_count);
    let max_tags = (reader.len() as i64 - TAG_TABLE_OFFSET) / TAG_TABLE_ENTRY_LEN;
    if tag_count < 0 || i64::from(tag_count) > max_tags {
        directory.add_error(format!("Invalid ICC tag count: {tag_count}"));
        return Ok(());
    }

    for i in 0..i64::from(tag_count) {
        let entry = TAG_TABLE_OFFSET + i * TAG_TABLE_ENTRY_LEN;
        let signature = reader.get_u32(entry)?;
        let offset = reader.get_u32(entry + 4)?;
        let length = reader.get_u32(entry + 8)?;
        match reader.get_bytes(i64::from(offset), u64::from(length)) {
            Ok(bytes) => directory.set(signature, bytes),
            Err(_) => directory.add_error(format!(
                "ICC tag '{}' lies outside the profile",
                four_cc(signature)
            )),
        }
    }
    Ok(())
}

/// Four-character code fields are stored as text when non-zero.
fn set_signature(reader: &ByteArrayReader, directory: &mut Directory, tag: u32) -> Result<(), ReaderError> {
    let value = reader.get_u32(i64::from(tag))?;
    if value != 0 {
        directory.set(tag, four_cc(value));
    }
    Ok(())
}

fn four_cc(value: u32) -> String {
    value.to_be_bytes().iter().map(|&b| b as char).collect()
}

fn set_date(reader: &ByteArrayReader, directory: &mut Directory) -> Result<(), ReaderError> {
    let base = i64::from(TAG_PROFILE_DATETIME);
    let mut parts = [0u32; 6];
    for (i, part) in parts.iter_mut().enumerate() {
        *part = u32::from(reader.get_u16(base + 2 * i as i64)?);
    }
    let [year, month, day, hour, minute, second] = parts;

    let date = NaiveDate::from_ymd_opt(year as i32, month, day)
        .and_then(|d| d.and_hms_opt(hour, minute, second));
    match date {
        Some(date) => directory.set(
            TAG_PROFILE_DATETIME,
            date.format("%Y:%m:%d %H:%M:%S").to_string(),
        ),
        // all-zero dates are common and simply mean "not set"
        None if parts.iter().all(|&p| p == 0) => {}
        None => directory.add_error(format!(
            "Invalid ICC profile date {year:04}-{month:02}-{day:02} {hour:02}:{minute:02}:{second:02}"
        )),
    }
    Ok(())
}

// =============================================================================
// Tests
// =============================================================================
