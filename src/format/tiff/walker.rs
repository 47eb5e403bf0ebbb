//! The IFD walker.
//!
//! Walks every IFD reachable from the TIFF header and turns each into a
//! [`Directory`]. Traversal uses an explicit stack of pending IFDs rather
//! than recursion, and every IFD offset is recorded (relative to the start
//! of the underlying buffer) the first time it is read. A pointer back to
//! an already-read offset is reported on the directory holding the pointer
//! and not followed, so cyclic files always terminate. Nesting beyond
//! [`ExtractOptions::max_ifd_depth`] is cut off the same way.
//!
//! # Traversal Order
//!
//! Directories are appended in depth-first order: an IFD, then the payloads
//! embedded in it (IPTC, ICC, Photoshop, XMP, in-place makernotes), then its
//! sub-IFDs in pointer order, then the IFD it chains to. For a typical
//! camera JPEG this gives IFD0, SubIFD, Interop, makernote, GPS, thumbnail.

use std::collections::HashSet;

use bytes::Bytes;
use tracing::{debug, warn};

use super::header::TiffHeader;
use super::makernote::{MakernoteAction, MakernoteSignatures};
use super::tags::{DataFormat, ExifTag};
use crate::config::ExtractOptions;
use crate::error::{ReaderError, TiffError};
use crate::format::{icc, iptc, photoshop, xmp};
use crate::io::{ByteArrayReader, RandomAccessReader};
use crate::metadata::{Directory, DirectoryKind, Metadata, TagValue};
use crate::rational::Rational;

/// Read TIFF-structured data starting at index zero of `reader` into
/// `metadata`.
///
/// Only a broken header is an error. Problems inside IFDs are recorded on
/// the directories they concern.
pub fn read_tiff(
    reader: &ByteArrayReader,
    metadata: &mut Metadata,
    options: &ExtractOptions,
) -> Result<(), TiffError> {
    let mut reader = reader.clone();
    let header = TiffHeader::parse(&reader)?;
    reader.set_byte_order(header.byte_order);

    let (offset, fell_back) = header.resolved_first_ifd_offset(reader.len());
    let mut root = IfdFrame {
        reader,
        offset: offset as i64,
        kind: DirectoryKind::ExifIfd0,
        depth: 0,
        parent: None,
        is_bigtiff: header.is_bigtiff,
        notes: Vec::new(),
    };
    if fell_back {
        warn!(
            declared = header.first_ifd_offset,
            "First IFD offset is past the end of the data, using the default"
        );
        root.notes.push(
            "First IFD offset is beyond the end of the TIFF data segment -- trying default offset"
                .to_string(),
        );
    }

    IfdWalker::new(metadata, options)?.run(root);
    Ok(())
}

// =============================================================================
// Work Items
// =============================================================================

/// One IFD waiting to be read.
struct IfdFrame {
    reader: ByteArrayReader,
    offset: i64,
    kind: DirectoryKind,
    depth: usize,
    /// Metadata index of the directory that pointed here
    parent: Option<usize>,
    is_bigtiff: bool,
    /// Errors to record on this IFD's directory once it exists
    notes: Vec<String>,
}

/// An IFD discovered while reading another, before its parent has an index.
struct PendingIfd {
    reader: ByteArrayReader,
    offset: i64,
    kind: DirectoryKind,
}

/// Embedded payloads handed to other decoders.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Payload {
    Iptc,
    Icc,
    Photoshop,
    Xmp,
}

enum Deferred {
    Directory(Directory),
    Payload(Payload, Bytes),
}

#[derive(Default)]
struct IfdContents {
    children: Vec<PendingIfd>,
    deferred: Vec<Deferred>,
    next: Option<PendingIfd>,
}

enum EntryFlow {
    Continue,
    Stop,
}

// =============================================================================
// IfdWalker
// =============================================================================

struct IfdWalker<'a> {
    metadata: &'a mut Metadata,
    options: &'a ExtractOptions,
    signatures: MakernoteSignatures,
    visited: HashSet<i64>,
    stack: Vec<IfdFrame>,
}

impl<'a> IfdWalker<'a> {
    fn new(metadata: &'a mut Metadata, options: &'a ExtractOptions) -> Result<Self, TiffError> {
        Ok(Self {
            metadata,
            options,
            signatures: MakernoteSignatures::new()?,
            visited: HashSet::new(),
            stack: Vec::new(),
        })
    }

    fn run(mut self, root: IfdFrame) {
        self.stack.push(root);
        while let Some(frame) = self.stack.pop() {
            self.visit(frame);
        }
    }

    fn visit(&mut self, mut frame: IfdFrame) {
        if frame.depth > self.options.max_ifd_depth {
            warn!(offset = frame.offset, depth = frame.depth, "IFD nesting too deep");
            self.parent_error(
                &frame,
                format!(
                    "Ignored IFD nested deeper than {} levels",
                    self.options.max_ifd_depth
                ),
            );
            return;
        }

        let absolute = frame.reader.to_unshifted_offset(frame.offset);
        if !self.visited.insert(absolute) {
            warn!(offset = absolute, kind = %frame.kind, "Cyclic IFD reference");
            self.parent_error(
                &frame,
                format!("Ignored cyclic reference to IFD at offset {absolute}"),
            );
            return;
        }

        debug!(offset = absolute, kind = %frame.kind, depth = frame.depth, "Reading IFD");

        let mut directory = Directory::new(frame.kind.clone());
        for note in frame.notes.drain(..) {
            directory.add_error(note);
        }

        let contents = match self.read_ifd(&frame, &mut directory) {
            Ok(contents) => contents,
            Err(message) => {
                warn!(offset = absolute, "{message}");
                match frame.parent {
                    Some(_) => self.parent_error(&frame, message),
                    None => {
                        directory.add_error(message);
                        self.metadata.add_directory(directory);
                    }
                }
                return;
            }
        };

        let index = self.metadata.add_directory(directory);

        for deferred in contents.deferred {
            match deferred {
                Deferred::Directory(directory) => {
                    self.metadata.add_directory(directory);
                }
                Deferred::Payload(payload, data) => self.decode_payload(payload, data),
            }
        }

        if let Some(next) = contents.next {
            self.stack.push(frame.spawn(next, frame.depth, index));
        }
        for child in contents.children.into_iter().rev() {
            self.stack.push(frame.spawn(child, frame.depth + 1, index));
        }
    }

    fn parent_error(&mut self, frame: &IfdFrame, message: String) {
        if let Some(parent) = frame.parent.and_then(|p| self.metadata.directory_mut(p)) {
            parent.add_error(message);
        }
    }

    fn decode_payload(&mut self, payload: Payload, data: Bytes) {
        debug!(?payload, len = data.len(), "Decoding embedded payload");
        match payload {
            Payload::Iptc => iptc::read_iptc(&data, self.metadata),
            Payload::Icc => icc::read_icc(data, self.metadata),
            Payload::Photoshop => photoshop::read_photoshop(data, self.metadata, self.options),
            Payload::Xmp => xmp::read_xmp(&data, self.metadata),
        }
    }

    // -------------------------------------------------------------------------
    // IFD Reading
    // -------------------------------------------------------------------------

    /// Read one IFD. An `Err` rejects the whole IFD before any entry is read.
    fn read_ifd(&self, frame: &IfdFrame, directory: &mut Directory) -> Result<IfdContents, String> {
        let mut reader = frame.reader.clone();
        let len = reader.len() as i64;
        let offset = frame.offset;
        let big = frame.is_bigtiff;

        if offset < 0 || offset >= len {
            return Err("Ignored IFD marked to start outside data segment".to_string());
        }

        let (count_size, entry_size, next_size) = if big { (8, 20, 8) } else { (2, 12, 4) };

        let mut count = if big {
            reader.get_u64(offset).map_err(|e| e.to_string())?
        } else {
            reader.get_u16(offset).map_err(|e| e.to_string())? as u64
        };

        // No real IFD has more than 255 entries; a count like 0x0100 means
        // this IFD was written in the other byte order.
        if !big && count > 0xFF && count & 0xFF == 0 {
            count >>= 8;
            reader.set_byte_order(reader.byte_order().swapped());
            debug!(offset, count, "Swapped byte order for IFD");
        }

        let dir_len = count
            .checked_mul(entry_size)
            .and_then(|n| n.checked_add(count_size + next_size));
        match dir_len {
            Some(n) if (offset as u64).saturating_add(n) <= len as u64 => {}
            _ => return Err("Illegally sized IFD".to_string()),
        }

        let mut contents = IfdContents::default();
        let mut invalid_formats = 0;
        for i in 0..count {
            let entry = offset + (count_size + i * entry_size) as i64;
            match self.read_entry(frame, &reader, entry, directory, &mut contents, &mut invalid_formats) {
                Ok(EntryFlow::Continue) => {}
                Ok(EntryFlow::Stop) => return Ok(contents),
                Err(e) => directory.add_error(e.to_string()),
            }
        }

        let next_at = offset + (count_size + count * entry_size) as i64;
        let next = if big {
            reader.get_u64(next_at)
        } else {
            reader.get_u32(next_at).map(u64::from)
        };
        if let Ok(next) = next {
            let follows = next != 0 && next < len as u64 && next as i64 >= offset;
            if let (true, Some(kind)) = (follows, follower_kind(directory)) {
                contents.next = Some(PendingIfd {
                    reader: frame.reader.clone(),
                    offset: next as i64,
                    kind,
                });
            }
        }

        Ok(contents)
    }

    fn read_entry(
        &self,
        frame: &IfdFrame,
        reader: &ByteArrayReader,
        entry: i64,
        directory: &mut Directory,
        contents: &mut IfdContents,
        invalid_formats: &mut usize,
    ) -> Result<EntryFlow, ReaderError> {
        let big = frame.is_bigtiff;
        let tag = reader.get_u16(entry)?;
        let code = reader.get_u16(entry + 2)?;
        let count = if big {
            reader.get_u64(entry + 4)?
        } else {
            reader.get_u32(entry + 4)? as u64
        };
        let value_field = entry + if big { 12 } else { 8 };

        let format = DataFormat::from_u16(code, big);
        let byte_count = match format {
            Some(format) => match (format.size_in_bytes() as u64).checked_mul(count) {
                Some(n) => n,
                None => {
                    directory.add_error(format!("Illegal number of bytes for TIFF tag data: {count}"));
                    return Ok(EntryFlow::Continue);
                }
            },
            // format 0 marks vendor-specific entries that carry no data
            None if code == 0 => 0,
            None => {
                directory.add_error(format!(
                    "Invalid TIFF tag format code {code} for tag 0x{tag:04X}"
                ));
                *invalid_formats += 1;
                if *invalid_formats > self.options.max_invalid_format_codes {
                    directory.add_error("Stopping processing as too many errors seen in TIFF IFD");
                    return Ok(EntryFlow::Stop);
                }
                return Ok(EntryFlow::Continue);
            }
        };

        let inline_size = if big { 8 } else { 4 };
        let value_offset = if byte_count > inline_size {
            let pointer = if big {
                reader.get_u64(value_field)?
            } else {
                reader.get_u32(value_field)? as u64
            };
            match pointer.checked_add(byte_count) {
                Some(end) if end <= reader.len() => pointer as i64,
                _ => {
                    directory.add_error("Illegal TIFF tag pointer offset");
                    return Ok(EntryFlow::Continue);
                }
            }
        } else {
            value_field
        };
        if !reader.is_valid_index(value_offset, byte_count) {
            directory.add_error(format!(
                "Illegal number of bytes for TIFF tag data: {byte_count}"
            ));
            return Ok(EntryFlow::Continue);
        }

        // Sub-IFD pointers
        if let (Some(format), Some(kind)) = (format, sub_ifd_kind(&frame.kind, tag)) {
            let width = match format {
                DataFormat::Long8 | DataFormat::Ifd8 => Some(8),
                f if f.size_in_bytes() == 4 => Some(4),
                _ => None,
            };
            if let Some(width) = width {
                for i in 0..count {
                    let at = value_offset + (i * width) as i64;
                    let child = if width == 8 {
                        reader.get_u64(at)?
                    } else {
                        reader.get_u32(at)? as u64
                    };
                    contents.children.push(PendingIfd {
                        reader: reader.clone(),
                        offset: i64::try_from(child).unwrap_or(-1),
                        kind: kind.clone(),
                    });
                }
                if count > 0 {
                    return Ok(EntryFlow::Continue);
                }
            }
        }

        if self.custom_entry(frame, reader, tag, value_offset, byte_count, directory, contents)? {
            return Ok(EntryFlow::Continue);
        }

        match format {
            Some(format) => directory.set(u32::from(tag), decode_value(reader, format, value_offset, count)?),
            None => directory.add_error(format!(
                "Invalid TIFF tag format code {code} for tag 0x{tag:04X}"
            )),
        }
        Ok(EntryFlow::Continue)
    }

    /// Entries that need more than a plain value decode. Returns `true` when
    /// the entry was consumed.
    #[allow(clippy::too_many_arguments)]
    fn custom_entry(
        &self,
        frame: &IfdFrame,
        reader: &ByteArrayReader,
        tag: u16,
        value_offset: i64,
        byte_count: u64,
        directory: &Directory,
        contents: &mut IfdContents,
    ) -> Result<bool, ReaderError> {
        use DirectoryKind::{ExifIfd0, ExifSubIfd};

        if tag == 0 && byte_count == 0 && !directory.contains_tag(0) {
            return Ok(true);
        }

        let payload = match (ExifTag::from_u16(tag), &frame.kind) {
            (Some(ExifTag::Makernote), ExifSubIfd) if self.options.decode_makernotes => {
                self.makernote(frame, reader, value_offset, byte_count, contents);
                return Ok(true);
            }
            // Adobe writes IPTC as LONG rather than UNDEFINED, so sniff the tag marker
            (Some(ExifTag::IptcNaa), ExifIfd0) if reader.get_u8(value_offset).ok() == Some(0x1C) => {
                Payload::Iptc
            }
            (Some(ExifTag::InterColorProfile), _) => Payload::Icc,
            (Some(ExifTag::PhotoshopSettings), ExifIfd0) => Payload::Photoshop,
            (Some(ExifTag::ApplicationNotes), ExifIfd0 | ExifSubIfd) => Payload::Xmp,
            _ => return Ok(false),
        };

        let data = match payload {
            Payload::Xmp => Bytes::from(reader.get_null_terminated_bytes(value_offset, byte_count)?),
            _ => reader.slice(value_offset, byte_count)?,
        };
        contents.deferred.push(Deferred::Payload(payload, data));
        Ok(true)
    }

    fn makernote(
        &self,
        frame: &IfdFrame,
        reader: &ByteArrayReader,
        offset: i64,
        byte_count: u64,
        contents: &mut IfdContents,
    ) {
        let make = self
            .metadata
            .first(&DirectoryKind::ExifIfd0)
            .and_then(|d| d.get_string(ExifTag::Make.id()));

        match self
            .signatures
            .resolve(reader, offset, byte_count, make.as_deref())
        {
            MakernoteAction::Ifd {
                vendor,
                reader,
                offset,
            } => contents.children.push(PendingIfd {
                reader,
                offset,
                kind: DirectoryKind::Makernote(vendor),
            }),
            MakernoteAction::Directory(directory) => {
                debug!(kind = %directory.kind(), at = frame.offset, "Makernote decoded in place");
                contents.deferred.push(Deferred::Directory(directory));
            }
        }
    }
}

impl IfdFrame {
    fn spawn(&self, pending: PendingIfd, depth: usize, parent: usize) -> IfdFrame {
        IfdFrame {
            reader: pending.reader,
            offset: pending.offset,
            kind: pending.kind,
            depth,
            parent: Some(parent),
            is_bigtiff: self.is_bigtiff,
            notes: Vec::new(),
        }
    }
}

/// Directory kind entered through pointer `tag` found in a `parent` IFD.
fn sub_ifd_kind(parent: &DirectoryKind, tag: u16) -> Option<DirectoryKind> {
    match (ExifTag::from_u16(tag)?, parent) {
        (ExifTag::SubIfdOffset, _) => Some(DirectoryKind::ExifSubIfd),
        (ExifTag::ExifSubIfdOffset, DirectoryKind::ExifIfd0) => Some(DirectoryKind::ExifSubIfd),
        (ExifTag::GpsInfoOffset, DirectoryKind::ExifIfd0) => Some(DirectoryKind::Gps),
        (ExifTag::InteropOffset, DirectoryKind::ExifSubIfd) => Some(DirectoryKind::ExifInterop),
        _ => None,
    }
}

/// Kind of the IFD chained after `directory`, if such a link is followed.
fn follower_kind(directory: &Directory) -> Option<DirectoryKind> {
    match directory.kind() {
        DirectoryKind::ExifIfd0 | DirectoryKind::ExifImage => {
            if directory.contains_tag(ExifTag::PageNumber.id()) {
                Some(DirectoryKind::ExifImage)
            } else {
                Some(DirectoryKind::ExifThumbnail)
            }
        }
        DirectoryKind::ExifThumbnail => Some(DirectoryKind::ExifThumbnail),
        _ => None,
    }
}

// =============================================================================
// Value Decoding
// =============================================================================

fn array<T>(
    count: u64,
    step: i64,
    start: i64,
    mut read: impl FnMut(i64) -> Result<T, ReaderError>,
) -> Result<Vec<T>, ReaderError> {
    (0..count as i64).map(|i| read(start + i * step)).collect()
}

fn decode_value(
    reader: &ByteArrayReader,
    format: DataFormat,
    offset: i64,
    count: u64,
) -> Result<TagValue, ReaderError> {
    let size = format.size_in_bytes() as i64;
    let single = count == 1;

    let value = match format {
        DataFormat::Undefined => reader.get_bytes(offset, count)?.into(),
        DataFormat::Ascii => reader
            .get_null_terminated_string_value(offset, count, None)?
            .into(),
        DataFormat::Rational => {
            let read = |at: i64| -> Result<Rational, ReaderError> {
                Ok(Rational::new(
                    reader.get_u32(at)? as i64,
                    reader.get_u32(at + 4)? as i64,
                ))
            };
            if single {
                read(offset)?.into()
            } else {
                array(count, size, offset, read)?.into()
            }
        }
        DataFormat::SRational => {
            let read = |at: i64| -> Result<Rational, ReaderError> {
                Ok(Rational::new(
                    reader.get_i32(at)? as i64,
                    reader.get_i32(at + 4)? as i64,
                ))
            };
            if single {
                read(offset)?.into()
            } else {
                array(count, size, offset, read)?.into()
            }
        }
        DataFormat::Float => {
            if single {
                reader.get_f32(offset)?.into()
            } else {
                array(count, size, offset, |at| reader.get_f32(at))?.into()
            }
        }
        DataFormat::Double => {
            if single {
                reader.get_f64(offset)?.into()
            } else {
                array(count, size, offset, |at| reader.get_f64(at))?.into()
            }
        }
        DataFormat::Byte | DataFormat::SByte | DataFormat::Short | DataFormat::SShort | DataFormat::SLong => {
            let read = |at: i64| -> Result<i32, ReaderError> {
                Ok(match format {
                    DataFormat::Byte => reader.get_u8(at)? as i32,
                    DataFormat::SByte => reader.get_i8(at)? as i32,
                    DataFormat::Short => reader.get_u16(at)? as i32,
                    DataFormat::SShort => reader.get_i16(at)? as i32,
                    _ => reader.get_i32(at)?,
                })
            };
            if single {
                read(offset)?.into()
            } else {
                array(count, size, offset, read)?.into()
            }
        }
        DataFormat::Long | DataFormat::Ifd | DataFormat::Long8 | DataFormat::SLong8 | DataFormat::Ifd8 => {
            let read = |at: i64| -> Result<i64, ReaderError> {
                if size == 8 {
                    reader.get_i64(at)
                } else {
                    Ok(reader.get_u32(at)? as i64)
                }
            };
            if single {
                read(offset)?.into()
            } else {
                array(count, size, offset, read)?.into()
            }
        }
    };
    Ok(value)
}

// =============================================================================
// Tests
// =============================================================================
