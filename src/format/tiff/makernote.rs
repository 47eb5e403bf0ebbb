//! Vendor makernote recognition.
//!
//! A makernote is an opaque blob inside the Exif SubIFD. Most vendors store
//! an IFD in it, but each one puts a different header in front, measures
//! offsets from a different base and may force its own byte order. The
//! layout is chosen by matching the first bytes of the blob against a
//! table of known headers, then the camera make against a second table.
//!
//! Kodak uses a fixed binary record instead of an IFD and is decoded here
//! directly.

use tracing::{debug, warn};

use super::tags::ExifTag;
use crate::byte_trie::ByteTrie;
use crate::charset::Charset;
use crate::error::{ByteTrieError, ReaderError};
use crate::io::{ByteArrayReader, ByteOrder, RandomAccessReader};
use crate::metadata::{Directory, DirectoryKind, MakernoteVendor};

// =============================================================================
// Layout Description
// =============================================================================

/// Where the makernote IFD begins.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IfdStart {
    /// A fixed distance from the offset base
    Fixed(i64),
    /// Read from a 32-bit value at this distance from the offset base
    PointerAt(i64),
}

/// What offsets inside the makernote IFD are measured from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OffsetBase {
    /// The enclosing TIFF header, like the rest of the Exif data
    TiffHeader,
    /// The first byte of the makernote
    Makernote,
    /// A TIFF header embedded this many bytes into the makernote
    MakernotePlus(i64),
}

/// Byte order used inside the makernote.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayoutByteOrder {
    Inherit,
    Big,
    Little,
    /// Taken from the `II`/`MM` mark at the offset base
    EmbeddedHeader,
}

/// How to find and read one vendor's makernote IFD.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MakernoteLayout {
    pub vendor: MakernoteVendor,
    pub ifd_start: IfdStart,
    pub base: OffsetBase,
    pub byte_order: LayoutByteOrder,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Rule {
    Ifd(MakernoteLayout),
    /// Sony by make, except when the data opens with `01 00`
    Sony(MakernoteLayout),
    Kodak,
    Unsupported(&'static str),
}

const fn ifd(
    vendor: MakernoteVendor,
    ifd_start: IfdStart,
    base: OffsetBase,
    byte_order: LayoutByteOrder,
) -> Rule {
    Rule::Ifd(MakernoteLayout {
        vendor,
        ifd_start,
        base,
        byte_order,
    })
}

use crate::metadata::MakernoteVendor as V;
use IfdStart::{Fixed, PointerAt};
use LayoutByteOrder::{Big, EmbeddedHeader, Inherit, Little};
use OffsetBase::{Makernote, MakernotePlus, TiffHeader};

const OLYMPUS_TYPE1: Rule = ifd(V::Olympus, Fixed(8), TiffHeader, Inherit);
const LEICA_TYPE5: Rule = ifd(V::LeicaType5, Fixed(8), Makernote, Inherit);
const FUJIFILM: Rule = ifd(V::Fujifilm, PointerAt(8), Makernote, Little);

/// Rules keyed by the leading bytes of the makernote.
const HEADER_RULES: &[(&[u8], Rule)] = &[
    (b"OLYMP\0", OLYMPUS_TYPE1),
    (b"EPSON", OLYMPUS_TYPE1),
    (b"AGFA", OLYMPUS_TYPE1),
    (b"OLYMPUS\0II", ifd(V::Olympus, Fixed(12), Makernote, Inherit)),
    (b"OM SYSTEM\0\0\0II", ifd(V::Olympus, Fixed(16), Makernote, Inherit)),
    (b"Nikon", Rule::Unsupported("Unsupported Nikon makernote data ignored.")),
    (b"Nikon\0\x01", ifd(V::NikonType1, Fixed(8), TiffHeader, Inherit)),
    (b"Nikon\0\x02", ifd(V::NikonType2, Fixed(8), MakernotePlus(10), EmbeddedHeader)),
    (b"SONY CAM", ifd(V::SonyType1, Fixed(12), TiffHeader, Inherit)),
    (b"SONY DSC", ifd(V::SonyType1, Fixed(12), TiffHeader, Inherit)),
    (b"SEMC MS\0\0\0\0\0", ifd(V::SonyType6, Fixed(20), TiffHeader, Big)),
    (b"SIGMA\0\0\0", ifd(V::Sigma, Fixed(10), TiffHeader, Inherit)),
    (b"FOVEON\0\0", ifd(V::Sigma, Fixed(10), TiffHeader, Inherit)),
    (b"KDK", Rule::Kodak),
    (b"QVC\0\0\0", ifd(V::CasioType2, Fixed(6), TiffHeader, Inherit)),
    (b"FUJIFILM", FUJIFILM),
    (b"KYOCERA", ifd(V::Kyocera, Fixed(22), TiffHeader, Inherit)),
    (b"LEICA\0\x01\0", LEICA_TYPE5),
    (b"LEICA\0\x04\0", LEICA_TYPE5),
    (b"LEICA\0\x05\0", LEICA_TYPE5),
    (b"LEICA\0\x06\0", LEICA_TYPE5),
    (b"LEICA\0\x07\0", LEICA_TYPE5),
    (b"Panasonic\0\0\0", ifd(V::Panasonic, Fixed(12), TiffHeader, Inherit)),
    (b"AOC\0", ifd(V::Pentax, Fixed(6), Makernote, Inherit)),
    (b"SANYO\0\x01\0", ifd(V::Sanyo, Fixed(8), Makernote, Inherit)),
    (b"Ricoh", ifd(V::Ricoh, Fixed(8), Makernote, Big)),
    (b"RICOH", ifd(V::Ricoh, Fixed(8), Makernote, Big)),
    // textual Ricoh format
    (b"Rv", Rule::Unsupported("Unsupported Ricoh makernote data ignored.")),
    (b"Rev", Rule::Unsupported("Unsupported Ricoh makernote data ignored.")),
    (b"Apple iOS\0", ifd(V::Apple, Fixed(14), Makernote, Big)),
];

/// Rules keyed by the upper-cased camera make, used when no header matched.
const MAKE_RULES: &[(&[u8], Rule)] = &[
    (b"MINOLTA", ifd(V::Olympus, Fixed(0), TiffHeader, Inherit)),
    (b"NIKON", ifd(V::NikonType2, Fixed(0), TiffHeader, Inherit)),
    (
        b"SONY",
        Rule::Sony(MakernoteLayout {
            vendor: V::SonyType1,
            ifd_start: Fixed(0),
            base: TiffHeader,
            byte_order: Inherit,
        }),
    ),
    (b"CANON", ifd(V::Canon, Fixed(0), TiffHeader, Inherit)),
    (b"CASIO", ifd(V::CasioType1, Fixed(0), TiffHeader, Inherit)),
    (b"FUJIFILM", FUJIFILM),
    (b"PENTAX", ifd(V::Pentax, Fixed(0), Makernote, Inherit)),
    (b"ASAHI", ifd(V::Pentax, Fixed(0), Makernote, Inherit)),
    (b"LEICA", ifd(V::Panasonic, Fixed(8), TiffHeader, Little)),
    (b"LEICA CAMERA AG", ifd(V::Leica, Fixed(8), TiffHeader, Little)),
    (b"SAMSUNG", ifd(V::Samsung, Fixed(0), TiffHeader, Inherit)),
    (b"DJI", ifd(V::Dji, Fixed(0), TiffHeader, Inherit)),
];

// =============================================================================
// Resolution
// =============================================================================

/// What the walker should do with a makernote.
#[derive(Debug)]
pub enum MakernoteAction {
    /// Read the IFD at `offset` of `reader` into a directory for `vendor`
    Ifd {
        vendor: MakernoteVendor,
        reader: ByteArrayReader,
        offset: i64,
    },
    /// The makernote was decoded (or rejected) in place
    Directory(Directory),
}

/// The two signature tries, built once per walk.
pub struct MakernoteSignatures {
    headers: ByteTrie<Rule>,
    makes: ByteTrie<Rule>,
}

impl MakernoteSignatures {
    pub fn new() -> Result<Self, ByteTrieError> {
        Ok(Self {
            headers: build(HEADER_RULES)?,
            makes: build(MAKE_RULES)?,
        })
    }

    /// Decide how to read the `byte_count` bytes of makernote at `offset`.
    ///
    /// `offset` must already be validated against `reader`.
    pub fn resolve(
        &self,
        reader: &ByteArrayReader,
        offset: i64,
        byte_count: u64,
        make: Option<&str>,
    ) -> MakernoteAction {
        let available = reader.len().saturating_sub(offset.max(0) as u64);
        let probe_len = (self.headers.max_depth() as u64).min(available);
        let probe = reader.bytes_at(offset, probe_len).unwrap_or_default();

        let rule = self.headers.find(probe).copied().or_else(|| {
            let make = make?.trim().to_ascii_uppercase();
            self.makes.find(make.as_bytes()).copied()
        });

        match rule {
            Some(Rule::Ifd(layout)) => layout_action(layout, reader, offset),
            Some(Rule::Sony(layout)) if !probe.starts_with(&[0x01, 0x00]) => {
                layout_action(layout, reader, offset)
            }
            Some(Rule::Kodak) => MakernoteAction::Directory(read_kodak(reader, offset, probe)),
            Some(Rule::Unsupported(message)) => unsupported(reader, offset, byte_count, message),
            _ => unsupported(
                reader,
                offset,
                byte_count,
                "Unsupported makernote data ignored.",
            ),
        }
    }
}

fn build(rules: &[(&[u8], Rule)]) -> Result<ByteTrie<Rule>, ByteTrieError> {
    let mut trie = ByteTrie::new();
    for (path, rule) in rules {
        trie.insert(*rule, path)?;
    }
    Ok(trie)
}

fn layout_action(layout: MakernoteLayout, reader: &ByteArrayReader, offset: i64) -> MakernoteAction {
    debug!(vendor = ?layout.vendor, offset, "Makernote layout selected");
    match locate_ifd(layout, reader, offset) {
        Ok((reader, ifd_offset)) => MakernoteAction::Ifd {
            vendor: layout.vendor,
            reader,
            offset: ifd_offset,
        },
        Err(e) => {
            let mut directory = Directory::new(DirectoryKind::Makernote(layout.vendor));
            directory.add_error(e.to_string());
            MakernoteAction::Directory(directory)
        }
    }
}

fn locate_ifd(
    layout: MakernoteLayout,
    reader: &ByteArrayReader,
    offset: i64,
) -> Result<(ByteArrayReader, i64), ReaderError> {
    let (mut target, base) = match layout.base {
        OffsetBase::TiffHeader => (reader.clone(), offset),
        OffsetBase::Makernote => (reader.shifted(offset as usize), 0),
        OffsetBase::MakernotePlus(n) => (reader.shifted((offset + n) as usize), 0),
    };

    match layout.byte_order {
        LayoutByteOrder::Inherit => {}
        LayoutByteOrder::Big => target.set_byte_order(ByteOrder::BigEndian),
        LayoutByteOrder::Little => target.set_byte_order(ByteOrder::LittleEndian),
        LayoutByteOrder::EmbeddedHeader => {
            let order = match target.bytes_at(0, 2)? {
                b"II" => Some(ByteOrder::LittleEndian),
                b"MM" => Some(ByteOrder::BigEndian),
                _ => None,
            };
            if let Some(order) = order {
                target.set_byte_order(order);
            }
        }
    }

    let ifd_offset = match layout.ifd_start {
        IfdStart::Fixed(n) => base + n,
        IfdStart::PointerAt(n) => target.get_u32(base + n)? as i64,
    };
    Ok((target, ifd_offset))
}

fn unsupported(
    reader: &ByteArrayReader,
    offset: i64,
    byte_count: u64,
    message: &str,
) -> MakernoteAction {
    warn!(offset, byte_count, "{message}");
    let mut directory = Directory::new(DirectoryKind::Makernote(MakernoteVendor::Unknown));
    match reader.get_bytes(offset, byte_count) {
        Ok(bytes) => directory.set(ExifTag::Makernote.id(), bytes),
        Err(e) => directory.add_error(e.to_string()),
    }
    directory.add_error(message);
    MakernoteAction::Directory(directory)
}

// =============================================================================
// Kodak
// =============================================================================

#[derive(Debug, Clone, Copy)]
enum KodakField {
    U8,
    I8,
    U16,
    I16,
    U32,
    Bytes(u64),
}

/// Fixed record fields, by offset from the start of the record. The offset
/// doubles as the tag id.
const KODAK_FIELDS: &[(i64, KodakField)] = &[
    (9, KodakField::U8),  // quality
    (10, KodakField::U8), // burst mode
    (12, KodakField::U16),
    (14, KodakField::U16),
    (16, KodakField::U16),
    (18, KodakField::Bytes(2)),
    (20, KodakField::Bytes(4)),
    (24, KodakField::U16),
    (27, KodakField::U8),
    (28, KodakField::U8),
    (29, KodakField::U8),
    (30, KodakField::U16),
    (32, KodakField::U32),
    (36, KodakField::I16),
    (56, KodakField::U8),
    (64, KodakField::U8),
    (92, KodakField::U8),
    (93, KodakField::U8),
    (94, KodakField::U16),
    (96, KodakField::U16),
    (98, KodakField::U16),
    (100, KodakField::U16),
    (102, KodakField::U16),
    (104, KodakField::U16),
    (107, KodakField::I8), // sharpness
];

fn read_kodak(reader: &ByteArrayReader, offset: i64, probe: &[u8]) -> Directory {
    let mut reader = reader.clone();
    reader.set_byte_order(if probe.starts_with(b"KDK INFO") {
        ByteOrder::BigEndian
    } else {
        ByteOrder::LittleEndian
    });

    let mut directory = Directory::new(DirectoryKind::Makernote(MakernoteVendor::Kodak));
    if let Err(e) = decode_kodak(&reader, offset + 8, &mut directory) {
        directory.add_error(format!("Error processing Kodak makernote data: {e}"));
    }
    directory
}

fn decode_kodak(
    reader: &ByteArrayReader,
    record: i64,
    directory: &mut Directory,
) -> Result<(), ReaderError> {
    // model
    directory.set(
        0,
        reader.get_null_terminated_string_value(record, 8, Some(Charset::Utf8))?,
    );

    for &(at, field) in KODAK_FIELDS {
        let index = record + at;
        let tag = at as u32;
        match field {
            KodakField::U8 => directory.set(tag, reader.get_u8(index)?),
            KodakField::I8 => directory.set(tag, reader.get_i8(index)? as i32),
            KodakField::U16 => directory.set(tag, reader.get_u16(index)?),
            KodakField::I16 => directory.set(tag, reader.get_i16(index)? as i32),
            KodakField::U32 => directory.set(tag, reader.get_u32(index)?),
            KodakField::Bytes(n) => directory.set(tag, reader.get_bytes(index, n)?),
        }
    }
    Ok(())
}

// =============================================================================
// Tests
// =============================================================================
