//! Test utilities for integration tests.
//!
//! Builders that assemble small but structurally valid image files in
//! memory, so every test states exactly which bytes it feeds the reader.

use image_metadata::{Directory, DirectoryKind, Metadata};

// =============================================================================
// TIFF File Builders
// =============================================================================

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ByteOrderType {
    LittleEndian,
    BigEndian,
}

impl ByteOrderType {
    fn u16(self, value: u16) -> [u8; 2] {
        match self {
            ByteOrderType::LittleEndian => value.to_le_bytes(),
            ByteOrderType::BigEndian => value.to_be_bytes(),
        }
    }

    fn u32(self, value: u32) -> [u8; 4] {
        match self {
            ByteOrderType::LittleEndian => value.to_le_bytes(),
            ByteOrderType::BigEndian => value.to_be_bytes(),
        }
    }
}

/// Builder for creating test TIFF files.
///
/// IFDs are laid out in the order they are added, each followed by the
/// values that do not fit in its entries. The first IFD is IFD0. Entries
/// can point at another IFD by its index, so sub-IFDs, chains and cycles
/// are all expressible.
pub struct TiffBuilder {
    byte_order: ByteOrderType,
    ifds: Vec<IfdBuilder>,
}

impl TiffBuilder {
    pub fn new() -> Self {
        Self {
            byte_order: ByteOrderType::LittleEndian,
            ifds: Vec::new(),
        }
    }

    pub fn with_byte_order(mut self, order: ByteOrderType) -> Self {
        self.byte_order = order;
        self
    }

    pub fn add_ifd(mut self, ifd: IfdBuilder) -> Self {
        self.ifds.push(ifd);
        self
    }

    /// Build the TIFF file data.
    pub fn build(self) -> Vec<u8> {
        let order = self.byte_order;

        // First pass: where each IFD starts
        let mut offsets = Vec::with_capacity(self.ifds.len());
        let mut offset = 8usize;
        for ifd in &self.ifds {
            offsets.push(offset);
            offset += ifd.size();
        }

        let mut data = Vec::with_capacity(offset);
        match order {
            ByteOrderType::LittleEndian => data.extend_from_slice(b"II"),
            ByteOrderType::BigEndian => data.extend_from_slice(b"MM"),
        }
        data.extend_from_slice(&order.u16(42));
        let first = offsets.first().copied().unwrap_or(0) as u32;
        data.extend_from_slice(&order.u32(first));

        for (ifd, &at) in self.ifds.iter().zip(&offsets) {
            ifd.write_to(&mut data, order, at, &offsets);
        }
        data
    }
}

impl Default for TiffBuilder {
    fn default() -> Self {
        Self::new()
    }
}

enum EntryValue {
    Bytes(Vec<u8>),
    Shorts(Vec<u16>),
    Longs(Vec<u32>),
    Rationals(Vec<(u32, u32)>),
    /// Offset of another IFD, by index
    Pointer(usize),
}

struct IfdEntryBuilder {
    tag: u16,
    field_type: u16,
    count: u32,
    value: EntryValue,
}

impl IfdEntryBuilder {
    fn encode(&self, order: ByteOrderType, offsets: &[usize]) -> Vec<u8> {
        match &self.value {
            EntryValue::Bytes(bytes) => bytes.clone(),
            EntryValue::Shorts(values) => values.iter().flat_map(|v| order.u16(*v)).collect(),
            EntryValue::Longs(values) => values.iter().flat_map(|v| order.u32(*v)).collect(),
            EntryValue::Rationals(values) => values
                .iter()
                .flat_map(|(n, d)| order.u32(*n).into_iter().chain(order.u32(*d)))
                .collect(),
            EntryValue::Pointer(index) => order.u32(offsets[*index] as u32).to_vec(),
        }
    }

    /// Encoded length, which does not depend on the final layout.
    fn len(&self) -> usize {
        match &self.value {
            EntryValue::Bytes(bytes) => bytes.len(),
            EntryValue::Shorts(values) => values.len() * 2,
            EntryValue::Longs(values) => values.len() * 4,
            EntryValue::Rationals(values) => values.len() * 8,
            EntryValue::Pointer(_) => 4,
        }
    }

    fn external_len(&self) -> usize {
        let len = self.len();
        if len > 4 {
            len + len % 2
        } else {
            0
        }
    }
}

/// Builder for one IFD.
pub struct IfdBuilder {
    entries: Vec<IfdEntryBuilder>,
    next: Option<usize>,
}

pub const BYTE: u16 = 1;
pub const ASCII: u16 = 2;
pub const SHORT: u16 = 3;
pub const LONG: u16 = 4;
pub const RATIONAL: u16 = 5;
pub const UNDEFINED: u16 = 7;

impl IfdBuilder {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            next: None,
        }
    }

    fn push(mut self, tag: u16, field_type: u16, count: u32, value: EntryValue) -> Self {
        self.entries.push(IfdEntryBuilder {
            tag,
            field_type,
            count,
            value,
        });
        self
    }

    pub fn add_short(self, tag: u16, value: u16) -> Self {
        self.push(tag, SHORT, 1, EntryValue::Shorts(vec![value]))
    }

    pub fn add_shorts(self, tag: u16, values: &[u16]) -> Self {
        self.push(tag, SHORT, values.len() as u32, EntryValue::Shorts(values.to_vec()))
    }

    pub fn add_long(self, tag: u16, value: u32) -> Self {
        self.push(tag, LONG, 1, EntryValue::Longs(vec![value]))
    }

    /// NUL-terminated ASCII string.
    pub fn add_ascii(self, tag: u16, text: &str) -> Self {
        let mut bytes = text.as_bytes().to_vec();
        bytes.push(0);
        let count = bytes.len() as u32;
        self.push(tag, ASCII, count, EntryValue::Bytes(bytes))
    }

    pub fn add_rational(self, tag: u16, numerator: u32, denominator: u32) -> Self {
        self.push(tag, RATIONAL, 1, EntryValue::Rationals(vec![(numerator, denominator)]))
    }

    pub fn add_rationals(self, tag: u16, values: &[(u32, u32)]) -> Self {
        self.push(tag, RATIONAL, values.len() as u32, EntryValue::Rationals(values.to_vec()))
    }

    pub fn add_undefined(self, tag: u16, bytes: &[u8]) -> Self {
        self.push(tag, UNDEFINED, bytes.len() as u32, EntryValue::Bytes(bytes.to_vec()))
    }

    /// Add an entry with an arbitrary format code and raw value bytes.
    pub fn add_raw(self, tag: u16, field_type: u16, count: u32, bytes: &[u8]) -> Self {
        self.push(tag, field_type, count, EntryValue::Bytes(bytes.to_vec()))
    }

    /// Add a LONG entry holding the offset of IFD number `ifd`.
    pub fn add_pointer(self, tag: u16, ifd: usize) -> Self {
        self.push(tag, LONG, 1, EntryValue::Pointer(ifd))
    }

    /// Chain IFD number `ifd` after this one.
    pub fn with_next(mut self, ifd: usize) -> Self {
        self.next = Some(ifd);
        self
    }

    fn size(&self) -> usize {
        2 + self.entries.len() * 12 + 4 + self.entries.iter().map(|e| e.external_len()).sum::<usize>()
    }

    fn write_to(&self, data: &mut Vec<u8>, order: ByteOrderType, at: usize, offsets: &[usize]) {
        assert_eq!(data.len(), at, "IFD written out of order");

        let mut external = Vec::new();
        let mut external_offset = at + 2 + self.entries.len() * 12 + 4;

        data.extend_from_slice(&order.u16(self.entries.len() as u16));
        for entry in &self.entries {
            data.extend_from_slice(&order.u16(entry.tag));
            data.extend_from_slice(&order.u16(entry.field_type));
            data.extend_from_slice(&order.u32(entry.count));

            let mut value = entry.encode(order, offsets);
            if value.len() > 4 {
                data.extend_from_slice(&order.u32(external_offset as u32));
                if value.len() % 2 != 0 {
                    value.push(0);
                }
                external_offset += value.len();
                external.extend_from_slice(&value);
            } else {
                value.resize(4, 0);
                data.extend_from_slice(&value);
            }
        }

        let next = self.next.map_or(0, |i| offsets[i] as u32);
        data.extend_from_slice(&order.u32(next));
        data.extend_from_slice(&external);
    }
}

impl Default for IfdBuilder {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// JPEG File Builder
// =============================================================================

/// Builder for JPEG files made of marker segments only.
pub struct JpegBuilder {
    segments: Vec<(u8, Vec<u8>)>,
    with_scan: bool,
}

impl JpegBuilder {
    pub fn new() -> Self {
        Self {
            segments: Vec::new(),
            with_scan: false,
        }
    }

    pub fn add_segment(mut self, marker: u8, payload: &[u8]) -> Self {
        self.segments.push((marker, payload.to_vec()));
        self
    }

    /// APP1 segment holding Exif data.
    pub fn add_exif(self, tiff: &[u8]) -> Self {
        let mut payload = b"Exif\0\0".to_vec();
        payload.extend_from_slice(tiff);
        self.add_segment(0xE1, &payload)
    }

    /// Baseline SOF0 frame header with three components.
    pub fn add_frame(self, width: u16, height: u16) -> Self {
        let mut payload = vec![8];
        payload.extend_from_slice(&height.to_be_bytes());
        payload.extend_from_slice(&width.to_be_bytes());
        payload.extend_from_slice(&[3, 1, 0x22, 0, 2, 0x11, 1, 3, 0x11, 1]);
        self.add_segment(0xC0, &payload)
    }

    pub fn add_comment(self, text: &str) -> Self {
        self.add_segment(0xFE, text.as_bytes())
    }

    /// Finish with an SOS marker followed by entropy-coded bytes.
    pub fn with_scan(mut self) -> Self {
        self.with_scan = true;
        self
    }

    pub fn build(self) -> Vec<u8> {
        let mut data = vec![0xFF, 0xD8];
        for (marker, payload) in &self.segments {
            data.extend_from_slice(&[0xFF, *marker]);
            data.extend_from_slice(&((payload.len() + 2) as u16).to_be_bytes());
            data.extend_from_slice(payload);
        }
        if self.with_scan {
            data.extend_from_slice(&[0xFF, 0xDA, 0x00, 0x08, 1, 1, 0, 0, 0x3F, 0]);
            // marker-like bytes inside the scan must never be read as segments
            data.extend_from_slice(&[0x12, 0xFF, 0xE1, 0x00, 0x04, 0x34, 0x56]);
            data.extend_from_slice(&[0xFF, 0xD9]);
        }
        data
    }
}

impl Default for JpegBuilder {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// PNG File Builder
// =============================================================================

/// Builder for PNG files. CRCs are written as zero; readers do not check
/// them.
pub struct PngBuilder {
    chunks: Vec<([u8; 4], Vec<u8>)>,
}

impl PngBuilder {
    /// A PNG starting with an 8-bit RGB IHDR of the given size.
    pub fn new(width: u32, height: u32) -> Self {
        let mut ihdr = Vec::new();
        ihdr.extend_from_slice(&width.to_be_bytes());
        ihdr.extend_from_slice(&height.to_be_bytes());
        ihdr.extend_from_slice(&[8, 2, 0, 0, 0]);
        Self {
            chunks: vec![(*b"IHDR", ihdr)],
        }
    }

    pub fn add_chunk(mut self, chunk_type: &[u8; 4], data: &[u8]) -> Self {
        self.chunks.push((*chunk_type, data.to_vec()));
        self
    }

    pub fn add_text(self, keyword: &str, text: &str) -> Self {
        let mut data = keyword.as_bytes().to_vec();
        data.push(0);
        data.extend_from_slice(text.as_bytes());
        self.add_chunk(b"tEXt", &data)
    }

    /// Appends IDAT and IEND chunks.
    pub fn build(self) -> Vec<u8> {
        let mut data = vec![0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A];
        let tail: [([u8; 4], Vec<u8>); 2] = [(*b"IDAT", vec![0x78, 0x9C, 0x03, 0x00]), (*b"IEND", Vec::new())];
        for (chunk_type, payload) in self.chunks.iter().chain(tail.iter()) {
            data.extend_from_slice(&(payload.len() as u32).to_be_bytes());
            data.extend_from_slice(chunk_type);
            data.extend_from_slice(payload);
            data.extend_from_slice(&[0, 0, 0, 0]);
        }
        data
    }
}

// =============================================================================
// Other Containers
// =============================================================================

/// A GIF89a with a logical screen of `width` x `height`, a 2-entry global
/// colour table and the given blocks before the trailer.
pub fn gif_file(width: u16, height: u16, blocks: &[&[u8]]) -> Vec<u8> {
    let mut data = b"GIF89a".to_vec();
    data.extend_from_slice(&width.to_le_bytes());
    data.extend_from_slice(&height.to_le_bytes());
    data.extend_from_slice(&[0x80, 0, 0]);
    data.extend_from_slice(&[0, 0, 0, 0xFF, 0xFF, 0xFF]);
    for block in blocks {
        data.extend_from_slice(block);
    }
    data.push(0x3B);
    data
}

/// A Windows BMP with a 40-byte BITMAPINFOHEADER and no pixel data.
pub fn bmp_file(width: i32, height: i32, bits_per_pixel: u16) -> Vec<u8> {
    let mut data = b"BM".to_vec();
    data.extend_from_slice(&54u32.to_le_bytes());
    data.extend_from_slice(&[0, 0, 0, 0]);
    data.extend_from_slice(&54u32.to_le_bytes());
    data.extend_from_slice(&40u32.to_le_bytes());
    data.extend_from_slice(&width.to_le_bytes());
    data.extend_from_slice(&height.to_le_bytes());
    data.extend_from_slice(&1u16.to_le_bytes());
    data.extend_from_slice(&bits_per_pixel.to_le_bytes());
    data.extend_from_slice(&0u32.to_le_bytes());
    data.extend_from_slice(&0u32.to_le_bytes());
    data.extend_from_slice(&2835u32.to_le_bytes());
    data.extend_from_slice(&2835u32.to_le_bytes());
    data.extend_from_slice(&0u32.to_le_bytes());
    data.extend_from_slice(&0u32.to_le_bytes());
    data
}

/// One Photoshop image resource block with an empty name.
pub fn photoshop_resource(id: u16, data: &[u8]) -> Vec<u8> {
    let mut out = b"8BIM".to_vec();
    out.extend_from_slice(&id.to_be_bytes());
    out.extend_from_slice(&[0, 0]);
    out.extend_from_slice(&(data.len() as u32).to_be_bytes());
    out.extend_from_slice(data);
    if data.len() % 2 != 0 {
        out.push(0);
    }
    out
}

/// A version 1 RGB PSD whose image resource section holds `resources`.
pub fn psd_file(width: u32, height: u32, resources: &[u8]) -> Vec<u8> {
    let mut data = b"8BPS".to_vec();
    data.extend_from_slice(&1u16.to_be_bytes());
    data.extend_from_slice(&[0; 6]);
    data.extend_from_slice(&3u16.to_be_bytes());
    data.extend_from_slice(&height.to_be_bytes());
    data.extend_from_slice(&width.to_be_bytes());
    data.extend_from_slice(&8u16.to_be_bytes());
    data.extend_from_slice(&3u16.to_be_bytes());
    // colour mode data section
    data.extend_from_slice(&0u32.to_be_bytes());
    data.extend_from_slice(&(resources.len() as u32).to_be_bytes());
    data.extend_from_slice(resources);
    data
}

/// One IPTC dataset with a short length.
pub fn iptc_dataset(record: u8, dataset: u8, value: &[u8]) -> Vec<u8> {
    let mut out = vec![0x1C, record, dataset];
    out.extend_from_slice(&(value.len() as u16).to_be_bytes());
    out.extend_from_slice(value);
    out
}

// =============================================================================
// Assertions
// =============================================================================

/// Directory kinds in discovery order.
pub fn kinds(metadata: &Metadata) -> Vec<DirectoryKind> {
    metadata.iter().map(|d| d.kind().clone()).collect()
}

/// The only directory of `kind`, failing the test if there is not exactly one.
pub fn single<'a>(metadata: &'a Metadata, kind: &DirectoryKind) -> &'a Directory {
    let matches: Vec<&Directory> = metadata.iter().filter(|d| d.kind() == kind).collect();
    assert_eq!(matches.len(), 1, "expected one {} directory", kind.name());
    matches[0]
}

/// Every error recorded on any directory, prefixed with the directory name.
pub fn all_errors(metadata: &Metadata) -> Vec<String> {
    metadata
        .iter()
        .flat_map(|d| d.errors().iter().map(move |e| format!("[{}] {}", d.name(), e)))
        .collect()
}
