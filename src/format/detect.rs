//! File type detection from leading bytes.
//!
//! Signatures live in a [`ByteTrie`]; the type of the last signature matched
//! along the input wins, so a Canon CR2 (`II*\0` followed by `\x10\0\0\0CR`)
//! is reported as CR2 rather than plain TIFF.

use std::sync::OnceLock;

use serde::Serialize;

use crate::byte_trie::ByteTrie;
use crate::error::ByteTrieError;
use crate::metadata::{Directory, DirectoryKind};

// =============================================================================
// FileType
// =============================================================================

/// Container formats recognised by their leading bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum FileType {
    Unknown,
    Jpeg,
    Tiff,
    Psd,
    Png,
    Bmp,
    Gif,
    Ico,
    Pcx,
    Riff,
    Eps,

    // raw formats
    Crw,
    Cr2,
    Orf,
    Raf,
    Rw2,
}

impl FileType {
    pub const fn name(&self) -> &'static str {
        match self {
            FileType::Unknown => "Unknown",
            FileType::Jpeg => "JPEG",
            FileType::Tiff => "TIFF",
            FileType::Psd => "PSD",
            FileType::Png => "PNG",
            FileType::Bmp => "BMP",
            FileType::Gif => "GIF",
            FileType::Ico => "ICO",
            FileType::Pcx => "PCX",
            FileType::Riff => "RIFF",
            FileType::Eps => "EPS",
            FileType::Crw => "CRW",
            FileType::Cr2 => "CR2",
            FileType::Orf => "ORF",
            FileType::Raf => "RAF",
            FileType::Rw2 => "RW2",
        }
    }

    pub const fn long_name(&self) -> &'static str {
        match self {
            FileType::Unknown => "Unknown",
            FileType::Jpeg => "Joint Photographic Experts Group",
            FileType::Tiff => "Tagged Image File Format",
            FileType::Psd => "Photoshop Document",
            FileType::Png => "Portable Network Graphics",
            FileType::Bmp => "Device-Independent Bitmap",
            FileType::Gif => "Graphics Interchange Format",
            FileType::Ico => "Windows Icon",
            FileType::Pcx => "PiCture eXchange",
            FileType::Riff => "Resource Interchange File Format",
            FileType::Eps => "Encapsulated PostScript",
            FileType::Crw => "Canon Camera Raw",
            FileType::Cr2 => "Canon Camera Raw",
            FileType::Orf => "Olympus Camera Raw",
            FileType::Raf => "FujiFilm Camera Raw",
            FileType::Rw2 => "Panasonic Camera Raw",
        }
    }

    pub const fn mime_type(&self) -> Option<&'static str> {
        match self {
            FileType::Jpeg => Some("image/jpeg"),
            FileType::Tiff => Some("image/tiff"),
            FileType::Psd => Some("image/vnd.adobe.photoshop"),
            FileType::Png => Some("image/png"),
            FileType::Bmp => Some("image/bmp"),
            FileType::Gif => Some("image/gif"),
            FileType::Ico => Some("image/x-icon"),
            FileType::Pcx => Some("image/x-pcx"),
            FileType::Eps => Some("application/postscript"),
            FileType::Crw | FileType::Cr2 => Some("image/x-canon-cr2"),
            FileType::Orf => Some("image/x-olympus-orf"),
            FileType::Raf => Some("image/x-fujifilm-raf"),
            FileType::Rw2 => Some("image/x-panasonic-rw2"),
            FileType::Unknown | FileType::Riff => None,
        }
    }

    /// Usual file extension, without the dot.
    pub const fn extension(&self) -> Option<&'static str> {
        match self {
            FileType::Jpeg => Some("jpg"),
            FileType::Tiff => Some("tiff"),
            FileType::Psd => Some("psd"),
            FileType::Png => Some("png"),
            FileType::Bmp => Some("bmp"),
            FileType::Gif => Some("gif"),
            FileType::Ico => Some("ico"),
            FileType::Pcx => Some("pcx"),
            FileType::Eps => Some("eps"),
            FileType::Crw => Some("crw"),
            FileType::Cr2 => Some("cr2"),
            FileType::Orf => Some("orf"),
            FileType::Raf => Some("raf"),
            FileType::Rw2 => Some("rw2"),
            FileType::Unknown | FileType::Riff => None,
        }
    }

    /// The File Type directory appended after a successful read.
    pub fn directory(&self) -> Directory {
        let mut dir = Directory::new(DirectoryKind::FileType);
        dir.set(TAG_DETECTED_FILE_TYPE_NAME, self.name());
        dir.set(TAG_DETECTED_FILE_TYPE_LONG_NAME, self.long_name());
        if let Some(mime) = self.mime_type() {
            dir.set(TAG_DETECTED_FILE_MIME_TYPE, mime);
        }
        if let Some(ext) = self.extension() {
            dir.set(TAG_EXPECTED_FILE_NAME_EXTENSION, ext);
        }
        dir
    }
}

impl std::fmt::Display for FileType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

// File Type directory tags
pub const TAG_DETECTED_FILE_TYPE_NAME: u32 = 1;
pub const TAG_DETECTED_FILE_TYPE_LONG_NAME: u32 = 2;
pub const TAG_DETECTED_FILE_MIME_TYPE: u32 = 3;
pub const TAG_EXPECTED_FILE_NAME_EXTENSION: u32 = 4;

// =============================================================================
// Detection
// =============================================================================

const SIGNATURES: &[(FileType, &[&[u8]])] = &[
    (FileType::Jpeg, &[&[0xFF, 0xD8]]),
    (
        FileType::Tiff,
        &[b"II\x2A\x00", b"MM\x00\x2A", b"II\x2B\x00", b"MM\x00\x2B"],
    ),
    (FileType::Psd, &[b"8BPS"]),
    (FileType::Png, &[&[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A]]),
    // BM is Windows; the rest are OS/2
    (FileType::Bmp, &[b"BM", b"BA", b"CI", b"CP", b"IC", b"PT"]),
    (FileType::Gif, &[b"GIF87a", b"GIF89a"]),
    (FileType::Ico, &[&[0x00, 0x00, 0x01, 0x00]]),
    (
        FileType::Pcx,
        &[&[0x0A, 0x00, 0x01], &[0x0A, 0x02, 0x01], &[0x0A, 0x03, 0x01], &[0x0A, 0x05, 0x01]],
    ),
    (FileType::Riff, &[b"RIFF"]),
    (FileType::Eps, &[b"%!PS", &[0xC5, 0xD0, 0xD3, 0xC6]]),
    (FileType::Crw, &[b"II\x1A\x00\x00\x00HEAPCCDR"]),
    (FileType::Cr2, &[b"II\x2A\x00\x10\x00\x00\x00CR"]),
    (FileType::Orf, &[b"IIRO", b"IIRS", b"MMOR"]),
    (FileType::Raf, &[b"FUJIFILMCCD-RAW"]),
    (FileType::Rw2, &[b"II\x55\x00"]),
];

/// Signature table for file type detection.
pub struct FileTypeDetector {
    trie: ByteTrie<FileType>,
}

static SHARED_DETECTOR: OnceLock<Result<FileTypeDetector, ByteTrieError>> = OnceLock::new();

impl FileTypeDetector {
    /// The detector over the built-in signature table, built on first use.
    pub fn shared() -> Result<&'static FileTypeDetector, ByteTrieError> {
        SHARED_DETECTOR
            .get_or_init(FileTypeDetector::new)
            .as_ref()
            .map_err(Clone::clone)
    }

    pub fn new() -> Result<Self, ByteTrieError> {
        let mut trie = ByteTrie::with_default(FileType::Unknown);
        for (file_type, paths) in SIGNATURES {
            trie.add_path(*file_type, paths)?;
        }
        Ok(Self { trie })
    }

    /// Longest signature, so callers know how many bytes to supply.
    pub fn max_depth(&self) -> usize {
        self.trie.max_depth()
    }

    pub fn detect(&self, bytes: &[u8]) -> FileType {
        let probe = &bytes[..bytes.len().min(self.max_depth())];
        self.trie.find(probe).copied().unwrap_or(FileType::Unknown)
    }
}

/// Identify a file from its first bytes.
pub fn detect_file_type(bytes: &[u8]) -> FileType {
    FileTypeDetector::shared().map_or(FileType::Unknown, |detector| detector.detect(bytes))
}

// =============================================================================
// Tests
// =============================================================================
