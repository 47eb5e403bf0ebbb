//! Character-encoding resolution for text embedded in metadata.
//!
//! IPTC declares its encoding with ISO 2022 escape sequences, Exif
//! UserComment with an 8-byte header, and most everything else says
//! nothing at all. Unresolvable indicators fall back to ISO-8859-1 so that
//! every byte still maps to some character.

use serde::Serialize;

const ESC: u8 = 0x1B;

/// Text encodings the decoders can produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Charset {
    Ascii,
    Iso8859_1,
    Utf8,
    Utf16Be,
    Utf16Le,
}

impl Charset {
    /// Look up an encoding by one of its common names (case-insensitive).
    pub fn from_name(name: &str) -> Option<Self> {
        let normalized = name.trim().to_ascii_uppercase().replace('_', "-");
        match normalized.as_str() {
            "ASCII" | "US-ASCII" => Some(Charset::Ascii),
            "ISO-8859-1" | "ISO8859-1" | "LATIN1" | "LATIN-1" | "CP1252" | "WINDOWS-1252" => {
                Some(Charset::Iso8859_1)
            }
            "UTF-8" | "UTF8" => Some(Charset::Utf8),
            "UTF-16BE" | "UTF-16" | "UNICODE" => Some(Charset::Utf16Be),
            "UTF-16LE" => Some(Charset::Utf16Le),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Charset::Ascii => "US-ASCII",
            Charset::Iso8859_1 => "ISO-8859-1",
            Charset::Utf8 => "UTF-8",
            Charset::Utf16Be => "UTF-16BE",
            Charset::Utf16Le => "UTF-16LE",
        }
    }

    /// Decode `bytes`, replacing anything unrepresentable.
    pub fn decode(&self, bytes: &[u8]) -> String {
        match self {
            Charset::Utf8 => String::from_utf8_lossy(bytes).into_owned(),
            Charset::Iso8859_1 => bytes.iter().map(|&b| b as char).collect(),
            Charset::Ascii => bytes
                .iter()
                .map(|&b| if b.is_ascii() { b as char } else { char::REPLACEMENT_CHARACTER })
                .collect(),
            Charset::Utf16Be => decode_utf16(bytes, u16::from_be_bytes),
            Charset::Utf16Le => decode_utf16(bytes, u16::from_le_bytes),
        }
    }
}

fn decode_utf16(bytes: &[u8], read: fn([u8; 2]) -> u16) -> String {
    let units = bytes.chunks_exact(2).map(|c| read([c[0], c[1]]));
    char::decode_utf16(units)
        .map(|r| r.unwrap_or(char::REPLACEMENT_CHARACTER))
        .collect()
}

/// Resolve an ISO 2022 designation escape, as found in the IPTC
/// CodedCharacterSet dataset.
pub fn charset_from_iso2022(bytes: &[u8]) -> Option<Charset> {
    if bytes.len() < 3 || bytes[0] != ESC {
        return None;
    }
    match (bytes[1], bytes[2]) {
        (b'%', b'G') => Some(Charset::Utf8),
        (b'.', b'A') | (b'-', b'A') => Some(Charset::Iso8859_1),
        (b'(', b'B') => Some(Charset::Ascii),
        _ => None,
    }
}

/// Best guess for undeclared text: UTF-8 when the bytes are valid UTF-8,
/// ISO-8859-1 otherwise.
pub fn guess_charset(bytes: &[u8]) -> Charset {
    if std::str::from_utf8(bytes).is_ok() {
        Charset::Utf8
    } else {
        Charset::Iso8859_1
    }
}

/// Decode an Exif UserComment value.
///
/// The first eight bytes name the encoding (`ASCII\0\0\0`, `UNICODE\0`,
/// `JIS\0\0\0\0\0`, or all zeros for undefined). Values without a
/// recognised header are decoded whole as ISO-8859-1.
pub fn decode_user_comment(bytes: &[u8]) -> String {
    if bytes.len() < 8 {
        return trim_comment(&Charset::Iso8859_1.decode(bytes));
    }

    let (header, body) = bytes.split_at(8);
    let header = header
        .iter()
        .take_while(|&&b| b != 0 && b != b' ')
        .map(|&b| b as char)
        .collect::<String>();

    let text = match header.as_str() {
        "ASCII" => Charset::Iso8859_1.decode(body),
        "UTF8" => Charset::Utf8.decode(body),
        // byte order is not declared; big-endian is the common case
        "UNICODE" => Charset::Utf16Be.decode(body),
        // TODO: decode JIS X 0208 instead of passing bytes through as Latin-1
        "JIS" => Charset::Iso8859_1.decode(body),
        "" => Charset::Iso8859_1.decode(body),
        _ => Charset::Iso8859_1.decode(bytes),
    };
    trim_comment(&text)
}

fn trim_comment(text: &str) -> String {
    text.trim_matches(|c: char| c == '\0' || c.is_whitespace())
        .to_string()
}
