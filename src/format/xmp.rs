//! XMP packets.
//!
//! The packet is kept verbatim. Parsing the RDF inside is left to callers
//! with an XML stack of their own.

use tracing::debug;

use crate::charset::Charset;
use crate::metadata::{Directory, DirectoryKind, Metadata, StringValue};

/// The raw packet text
pub const TAG_XMP_PACKET: u32 = 0;

/// Opening processing instruction of a wrapped packet
const PACKET_BEGIN: &[u8] = b"<?xpacket begin";

/// Store one XMP packet in a new XMP directory.
pub fn read_xmp(data: &[u8], metadata: &mut Metadata) {
    let mut directory = Directory::new(DirectoryKind::Xmp);

    let end = data
        .iter()
        .rposition(|&b| b != 0 && !b.is_ascii_whitespace())
        .map_or(0, |i| i + 1);
    let packet = &data[..end];

    if packet.is_empty() {
        directory.add_error("Empty XMP packet");
    } else {
        if std::str::from_utf8(packet).is_err() {
            directory.add_error("XMP packet is not valid UTF-8");
        }
        if !packet.starts_with(PACKET_BEGIN) && !packet.starts_with(b"<") {
            debug!(len = packet.len(), "XMP data does not start with markup");
        }
        directory.set(TAG_XMP_PACKET, StringValue::new(packet.to_vec(), Some(Charset::Utf8)));
    }
    metadata.add_directory(directory);
}
