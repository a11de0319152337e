use bytes::{Buf, Bytes};
use shared::{
    error::{Error, Result},
    marshal::Unmarshal,
};

use crate::header::{Header, PacketType};

/// Number of zero bytes needed to pad `len` to a 32-bit boundary.
pub(crate) fn get_padding_size(len: usize) -> usize {
    if len % 4 == 0 { 0 } else { 4 - (len % 4) }
}

/// Reads the common header of one packet of the expected type and returns it
/// with the packet body. Padding announced by the header is stripped.
pub(crate) fn read_packet<B: Buf>(
    raw_packet: &mut B,
    packet_type: PacketType,
) -> Result<(Header, Bytes)> {
    let header = Header::unmarshal(raw_packet)?;
    if header.packet_type != packet_type {
        return Err(Error::WrongType);
    }

    let body_len = header.length as usize * 4;
    if raw_packet.remaining() < body_len {
        return Err(Error::PacketTooShort);
    }
    let mut body = raw_packet.copy_to_bytes(body_len);

    if header.padding {
        let Some(&padding_len) = body.last() else {
            return Err(Error::WrongPadding);
        };
        let padding_len = padding_len as usize;
        if padding_len == 0 || padding_len > body.len() {
            return Err(Error::WrongPadding);
        }
        body.truncate(body.len() - padding_len);
    }

    Ok((header, body))
}

/// Like [`read_packet`] for feedback messages, additionally checking the FMT.
pub(crate) fn read_feedback<B: Buf>(
    raw_packet: &mut B,
    packet_type: PacketType,
    formats: &[u8],
) -> Result<(Header, Bytes)> {
    let (header, body) = read_packet(raw_packet, packet_type)?;
    if !formats.contains(&header.count) {
        return Err(Error::WrongFeedbackType(header.count));
    }
    // sender and media ssrc
    if body.remaining() < 8 {
        return Err(Error::PacketTooShort);
    }
    Ok((header, body))
}
