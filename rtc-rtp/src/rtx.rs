//! RFC 4588 retransmission payload format.
//!
//! An RTX packet carries the original sequence number (OSN) in the first two
//! bytes of its payload, followed by the original payload.

use bytes::{BufMut, Bytes, BytesMut};
use shared::error::{Error, Result};

use crate::packet::Packet;

pub const OSN_LENGTH: usize = 2;

/// Restores the original packet from an RTX packet: the SSRC becomes
/// `media_ssrc`, the sequence number the OSN and the payload type
/// `associated_payload_type`.
pub fn unwrap(rtx: &Packet, media_ssrc: u32, associated_payload_type: u8) -> Result<Packet> {
    if rtx.payload.len() < OSN_LENGTH {
        return Err(Error::ErrRtxPayloadTooShort);
    }

    let mut header = rtx.header.clone();
    header.ssrc = media_ssrc;
    header.sequence_number = u16::from_be_bytes([rtx.payload[0], rtx.payload[1]]);
    header.payload_type = associated_payload_type;

    Ok(Packet {
        header,
        payload: rtx.payload.slice(OSN_LENGTH..),
    })
}

/// Builds the RTX form of `original` on the retransmission stream.
pub fn wrap(
    original: &Packet,
    rtx_ssrc: u32,
    rtx_payload_type: u8,
    rtx_sequence_number: u16,
) -> Packet {
    let mut payload = BytesMut::with_capacity(OSN_LENGTH + original.payload.len());
    payload.put_u16(original.header.sequence_number);
    payload.put_slice(&original.payload);

    let mut header = original.header.clone();
    header.ssrc = rtx_ssrc;
    header.payload_type = rtx_payload_type;
    header.sequence_number = rtx_sequence_number;
    header.padding = false;

    Packet {
        header,
        payload: payload.freeze(),
    }
}

/// Original sequence number carried by an RTX payload.
pub fn original_sequence_number(payload: &Bytes) -> Option<u16> {
    (payload.len() >= OSN_LENGTH).then(|| u16::from_be_bytes([payload[0], payload[1]]))
}
