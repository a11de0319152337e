use std::time::Instant;

use bytes::Bytes;
use rtp::extension::HeaderExtensions;

use crate::group::SourceKind;
use crate::rtp_map::{Codec, MediaType};

/// A decrypted RTP packet resolved to its group.
///
/// Packets received on a retransmission stream are delivered unwrapped, with
/// the media SSRC, original sequence number and associated payload type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReceivedPacket {
    pub media_type: MediaType,
    pub codec: Codec,
    pub source: SourceKind,
    pub packet: rtp::Packet,
    pub extended_sequence_number: u32,
    pub extensions: HeaderExtensions,
    pub arrival: Instant,
}

/// A media packet handed to the transport for sending.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingPacket {
    pub ssrc: u32,
    pub codec: Codec,
    pub sequence_number: u16,
    pub timestamp: u32,
    pub marker: bool,
    pub payload: Bytes,
}
