//! Compound RTCP packets.
//!
//! A compound packet is a sequence of sub-packets, each starting with the
//! common [`Header`]. Parsing walks the sequence by the length in each header
//! and dispatches on packet type and feedback format.

use bytes::{Buf, Bytes, BytesMut};
use log::{debug, trace};
use shared::{
    error::{Error, Result},
    marshal::{Marshal, MarshalSize, Unmarshal},
};

use crate::{
    application_defined::ApplicationDefined,
    extended_jitter_report::ExtendedJitterReport,
    goodbye::Goodbye,
    header::*,
    legacy::{full_intra_request::LegacyFullIntraRequest, nack::LegacyNack},
    payload_feedbacks::{
        application_layer_feedback::ApplicationLayerFeedback,
        full_intra_request::FullIntraRequest, picture_loss_indication::PictureLossIndication,
        receiver_estimated_maximum_bitrate::ReceiverEstimatedMaximumBitrate,
        reference_picture_selection_indication::ReferencePictureSelectionIndication,
        slice_loss_indication::SliceLossIndication,
        temporal_spatial_tradeoff::TemporalSpatialTradeoff,
        video_back_channel_message::VideoBackChannelMessage,
    },
    receiver_report::ReceiverReport,
    sender_report::SenderReport,
    source_description::SourceDescription,
    transport_feedbacks::{
        temporary_maximum_bitrate::TemporaryMaximumBitrate, transport_layer_cc::TransportLayerCc,
        transport_layer_nack::TransportLayerNack,
    },
};

/// Offset of the application layer feedback FCI from the start of the packet.
const AFB_FCI_OFFSET: usize = HEADER_LENGTH + 8;

macro_rules! packets {
    ($($variant:ident),+ $(,)?) => {
        /// One sub-packet of a compound RTCP packet.
        #[derive(Debug, PartialEq, Eq, Clone)]
        pub enum Packet {
            $($variant($variant),)+
        }

        $(
            impl From<$variant> for Packet {
                fn from(p: $variant) -> Self {
                    Packet::$variant(p)
                }
            }
        )+

        impl Packet {
            /// The common header this packet serializes with.
            pub fn header(&self) -> Header {
                match self {
                    $(Packet::$variant(p) => p.header(),)+
                }
            }
        }

        impl MarshalSize for Packet {
            fn marshal_size(&self) -> usize {
                match self {
                    $(Packet::$variant(p) => p.marshal_size(),)+
                }
            }
        }

        impl Marshal for Packet {
            fn marshal_to(&self, buf: &mut [u8]) -> Result<usize> {
                match self {
                    $(Packet::$variant(p) => p.marshal_to(buf),)+
                }
            }
        }
    };
}

packets!(
    SenderReport,
    ReceiverReport,
    SourceDescription,
    Goodbye,
    ApplicationDefined,
    ExtendedJitterReport,
    LegacyFullIntraRequest,
    LegacyNack,
    TransportLayerNack,
    TemporaryMaximumBitrate,
    TransportLayerCc,
    PictureLossIndication,
    FullIntraRequest,
    SliceLossIndication,
    ReferencePictureSelectionIndication,
    TemporalSpatialTradeoff,
    VideoBackChannelMessage,
    ApplicationLayerFeedback,
    ReceiverEstimatedMaximumBitrate,
);

impl Packet {
    /// SSRCs this packet refers to: the reported or requested media sources.
    pub fn destination_ssrc(&self) -> Vec<u32> {
        match self {
            Packet::SenderReport(p) => p.destination_ssrc(),
            Packet::ReceiverReport(p) => p.destination_ssrc(),
            Packet::SourceDescription(p) => p.destination_ssrc(),
            Packet::Goodbye(p) => p.destination_ssrc(),
            Packet::ApplicationDefined(p) => p.destination_ssrc(),
            Packet::ExtendedJitterReport(_) => vec![],
            Packet::LegacyFullIntraRequest(p) => p.destination_ssrc(),
            Packet::LegacyNack(p) => p.destination_ssrc(),
            Packet::TransportLayerNack(p) => p.destination_ssrc(),
            Packet::TemporaryMaximumBitrate(p) => p.destination_ssrc(),
            Packet::TransportLayerCc(p) => p.destination_ssrc(),
            Packet::PictureLossIndication(p) => p.destination_ssrc(),
            Packet::FullIntraRequest(p) => p.destination_ssrc(),
            Packet::SliceLossIndication(p) => p.destination_ssrc(),
            Packet::ReferencePictureSelectionIndication(p) => p.destination_ssrc(),
            Packet::TemporalSpatialTradeoff(p) => p.destination_ssrc(),
            Packet::VideoBackChannelMessage(p) => p.destination_ssrc(),
            Packet::ApplicationLayerFeedback(p) => p.destination_ssrc(),
            Packet::ReceiverEstimatedMaximumBitrate(p) => p.destination_ssrc(),
        }
    }
}

/// Serializes packets back to back into one compound packet.
pub fn marshal(packets: &[Packet]) -> Result<Bytes> {
    let size = packets.iter().map(MarshalSize::marshal_size).sum();
    let mut out = BytesMut::with_capacity(size);
    out.resize(size, 0);

    let mut offset = 0;
    for p in packets {
        offset += p.marshal_to(&mut out[offset..])?;
    }
    if offset != size {
        return Err(Error::WrongMarshalSize(size, offset));
    }

    Ok(out.freeze())
}

/// Parses a compound packet.
///
/// A header with a bad version, or a length running past the end of the
/// buffer, fails the whole parse since the remaining framing cannot be
/// trusted. Sub-packets of unknown type or format are skipped, and a
/// sub-packet whose body fails to parse is dropped while parsing continues
/// with the next one.
pub fn unmarshal<B>(raw_data: &mut B) -> Result<Vec<Packet>>
where
    B: Buf,
{
    let mut raw = raw_data.copy_to_bytes(raw_data.remaining());
    let mut packets = vec![];

    while raw.has_remaining() {
        let header = Header::unmarshal(&mut raw.slice(..))?;
        let length = header.packet_size();
        if length > raw.remaining() {
            return Err(Error::PacketLengthExceedsBuffer(length, raw.remaining()));
        }

        let member = raw.split_to(length);
        match unmarshal_member(&header, member) {
            Ok(Some(p)) => packets.push(p),
            Ok(None) => trace!(
                "skipping rtcp packet type {} format {}",
                header.packet_type,
                header.count
            ),
            Err(err) => debug!(
                "dropping rtcp {} format {}: {}",
                header.packet_type, header.count, err
            ),
        }
    }

    Ok(packets)
}

fn unmarshal_member(header: &Header, raw: Bytes) -> Result<Option<Packet>> {
    let buf = &mut raw.clone();

    let packet: Packet = match header.packet_type {
        PacketType::SenderReport => SenderReport::unmarshal(buf)?.into(),
        PacketType::ReceiverReport => ReceiverReport::unmarshal(buf)?.into(),
        PacketType::SourceDescription => SourceDescription::unmarshal(buf)?.into(),
        PacketType::Goodbye => Goodbye::unmarshal(buf)?.into(),
        PacketType::ApplicationDefined => ApplicationDefined::unmarshal(buf)?.into(),
        PacketType::ExtendedJitterReport => ExtendedJitterReport::unmarshal(buf)?.into(),
        PacketType::LegacyFullIntraRequest => LegacyFullIntraRequest::unmarshal(buf)?.into(),
        PacketType::LegacyNack => LegacyNack::unmarshal(buf)?.into(),

        PacketType::TransportSpecificFeedback => match header.count {
            FORMAT_TLN => TransportLayerNack::unmarshal(buf)?.into(),
            FORMAT_TMMBR | FORMAT_TMMBN => TemporaryMaximumBitrate::unmarshal(buf)?.into(),
            FORMAT_TCC => TransportLayerCc::unmarshal(buf)?.into(),
            _ => return Ok(None),
        },

        PacketType::PayloadSpecificFeedback => match header.count {
            FORMAT_PLI => PictureLossIndication::unmarshal(buf)?.into(),
            FORMAT_SLI => SliceLossIndication::unmarshal(buf)?.into(),
            FORMAT_RPSI => ReferencePictureSelectionIndication::unmarshal(buf)?.into(),
            FORMAT_FIR => FullIntraRequest::unmarshal(buf)?.into(),
            FORMAT_TSTR | FORMAT_TSTN => TemporalSpatialTradeoff::unmarshal(buf)?.into(),
            FORMAT_VBCM => VideoBackChannelMessage::unmarshal(buf)?.into(),
            FORMAT_AFB => {
                let is_remb = raw.len() > AFB_FCI_OFFSET
                    && ReceiverEstimatedMaximumBitrate::is_remb(&raw[AFB_FCI_OFFSET..]);
                if is_remb {
                    ReceiverEstimatedMaximumBitrate::unmarshal(buf)?.into()
                } else {
                    ApplicationLayerFeedback::unmarshal(buf)?.into()
                }
            }
            _ => return Ok(None),
        },

        PacketType::Unsupported => return Ok(None),
    };

    Ok(Some(packet))
}
