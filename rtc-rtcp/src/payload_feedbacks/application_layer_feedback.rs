use bytes::{Buf, BufMut, Bytes};
use shared::{
    error::{Error, Result},
    marshal::{Marshal, MarshalSize, Unmarshal},
};

use crate::{
    header::{FORMAT_AFB, HEADER_LENGTH, Header, PacketType},
    util::{get_padding_size, read_feedback},
};

/// Application layer feedback with an opaque FCI, RFC 4585 section 6.4.
/// Feedback tagged `REMB` is parsed as
/// [`ReceiverEstimatedMaximumBitrate`](super::receiver_estimated_maximum_bitrate::ReceiverEstimatedMaximumBitrate)
/// instead.
#[derive(Debug, PartialEq, Eq, Default, Clone)]
pub struct ApplicationLayerFeedback {
    pub sender_ssrc: u32,
    pub media_ssrc: u32,
    /// Zero padded to a multiple of four on the wire.
    pub data: Bytes,
}

impl ApplicationLayerFeedback {
    pub fn header(&self) -> Header {
        Header::for_size(
            PacketType::PayloadSpecificFeedback,
            FORMAT_AFB,
            self.marshal_size(),
        )
    }

    pub fn destination_ssrc(&self) -> Vec<u32> {
        vec![self.media_ssrc]
    }
}

impl MarshalSize for ApplicationLayerFeedback {
    fn marshal_size(&self) -> usize {
        HEADER_LENGTH + 8 + self.data.len() + get_padding_size(self.data.len())
    }
}

impl Marshal for ApplicationLayerFeedback {
    fn marshal_to(&self, mut buf: &mut [u8]) -> Result<usize> {
        if buf.remaining_mut() < self.marshal_size() {
            return Err(Error::BufferTooShort);
        }

        let n = self.header().marshal_to(buf)?;
        buf = &mut buf[n..];

        buf.put_u32(self.sender_ssrc);
        buf.put_u32(self.media_ssrc);
        buf.put_slice(&self.data);
        for _ in 0..get_padding_size(self.data.len()) {
            buf.put_u8(0);
        }

        Ok(self.marshal_size())
    }
}

impl Unmarshal for ApplicationLayerFeedback {
    fn unmarshal<B>(raw_packet: &mut B) -> Result<Self>
    where
        Self: Sized,
        B: Buf,
    {
        let (_, mut body) =
            read_feedback(raw_packet, PacketType::PayloadSpecificFeedback, &[FORMAT_AFB])?;

        Ok(ApplicationLayerFeedback {
            sender_ssrc: body.get_u32(),
            media_ssrc: body.get_u32(),
            data: body,
        })
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_application_layer_feedback_roundtrip() -> Result<()> {
        let afb = ApplicationLayerFeedback {
            sender_ssrc: 0x902f9e2e,
            media_ssrc: 0xbc5e9a40,
            data: Bytes::from_static(b"GOOG"),
        };
        let data = afb.marshal()?;
        assert_eq!(data[0], 0x8f);
        assert_eq!(ApplicationLayerFeedback::unmarshal(&mut data.clone())?, afb);

        let unaligned = ApplicationLayerFeedback {
            data: Bytes::from_static(b"abcde"),
            ..afb
        };
        let data = unaligned.marshal()?;
        assert_eq!(data.len(), 20);
        assert_eq!(
            ApplicationLayerFeedback::unmarshal(&mut data.clone())?.data,
            Bytes::from_static(b"abcde\0\0\0")
        );
        Ok(())
    }
}
