use bytes::{Buf, BufMut};
use shared::{
    error::{Error, Result},
    marshal::{Marshal, MarshalSize, Unmarshal},
};

use crate::{
    header::{HEADER_LENGTH, Header, PacketType, SSRC_LENGTH},
    transport_feedbacks::transport_layer_nack::NackPair,
    util::read_packet,
};

const NACK_BODY_LENGTH: usize = SSRC_LENGTH + 4;

/// RFC 2032 negative acknowledgement (PT 193).
#[derive(Debug, Default, PartialEq, Eq, Clone)]
pub struct LegacyNack {
    pub ssrc: u32,
    /// First lost sequence number.
    pub first_sequence_number: u16,
    /// Bitmask of following lost packets, bit i requesting
    /// `first_sequence_number + i + 1`.
    pub bitmask: u16,
}

impl LegacyNack {
    pub fn header(&self) -> Header {
        Header::for_size(PacketType::LegacyNack, 0, self.marshal_size())
    }

    pub fn destination_ssrc(&self) -> Vec<u32> {
        vec![self.ssrc]
    }

    /// Sequence numbers requested by this packet.
    pub fn packet_list(&self) -> Vec<u16> {
        NackPair {
            packet_id: self.first_sequence_number,
            lost_packets: self.bitmask,
        }
        .packet_list()
    }
}

impl MarshalSize for LegacyNack {
    fn marshal_size(&self) -> usize {
        HEADER_LENGTH + NACK_BODY_LENGTH
    }
}

impl Marshal for LegacyNack {
    fn marshal_to(&self, mut buf: &mut [u8]) -> Result<usize> {
        if buf.remaining_mut() < self.marshal_size() {
            return Err(Error::BufferTooShort);
        }

        /*
         *  0                   1                   2                   3
         *  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
         * +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
         * |V=2|P|   MBZ   |  PT=RTCP_NACK |            length             |
         * +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
         * |                              SSRC                             |
         * +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
         * |              FSN              |              BLP              |
         * +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
         */
        let n = self.header().marshal_to(buf)?;
        buf = &mut buf[n..];
        buf.put_u32(self.ssrc);
        buf.put_u16(self.first_sequence_number);
        buf.put_u16(self.bitmask);

        Ok(self.marshal_size())
    }
}

impl Unmarshal for LegacyNack {
    fn unmarshal<B>(raw_packet: &mut B) -> Result<Self>
    where
        Self: Sized,
        B: Buf,
    {
        let (_, mut body) = read_packet(raw_packet, PacketType::LegacyNack)?;
        if body.remaining() < NACK_BODY_LENGTH {
            return Err(Error::PacketTooShort);
        }

        Ok(LegacyNack {
            ssrc: body.get_u32(),
            first_sequence_number: body.get_u16(),
            bitmask: body.get_u16(),
        })
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use bytes::Bytes;

    #[test]
    fn test_legacy_nack() {
        let data = Bytes::from_static(&[
            0x80, 0xc1, 0x00, 0x02, // v=2, p=0, NACK, len=2
            0x90, 0x2f, 0x9e, 0x2e, // ssrc=0x902f9e2e
            0x03, 0xe8, 0x00, 0x05, // fsn=1000, blp=0b101
        ]);
        let nack = LegacyNack::unmarshal(&mut data.clone()).unwrap();
        assert_eq!(
            nack,
            LegacyNack {
                ssrc: 0x902f9e2e,
                first_sequence_number: 1000,
                bitmask: 0b101,
            }
        );
        assert_eq!(nack.packet_list(), vec![1000, 1001, 1003]);
        assert_eq!(nack.marshal().unwrap(), data);
    }
}
