use bytes::{Buf, BufMut};
use shared::{
    error::{Error, Result},
    marshal::{Marshal, MarshalSize, Unmarshal},
};

use crate::{
    header::{HEADER_LENGTH, Header, PacketType, SSRC_LENGTH},
    util::read_packet,
};

/// RFC 2032 full intra request (PT 192).
#[derive(Debug, Default, PartialEq, Eq, Clone)]
pub struct LegacyFullIntraRequest {
    pub ssrc: u32,
}

impl LegacyFullIntraRequest {
    pub fn header(&self) -> Header {
        Header::for_size(PacketType::LegacyFullIntraRequest, 0, self.marshal_size())
    }

    pub fn destination_ssrc(&self) -> Vec<u32> {
        vec![self.ssrc]
    }
}

impl MarshalSize for LegacyFullIntraRequest {
    fn marshal_size(&self) -> usize {
        HEADER_LENGTH + SSRC_LENGTH
    }
}

impl Marshal for LegacyFullIntraRequest {
    fn marshal_to(&self, mut buf: &mut [u8]) -> Result<usize> {
        if buf.remaining_mut() < self.marshal_size() {
            return Err(Error::BufferTooShort);
        }

        let n = self.header().marshal_to(buf)?;
        buf = &mut buf[n..];
        buf.put_u32(self.ssrc);

        Ok(self.marshal_size())
    }
}

impl Unmarshal for LegacyFullIntraRequest {
    fn unmarshal<B>(raw_packet: &mut B) -> Result<Self>
    where
        Self: Sized,
        B: Buf,
    {
        let (_, mut body) = read_packet(raw_packet, PacketType::LegacyFullIntraRequest)?;
        if body.remaining() < SSRC_LENGTH {
            return Err(Error::PacketTooShort);
        }

        Ok(LegacyFullIntraRequest {
            ssrc: body.get_u32(),
        })
    }
}
