use bytes::{Buf, BufMut};
use shared::{
    error::{Error, Result},
    marshal::{Marshal, MarshalSize, Unmarshal},
};

use crate::{
    header::{COUNT_MAX, HEADER_LENGTH, Header, PacketType},
    util::read_packet,
};

/// Extended inter-arrival jitter report (IJ), RFC 5450.
///
/// Carries one jitter value per RTP source, in timestamp units.
#[derive(Debug, Default, PartialEq, Eq, Clone)]
pub struct ExtendedJitterReport {
    pub jitters: Vec<u32>,
}

impl ExtendedJitterReport {
    pub fn header(&self) -> Header {
        Header::for_size(
            PacketType::ExtendedJitterReport,
            self.jitters.len() as u8,
            self.marshal_size(),
        )
    }
}

impl MarshalSize for ExtendedJitterReport {
    fn marshal_size(&self) -> usize {
        HEADER_LENGTH + self.jitters.len() * 4
    }
}

impl Marshal for ExtendedJitterReport {
    fn marshal_to(&self, mut buf: &mut [u8]) -> Result<usize> {
        if self.jitters.len() > COUNT_MAX {
            return Err(Error::TooManyReports);
        }
        if buf.remaining_mut() < self.marshal_size() {
            return Err(Error::BufferTooShort);
        }

        let n = self.header().marshal_to(buf)?;
        buf = &mut buf[n..];
        for jitter in &self.jitters {
            buf.put_u32(*jitter);
        }

        Ok(self.marshal_size())
    }
}

impl Unmarshal for ExtendedJitterReport {
    fn unmarshal<B>(raw_packet: &mut B) -> Result<Self>
    where
        Self: Sized,
        B: Buf,
    {
        let (header, mut body) = read_packet(raw_packet, PacketType::ExtendedJitterReport)?;
        if body.remaining() < header.count as usize * 4 {
            return Err(Error::PacketTooShort);
        }

        let jitters = (0..header.count).map(|_| body.get_u32()).collect();
        Ok(ExtendedJitterReport { jitters })
    }
}
