use std::fmt;

use bytes::{Buf, BufMut};
use shared::{
    error::{Error, Result},
    marshal::{Marshal, MarshalSize, Unmarshal},
};

use crate::{
    header::{FORMAT_SLI, HEADER_LENGTH, Header, PacketType},
    util::read_feedback,
};

const SLI_OFFSET: usize = 8;
const SLI_ENTRY_LENGTH: usize = 4;

/// SliEntry represents a single entry to the SLI packet's
/// list of lost slices.
#[derive(Debug, PartialEq, Eq, Default, Clone, Copy)]
pub struct SliEntry {
    /// ID of first lost slice, 13 bits
    pub first: u16,
    /// Number of lost slices, 13 bits
    pub number: u16,
    /// ID of related picture, 6 bits
    pub picture: u8,
}

/// The SliceLossIndication packet informs the encoder about the loss of a picture slice
#[derive(Debug, PartialEq, Eq, Default, Clone)]
pub struct SliceLossIndication {
    pub sender_ssrc: u32,
    pub media_ssrc: u32,
    pub sli_entries: Vec<SliEntry>,
}

impl fmt::Display for SliceLossIndication {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "SliceLossIndication {:x} {:x} {:?}",
            self.sender_ssrc, self.media_ssrc, self.sli_entries,
        )
    }
}

impl SliceLossIndication {
    pub fn header(&self) -> Header {
        Header::for_size(
            PacketType::PayloadSpecificFeedback,
            FORMAT_SLI,
            self.marshal_size(),
        )
    }

    pub fn destination_ssrc(&self) -> Vec<u32> {
        vec![self.media_ssrc]
    }
}

impl MarshalSize for SliceLossIndication {
    fn marshal_size(&self) -> usize {
        HEADER_LENGTH + SLI_OFFSET + self.sli_entries.len() * SLI_ENTRY_LENGTH
    }
}

impl Marshal for SliceLossIndication {
    fn marshal_to(&self, mut buf: &mut [u8]) -> Result<usize> {
        if buf.remaining_mut() < self.marshal_size() {
            return Err(Error::BufferTooShort);
        }
        for s in &self.sli_entries {
            if s.first > 0x1FFF || s.number > 0x1FFF || s.picture > 0x3F {
                return Err(Error::FieldOutOfRange("sli entry"));
            }
        }

        let n = self.header().marshal_to(buf)?;
        buf = &mut buf[n..];

        buf.put_u32(self.sender_ssrc);
        buf.put_u32(self.media_ssrc);

        for s in &self.sli_entries {
            let sli = ((s.first as u32) << 19) | ((s.number as u32) << 6) | (s.picture as u32);
            buf.put_u32(sli);
        }

        Ok(self.marshal_size())
    }
}

impl Unmarshal for SliceLossIndication {
    fn unmarshal<B>(raw_packet: &mut B) -> Result<Self>
    where
        Self: Sized,
        B: Buf,
    {
        let (_, mut body) =
            read_feedback(raw_packet, PacketType::PayloadSpecificFeedback, &[FORMAT_SLI])?;

        let sender_ssrc = body.get_u32();
        let media_ssrc = body.get_u32();

        let mut sli_entries = vec![];
        while body.remaining() >= SLI_ENTRY_LENGTH {
            let sli = body.get_u32();
            sli_entries.push(SliEntry {
                first: ((sli >> 19) & 0x1FFF) as u16,
                number: ((sli >> 6) & 0x1FFF) as u16,
                picture: (sli & 0x3F) as u8,
            });
        }

        Ok(SliceLossIndication {
            sender_ssrc,
            media_ssrc,
            sli_entries,
        })
    }
}
