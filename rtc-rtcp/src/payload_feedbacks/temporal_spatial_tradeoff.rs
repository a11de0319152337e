use bytes::{Buf, BufMut};
use shared::{
    error::{Error, Result},
    marshal::{Marshal, MarshalSize, Unmarshal},
};

use crate::{
    header::{FORMAT_TSTN, FORMAT_TSTR, HEADER_LENGTH, Header, PacketType},
    util::read_feedback,
};

const TST_ENTRY_LENGTH: usize = 8;
const INDEX_MAX: u8 = 31;

#[derive(Debug, PartialEq, Eq, Default, Clone, Copy)]
pub struct TstEntry {
    pub ssrc: u32,
    pub sequence_number: u8,
    /// 0 requests the highest spatial quality, 31 the highest frame rate.
    pub index: u8,
}

/// Temporal-spatial trade-off request (TSTR) or notification (TSTN),
/// RFC 5104 sections 4.3.2 and 4.3.3.
#[derive(Debug, PartialEq, Eq, Default, Clone)]
pub struct TemporalSpatialTradeoff {
    pub sender_ssrc: u32,
    pub media_ssrc: u32,
    pub notification: bool,
    pub entries: Vec<TstEntry>,
}

impl TemporalSpatialTradeoff {
    pub fn header(&self) -> Header {
        let fmt = if self.notification {
            FORMAT_TSTN
        } else {
            FORMAT_TSTR
        };
        Header::for_size(PacketType::PayloadSpecificFeedback, fmt, self.marshal_size())
    }

    pub fn destination_ssrc(&self) -> Vec<u32> {
        self.entries.iter().map(|e| e.ssrc).collect()
    }
}

impl MarshalSize for TemporalSpatialTradeoff {
    fn marshal_size(&self) -> usize {
        HEADER_LENGTH + 8 + self.entries.len() * TST_ENTRY_LENGTH
    }
}

impl Marshal for TemporalSpatialTradeoff {
    fn marshal_to(&self, mut buf: &mut [u8]) -> Result<usize> {
        if buf.remaining_mut() < self.marshal_size() {
            return Err(Error::BufferTooShort);
        }
        if self.entries.iter().any(|e| e.index > INDEX_MAX) {
            return Err(Error::FieldOutOfRange("tst index"));
        }

        let n = self.header().marshal_to(buf)?;
        buf = &mut buf[n..];

        buf.put_u32(self.sender_ssrc);
        buf.put_u32(self.media_ssrc);
        for e in &self.entries {
            buf.put_u32(e.ssrc);
            buf.put_u32((e.sequence_number as u32) << 24 | e.index as u32);
        }

        Ok(self.marshal_size())
    }
}

impl Unmarshal for TemporalSpatialTradeoff {
    fn unmarshal<B>(raw_packet: &mut B) -> Result<Self>
    where
        Self: Sized,
        B: Buf,
    {
        let (header, mut body) = read_feedback(
            raw_packet,
            PacketType::PayloadSpecificFeedback,
            &[FORMAT_TSTR, FORMAT_TSTN],
        )?;

        let sender_ssrc = body.get_u32();
        let media_ssrc = body.get_u32();
        let mut entries = vec![];
        while body.remaining() >= TST_ENTRY_LENGTH {
            let ssrc = body.get_u32();
            let word = body.get_u32();
            entries.push(TstEntry {
                ssrc,
                sequence_number: (word >> 24) as u8,
                index: (word & INDEX_MAX as u32) as u8,
            });
        }

        Ok(TemporalSpatialTradeoff {
            sender_ssrc,
            media_ssrc,
            notification: header.count == FORMAT_TSTN,
            entries,
        })
    }
}
