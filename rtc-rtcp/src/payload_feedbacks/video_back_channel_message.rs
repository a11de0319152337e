use bytes::{Buf, BufMut, Bytes};
use shared::{
    error::{Error, Result},
    marshal::{Marshal, MarshalSize, Unmarshal},
};

use crate::{
    header::{FORMAT_VBCM, HEADER_LENGTH, Header, PacketType},
    util::{get_padding_size, read_feedback},
};

const VBCM_FIXED_LENGTH: usize = 8;

/// One VBCM FCI entry, RFC 5104 section 4.3.4.
#[derive(Debug, PartialEq, Eq, Default, Clone)]
pub struct VbcmEntry {
    pub ssrc: u32,
    pub sequence_number: u8,
    pub payload_type: u8,
    pub message: Bytes,
}

impl VbcmEntry {
    fn wire_size(&self) -> usize {
        VBCM_FIXED_LENGTH + self.message.len() + get_padding_size(self.message.len())
    }
}

/// Video back channel message.
#[derive(Debug, PartialEq, Eq, Default, Clone)]
pub struct VideoBackChannelMessage {
    pub sender_ssrc: u32,
    pub media_ssrc: u32,
    pub entries: Vec<VbcmEntry>,
}

impl VideoBackChannelMessage {
    pub fn header(&self) -> Header {
        Header::for_size(
            PacketType::PayloadSpecificFeedback,
            FORMAT_VBCM,
            self.marshal_size(),
        )
    }

    pub fn destination_ssrc(&self) -> Vec<u32> {
        self.entries.iter().map(|e| e.ssrc).collect()
    }
}

impl MarshalSize for VideoBackChannelMessage {
    fn marshal_size(&self) -> usize {
        HEADER_LENGTH + 8 + self.entries.iter().map(VbcmEntry::wire_size).sum::<usize>()
    }
}

impl Marshal for VideoBackChannelMessage {
    fn marshal_to(&self, mut buf: &mut [u8]) -> Result<usize> {
        if buf.remaining_mut() < self.marshal_size() {
            return Err(Error::BufferTooShort);
        }
        for e in &self.entries {
            if e.payload_type > 0x7F {
                return Err(Error::FieldOutOfRange("vbcm payload type"));
            }
            if e.message.len() > u16::MAX as usize {
                return Err(Error::FieldOutOfRange("vbcm length"));
            }
        }

        let n = self.header().marshal_to(buf)?;
        buf = &mut buf[n..];

        buf.put_u32(self.sender_ssrc);
        buf.put_u32(self.media_ssrc);
        for e in &self.entries {
            buf.put_u32(e.ssrc);
            buf.put_u8(e.sequence_number);
            buf.put_u8(e.payload_type);
            buf.put_u16(e.message.len() as u16);
            buf.put_slice(&e.message);
            for _ in 0..get_padding_size(e.message.len()) {
                buf.put_u8(0);
            }
        }

        Ok(self.marshal_size())
    }
}

impl Unmarshal for VideoBackChannelMessage {
    fn unmarshal<B>(raw_packet: &mut B) -> Result<Self>
    where
        Self: Sized,
        B: Buf,
    {
        let (_, mut body) = read_feedback(
            raw_packet,
            PacketType::PayloadSpecificFeedback,
            &[FORMAT_VBCM],
        )?;

        let sender_ssrc = body.get_u32();
        let media_ssrc = body.get_u32();
        let mut entries = vec![];
        while body.remaining() >= VBCM_FIXED_LENGTH {
            let ssrc = body.get_u32();
            let sequence_number = body.get_u8();
            let payload_type = body.get_u8() & 0x7F;
            let len = body.get_u16() as usize;
            let padded = len + get_padding_size(len);
            if body.remaining() < len {
                return Err(Error::PacketTooShort);
            }
            let message = body.copy_to_bytes(len);
            body.advance((padded - len).min(body.remaining()));
            entries.push(VbcmEntry {
                ssrc,
                sequence_number,
                payload_type,
                message,
            });
        }

        Ok(VideoBackChannelMessage {
            sender_ssrc,
            media_ssrc,
            entries,
        })
    }
}
