use std::fmt;

use bytes::{Buf, BufMut, Bytes};
use shared::{
    error::{Error, Result},
    marshal::{Marshal, MarshalSize, Unmarshal},
};

use crate::{
    header::{FORMAT_RPSI, HEADER_LENGTH, Header, PacketType},
    util::{get_padding_size, read_feedback},
};

const RPSI_OFFSET: usize = 8;
const RPSI_FIXED_LENGTH: usize = 2;

/// Reference picture selection indication, RFC 4585 section 6.3.3.
///
/// ```text
///  0                   1                   2                   3
///  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |      PB       |0| Payload Type|    Native RPSI bit string     |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |   defined per codec          ...                | Padding (0) |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// ```
///
/// The bit string is kept in whole octets, so PB is always a multiple of 8.
#[derive(Debug, PartialEq, Eq, Default, Clone)]
pub struct ReferencePictureSelectionIndication {
    pub sender_ssrc: u32,
    pub media_ssrc: u32,
    pub payload_type: u8,
    pub bit_string: Bytes,
}

impl fmt::Display for ReferencePictureSelectionIndication {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ReferencePictureSelectionIndication {:x} {:x} pt={} {:02x?}",
            self.sender_ssrc,
            self.media_ssrc,
            self.payload_type,
            &self.bit_string[..]
        )
    }
}

impl ReferencePictureSelectionIndication {
    pub fn header(&self) -> Header {
        Header::for_size(
            PacketType::PayloadSpecificFeedback,
            FORMAT_RPSI,
            self.marshal_size(),
        )
    }

    pub fn destination_ssrc(&self) -> Vec<u32> {
        vec![self.media_ssrc]
    }

    fn padding_size(&self) -> usize {
        get_padding_size(RPSI_FIXED_LENGTH + self.bit_string.len())
    }
}

impl MarshalSize for ReferencePictureSelectionIndication {
    fn marshal_size(&self) -> usize {
        HEADER_LENGTH
            + RPSI_OFFSET
            + RPSI_FIXED_LENGTH
            + self.bit_string.len()
            + self.padding_size()
    }
}

impl Marshal for ReferencePictureSelectionIndication {
    fn marshal_to(&self, mut buf: &mut [u8]) -> Result<usize> {
        if buf.remaining_mut() < self.marshal_size() {
            return Err(Error::BufferTooShort);
        }
        if self.payload_type > 0x7F {
            return Err(Error::FieldOutOfRange("rpsi payload type"));
        }

        let n = self.header().marshal_to(buf)?;
        buf = &mut buf[n..];

        let padding = self.padding_size();
        buf.put_u32(self.sender_ssrc);
        buf.put_u32(self.media_ssrc);
        buf.put_u8((padding * 8) as u8);
        buf.put_u8(self.payload_type);
        buf.put(self.bit_string.clone());
        for _ in 0..padding {
            buf.put_u8(0);
        }

        Ok(self.marshal_size())
    }
}

impl Unmarshal for ReferencePictureSelectionIndication {
    fn unmarshal<B>(raw_packet: &mut B) -> Result<Self>
    where
        Self: Sized,
        B: Buf,
    {
        let (_, mut body) = read_feedback(
            raw_packet,
            PacketType::PayloadSpecificFeedback,
            &[FORMAT_RPSI],
        )?;
        let sender_ssrc = body.get_u32();
        let media_ssrc = body.get_u32();

        if body.remaining() < RPSI_FIXED_LENGTH {
            return Err(Error::PacketTooShort);
        }
        let padding_bits = body.get_u8() as usize;
        let payload_type = body.get_u8() & 0x7F;
        if padding_bits % 8 != 0 || padding_bits / 8 > body.remaining() {
            return Err(Error::WrongPadding);
        }
        body.truncate(body.len() - padding_bits / 8);

        Ok(ReferencePictureSelectionIndication {
            sender_ssrc,
            media_ssrc,
            payload_type,
            bit_string: body,
        })
    }
}
