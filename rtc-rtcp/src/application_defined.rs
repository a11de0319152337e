use bytes::{Buf, BufMut, Bytes};
use shared::{
    error::{Error, Result},
    marshal::{Marshal, MarshalSize, Unmarshal},
};

use crate::{
    header::{COUNT_MAX, HEADER_LENGTH, Header, PacketType, SSRC_LENGTH},
    util::{get_padding_size, read_packet},
};

const NAME_LENGTH: usize = 4;

/// ApplicationDefined (APP) packet, RFC 3550 section 6.7.
#[derive(Debug, Default, PartialEq, Eq, Clone)]
pub struct ApplicationDefined {
    /// Application specific subtype, carried in the count field.
    pub sub_type: u8,
    pub ssrc: u32,
    /// Four ASCII characters naming the application.
    pub name: [u8; NAME_LENGTH],
    /// Application dependent data. Serialized zero-padded to 32 bits.
    pub data: Bytes,
}

impl ApplicationDefined {
    pub fn header(&self) -> Header {
        Header::for_size(
            PacketType::ApplicationDefined,
            self.sub_type,
            self.marshal_size(),
        )
    }

    pub fn destination_ssrc(&self) -> Vec<u32> {
        vec![self.ssrc]
    }
}

impl MarshalSize for ApplicationDefined {
    fn marshal_size(&self) -> usize {
        let l = HEADER_LENGTH + SSRC_LENGTH + NAME_LENGTH + self.data.len();
        l + get_padding_size(l)
    }
}

impl Marshal for ApplicationDefined {
    fn marshal_to(&self, mut buf: &mut [u8]) -> Result<usize> {
        if self.sub_type as usize > COUNT_MAX {
            return Err(Error::InvalidHeader);
        }
        if buf.remaining_mut() < self.marshal_size() {
            return Err(Error::BufferTooShort);
        }

        /*
         *  0                   1                   2                   3
         *  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
         * +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
         * |V=2|P| subtype |   PT=APP=204  |             length            |
         * +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
         * |                           SSRC/CSRC                           |
         * +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
         * |                          name (ASCII)                         |
         * +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
         * |                   application-dependent data                ...
         * +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
         */
        let n = self.header().marshal_to(buf)?;
        buf = &mut buf[n..];

        buf.put_u32(self.ssrc);
        buf.put_slice(&self.name);
        buf.put_slice(&self.data);
        for _ in 0..get_padding_size(self.data.len()) {
            buf.put_u8(0);
        }

        Ok(self.marshal_size())
    }
}

impl Unmarshal for ApplicationDefined {
    fn unmarshal<B>(raw_packet: &mut B) -> Result<Self>
    where
        Self: Sized,
        B: Buf,
    {
        let (header, mut body) = read_packet(raw_packet, PacketType::ApplicationDefined)?;
        if body.remaining() < SSRC_LENGTH + NAME_LENGTH {
            return Err(Error::PacketTooShort);
        }

        let ssrc = body.get_u32();
        let mut name = [0u8; NAME_LENGTH];
        body.copy_to_slice(&mut name);

        Ok(ApplicationDefined {
            sub_type: header.count,
            ssrc,
            name,
            data: body,
        })
    }
}
