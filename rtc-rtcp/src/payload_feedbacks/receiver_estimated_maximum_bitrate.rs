use std::fmt;

use bytes::{Buf, BufMut};
use shared::{
    error::{Error, Result},
    marshal::{Marshal, MarshalSize, Unmarshal},
};

use crate::{
    header::{FORMAT_AFB, HEADER_LENGTH, Header, PacketType, SSRC_LENGTH},
    util::read_feedback,
};

pub(crate) const UNIQUE_IDENTIFIER: [u8; 4] = [b'R', b'E', b'M', b'B'];

const REMB_OFFSET: usize = 16;
const MANTISSA_MAX: u64 = 0x3FFFF;
const EXPONENT_MAX: u32 = 63;

/// ReceiverEstimatedMaximumBitrate contains the receiver's estimated maximum bitrate.
/// see: <https://tools.ietf.org/html/draft-alvestrand-rmcat-remb-03>
///
/// ```text
///  0                   1                   2                   3
///  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |V=2|P| FMT=15  |   PT=206      |             length            |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |                  SSRC of packet sender                        |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |                  SSRC of media source                         |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |  Unique identifier 'R' 'E' 'M' 'B'                            |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |  Num SSRC     | BR Exp    |  BR Mantissa                      |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |   SSRC feedback                                               |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |  ...                                                          |
/// ```
#[derive(Debug, PartialEq, Eq, Default, Clone)]
pub struct ReceiverEstimatedMaximumBitrate {
    /// SSRC of sender
    pub sender_ssrc: u32,
    /// Estimated maximum bitrate in bits per second. Values needing more than
    /// 18 significant bits lose their low bits on the wire.
    pub bitrate: u64,
    /// SSRC entries which this packet applies to
    pub ssrcs: Vec<u32>,
}

impl fmt::Display for ReceiverEstimatedMaximumBitrate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Do some unit conversions because b/s is far too difficult to read.
        let mut bitrate = self.bitrate as f64;
        let mut unit = "b/s";
        for next in ["Kb/s", "Mb/s", "Gb/s", "Tb/s"] {
            if bitrate < 1000.0 {
                break;
            }
            bitrate /= 1000.0;
            unit = next;
        }

        write!(
            f,
            "ReceiverEstimatedMaximumBitrate {:x} {bitrate:.2} {unit} {:x?}",
            self.sender_ssrc, self.ssrcs
        )
    }
}

impl ReceiverEstimatedMaximumBitrate {
    pub fn header(&self) -> Header {
        Header::for_size(
            PacketType::PayloadSpecificFeedback,
            FORMAT_AFB,
            self.marshal_size(),
        )
    }

    pub fn destination_ssrc(&self) -> Vec<u32> {
        self.ssrcs.clone()
    }

    /// Whether an application layer feedback FCI carries the REMB tag.
    pub(crate) fn is_remb(fci: &[u8]) -> bool {
        fci.len() >= UNIQUE_IDENTIFIER.len() && fci[..UNIQUE_IDENTIFIER.len()] == UNIQUE_IDENTIFIER
    }
}

impl MarshalSize for ReceiverEstimatedMaximumBitrate {
    fn marshal_size(&self) -> usize {
        HEADER_LENGTH + REMB_OFFSET + self.ssrcs.len() * SSRC_LENGTH
    }
}

impl Marshal for ReceiverEstimatedMaximumBitrate {
    fn marshal_to(&self, mut buf: &mut [u8]) -> Result<usize> {
        if buf.remaining_mut() < self.marshal_size() {
            return Err(Error::BufferTooShort);
        }
        if self.ssrcs.len() > u8::MAX as usize {
            return Err(Error::TooManySources);
        }

        let mut mantissa = self.bitrate;
        let mut exp = 0u32;
        while mantissa > MANTISSA_MAX {
            mantissa >>= 1;
            exp += 1;
        }
        if exp > EXPONENT_MAX {
            return Err(Error::InvalidBitrate);
        }

        let n = self.header().marshal_to(buf)?;
        buf = &mut buf[n..];

        buf.put_u32(self.sender_ssrc);
        // media source ssrc is always zero
        buf.put_u32(0);
        buf.put_slice(&UNIQUE_IDENTIFIER);
        buf.put_u8(self.ssrcs.len() as u8);
        buf.put_u8((exp << 2) as u8 | (mantissa >> 16) as u8);
        buf.put_u16((mantissa & 0xFFFF) as u16);
        for ssrc in &self.ssrcs {
            buf.put_u32(*ssrc);
        }

        Ok(self.marshal_size())
    }
}

impl Unmarshal for ReceiverEstimatedMaximumBitrate {
    fn unmarshal<B>(raw_packet: &mut B) -> Result<Self>
    where
        Self: Sized,
        B: Buf,
    {
        let (_, mut body) =
            read_feedback(raw_packet, PacketType::PayloadSpecificFeedback, &[FORMAT_AFB])?;
        if body.remaining() < REMB_OFFSET {
            return Err(Error::PacketTooShort);
        }

        let sender_ssrc = body.get_u32();
        let _media_ssrc = body.get_u32();
        if !Self::is_remb(&body) {
            return Err(Error::MissingRembIdentifier);
        }
        body.advance(UNIQUE_IDENTIFIER.len());

        let num_ssrc = body.get_u8() as usize;
        let b = body.get_u8();
        let exp = b >> 2;
        let mantissa = ((b & 0x3) as u64) << 16 | body.get_u16() as u64;
        let bitrate = mantissa
            .checked_shl(exp as u32)
            .filter(|v| v >> exp == mantissa)
            .ok_or(Error::InvalidBitrate)?;

        if body.remaining() != num_ssrc * SSRC_LENGTH {
            return Err(Error::SsrcNumAndLengthMismatch);
        }
        let ssrcs = (0..num_ssrc).map(|_| body.get_u32()).collect();

        Ok(ReceiverEstimatedMaximumBitrate {
            sender_ssrc,
            bitrate,
            ssrcs,
        })
    }
}
