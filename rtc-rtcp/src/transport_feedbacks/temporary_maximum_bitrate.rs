use bytes::{Buf, BufMut};
use shared::{
    error::{Error, Result},
    marshal::{Marshal, MarshalSize, Unmarshal},
};

use crate::{
    header::{FORMAT_TMMBN, FORMAT_TMMBR, HEADER_LENGTH, Header, PacketType},
    util::read_feedback,
};

const ENTRY_LENGTH: usize = 8;
const MANTISSA_MAX: u64 = 0x1FFFF;
const OVERHEAD_MAX: u16 = 0x1FF;

/// One FCI entry of a TMMBR or TMMBN message, RFC 5104 section 4.2.
#[derive(Debug, PartialEq, Eq, Default, Clone, Copy)]
pub struct TmmbEntry {
    pub ssrc: u32,
    /// Maximum total media bit rate in bits per second. Serialized as a
    /// 17-bit mantissa and 6-bit exponent, so low bits of large values are lost.
    pub bitrate: u64,
    /// Measured per-packet overhead in bytes, 9 bits.
    pub overhead: u16,
}

impl TmmbEntry {
    fn encode(&self) -> Result<u32> {
        if self.overhead > OVERHEAD_MAX {
            return Err(Error::FieldOutOfRange("tmmb overhead"));
        }
        let mut mantissa = self.bitrate;
        let mut exp = 0u32;
        while mantissa > MANTISSA_MAX {
            mantissa >>= 1;
            exp += 1;
        }
        Ok(exp << 26 | (mantissa as u32) << 9 | self.overhead as u32)
    }

    fn decode(ssrc: u32, word: u32) -> Self {
        let exp = word >> 26;
        let mantissa = (word >> 9) & MANTISSA_MAX as u32;
        TmmbEntry {
            ssrc,
            bitrate: (mantissa as u64) << exp,
            overhead: (word & OVERHEAD_MAX as u32) as u16,
        }
    }
}

/// Temporary maximum media stream bit rate request (TMMBR) or, when
/// `notification` is set, notification (TMMBN).
#[derive(Debug, PartialEq, Eq, Default, Clone)]
pub struct TemporaryMaximumBitrate {
    pub sender_ssrc: u32,
    pub media_ssrc: u32,
    pub notification: bool,
    pub entries: Vec<TmmbEntry>,
}

impl TemporaryMaximumBitrate {
    pub fn header(&self) -> Header {
        let fmt = if self.notification {
            FORMAT_TMMBN
        } else {
            FORMAT_TMMBR
        };
        Header::for_size(
            PacketType::TransportSpecificFeedback,
            fmt,
            self.marshal_size(),
        )
    }

    pub fn destination_ssrc(&self) -> Vec<u32> {
        self.entries.iter().map(|e| e.ssrc).collect()
    }
}

impl MarshalSize for TemporaryMaximumBitrate {
    fn marshal_size(&self) -> usize {
        HEADER_LENGTH + 8 + self.entries.len() * ENTRY_LENGTH
    }
}

impl Marshal for TemporaryMaximumBitrate {
    fn marshal_to(&self, mut buf: &mut [u8]) -> Result<usize> {
        if buf.remaining_mut() < self.marshal_size() {
            return Err(Error::BufferTooShort);
        }

        /*
         *  0                   1                   2                   3
         *  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
         * +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
         * |                              SSRC                             |
         * +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
         * | MxTBR Exp |  MxTBR Mantissa                 |Measured Overhead|
         * +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
         */
        let words = self
            .entries
            .iter()
            .map(TmmbEntry::encode)
            .collect::<Result<Vec<u32>>>()?;

        let n = self.header().marshal_to(buf)?;
        buf = &mut buf[n..];

        buf.put_u32(self.sender_ssrc);
        buf.put_u32(self.media_ssrc);
        for (entry, word) in self.entries.iter().zip(words) {
            buf.put_u32(entry.ssrc);
            buf.put_u32(word);
        }

        Ok(self.marshal_size())
    }
}

impl Unmarshal for TemporaryMaximumBitrate {
    fn unmarshal<B>(raw_packet: &mut B) -> Result<Self>
    where
        Self: Sized,
        B: Buf,
    {
        let (header, mut body) = read_feedback(
            raw_packet,
            PacketType::TransportSpecificFeedback,
            &[FORMAT_TMMBR, FORMAT_TMMBN],
        )?;

        let sender_ssrc = body.get_u32();
        let media_ssrc = body.get_u32();

        let mut entries = Vec::with_capacity(body.remaining() / ENTRY_LENGTH);
        while body.remaining() >= ENTRY_LENGTH {
            let ssrc = body.get_u32();
            entries.push(TmmbEntry::decode(ssrc, body.get_u32()));
        }

        Ok(TemporaryMaximumBitrate {
            sender_ssrc,
            media_ssrc,
            notification: header.count == FORMAT_TMMBN,
            entries,
        })
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use bytes::Bytes;

    #[test]
    fn test_tmmbr_roundtrip() {
        let tmmbr = TemporaryMaximumBitrate {
            sender_ssrc: 0x902f9e2e,
            media_ssrc: 0,
            notification: false,
            entries: vec![
                TmmbEntry {
                    ssrc: 0xbc5e9a40,
                    bitrate: 0x1FFFF << 4,
                    overhead: 40,
                },
                TmmbEntry {
                    ssrc: 0x12345678,
                    bitrate: 64_000,
                    overhead: 0,
                },
            ],
        };
        let raw = tmmbr.marshal().unwrap();
        assert_eq!(raw[0], 0x83);
        assert_eq!(raw[1], 205);
        // exp=4, mantissa=0x1FFFF, overhead=40
        assert_eq!(&raw[16..20], &[0x13, 0xff, 0xfe, 0x28]);

        let got = TemporaryMaximumBitrate::unmarshal(&mut raw.clone()).unwrap();
        assert_eq!(got, tmmbr);
    }

    #[test]
    fn test_tmmbn_roundtrip() {
        let tmmbn = TemporaryMaximumBitrate {
            sender_ssrc: 1,
            media_ssrc: 0,
            notification: true,
            entries: vec![],
        };
        let raw = tmmbn.marshal().unwrap();
        assert_eq!(raw[0], 0x84);
        assert_eq!(
            TemporaryMaximumBitrate::unmarshal(&mut raw.clone()).unwrap(),
            tmmbn
        );
    }

    #[test]
    fn test_tmmb_lossy_and_invalid() {
        let entry = TmmbEntry {
            ssrc: 1,
            bitrate: (1 << 20) + 1,
            overhead: 0,
        };
        let decoded = TmmbEntry::decode(1, entry.encode().unwrap());
        assert_eq!(decoded.bitrate, 1 << 20);

        let bad = TmmbEntry {
            ssrc: 1,
            bitrate: 0,
            overhead: 512,
        };
        assert_eq!(bad.encode(), Err(Error::FieldOutOfRange("tmmb overhead")));

        let nack = Bytes::from_static(&[
            0x81, 0xcd, 0x00, 0x02, 0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x00,
        ]);
        assert_eq!(
            TemporaryMaximumBitrate::unmarshal(&mut nack.clone()),
            Err(Error::WrongFeedbackType(1))
        );
    }
}
