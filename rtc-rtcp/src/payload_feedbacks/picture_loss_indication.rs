use std::fmt;

use bytes::{Buf, BufMut};
use shared::{
    error::{Error, Result},
    marshal::{Marshal, MarshalSize, Unmarshal},
};

use crate::{
    header::{FORMAT_PLI, HEADER_LENGTH, Header, PacketType, SSRC_LENGTH},
    util::read_feedback,
};

const PLI_LENGTH: usize = 2;

/// The PictureLossIndication packet informs the encoder about the loss of an undefined amount of coded video data belonging to one or more pictures
#[derive(Debug, PartialEq, Eq, Default, Clone)]
pub struct PictureLossIndication {
    /// SSRC of sender
    pub sender_ssrc: u32,
    /// SSRC where the loss was experienced
    pub media_ssrc: u32,
}

impl fmt::Display for PictureLossIndication {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "PictureLossIndication {:x} {:x}",
            self.sender_ssrc, self.media_ssrc
        )
    }
}

impl PictureLossIndication {
    pub fn header(&self) -> Header {
        Header {
            padding: false,
            count: FORMAT_PLI,
            packet_type: PacketType::PayloadSpecificFeedback,
            length: PLI_LENGTH as u16,
        }
    }

    pub fn destination_ssrc(&self) -> Vec<u32> {
        vec![self.media_ssrc]
    }
}

impl MarshalSize for PictureLossIndication {
    fn marshal_size(&self) -> usize {
        HEADER_LENGTH + SSRC_LENGTH * 2
    }
}

impl Marshal for PictureLossIndication {
    fn marshal_to(&self, mut buf: &mut [u8]) -> Result<usize> {
        if buf.remaining_mut() < self.marshal_size() {
            return Err(Error::BufferTooShort);
        }

        let n = self.header().marshal_to(buf)?;
        buf = &mut buf[n..];

        buf.put_u32(self.sender_ssrc);
        buf.put_u32(self.media_ssrc);

        Ok(self.marshal_size())
    }
}

impl Unmarshal for PictureLossIndication {
    fn unmarshal<B>(raw_packet: &mut B) -> Result<Self>
    where
        Self: Sized,
        B: Buf,
    {
        let (_, mut body) =
            read_feedback(raw_packet, PacketType::PayloadSpecificFeedback, &[FORMAT_PLI])?;
        if body.remaining() > SSRC_LENGTH * 2 {
            return Err(Error::PictureLossWithBody);
        }

        Ok(PictureLossIndication {
            sender_ssrc: body.get_u32(),
            media_ssrc: body.get_u32(),
        })
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use bytes::Bytes;

    #[test]
    fn test_picture_loss_indication_unmarshal() {
        let tests = vec![
            (
                "valid",
                Bytes::from_static(&[
                    0x81, 0xce, 0x00, 0x02, // v=2, p=0, FMT=1, PSFB, len=2
                    0x00, 0x00, 0x00, 0x00, // ssrc=0x0
                    0x4b, 0xc4, 0xfc, 0xb4, // ssrc=0x4bc4fcb4
                ]),
                PictureLossIndication {
                    sender_ssrc: 0x0,
                    media_ssrc: 0x4bc4fcb4,
                },
                None,
            ),
            (
                "packet too short",
                Bytes::from_static(&[0x81, 0xce, 0x00, 0x00]),
                PictureLossIndication::default(),
                Some(Error::PacketTooShort),
            ),
            (
                "invalid header",
                Bytes::from_static(&[
                    0x00, 0xce, 0x00, 0x02, 0x00, 0x00, 0x00, 0x00, 0x4b, 0xc4, 0xfc, 0xb4,
                ]),
                PictureLossIndication::default(),
                Some(Error::BadVersion),
            ),
            (
                "wrong type",
                Bytes::from_static(&[
                    0x81, 0xc9, 0x00, 0x02, 0x00, 0x00, 0x00, 0x00, 0x4b, 0xc4, 0xfc, 0xb4,
                ]),
                PictureLossIndication::default(),
                Some(Error::WrongType),
            ),
            (
                "wrong fmt",
                Bytes::from_static(&[
                    0x82, 0xce, 0x00, 0x02, 0x00, 0x00, 0x00, 0x00, 0x4b, 0xc4, 0xfc, 0xb4,
                ]),
                PictureLossIndication::default(),
                Some(Error::WrongFeedbackType(2)),
            ),
            (
                "with body",
                Bytes::from_static(&[
                    0x81, 0xce, 0x00, 0x03, 0x00, 0x00, 0x00, 0x00, 0x4b, 0xc4, 0xfc, 0xb4, 0x00,
                    0x00, 0x00, 0x00,
                ]),
                PictureLossIndication::default(),
                Some(Error::PictureLossWithBody),
            ),
        ];

        for (name, data, want, want_error) in tests {
            let got = PictureLossIndication::unmarshal(&mut data.clone());
            match want_error {
                Some(err) => assert_eq!(got, Err(err), "Unmarshal {name}"),
                None => assert_eq!(got, Ok(want), "Unmarshal {name}"),
            }
        }
    }

    #[test]
    fn test_picture_loss_indication_roundtrip() -> Result<()> {
        let pli = PictureLossIndication {
            sender_ssrc: 1,
            media_ssrc: 2,
        };
        let data = pli.marshal()?;
        assert_eq!(pli.header().packet_size(), data.len());
        assert_eq!(PictureLossIndication::unmarshal(&mut data.clone())?, pli);
        Ok(())
    }
}
