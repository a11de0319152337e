use std::fmt;

use bytes::{Buf, BufMut};
use shared::{
    error::{Error, Result},
    marshal::{Marshal, MarshalSize, Unmarshal},
};

use crate::{
    header::{FORMAT_TLN, HEADER_LENGTH, Header, PacketType},
    util::read_feedback,
};

/// PacketBitmap shouldn't be used like a normal integral,
/// so it's type is masked here. Access it with PacketList().
type PacketBitmap = u16;

/// NackPair is a wire-representation of a collection of
/// Lost RTP packets
#[derive(Debug, PartialEq, Eq, Default, Clone, Copy)]
pub struct NackPair {
    /// ID of lost packets
    pub packet_id: u16,
    /// Bitmask of following lost packets. Bit i (least significant first)
    /// marks `packet_id + i + 1` as lost.
    pub lost_packets: PacketBitmap,
}

impl NackPair {
    pub fn new(seq: u16) -> Self {
        Self {
            packet_id: seq,
            lost_packets: Default::default(),
        }
    }

    /// PacketList returns a list of Nack'd packets that's referenced by a NackPair
    pub fn packet_list(&self) -> Vec<u16> {
        let mut out = Vec::with_capacity(17);
        self.range(|seq| {
            out.push(seq);
            true
        });
        out
    }

    /// Calls `f` for every requested sequence number until it returns false.
    pub fn range<F>(&self, mut f: F)
    where
        F: FnMut(u16) -> bool,
    {
        if !f(self.packet_id) {
            return;
        }

        let mut b = self.lost_packets;
        let mut i = 0;
        while b != 0 {
            if (b & (1 << i)) != 0 {
                b &= !(1 << i);
                if !f(self.packet_id.wrapping_add(i + 1)) {
                    return;
                }
            }
            i += 1;
        }
    }
}

/// Builds NACK fields from sequence numbers in increasing order.
pub fn nack_pairs_from_sequence_numbers(seq_nos: &[u16]) -> Vec<NackPair> {
    let Some((&first, rest)) = seq_nos.split_first() else {
        return vec![];
    };

    let mut nack_pair = NackPair::new(first);
    let mut pairs = vec![];

    for &seq in rest {
        let distance = seq.wrapping_sub(nack_pair.packet_id);
        if distance == 0 {
            continue;
        }
        if distance > 16 {
            pairs.push(nack_pair);
            nack_pair = NackPair::new(seq);
            continue;
        }
        nack_pair.lost_packets |= 1 << (distance - 1);
    }
    pairs.push(nack_pair);

    pairs
}

const TLN_LENGTH: usize = 2;
const NACK_OFFSET: usize = 8;

/// The TransportLayerNack packet informs the encoder about the loss of a transport packet
/// IETF RFC 4585, Section 6.2.1
/// <https://tools.ietf.org/html/rfc4585#section-6.2.1>
#[derive(Debug, PartialEq, Eq, Default, Clone)]
pub struct TransportLayerNack {
    /// SSRC of sender
    pub sender_ssrc: u32,
    /// SSRC of the media source
    pub media_ssrc: u32,

    pub nacks: Vec<NackPair>,
}

impl fmt::Display for TransportLayerNack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut out = format!("TransportLayerNack from {:x}\n", self.sender_ssrc);
        out += format!("\tMedia Ssrc {:x}\n", self.media_ssrc).as_str();
        out += "\tID\tLostPackets\n";
        for nack in &self.nacks {
            out += format!("\t{}\t{:b}\n", nack.packet_id, nack.lost_packets).as_str();
        }
        write!(f, "{out}")
    }
}

impl TransportLayerNack {
    pub fn header(&self) -> Header {
        Header::for_size(
            PacketType::TransportSpecificFeedback,
            FORMAT_TLN,
            self.marshal_size(),
        )
    }

    pub fn destination_ssrc(&self) -> Vec<u32> {
        vec![self.media_ssrc]
    }
}

impl MarshalSize for TransportLayerNack {
    fn marshal_size(&self) -> usize {
        HEADER_LENGTH + NACK_OFFSET + self.nacks.len() * 4
    }
}

impl Marshal for TransportLayerNack {
    fn marshal_to(&self, mut buf: &mut [u8]) -> Result<usize> {
        if self.nacks.len() + TLN_LENGTH > u8::MAX as usize {
            return Err(Error::TooManyReports);
        }
        if buf.remaining_mut() < self.marshal_size() {
            return Err(Error::BufferTooShort);
        }

        let n = self.header().marshal_to(buf)?;
        buf = &mut buf[n..];

        buf.put_u32(self.sender_ssrc);
        buf.put_u32(self.media_ssrc);

        for nack in &self.nacks {
            buf.put_u16(nack.packet_id);
            buf.put_u16(nack.lost_packets);
        }

        Ok(self.marshal_size())
    }
}

impl Unmarshal for TransportLayerNack {
    fn unmarshal<B>(raw_packet: &mut B) -> Result<Self>
    where
        Self: Sized,
        B: Buf,
    {
        let (_, mut body) = read_feedback(
            raw_packet,
            PacketType::TransportSpecificFeedback,
            &[FORMAT_TLN],
        )?;

        let sender_ssrc = body.get_u32();
        let media_ssrc = body.get_u32();

        let mut nacks = Vec::with_capacity(body.remaining() / 4);
        while body.remaining() >= 4 {
            nacks.push(NackPair {
                packet_id: body.get_u16(),
                lost_packets: body.get_u16(),
            });
        }

        Ok(TransportLayerNack {
            sender_ssrc,
            media_ssrc,
            nacks,
        })
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use bytes::Bytes;

    #[test]
    fn test_transport_layer_nack_unmarshal() {
        let tests = vec![
            (
                "valid",
                Bytes::from_static(&[
                    // TransportLayerNack
                    0x81, 0xcd, 0x0, 0x3, // sender=0x902f9e2e
                    0x90, 0x2f, 0x9e, 0x2e, // media=0x902f9e2e
                    0x90, 0x2f, 0x9e, 0x2e, // nack 0xAAAA, 0x5555
                    0xaa, 0xaa, 0x55, 0x55,
                ]),
                TransportLayerNack {
                    sender_ssrc: 0x902f9e2e,
                    media_ssrc: 0x902f9e2e,
                    nacks: vec![NackPair {
                        packet_id: 0xaaaa,
                        lost_packets: 0x5555,
                    }],
                },
                None,
            ),
            (
                "short report",
                Bytes::from_static(&[
                    0x81, 0xcd, 0x0, 0x2, // ssrc=0x902f9e2e
                    0x90, 0x2f, 0x9e, 0x2e,
                    // report ends early
                ]),
                TransportLayerNack::default(),
                Some(Error::PacketTooShort),
            ),
            (
                "wrong type",
                Bytes::from_static(&[
                    // v=2, p=0, count=1, SR, len=7
                    0x81, 0xc8, 0x0, 0x7, // ssrc=0x902f9e2e
                    0x90, 0x2f, 0x9e, 0x2e, // ssrc=0xbc5e9a40
                    0xbc, 0x5e, 0x9a, 0x40, // fracLost=0, totalLost=0
                    0x0, 0x0, 0x0, 0x0, // lastSeq=0x46e1
                    0x0, 0x0, 0x46, 0xe1, // jitter=273
                    0x0, 0x0, 0x1, 0x11, // lsr=0x9f36432
                    0x9, 0xf3, 0x64, 0x32, // delay=150137
                    0x0, 0x2, 0x4a, 0x79,
                ]),
                TransportLayerNack::default(),
                Some(Error::WrongType),
            ),
            (
                "wrong format",
                Bytes::from_static(&[
                    // v=2, p=0, FMT=3 (TMMBR), RTPFB, len=2
                    0x83, 0xcd, 0x0, 0x2, 0x90, 0x2f, 0x9e, 0x2e, 0x90, 0x2f, 0x9e, 0x2e,
                ]),
                TransportLayerNack::default(),
                Some(Error::WrongFeedbackType(3)),
            ),
        ];

        for (name, data, want, want_error) in tests {
            let buf = &mut data.clone();
            let got = TransportLayerNack::unmarshal(buf);

            assert_eq!(
                got.is_err(),
                want_error.is_some(),
                "Unmarshal {name} : err = {got:?}, want {want_error:?}"
            );

            if let Some(err) = want_error {
                let got_err = got.err().unwrap();
                assert_eq!(
                    err, got_err,
                    "Unmarshal {name} : err = {got_err:?}, want {err:?}",
                );
            } else {
                let actual = got.unwrap();
                assert_eq!(
                    actual, want,
                    "Unmarshal {name} : got {actual:?}, want {want:?}"
                );
                assert_eq!(actual.marshal().unwrap(), data, "Marshal {name}");
            }
        }
    }

    #[test]
    fn test_nack_pair() {
        let test_nack = |s: Vec<u16>, n: NackPair| {
            let l = n.packet_list();
            assert_eq!(s, l, "{n:?}: expected {s:?}, got {l:?}");
        };

        test_nack(
            vec![42],
            NackPair {
                packet_id: 42,
                lost_packets: 0,
            },
        );

        test_nack(
            vec![42, 43],
            NackPair {
                packet_id: 42,
                lost_packets: 1,
            },
        );

        test_nack(
            vec![42, 44],
            NackPair {
                packet_id: 42,
                lost_packets: 2,
            },
        );

        test_nack(
            vec![42, 43, 44],
            NackPair {
                packet_id: 42,
                lost_packets: 3,
            },
        );

        test_nack(
            vec![42, 58],
            NackPair {
                packet_id: 42,
                lost_packets: 0x8000,
            },
        );

        // Wrap around
        test_nack(
            vec![65534, 65535, 0, 1],
            NackPair {
                packet_id: 65534,
                lost_packets: 0b0000_0111,
            },
        );

        // Gap
        test_nack(
            vec![123, 125, 127, 129],
            NackPair {
                packet_id: 123,
                lost_packets: 0b0010_1010,
            },
        );
    }

    #[test]
    fn test_nack_pair_range() {
        let n = NackPair {
            packet_id: 42,
            lost_packets: 2,
        };

        let mut out = vec![];
        n.range(|s: u16| -> bool {
            out.push(s);
            true
        });
        assert_eq!(out, vec![42, 44]);

        let mut out = vec![];
        n.range(|s: u16| -> bool {
            out.push(s);
            false
        });
        assert_eq!(out, vec![42]);
    }

    #[test]
    fn test_nack_pairs_from_sequence_numbers() {
        assert!(nack_pairs_from_sequence_numbers(&[]).is_empty());

        assert_eq!(
            nack_pairs_from_sequence_numbers(&[100, 101, 103, 116, 117, 200]),
            vec![
                NackPair {
                    packet_id: 100,
                    lost_packets: 0b1000_0000_0000_0101,
                },
                NackPair {
                    packet_id: 117,
                    lost_packets: 0,
                },
                NackPair {
                    packet_id: 200,
                    lost_packets: 0,
                },
            ]
        );

        assert_eq!(
            nack_pairs_from_sequence_numbers(&[65535, 0, 1]),
            vec![NackPair {
                packet_id: 65535,
                lost_packets: 0b11,
            }]
        );
    }
}
