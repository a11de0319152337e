//! Transport-wide congestion control feedback
//! (draft-holmer-rmcat-transport-wide-cc-extensions-01, section 3.1).
//!
//! ```text
//!  0                   1                   2                   3
//!  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |V=2|P|  FMT=15 |    PT=205     |           length              |
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |                     SSRC of packet sender                     |
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |                      SSRC of media source                     |
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |      base sequence number     |      packet status count      |
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |                 reference time                | fb pkt. count |
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |          packet chunk         |         packet chunk          |
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! .                                                               .
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |         packet chunk          |  recv delta   |  recv delta   |
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! .                                                               .
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |           recv delta          |  recv delta   | zero padding  |
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! ```

use std::collections::BTreeMap;
use std::fmt;

use bytes::{Buf, BufMut};
use shared::{
    error::{Error, Result},
    marshal::{Marshal, MarshalSize, Unmarshal},
};

use crate::{
    header::{FORMAT_TCC, HEADER_LENGTH, Header, PacketType},
    util::{get_padding_size, read_feedback},
};

/// Receive deltas are expressed in multiples of 250us.
pub const TYPE_TCC_DELTA_SCALE_FACTOR: i64 = 250;
/// The reference time is expressed in multiples of 64ms.
pub const TYPE_TCC_REFERENCE_TIME_SCALE: i64 = 64_000;

const PACKET_CHUNK_OFFSET: usize = 16;

const MAX_RUN_LENGTH_CAP: usize = 0x1fff;
const MAX_ONE_BIT_CAP: usize = 14;
const MAX_TWO_BIT_CAP: usize = 7;
const RUN_LENGTH_THRESHOLD: usize = 15;
const RUN_LENGTH_THRESHOLD_LARGE: usize = 8;
const SMALL_DELTA_MAX: i64 = 127;

#[derive(Default, Debug, PartialEq, Eq, Copy, Clone)]
#[repr(u8)]
pub enum SymbolTypeTcc {
    #[default]
    PacketNotReceived = 0,
    PacketReceivedSmallDelta = 1,
    PacketReceivedLargeDelta = 2,
    /// Reserved by the draft. Decoded as a packet without a delta.
    PacketReceivedWithoutDelta = 3,
}

impl From<u16> for SymbolTypeTcc {
    fn from(val: u16) -> Self {
        match val & 0x3 {
            0 => SymbolTypeTcc::PacketNotReceived,
            1 => SymbolTypeTcc::PacketReceivedSmallDelta,
            2 => SymbolTypeTcc::PacketReceivedLargeDelta,
            _ => SymbolTypeTcc::PacketReceivedWithoutDelta,
        }
    }
}

#[derive(Default, Debug, PartialEq, Eq, Copy, Clone)]
#[repr(u8)]
pub enum SymbolSizeTypeTcc {
    #[default]
    OneBit = 0,
    TwoBit = 1,
}

/// A run of identical status symbols.
#[derive(Debug, Default, PartialEq, Eq, Clone)]
pub struct RunLengthChunk {
    pub packet_status_symbol: SymbolTypeTcc,
    /// 13 bits.
    pub run_length: u16,
}

/// Fourteen one-bit or seven two-bit status symbols.
#[derive(Debug, Default, PartialEq, Eq, Clone)]
pub struct StatusVectorChunk {
    pub symbol_size: SymbolSizeTypeTcc,
    pub symbol_list: Vec<SymbolTypeTcc>,
}

#[derive(Debug, PartialEq, Eq, Clone)]
pub enum PacketStatusChunk {
    RunLengthChunk(RunLengthChunk),
    StatusVectorChunk(StatusVectorChunk),
}

impl PacketStatusChunk {
    fn encode(&self) -> Result<u16> {
        match self {
            PacketStatusChunk::RunLengthChunk(c) => {
                if c.run_length as usize > MAX_RUN_LENGTH_CAP {
                    return Err(Error::FieldOutOfRange("tcc run length"));
                }
                Ok((c.packet_status_symbol as u16) << 13 | c.run_length)
            }
            PacketStatusChunk::StatusVectorChunk(c) => {
                let (cap, width) = match c.symbol_size {
                    SymbolSizeTypeTcc::OneBit => (MAX_ONE_BIT_CAP, 1),
                    SymbolSizeTypeTcc::TwoBit => (MAX_TWO_BIT_CAP, 2),
                };
                if c.symbol_list.len() > cap {
                    return Err(Error::FieldOutOfRange("tcc status vector"));
                }
                let mut word = 0x8000 | (c.symbol_size as u16) << 14;
                for (i, symbol) in c.symbol_list.iter().enumerate() {
                    let symbol = *symbol as u16;
                    if width == 1 && symbol > 1 {
                        return Err(Error::FieldOutOfRange("tcc one bit symbol"));
                    }
                    word |= symbol << (14 - width * (i + 1));
                }
                Ok(word)
            }
        }
    }

    fn decode(word: u16) -> Self {
        if word & 0x8000 == 0 {
            return PacketStatusChunk::RunLengthChunk(RunLengthChunk {
                packet_status_symbol: SymbolTypeTcc::from(word >> 13),
                run_length: word & MAX_RUN_LENGTH_CAP as u16,
            });
        }

        let (symbol_size, cap, width) = if word & 0x4000 == 0 {
            (SymbolSizeTypeTcc::OneBit, MAX_ONE_BIT_CAP, 1)
        } else {
            (SymbolSizeTypeTcc::TwoBit, MAX_TWO_BIT_CAP, 2)
        };
        let mask = (1u16 << width) - 1;
        let symbol_list = (0..cap)
            .map(|i| SymbolTypeTcc::from((word >> (14 - width * (i + 1))) & mask))
            .collect();
        PacketStatusChunk::StatusVectorChunk(StatusVectorChunk {
            symbol_size,
            symbol_list,
        })
    }

    fn symbols(&self) -> Vec<SymbolTypeTcc> {
        match self {
            PacketStatusChunk::RunLengthChunk(c) => {
                vec![c.packet_status_symbol; c.run_length as usize]
            }
            PacketStatusChunk::StatusVectorChunk(c) => c.symbol_list.clone(),
        }
    }
}

/// Arrival delta of one received packet.
#[derive(Debug, Default, PartialEq, Eq, Clone, Copy)]
pub struct RecvDelta {
    pub type_tcc_packet: SymbolTypeTcc,
    /// Microseconds since the previous received packet, a multiple of 250.
    pub delta: i64,
}

impl RecvDelta {
    fn wire_size(&self) -> usize {
        match self.type_tcc_packet {
            SymbolTypeTcc::PacketReceivedSmallDelta => 1,
            SymbolTypeTcc::PacketReceivedLargeDelta => 2,
            _ => 0,
        }
    }
}

#[derive(Debug, Default, PartialEq, Eq, Clone)]
pub struct TransportLayerCc {
    pub sender_ssrc: u32,
    pub media_ssrc: u32,
    pub base_sequence_number: u16,
    pub packet_status_count: u16,
    /// 24 bits, in multiples of 64ms.
    pub reference_time: u32,
    pub fb_pkt_count: u8,
    pub packet_chunks: Vec<PacketStatusChunk>,
    pub recv_deltas: Vec<RecvDelta>,
}

impl fmt::Display for TransportLayerCc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut out = String::new();
        out += format!("TransportLayerCC:\n\tSender Ssrc {}\n", self.sender_ssrc).as_str();
        out += format!("\tMedia Ssrc {}\n", self.media_ssrc).as_str();
        out += format!("\tBase Sequence Number {}\n", self.base_sequence_number).as_str();
        out += format!("\tStatus Count {}\n", self.packet_status_count).as_str();
        out += format!("\tReference Time {}\n", self.reference_time).as_str();
        out += format!("\tFeedback Packet Count {}\n", self.fb_pkt_count).as_str();
        out += format!("\tChunks {:?}\n", self.packet_chunks).as_str();
        out += format!("\tDeltas {:?}\n", self.recv_deltas).as_str();
        write!(f, "{out}")
    }
}

impl TransportLayerCc {
    /// Builds a feedback message from arrival times in microseconds keyed by
    /// extended transport-wide sequence number. Every sequence number between
    /// the first and the last key is reported; missing keys and `None` values
    /// are reported as not received.
    pub fn from_arrivals(
        sender_ssrc: u32,
        media_ssrc: u32,
        fb_pkt_count: u8,
        arrivals: &BTreeMap<u32, Option<i64>>,
    ) -> Result<Self> {
        let (Some((&first, _)), Some((&last, _))) =
            (arrivals.first_key_value(), arrivals.last_key_value())
        else {
            return Ok(TransportLayerCc {
                sender_ssrc,
                media_ssrc,
                fb_pkt_count,
                ..Default::default()
            });
        };
        let status_count = (last - first) as usize + 1;
        if status_count > u16::MAX as usize {
            return Err(Error::FieldOutOfRange("tcc status count"));
        }

        let reference = arrivals
            .values()
            .flatten()
            .next()
            .map_or(0, |t| t / TYPE_TCC_REFERENCE_TIME_SCALE);
        let mut last_timestamp_us = reference * TYPE_TCC_REFERENCE_TIME_SCALE;

        let mut symbols = Vec::with_capacity(status_count);
        let mut recv_deltas = vec![];
        for seq in first..=last {
            let Some(Some(arrival)) = arrivals.get(&seq) else {
                symbols.push(SymbolTypeTcc::PacketNotReceived);
                continue;
            };

            let delta_us = arrival - last_timestamp_us;
            let delta_250us = if delta_us >= 0 {
                (delta_us + TYPE_TCC_DELTA_SCALE_FACTOR / 2) / TYPE_TCC_DELTA_SCALE_FACTOR
            } else {
                (delta_us - TYPE_TCC_DELTA_SCALE_FACTOR / 2) / TYPE_TCC_DELTA_SCALE_FACTOR
            };
            let (symbol, delta_250us) = if (0..=SMALL_DELTA_MAX).contains(&delta_250us) {
                (SymbolTypeTcc::PacketReceivedSmallDelta, delta_250us)
            } else {
                (
                    SymbolTypeTcc::PacketReceivedLargeDelta,
                    delta_250us.clamp(i16::MIN as i64, i16::MAX as i64),
                )
            };
            let delta = delta_250us * TYPE_TCC_DELTA_SCALE_FACTOR;
            last_timestamp_us += delta;

            symbols.push(symbol);
            recv_deltas.push(RecvDelta {
                type_tcc_packet: symbol,
                delta,
            });
        }

        Ok(TransportLayerCc {
            sender_ssrc,
            media_ssrc,
            base_sequence_number: first as u16,
            packet_status_count: status_count as u16,
            reference_time: (reference as u32) & 0xFF_FFFF,
            fb_pkt_count,
            packet_chunks: encode_chunks(&symbols),
            recv_deltas,
        })
    }

    /// Arrival times in microseconds keyed by `base_sequence_number + i`,
    /// `None` for packets reported as not received.
    pub fn arrivals(&self) -> BTreeMap<u32, Option<i64>> {
        let mut arrivals = BTreeMap::new();
        let mut deltas = self.recv_deltas.iter();
        let mut timestamp = self.reference_time as i64 * TYPE_TCC_REFERENCE_TIME_SCALE;

        for (i, symbol) in self
            .packet_chunks
            .iter()
            .flat_map(PacketStatusChunk::symbols)
            .take(self.packet_status_count as usize)
            .enumerate()
        {
            let seq = self.base_sequence_number as u32 + i as u32;
            let arrival = match symbol {
                SymbolTypeTcc::PacketReceivedSmallDelta | SymbolTypeTcc::PacketReceivedLargeDelta => {
                    deltas.next().map(|d| {
                        timestamp += d.delta;
                        timestamp
                    })
                }
                _ => None,
            };
            arrivals.insert(seq, arrival);
        }

        arrivals
    }

    pub fn header(&self) -> Header {
        Header::for_size(
            PacketType::TransportSpecificFeedback,
            FORMAT_TCC,
            self.marshal_size(),
        )
    }

    pub fn destination_ssrc(&self) -> Vec<u32> {
        vec![self.media_ssrc]
    }
}

/// Packs status symbols into chunks. A run of identical symbols becomes a run
/// length chunk once it reaches 15, or 8 when a large delta has been seen.
/// Everything else is collected into status vectors: two-bit as soon as a
/// large delta is pending, one-bit otherwise.
fn encode_chunks(symbols: &[SymbolTypeTcc]) -> Vec<PacketStatusChunk> {
    let is_large = |s: &SymbolTypeTcc| *s == SymbolTypeTcc::PacketReceivedLargeDelta;

    let mut chunks = vec![];
    let mut pending: Vec<SymbolTypeTcc> = vec![];
    let mut large_seen = false;
    let mut i = 0;

    while i < symbols.len() {
        let symbol = symbols[i];
        if pending.is_empty() {
            let run = symbols[i..]
                .iter()
                .take(MAX_RUN_LENGTH_CAP)
                .take_while(|s| **s == symbol)
                .count();
            let threshold = if large_seen || is_large(&symbol) {
                RUN_LENGTH_THRESHOLD_LARGE
            } else {
                RUN_LENGTH_THRESHOLD
            };
            if run >= threshold {
                chunks.push(PacketStatusChunk::RunLengthChunk(RunLengthChunk {
                    packet_status_symbol: symbol,
                    run_length: run as u16,
                }));
                large_seen |= is_large(&symbol);
                i += run;
                continue;
            }
        }

        pending.push(symbol);
        large_seen |= is_large(&symbol);
        i += 1;

        while pending.iter().any(is_large) && pending.len() >= MAX_TWO_BIT_CAP {
            let rest = pending.split_off(MAX_TWO_BIT_CAP);
            chunks.push(vector_chunk(SymbolSizeTypeTcc::TwoBit, pending));
            pending = rest;
        }
        if pending.len() == MAX_ONE_BIT_CAP {
            chunks.push(vector_chunk(
                SymbolSizeTypeTcc::OneBit,
                std::mem::take(&mut pending),
            ));
        }
    }

    if !pending.is_empty() {
        let size = if pending.iter().any(is_large) {
            SymbolSizeTypeTcc::TwoBit
        } else {
            SymbolSizeTypeTcc::OneBit
        };
        chunks.push(vector_chunk(size, pending));
    }

    chunks
}

fn vector_chunk(symbol_size: SymbolSizeTypeTcc, mut symbol_list: Vec<SymbolTypeTcc>) -> PacketStatusChunk {
    let cap = match symbol_size {
        SymbolSizeTypeTcc::OneBit => MAX_ONE_BIT_CAP,
        SymbolSizeTypeTcc::TwoBit => MAX_TWO_BIT_CAP,
    };
    symbol_list.resize(cap, SymbolTypeTcc::PacketNotReceived);
    PacketStatusChunk::StatusVectorChunk(StatusVectorChunk {
        symbol_size,
        symbol_list,
    })
}

impl MarshalSize for TransportLayerCc {
    fn marshal_size(&self) -> usize {
        let n = HEADER_LENGTH
            + PACKET_CHUNK_OFFSET
            + self.packet_chunks.len() * 2
            + self.recv_deltas.iter().map(RecvDelta::wire_size).sum::<usize>();
        n + get_padding_size(n)
    }
}

impl Marshal for TransportLayerCc {
    fn marshal_to(&self, mut buf: &mut [u8]) -> Result<usize> {
        let size = self.marshal_size();
        if buf.remaining_mut() < size {
            return Err(Error::BufferTooShort);
        }

        let n = self.header().marshal_to(buf)?;
        buf = &mut buf[n..];

        buf.put_u32(self.sender_ssrc);
        buf.put_u32(self.media_ssrc);
        buf.put_u16(self.base_sequence_number);
        buf.put_u16(self.packet_status_count);
        buf.put_u32((self.reference_time & 0xFF_FFFF) << 8 | self.fb_pkt_count as u32);

        for chunk in &self.packet_chunks {
            buf.put_u16(chunk.encode()?);
        }

        let mut written = HEADER_LENGTH + PACKET_CHUNK_OFFSET + self.packet_chunks.len() * 2;
        for delta in &self.recv_deltas {
            let units = delta.delta / TYPE_TCC_DELTA_SCALE_FACTOR;
            match delta.type_tcc_packet {
                SymbolTypeTcc::PacketReceivedSmallDelta => {
                    if !(0..=u8::MAX as i64).contains(&units) {
                        return Err(Error::FieldOutOfRange("tcc small delta"));
                    }
                    buf.put_u8(units as u8);
                    written += 1;
                }
                SymbolTypeTcc::PacketReceivedLargeDelta => {
                    if !(i16::MIN as i64..=i16::MAX as i64).contains(&units) {
                        return Err(Error::FieldOutOfRange("tcc large delta"));
                    }
                    buf.put_i16(units as i16);
                    written += 2;
                }
                _ => {}
            }
        }

        for _ in written..size {
            buf.put_u8(0);
        }

        Ok(size)
    }
}

impl Unmarshal for TransportLayerCc {
    fn unmarshal<B>(raw_packet: &mut B) -> Result<Self>
    where
        Self: Sized,
        B: Buf,
    {
        let (_, mut body) = read_feedback(
            raw_packet,
            PacketType::TransportSpecificFeedback,
            &[FORMAT_TCC],
        )?;
        if body.remaining() < PACKET_CHUNK_OFFSET {
            return Err(Error::TransportCcNotEnoughData);
        }

        let sender_ssrc = body.get_u32();
        let media_ssrc = body.get_u32();
        let base_sequence_number = body.get_u16();
        let packet_status_count = body.get_u16();
        let word = body.get_u32();
        let reference_time = word >> 8;
        let fb_pkt_count = (word & 0xFF) as u8;

        let mut packet_chunks = vec![];
        let mut symbols = vec![];
        while symbols.len() < packet_status_count as usize {
            if body.remaining() < 2 {
                return Err(Error::TransportCcNotEnoughData);
            }
            let chunk = PacketStatusChunk::decode(body.get_u16());
            symbols.extend(chunk.symbols());
            packet_chunks.push(chunk);
        }
        symbols.truncate(packet_status_count as usize);

        let mut recv_deltas = vec![];
        for symbol in symbols {
            let delta = match symbol {
                SymbolTypeTcc::PacketReceivedSmallDelta => {
                    if body.remaining() < 1 {
                        return Err(Error::TransportCcNotEnoughData);
                    }
                    body.get_u8() as i64
                }
                SymbolTypeTcc::PacketReceivedLargeDelta => {
                    if body.remaining() < 2 {
                        return Err(Error::TransportCcNotEnoughData);
                    }
                    body.get_i16() as i64
                }
                _ => continue,
            };
            recv_deltas.push(RecvDelta {
                type_tcc_packet: symbol,
                delta: delta * TYPE_TCC_DELTA_SCALE_FACTOR,
            });
        }

        Ok(TransportLayerCc {
            sender_ssrc,
            media_ssrc,
            base_sequence_number,
            packet_status_count,
            reference_time,
            fb_pkt_count,
            packet_chunks,
            recv_deltas,
        })
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use bytes::Bytes;

    const T: i64 = 5 * TYPE_TCC_REFERENCE_TIME_SCALE;

    fn at(units: i64) -> Option<i64> {
        Some(T + units * TYPE_TCC_DELTA_SCALE_FACTOR)
    }

    #[test]
    fn test_transport_layer_cc_roundtrip() -> Result<()> {
        let arrivals: BTreeMap<u32, Option<i64>> = [
            (100, at(0)),
            (101, None),
            (102, at(3)),
            (103, at(3)),
            (104, None),
            (105, at(500)),
            (106, at(400)),
            (107, at(401)),
            (108, at(402)),
            (109, at(403)),
            (110, at(404)),
        ]
        .into_iter()
        .collect();

        let cc = TransportLayerCc::from_arrivals(1, 2, 9, &arrivals)?;
        assert_eq!(cc.base_sequence_number, 100);
        assert_eq!(cc.packet_status_count, 11);
        assert_eq!(cc.reference_time, 5);

        let raw = cc.marshal()?;
        assert_eq!(raw.len() % 4, 0);
        assert_eq!(raw[0], 0x8f);
        assert_eq!(raw[1], 205);

        let parsed = TransportLayerCc::unmarshal(&mut raw.clone())?;
        assert_eq!(parsed, cc);
        assert_eq!(parsed.arrivals(), arrivals);
        Ok(())
    }

    #[test]
    fn test_transport_layer_cc_run_length() -> Result<()> {
        let arrivals: BTreeMap<u32, Option<i64>> = (0..20).map(|i| (i, at(i as i64))).collect();
        let cc = TransportLayerCc::from_arrivals(1, 2, 0, &arrivals)?;
        assert_eq!(
            cc.packet_chunks,
            vec![PacketStatusChunk::RunLengthChunk(RunLengthChunk {
                packet_status_symbol: SymbolTypeTcc::PacketReceivedSmallDelta,
                run_length: 20,
            })]
        );

        let raw = cc.marshal()?;
        assert_eq!(&raw[20..22], &[0x20, 0x14]);
        // 22 bytes of header and chunk, 20 one-byte deltas, 2 bytes padding
        assert_eq!(raw.len(), 44);
        Ok(())
    }

    #[test]
    fn test_transport_layer_cc_one_bit_vector() -> Result<()> {
        let arrivals: BTreeMap<u32, Option<i64>> = (0..14)
            .map(|i| (i, if i % 2 == 0 { at(i as i64) } else { None }))
            .collect();
        let cc = TransportLayerCc::from_arrivals(1, 2, 0, &arrivals)?;
        assert_eq!(cc.packet_chunks.len(), 1);

        let raw = cc.marshal()?;
        assert_eq!(&raw[20..22], &[0xaa, 0xaa]);
        assert_eq!(TransportLayerCc::unmarshal(&mut raw.clone())?.arrivals(), arrivals);
        Ok(())
    }

    #[test]
    fn test_transport_layer_cc_two_bit_vector() -> Result<()> {
        let arrivals: BTreeMap<u32, Option<i64>> = [(7, at(0)), (8, at(200))].into_iter().collect();
        let cc = TransportLayerCc::from_arrivals(1, 2, 0, &arrivals)?;

        let raw = cc.marshal()?;
        assert_eq!(&raw[20..22], &[0xd8, 0x00]);
        assert_eq!(&raw[22..25], &[0x00, 0x00, 0xc8]);
        assert_eq!(raw.len(), 28);
        assert_eq!(&raw[25..], &[0, 0, 0]);
        assert_eq!(raw[0] & 0x20, 0, "padding bit must stay clear");
        Ok(())
    }

    #[test]
    fn test_transport_layer_cc_negative_delta() -> Result<()> {
        let arrivals: BTreeMap<u32, Option<i64>> =
            [(65000, at(10)), (65001, at(4))].into_iter().collect();
        let cc = TransportLayerCc::from_arrivals(1, 2, 0, &arrivals)?;
        assert_eq!(cc.recv_deltas[1].type_tcc_packet, SymbolTypeTcc::PacketReceivedLargeDelta);
        assert_eq!(cc.recv_deltas[1].delta, -1500);

        let parsed = TransportLayerCc::unmarshal(&mut cc.marshal()?)?;
        assert_eq!(parsed.arrivals(), arrivals);
        Ok(())
    }

    #[test]
    fn test_transport_layer_cc_rounding() -> Result<()> {
        let arrivals: BTreeMap<u32, Option<i64>> =
            [(1, Some(T + 130)), (2, Some(T + 370))].into_iter().collect();
        let cc = TransportLayerCc::from_arrivals(1, 2, 0, &arrivals)?;
        let deltas: Vec<i64> = cc.recv_deltas.iter().map(|d| d.delta).collect();
        assert_eq!(deltas, vec![250, 0]);
        Ok(())
    }

    #[test]
    fn test_transport_layer_cc_empty() -> Result<()> {
        let cc = TransportLayerCc::from_arrivals(1, 2, 3, &BTreeMap::new())?;
        let raw = cc.marshal()?;
        assert_eq!(raw.len(), 20);
        assert!(TransportLayerCc::unmarshal(&mut raw.clone())?.arrivals().is_empty());
        Ok(())
    }

    #[test]
    fn test_transport_layer_cc_not_enough_data() {
        // status count 5 but no chunk
        let no_chunk = Bytes::from_static(&[
            0x8f, 0xcd, 0x00, 0x04, 0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x02, 0x00, 0x01,
            0x00, 0x05, 0x00, 0x00, 0x05, 0x00,
        ]);
        assert_eq!(
            TransportLayerCc::unmarshal(&mut no_chunk.clone()),
            Err(Error::TransportCcNotEnoughData)
        );

        // run of 5 small deltas with only two delta bytes
        let short_deltas = Bytes::from_static(&[
            0x8f, 0xcd, 0x00, 0x05, 0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x02, 0x00, 0x01,
            0x00, 0x05, 0x00, 0x00, 0x05, 0x00, 0x20, 0x05, 0x01, 0x01,
        ]);
        assert_eq!(
            TransportLayerCc::unmarshal(&mut short_deltas.clone()),
            Err(Error::TransportCcNotEnoughData)
        );

        let short_fci = Bytes::from_static(&[
            0x8f, 0xcd, 0x00, 0x03, 0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x02, 0x00, 0x01,
            0x00, 0x05,
        ]);
        assert_eq!(
            TransportLayerCc::unmarshal(&mut short_fci.clone()),
            Err(Error::TransportCcNotEnoughData)
        );
    }
}
