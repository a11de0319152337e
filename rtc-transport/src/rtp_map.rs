//! Payload type to codec mapping negotiated for one transport.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use shared::error::Error;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaType {
    Audio,
    Video,
}

impl fmt::Display for MediaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MediaType::Audio => f.write_str("audio"),
            MediaType::Video => f.write_str("video"),
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Codec {
    Opus,
    Pcmu,
    Pcma,
    G722,
    Isac,
    Vp8,
    Vp9,
    H264,
    Av1,
    Red,
    Ulpfec,
    Flexfec,
    Rtx,
}

impl Codec {
    pub const fn name(&self) -> &'static str {
        match self {
            Codec::Opus => "opus",
            Codec::Pcmu => "pcmu",
            Codec::Pcma => "pcma",
            Codec::G722 => "g722",
            Codec::Isac => "isac",
            Codec::Vp8 => "vp8",
            Codec::Vp9 => "vp9",
            Codec::H264 => "h264",
            Codec::Av1 => "av1",
            Codec::Red => "red",
            Codec::Ulpfec => "ulpfec",
            Codec::Flexfec => "flexfec",
            Codec::Rtx => "rtx",
        }
    }

    pub const fn media_type(&self) -> MediaType {
        match self {
            Codec::Opus | Codec::Pcmu | Codec::Pcma | Codec::G722 | Codec::Isac => {
                MediaType::Audio
            }
            _ => MediaType::Video,
        }
    }

    /// Forward error correction codecs carried on a group's FEC source.
    pub const fn is_fec(&self) -> bool {
        matches!(self, Codec::Flexfec | Codec::Ulpfec)
    }
}

impl FromStr for Codec {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let codec = match s.to_ascii_lowercase().as_str() {
            "opus" => Codec::Opus,
            "pcmu" => Codec::Pcmu,
            "pcma" => Codec::Pcma,
            "g722" => Codec::G722,
            "isac" => Codec::Isac,
            "vp8" => Codec::Vp8,
            "vp9" => Codec::Vp9,
            "h264" => Codec::H264,
            "av1" => Codec::Av1,
            "red" => Codec::Red,
            "ulpfec" => Codec::Ulpfec,
            "flexfec" => Codec::Flexfec,
            "rtx" => Codec::Rtx,
            _ => return Err(Error::ErrConfig(format!("unknown codec {s}"))),
        };
        Ok(codec)
    }
}

impl fmt::Display for Codec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Maps payload types to codecs and RTX payload types to the payload type
/// they retransmit (the RFC 4588 `apt`).
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RtpMap {
    codecs: BTreeMap<u8, Codec>,
    associated: BTreeMap<u8, u8>,
}

impl RtpMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, payload_type: u8, codec: Codec) {
        self.codecs.insert(payload_type, codec);
    }

    /// Maps `rtx_payload_type` as the retransmission format of
    /// `associated_payload_type`.
    pub fn insert_rtx(&mut self, rtx_payload_type: u8, associated_payload_type: u8) {
        self.codecs.insert(rtx_payload_type, Codec::Rtx);
        self.associated
            .insert(rtx_payload_type, associated_payload_type);
    }

    pub fn codec(&self, payload_type: u8) -> Option<Codec> {
        self.codecs.get(&payload_type).copied()
    }

    /// Lowest payload type mapped to `codec`.
    pub fn payload_type(&self, codec: Codec) -> Option<u8> {
        self.codecs
            .iter()
            .find(|(_, c)| **c == codec)
            .map(|(pt, _)| *pt)
    }

    pub fn associated_payload_type(&self, rtx_payload_type: u8) -> Option<u8> {
        self.associated.get(&rtx_payload_type).copied()
    }

    pub fn rtx_payload_type(&self, associated_payload_type: u8) -> Option<u8> {
        self.associated
            .iter()
            .find(|(_, apt)| **apt == associated_payload_type)
            .map(|(pt, _)| *pt)
    }

    pub fn is_empty(&self) -> bool {
        self.codecs.is_empty()
    }

    pub fn clear(&mut self) {
        self.codecs.clear();
        self.associated.clear();
    }
}
