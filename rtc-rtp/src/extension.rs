//! Header extensions understood by the transport and the mapping between
//! negotiated one-byte ids and extension kinds.

use std::fmt;

use bytes::{BufMut, Bytes, BytesMut};
use log::trace;
use shared::error::{Error, Result};

use crate::header::{EXTENSION_ID_RESERVED, Header};

pub const AUDIO_LEVEL_URI: &str = "urn:ietf:params:rtp-hdrext:ssrc-audio-level";
pub const TRANSMISSION_OFFSET_URI: &str = "urn:ietf:params:rtp-hdrext:toffset";
pub const ABS_SEND_TIME_URI: &str = "http://www.webrtc.org/experiments/rtp-hdrext/abs-send-time";
pub const VIDEO_ORIENTATION_URI: &str = "urn:3gpp:video-orientation";
pub const TRANSPORT_CC_URI: &str =
    "http://www.ietf.org/id/draft-holmer-rmcat-transport-wide-cc-extensions-01";

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ExtensionKind {
    AudioLevel,
    TransmissionOffset,
    AbsSendTime,
    VideoOrientation,
    TransportSequenceNumber,
}

impl ExtensionKind {
    pub const ALL: [ExtensionKind; 5] = [
        ExtensionKind::AudioLevel,
        ExtensionKind::TransmissionOffset,
        ExtensionKind::AbsSendTime,
        ExtensionKind::VideoOrientation,
        ExtensionKind::TransportSequenceNumber,
    ];

    pub const fn uri(&self) -> &'static str {
        match self {
            ExtensionKind::AudioLevel => AUDIO_LEVEL_URI,
            ExtensionKind::TransmissionOffset => TRANSMISSION_OFFSET_URI,
            ExtensionKind::AbsSendTime => ABS_SEND_TIME_URI,
            ExtensionKind::VideoOrientation => VIDEO_ORIENTATION_URI,
            ExtensionKind::TransportSequenceNumber => TRANSPORT_CC_URI,
        }
    }

    pub fn from_uri(uri: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.uri() == uri)
    }
}

impl fmt::Display for ExtensionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.uri())
    }
}

/// RFC 6464 audio level: voice activity flag and level in -dBov (0..=127).
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct AudioLevel {
    pub voice_activity: bool,
    pub level: u8,
}

/// Coordination of video orientation (3GPP TS 26.114).
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct VideoOrientation {
    pub camera: bool,
    pub flip: bool,
    /// Clockwise rotation in multiples of 90 degrees.
    pub rotation: u8,
}

/// Values decoded from the extensions of a single packet.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub struct HeaderExtensions {
    pub audio_level: Option<AudioLevel>,
    /// Transmission time offset in RTP timestamp units.
    pub transmission_offset: Option<i32>,
    /// Absolute send time in milliseconds, modulo 64 seconds.
    pub abs_send_time: Option<u64>,
    pub video_orientation: Option<VideoOrientation>,
    pub transport_sequence_number: Option<u16>,
}

/// Negotiated extension ids of one direction.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ExtensionMap {
    kinds: [Option<ExtensionKind>; EXTENSION_ID_RESERVED as usize],
}

impl ExtensionMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Maps `id` to `kind`, replacing any previous mapping of either.
    pub fn insert(&mut self, id: u8, kind: ExtensionKind) -> Result<()> {
        if id == 0 || id >= EXTENSION_ID_RESERVED {
            return Err(Error::ErrRfc8285oneByteHeaderIdrange);
        }
        for slot in self.kinds.iter_mut() {
            if *slot == Some(kind) {
                *slot = None;
            }
        }
        self.kinds[id as usize] = Some(kind);
        Ok(())
    }

    pub fn kind(&self, id: u8) -> Option<ExtensionKind> {
        self.kinds.get(id as usize).copied().flatten()
    }

    pub fn id(&self, kind: ExtensionKind) -> Option<u8> {
        self.kinds
            .iter()
            .position(|k| *k == Some(kind))
            .map(|id| id as u8)
    }

    pub fn is_empty(&self) -> bool {
        self.kinds.iter().all(Option::is_none)
    }

    pub fn clear(&mut self) {
        self.kinds = Default::default();
    }

    /// Decodes every mapped extension present in `header`. Elements with an
    /// unmapped id or a too short value are skipped.
    pub fn parse(&self, header: &Header) -> HeaderExtensions {
        let mut values = HeaderExtensions::default();
        if !header.extension {
            return values;
        }

        for ext in &header.extensions {
            let Some(kind) = self.kind(ext.id) else {
                continue;
            };
            let b = &ext.payload;
            match kind {
                ExtensionKind::AudioLevel if !b.is_empty() => {
                    values.audio_level = Some(AudioLevel {
                        voice_activity: b[0] & 0x80 != 0,
                        level: b[0] & 0x7F,
                    });
                }
                ExtensionKind::TransmissionOffset if b.len() >= 3 => {
                    let raw = get3(b);
                    // sign extend the 24 bit value
                    values.transmission_offset = Some(((raw << 8) as i32) >> 8);
                }
                ExtensionKind::AbsSendTime if b.len() >= 3 => {
                    values.abs_send_time = Some((get3(b) as u64 * 1000) >> 18);
                }
                ExtensionKind::VideoOrientation if !b.is_empty() => {
                    values.video_orientation = Some(VideoOrientation {
                        camera: b[0] & 0x08 != 0,
                        flip: b[0] & 0x04 != 0,
                        rotation: b[0] & 0x03,
                    });
                }
                ExtensionKind::TransportSequenceNumber if b.len() >= 2 => {
                    values.transport_sequence_number = Some(u16::from_be_bytes([b[0], b[1]]));
                }
                _ => {
                    trace!("extension {kind} with id {} too short: {}", ext.id, b.len());
                }
            }
        }

        values
    }

    /// Writes the transport-wide sequence number into `header` if the
    /// transport-cc extension is mapped. Returns whether it was written.
    pub fn set_transport_sequence_number(&self, header: &mut Header, seq: u16) -> Result<bool> {
        let Some(id) = self.id(ExtensionKind::TransportSequenceNumber) else {
            return Ok(false);
        };
        let mut payload = BytesMut::with_capacity(2);
        payload.put_u16(seq);
        header.set_extension(id, payload.freeze())?;
        Ok(true)
    }
}

fn get3(b: &Bytes) -> u32 {
    (b[0] as u32) << 16 | (b[1] as u32) << 8 | b[2] as u32
}
