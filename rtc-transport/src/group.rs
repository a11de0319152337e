//! Source groups: the media, retransmission and FEC sources of one logical
//! stream.

use std::fmt;
use std::sync::Arc;

use crate::listener::StreamListener;
use crate::loss_tracker::LossTracker;
use crate::retransmission_buffer::RetransmissionBuffer;
use crate::rtp_map::MediaType;
use crate::source::Source;

/// Handle returned when a group is registered with a transport.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GroupId(pub(crate) u64);

impl fmt::Display for GroupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "group#{}", self.0)
    }
}

/// Which source of a group a packet belongs to.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum SourceKind {
    Media,
    Rtx,
    Fec,
}

/// Identity of a group, passed to listeners.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct GroupInfo {
    pub id: GroupId,
    pub media_type: MediaType,
    pub media_ssrc: u32,
    pub rtx_ssrc: u32,
    pub fec_ssrc: u32,
}

/// Access shared by incoming and outgoing groups.
pub trait SourceGroup {
    fn media_type(&self) -> MediaType;
    fn media(&self) -> &Source;
    fn rtx(&self) -> &Source;
    fn fec(&self) -> &Source;
    fn source_mut(&mut self, kind: SourceKind) -> &mut Source;
    fn listener(&self) -> Option<&Arc<dyn StreamListener>>;

    /// SSRCs in media, RTX, FEC order.
    fn ssrcs(&self) -> [u32; 3] {
        [self.media().ssrc, self.rtx().ssrc, self.fec().ssrc]
    }

    fn source(&self, kind: SourceKind) -> &Source {
        match kind {
            SourceKind::Media => self.media(),
            SourceKind::Rtx => self.rtx(),
            SourceKind::Fec => self.fec(),
        }
    }

    /// Classifies `ssrc`, media first.
    fn kind_of(&self, ssrc: u32) -> Option<SourceKind> {
        if ssrc == self.media().ssrc {
            Some(SourceKind::Media)
        } else if ssrc == self.rtx().ssrc {
            Some(SourceKind::Rtx)
        } else if ssrc == self.fec().ssrc {
            Some(SourceKind::Fec)
        } else {
            None
        }
    }

    fn info(&self, id: GroupId) -> GroupInfo {
        GroupInfo {
            id,
            media_type: self.media_type(),
            media_ssrc: self.media().ssrc,
            rtx_ssrc: self.rtx().ssrc,
            fec_ssrc: self.fec().ssrc,
        }
    }
}

pub struct IncomingSourceGroup {
    pub media_type: MediaType,
    pub media: Source,
    pub rtx: Source,
    pub fec: Source,
    pub losses: LossTracker,
    pub listener: Option<Arc<dyn StreamListener>>,
}

pub struct OutgoingSourceGroup {
    pub media_type: MediaType,
    pub media: Source,
    pub rtx: Source,
    pub fec: Source,
    pub packets: RetransmissionBuffer,
    pub listener: Option<Arc<dyn StreamListener>>,
}

impl IncomingSourceGroup {
    /// A zero `rtx_ssrc` or `fec_ssrc` means the stream has no such source.
    pub fn new(media_type: MediaType, media_ssrc: u32, rtx_ssrc: u32, fec_ssrc: u32) -> Self {
        IncomingSourceGroup {
            media_type,
            media: Source::new(media_ssrc),
            rtx: Source::new(rtx_ssrc),
            fec: Source::new(fec_ssrc),
            losses: LossTracker::default(),
            listener: None,
        }
    }

    pub fn with_listener(mut self, listener: Arc<dyn StreamListener>) -> Self {
        self.listener = Some(listener);
        self
    }

    /// Clears counters and loss history, for stream reconfiguration.
    pub fn reset(&mut self) {
        self.media.reset();
        self.rtx.reset();
        self.fec.reset();
        self.losses.reset();
    }
}

impl OutgoingSourceGroup {
    pub fn new(media_type: MediaType, media_ssrc: u32, rtx_ssrc: u32, fec_ssrc: u32) -> Self {
        OutgoingSourceGroup {
            media_type,
            media: Source::new(media_ssrc),
            rtx: Source::new(rtx_ssrc),
            fec: Source::new(fec_ssrc),
            packets: RetransmissionBuffer::new(),
            listener: None,
        }
    }

    pub fn with_listener(mut self, listener: Arc<dyn StreamListener>) -> Self {
        self.listener = Some(listener);
        self
    }
}

macro_rules! impl_source_group {
    ($group:ty) => {
        impl SourceGroup for $group {
            fn media_type(&self) -> MediaType {
                self.media_type
            }
            fn media(&self) -> &Source {
                &self.media
            }
            fn rtx(&self) -> &Source {
                &self.rtx
            }
            fn fec(&self) -> &Source {
                &self.fec
            }
            fn source_mut(&mut self, kind: SourceKind) -> &mut Source {
                match kind {
                    SourceKind::Media => &mut self.media,
                    SourceKind::Rtx => &mut self.rtx,
                    SourceKind::Fec => &mut self.fec,
                }
            }
            fn listener(&self) -> Option<&Arc<dyn StreamListener>> {
                self.listener.as_ref()
            }
        }

        impl fmt::Debug for $group {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.debug_struct(stringify!($group))
                    .field("media_type", &self.media_type)
                    .field("media", &self.media.ssrc)
                    .field("rtx", &self.rtx.ssrc)
                    .field("fec", &self.fec.ssrc)
                    .field("listener", &self.listener.is_some())
                    .finish()
            }
        }
    };
}

impl_source_group!(IncomingSourceGroup);
impl_source_group!(OutgoingSourceGroup);
