use std::fmt;
use std::net::{Ipv4Addr, SocketAddr};
use std::time::Instant;

use bytes::BytesMut;

/// Addresses a datagram travels between.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct TransportContext {
    pub local_addr: SocketAddr,
    pub peer_addr: SocketAddr,
}

impl TransportContext {
    pub fn new(local_addr: SocketAddr, peer_addr: SocketAddr) -> Self {
        TransportContext {
            local_addr,
            peer_addr,
        }
    }

    /// Context of a datagram from `peer` whose local address is unknown.
    pub fn from_peer(peer_addr: SocketAddr) -> Self {
        TransportContext {
            peer_addr,
            ..Default::default()
        }
    }
}

impl Default for TransportContext {
    fn default() -> Self {
        let unspecified = SocketAddr::from((Ipv4Addr::UNSPECIFIED, 0));
        TransportContext::new(unspecified, unspecified)
    }
}

impl fmt::Display for TransportContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} <-> {}", self.local_addr, self.peer_addr)
    }
}

/// A message stamped with the time it was received or queued and the
/// addresses it belongs to.
#[derive(Debug, Clone)]
pub struct TransportMessage<T> {
    pub now: Instant,
    pub transport: TransportContext,
    pub message: T,
}

/// A raw datagram.
pub type TaggedBytesMut = TransportMessage<BytesMut>;
