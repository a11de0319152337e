//! Thread-safe front of a [`TransportHandler`].
//!
//! Every entry point takes the transport's single lock, runs the handler and
//! collects its output. Datagram sends and listener callbacks happen after
//! the lock is released.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use bytes::BytesMut;
use log::{debug, trace};
use parking_lot::Mutex;
use sansio::Protocol;
use shared::error::Result;
use shared::{TaggedBytesMut, TransportContext, TransportMessage};

use crate::config::{Properties, TransportConfig};
use crate::dtls::DtlsEngine;
use crate::group::{GroupId, IncomingSourceGroup, OutgoingSourceGroup};
use crate::handler::{Delivery, TransportHandler};
use crate::ice::IceCredentials;
use crate::listener::{RtcpObserver, StreamListener, TransportEvent};
use crate::packet::OutgoingPacket;
use crate::source::{ReportCounters, SourceStats};

/// Fire-and-forget datagram output.
pub trait DatagramSender: Send + Sync {
    fn send(&self, peer: SocketAddr, data: &[u8]);
}

/// Work collected under the lock and performed after releasing it.
#[derive(Default)]
struct Output {
    datagrams: Vec<TaggedBytesMut>,
    deliveries: Vec<(Delivery, Option<Arc<dyn StreamListener>>)>,
    events: Vec<(TransportEvent, Option<Arc<dyn StreamListener>>)>,
}

pub struct SecureTransport {
    handler: Mutex<TransportHandler>,
    sender: Arc<dyn DatagramSender>,
    observer: Option<Arc<dyn RtcpObserver>>,
}

impl SecureTransport {
    pub fn new(dtls: Box<dyn DtlsEngine>, sender: Arc<dyn DatagramSender>) -> Self {
        SecureTransport {
            handler: Mutex::new(TransportHandler::new(dtls)),
            sender,
            observer: None,
        }
    }

    pub fn with_observer(mut self, observer: Arc<dyn RtcpObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    pub fn set_local_addr(&self, local_addr: SocketAddr) {
        self.handler.lock().set_local_addr(local_addr);
    }

    /// Handles one datagram received from `peer`.
    pub fn on_data(&self, peer: SocketAddr, data: &[u8], now: Instant) -> Result<()> {
        self.run(|handler| {
            handler.handle_read(TaggedBytesMut {
                now,
                transport: TransportContext::from_peer(peer),
                message: BytesMut::from(data),
            })
        })
    }

    /// Encrypts and sends a media packet, keeping a copy for retransmission.
    pub fn send(&self, packet: OutgoingPacket, now: Instant) -> Result<()> {
        self.run(|handler| {
            handler.handle_write(TransportMessage {
                now,
                transport: TransportContext::default(),
                message: packet,
            })
        })
    }

    pub fn send_pli(&self, media_ssrc: u32, now: Instant) -> Result<()> {
        self.run(|handler| handler.send_pli(media_ssrc, now))
    }

    pub fn send_rtcp(&self, packets: &[rtcp::Packet], now: Instant) -> Result<()> {
        self.run(|handler| handler.send_rtcp(packets, now))
    }

    /// Retransmits `seq` of an outgoing group as if the remote side had
    /// NACKed it.
    pub fn resend(&self, id: GroupId, seq: u16, now: Instant) -> Result<bool> {
        self.run(|handler| handler.resend(id, seq, now))
    }

    pub fn add_remote_candidate(
        &self,
        addr: SocketAddr,
        priority: u32,
        use_candidate: bool,
        now: Instant,
    ) {
        self.run(|handler| {
            handler.add_remote_candidate(addr, priority, use_candidate, now);
        })
    }

    pub fn active_candidate(&self) -> Option<SocketAddr> {
        self.handler.lock().candidates().active().map(|c| c.addr)
    }

    pub fn set_properties(&self, properties: &Properties) -> Result<()> {
        let config = TransportConfig::from_properties(properties)?;
        self.apply_config(&config)
    }

    pub fn apply_config(&self, config: &TransportConfig) -> Result<()> {
        self.handler.lock().apply_config(config)
    }

    pub fn set_local_crypto_sdes(&self, suite: &str, key: &[u8]) -> Result<()> {
        self.handler.lock().set_local_crypto_sdes(suite, key)
    }

    pub fn set_remote_crypto_sdes(&self, suite: &str, key: &[u8]) -> Result<()> {
        self.handler.lock().set_remote_crypto_sdes(suite, key)
    }

    pub fn set_remote_crypto_dtls(
        &self,
        setup: &str,
        hash: &str,
        fingerprint: &str,
        now: Instant,
    ) -> Result<()> {
        self.run(|handler| handler.set_remote_crypto_dtls(setup, hash, fingerprint, now))
    }

    pub fn is_secured(&self) -> bool {
        self.handler.lock().is_secured()
    }

    pub fn set_local_ice_credentials(&self, ufrag: &str, pwd: &str) {
        self.handler.lock().set_local_ice_credentials(ufrag, pwd);
    }

    pub fn generate_local_ice_credentials(&self) -> IceCredentials {
        self.handler.lock().generate_local_ice_credentials().clone()
    }

    pub fn local_ice_credentials(&self) -> IceCredentials {
        self.handler.lock().local_ice_credentials().clone()
    }

    pub fn set_remote_ice_credentials(&self, ufrag: &str, pwd: &str) {
        self.handler.lock().set_remote_ice_credentials(ufrag, pwd);
    }

    pub fn remote_ice_credentials(&self) -> IceCredentials {
        self.handler.lock().remote_ice_credentials().clone()
    }

    pub fn add_incoming_group(&self, group: IncomingSourceGroup) -> Result<GroupId> {
        self.handler.lock().add_incoming_group(group)
    }

    pub fn remove_incoming_group(&self, id: GroupId) -> Option<IncomingSourceGroup> {
        self.handler.lock().remove_incoming_group(id)
    }

    pub fn add_outgoing_group(&self, group: OutgoingSourceGroup) -> Result<GroupId> {
        self.handler.lock().add_outgoing_group(group)
    }

    pub fn remove_outgoing_group(&self, id: GroupId) -> Option<OutgoingSourceGroup> {
        self.handler.lock().remove_outgoing_group(id)
    }

    pub fn incoming_source_stats(&self, ssrc: u32) -> Option<SourceStats> {
        self.handler.lock().incoming_source_stats(ssrc)
    }

    pub fn outgoing_source_stats(&self, ssrc: u32) -> Option<SourceStats> {
        self.handler.lock().outgoing_source_stats(ssrc)
    }

    pub fn take_report_counters(&self, ssrc: u32) -> Option<ReportCounters> {
        self.handler.lock().take_report_counters(ssrc)
    }

    /// Number of packets held for retransmission by an outgoing group.
    pub fn retransmission_buffer_len(&self, id: GroupId) -> Option<usize> {
        self.handler
            .lock()
            .outgoing_group(id)
            .map(|g| g.packets.len())
    }

    pub fn reset(&self) {
        self.handler.lock().reset();
    }

    /// Runs `f` under the lock, then performs the sends and callbacks it
    /// produced.
    fn run<T>(&self, f: impl FnOnce(&mut TransportHandler) -> T) -> T {
        let (result, output) = {
            let mut handler = self.handler.lock();
            let result = f(&mut *handler);
            (result, Self::drain(&mut *handler))
        };
        self.dispatch(output);
        result
    }

    fn drain(handler: &mut TransportHandler) -> Output {
        let mut output = Output::default();
        while let Some(datagram) = handler.poll_write() {
            output.datagrams.push(datagram);
        }
        while let Some(delivery) = handler.poll_read() {
            let listener = handler.incoming_listener(delivery.group.id);
            output.deliveries.push((delivery, listener));
        }
        while let Some(event) = handler.poll_event() {
            let listener = match &event {
                TransportEvent::FullIntraRequest { group, .. } => {
                    handler.outgoing_listener(group.id)
                }
                _ => None,
            };
            output.events.push((event, listener));
        }
        output
    }

    fn dispatch(&self, output: Output) {
        for datagram in output.datagrams {
            trace!(
                "sending {} bytes to {}",
                datagram.message.len(),
                datagram.transport.peer_addr
            );
            self.sender
                .send(datagram.transport.peer_addr, &datagram.message);
        }

        for (delivery, listener) in output.deliveries {
            match listener {
                Some(listener) => listener.on_rtp(&delivery.group, &delivery.packet),
                None => debug!("no listener on {}, dropping packet", delivery.group.id),
            }
        }

        for (event, listener) in output.events {
            if let TransportEvent::FullIntraRequest { group, ssrc } = &event {
                match listener {
                    Some(listener) => listener.on_full_intra_request(group, *ssrc),
                    None => debug!("no listener on {} for key frame request", group.id),
                }
            } else if let Some(observer) = &self.observer {
                event.notify(observer.as_ref());
            }
        }
    }
}
