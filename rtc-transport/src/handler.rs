//! The sans-I/O transport state machine.
//!
//! [`TransportHandler`] takes ciphertext datagrams and outgoing media packets
//! and produces ciphertext datagrams, listener deliveries and events. It never
//! touches a socket; [`SecureTransport`](crate::SecureTransport) drives it.

use std::collections::VecDeque;
use std::net::{Ipv4Addr, SocketAddr};
use std::sync::Arc;
use std::time::Instant;

use bytes::BytesMut;
use log::{debug, error, info, trace, warn};
use rtcp::payload_feedbacks::picture_loss_indication::PictureLossIndication;
use rtcp::transport_feedbacks::transport_layer_nack::TransportLayerNack;
use rtp::extension::ExtensionMap;
use rtp::header::FIXED_HEADER_LENGTH;
use shared::error::{Error, Result};
use shared::marshal::{Marshal, MarshalSize, Unmarshal};
use shared::util::{match_srtcp, match_srtp};
use shared::{TaggedBytesMut, TransportContext, TransportMessage};

use crate::candidate::CandidateSet;
use crate::config::{DEFAULT_MTU, TransportConfig};
use crate::crypto::SrtpSession;
use crate::dtls::{DtlsEngine, Fingerprint, Setup};
use crate::group::{
    GroupId, GroupInfo, IncomingSourceGroup, OutgoingSourceGroup, SourceGroup, SourceKind,
};
use crate::ice::IceCredentials;
use crate::listener::{StreamListener, TransportEvent};
use crate::packet::{OutgoingPacket, ReceivedPacket};
use crate::registry::{IncomingRegistry, OutgoingRegistry};
use crate::rtp_map::{Codec, MediaType, RtpMap};
use crate::source::{ReportCounters, SourceStats};
use crate::twcc::FeedbackRecorder;

/// A received packet ready for its group's listener.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    pub group: GroupInfo,
    pub packet: ReceivedPacket,
}

/// Requests that do not carry media.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum TransportCommand {
    /// Ask the sender of `media_ssrc` for a key frame.
    SendPli(u32),
}

#[derive(Default)]
pub(crate) struct TransportHandlerContext {
    pub(crate) read_outs: VecDeque<Delivery>,
    pub(crate) write_outs: VecDeque<TaggedBytesMut>,
    pub(crate) event_outs: VecDeque<TransportEvent>,
}

impl TransportHandlerContext {
    fn push_datagram(
        &mut self,
        local_addr: SocketAddr,
        peer_addr: SocketAddr,
        now: Instant,
        message: BytesMut,
    ) {
        self.write_outs.push_back(TaggedBytesMut {
            now,
            transport: TransportContext::new(local_addr, peer_addr),
            message,
        });
    }
}

/// State of one secure media transport: crypto contexts, candidates, source
/// groups and the feedback loop between them.
pub struct TransportHandler {
    local_addr: SocketAddr,
    mtu: usize,
    rtp_map: RtpMap,
    ext_map: ExtensionMap,
    srtp: SrtpSession,
    dtls: Box<dyn DtlsEngine>,
    candidates: CandidateSet,
    local_ice: IceCredentials,
    remote_ice: IceCredentials,
    incoming: IncomingRegistry,
    outgoing: OutgoingRegistry,
    feedback: FeedbackRecorder,
    transport_sequence_number: u16,
    epoch: Instant,
    ctx: TransportHandlerContext,
}

impl TransportHandler {
    pub fn new(dtls: Box<dyn DtlsEngine>) -> Self {
        TransportHandler {
            local_addr: SocketAddr::from((Ipv4Addr::UNSPECIFIED, 0)),
            mtu: DEFAULT_MTU,
            rtp_map: RtpMap::new(),
            ext_map: ExtensionMap::new(),
            srtp: SrtpSession::new(),
            dtls,
            candidates: CandidateSet::new(),
            local_ice: IceCredentials::default(),
            remote_ice: IceCredentials::default(),
            incoming: IncomingRegistry::new(),
            outgoing: OutgoingRegistry::new(),
            feedback: FeedbackRecorder::new(),
            transport_sequence_number: 0,
            epoch: Instant::now(),
            ctx: TransportHandlerContext::default(),
        }
    }

    pub fn name(&self) -> &'static str {
        "TransportHandler"
    }

    pub fn set_local_addr(&mut self, local_addr: SocketAddr) {
        self.local_addr = local_addr;
    }

    /// Replaces the payload type map, the extension map and the MTU. Nothing
    /// changes if the configuration is invalid.
    pub fn apply_config(&mut self, config: &TransportConfig) -> Result<()> {
        let (rtp_map, ext_map) = config.build_maps()?;
        self.rtp_map = rtp_map;
        self.ext_map = ext_map;
        self.mtu = config.mtu;
        Ok(())
    }

    pub fn rtp_map(&self) -> &RtpMap {
        &self.rtp_map
    }

    pub fn extension_map(&self) -> &ExtensionMap {
        &self.ext_map
    }

    pub fn add_incoming_group(&mut self, group: IncomingSourceGroup) -> Result<GroupId> {
        self.incoming.add(group)
    }

    pub fn remove_incoming_group(&mut self, id: GroupId) -> Option<IncomingSourceGroup> {
        self.incoming.remove(id)
    }

    pub fn add_outgoing_group(&mut self, group: OutgoingSourceGroup) -> Result<GroupId> {
        self.outgoing.add(group)
    }

    pub fn remove_outgoing_group(&mut self, id: GroupId) -> Option<OutgoingSourceGroup> {
        self.outgoing.remove(id)
    }

    pub fn incoming_group(&self, id: GroupId) -> Option<&IncomingSourceGroup> {
        self.incoming.get(id)
    }

    pub fn outgoing_group(&self, id: GroupId) -> Option<&OutgoingSourceGroup> {
        self.outgoing.get(id)
    }

    pub fn incoming_listener(&self, id: GroupId) -> Option<Arc<dyn StreamListener>> {
        self.incoming.get(id).and_then(|g| g.listener().cloned())
    }

    pub fn outgoing_listener(&self, id: GroupId) -> Option<Arc<dyn StreamListener>> {
        self.outgoing.get(id).and_then(|g| g.listener().cloned())
    }

    pub fn incoming_source_stats(&self, ssrc: u32) -> Option<SourceStats> {
        let (_, group) = self.incoming.find(ssrc)?;
        group.kind_of(ssrc).map(|kind| group.source(kind).stats())
    }

    pub fn outgoing_source_stats(&self, ssrc: u32) -> Option<SourceStats> {
        let (_, group) = self.outgoing.find(ssrc)?;
        group.kind_of(ssrc).map(|kind| group.source(kind).stats())
    }

    /// Resets the since-last-report counters of `ssrc`, looking at outgoing
    /// sources first.
    pub fn take_report_counters(&mut self, ssrc: u32) -> Option<ReportCounters> {
        if let Some((_, group)) = self.outgoing.find_mut(ssrc) {
            let kind = group.kind_of(ssrc)?;
            return Some(group.source_mut(kind).take_report_counters());
        }
        let (_, group) = self.incoming.find_mut(ssrc)?;
        let kind = group.kind_of(ssrc)?;
        Some(group.source_mut(kind).take_report_counters())
    }

    /// Adds a remote candidate and flushes pending DTLS records to whichever
    /// candidate is active afterwards.
    pub fn add_remote_candidate(
        &mut self,
        addr: SocketAddr,
        priority: u32,
        use_candidate: bool,
        now: Instant,
    ) {
        self.candidates.add(addr, priority, use_candidate);
        self.flush_dtls(None, now);
    }

    pub fn candidates(&self) -> &CandidateSet {
        &self.candidates
    }

    pub fn set_local_crypto_sdes(&mut self, suite: &str, key: &[u8]) -> Result<()> {
        self.srtp.set_local_sdes(suite, key)
    }

    pub fn set_remote_crypto_sdes(&mut self, suite: &str, key: &[u8]) -> Result<()> {
        self.srtp.set_remote_sdes(suite, key)
    }

    /// Configures the DTLS engine from the remote `a=setup` and
    /// `a=fingerprint` values.
    pub fn set_remote_crypto_dtls(
        &mut self,
        setup: &str,
        hash: &str,
        fingerprint: &str,
        now: Instant,
    ) -> Result<()> {
        let setup: Setup = setup.parse()?;
        let role = setup.local_role()?;
        let fingerprint = Fingerprint::parse(hash.parse()?, fingerprint)?;
        self.dtls.set_remote_parameters(setup, &fingerprint)?;
        info!("dtls configured as {role} for remote {fingerprint}");
        self.flush_dtls(None, now);
        Ok(())
    }

    pub fn is_secured(&self) -> bool {
        self.srtp.is_secured()
    }

    pub fn set_local_ice_credentials(&mut self, ufrag: &str, pwd: &str) {
        self.local_ice = IceCredentials::new(ufrag, pwd);
    }

    pub fn generate_local_ice_credentials(&mut self) -> &IceCredentials {
        self.local_ice = IceCredentials::generate();
        &self.local_ice
    }

    pub fn local_ice_credentials(&self) -> &IceCredentials {
        &self.local_ice
    }

    pub fn set_remote_ice_credentials(&mut self, ufrag: &str, pwd: &str) {
        self.remote_ice = IceCredentials::new(ufrag, pwd);
    }

    pub fn remote_ice_credentials(&self) -> &IceCredentials {
        &self.remote_ice
    }

    /// Drops crypto, ICE and candidate state. Registered groups stay.
    pub fn reset(&mut self) {
        self.srtp.clear();
        self.local_ice = IceCredentials::default();
        self.remote_ice = IceCredentials::default();
        self.candidates.clear();
        self.feedback.reset();
        info!("transport reset");
    }

    pub fn send_pli(&mut self, media_ssrc: u32, now: Instant) -> Result<()> {
        let pli = PictureLossIndication {
            sender_ssrc: 0,
            media_ssrc,
        };
        self.send_rtcp(&[pli.into()], now)
    }

    /// Encrypts and queues a compound RTCP packet for the active candidate.
    pub fn send_rtcp(&mut self, packets: &[rtcp::Packet], now: Instant) -> Result<()> {
        let Some(peer) = self.candidates.active().map(|c| c.addr) else {
            debug!("no active candidate, dropping rtcp");
            return Ok(());
        };
        let Some(context) = self.srtp.local() else {
            debug!("local crypto not ready, dropping rtcp");
            return Ok(());
        };

        let raw = rtcp::marshal(packets)?;
        let encrypted = context.encrypt_rtcp(&raw).map_err(|err| {
            error!("srtcp encrypt failed: {err}");
            err
        })?;
        self.ctx.push_datagram(self.local_addr, peer, now, encrypted);
        Ok(())
    }

    fn flush_dtls(&mut self, peer: Option<SocketAddr>, now: Instant) {
        let Some(peer) = peer.or_else(|| self.candidates.active().map(|c| c.addr)) else {
            return;
        };
        while let Some(record) = self.dtls.drain() {
            trace!("dtls record of {} bytes to {peer}", record.len());
            self.ctx
                .push_datagram(self.local_addr, peer, now, BytesMut::from(&record[..]));
        }
    }

    fn read_dtls(&mut self, peer: SocketAddr, now: Instant, buf: &[u8]) -> Result<()> {
        self.dtls.feed(buf).map_err(|err| {
            error!("dtls feed from {peer} failed: {err}");
            err
        })?;
        if let Some(material) = self.dtls.poll_keys() {
            info!("dtls handshake with {peer} completed, using {}", material.profile);
            self.srtp.install(&material)?;
        }
        self.flush_dtls(Some(peer), now);
        Ok(())
    }

    fn read_rtcp(&mut self, now: Instant, buf: &[u8]) -> Result<()> {
        let Some(context) = self.srtp.remote() else {
            debug!("remote crypto not ready, dropping srtcp");
            return Ok(());
        };
        let mut decrypted = context.decrypt_rtcp(buf).map_err(|err| {
            error!("srtcp decrypt failed: {err}");
            err
        })?;
        let packets = rtcp::unmarshal(&mut decrypted).map_err(|err| {
            debug!("dropping malformed rtcp: {err}");
            err
        })?;

        for packet in packets {
            self.dispatch_rtcp(packet, now);
        }
        Ok(())
    }

    fn dispatch_rtcp(&mut self, packet: rtcp::Packet, now: Instant) {
        trace!("rtcp {}", packet.header().packet_type);
        match packet {
            rtcp::Packet::SenderReport(sr) => {
                trace!("sender report from {} at {:?}", sr.ssrc, sr.wall_clock());
                self.ctx.event_outs.push_back(TransportEvent::SenderReport(sr));
            }
            rtcp::Packet::ReceiverReport(rr) => {
                self.ctx
                    .event_outs
                    .push_back(TransportEvent::ReceiverReport(rr));
            }
            rtcp::Packet::Goodbye(bye) => {
                self.ctx.event_outs.push_back(TransportEvent::Goodbye(bye));
            }
            rtcp::Packet::TransportLayerNack(nack) => self.handle_nack(&nack, now),
            rtcp::Packet::TemporaryMaximumBitrate(tmmb) => {
                self.ctx.event_outs.push_back(TransportEvent::Tmmb(tmmb));
            }
            rtcp::Packet::TransportLayerCc(cc) => {
                self.ctx
                    .event_outs
                    .push_back(TransportEvent::TransportFeedback(cc));
            }
            rtcp::Packet::PictureLossIndication(pli) => self.full_intra_request(pli.media_ssrc),
            rtcp::Packet::FullIntraRequest(fir) => {
                for entry in &fir.fir {
                    self.full_intra_request(entry.ssrc);
                }
            }
            rtcp::Packet::ReceiverEstimatedMaximumBitrate(remb) => {
                self.ctx.event_outs.push_back(TransportEvent::Remb(remb));
            }
            other => debug!("ignoring rtcp {}", other.header().packet_type),
        }
    }

    fn full_intra_request(&mut self, ssrc: u32) {
        let Some((id, group)) = self.outgoing.find(ssrc) else {
            warn!("key frame request for unknown ssrc {ssrc}");
            return;
        };
        self.ctx.event_outs.push_back(TransportEvent::FullIntraRequest {
            group: group.info(id),
            ssrc,
        });
    }

    fn handle_nack(&mut self, nack: &TransportLayerNack, now: Instant) {
        let id = match self.outgoing.find(nack.media_ssrc) {
            Some((id, group)) if group.kind_of(nack.media_ssrc) == Some(SourceKind::Media) => id,
            _ => {
                warn!("nack for unknown media ssrc {}", nack.media_ssrc);
                return;
            }
        };

        for pair in &nack.nacks {
            let mut served = true;
            pair.range(|seq| match self.resend(id, seq, now) {
                Ok(true) => true,
                Ok(false) => {
                    served = false;
                    false
                }
                Err(err) => {
                    error!("retransmission of {seq} failed: {err}");
                    true
                }
            });
            if !served {
                break;
            }
        }
    }

    /// Retransmits `seq` of group `id`, on its RTX stream when it has one.
    /// Returns false if the packet is no longer buffered, in which case the
    /// buffer is dropped and a full intra request is raised instead.
    pub fn resend(&mut self, id: GroupId, seq: u16, now: Instant) -> Result<bool> {
        let Some(group) = self.outgoing.get_mut(id) else {
            return Ok(true);
        };

        let ext = group.media.rollover.resolve(seq);
        let Some(original) = group.packets.get(ext).cloned() else {
            debug!(
                "packet {seq} of ssrc {} is no longer buffered, requesting a key frame",
                group.media.ssrc
            );
            group.packets.clear();
            let info = group.info(id);
            self.ctx.event_outs.push_back(TransportEvent::FullIntraRequest {
                group: info,
                ssrc: info.media_ssrc,
            });
            return Ok(false);
        };

        let rtx_payload_type = self.rtp_map.rtx_payload_type(original.header.payload_type);
        let mut rtx_rollover = group.rtx.rollover;
        let (mut packet, kind) = match rtx_payload_type {
            Some(rtx_pt) if group.rtx.ssrc != 0 => {
                let rtx_seq = rtx_rollover.advance();
                (
                    rtp::rtx::wrap(&original, group.rtx.ssrc, rtx_pt, rtx_seq),
                    SourceKind::Rtx,
                )
            }
            _ => (original, SourceKind::Media),
        };
        let stamped = group.media_type == MediaType::Video
            && self
                .ext_map
                .set_transport_sequence_number(&mut packet.header, self.transport_sequence_number)?;

        let size = packet.marshal_size();
        if size > self.mtu {
            warn!(
                "retransmission of {seq} on ssrc {} is {size} bytes, over mtu {}",
                group.media.ssrc, self.mtu
            );
            return Err(Error::PacketExceedsMtu(size, self.mtu));
        }

        let Some(peer) = self.candidates.active().map(|c| c.addr) else {
            debug!("no active candidate, dropping retransmission");
            return Ok(true);
        };
        let Some(context) = self.srtp.local() else {
            debug!("local crypto not ready, dropping retransmission");
            return Ok(true);
        };

        let encrypted = context.encrypt_rtp(&packet.marshal()?).map_err(|err| {
            error!("srtp encrypt failed: {err}");
            err
        })?;
        trace!(
            "retransmitting {seq} of ssrc {} as {kind:?} {}",
            group.media.ssrc,
            packet.header.sequence_number
        );
        if kind == SourceKind::Rtx {
            group.rtx.rollover = rtx_rollover;
        }
        if stamped {
            self.transport_sequence_number = self.transport_sequence_number.wrapping_add(1);
        }
        group
            .source_mut(kind)
            .update(size, packet.header.timestamp, now);
        self.ctx.push_datagram(self.local_addr, peer, now, encrypted);
        Ok(true)
    }

    fn read_rtp(&mut self, now: Instant, buf: &[u8]) -> Result<()> {
        if buf.len() < FIXED_HEADER_LENGTH {
            debug!("dropping datagram of {} bytes", buf.len());
            return Err(Error::ErrHeaderSizeInsufficient);
        }
        if !match_srtp(buf) {
            debug!("dropping datagram starting with {:#04x}", buf[0]);
            return Err(Error::BadVersion);
        }
        let Some(context) = self.srtp.remote() else {
            debug!("remote crypto not ready, dropping srtp");
            return Ok(());
        };

        let mut decrypted = context.decrypt_rtp(buf).map_err(|err| {
            error!("srtp decrypt failed: {err}");
            err
        })?;
        let size = decrypted.len();
        let packet = rtp::Packet::unmarshal(&mut decrypted)?;
        let ssrc = packet.header.ssrc;
        let payload_type = packet.header.payload_type;

        let Some(codec) = self.rtp_map.codec(payload_type) else {
            warn!("unknown payload type {payload_type} on ssrc {ssrc}");
            return Err(Error::UnknownPayloadType(payload_type));
        };
        let Some((id, group)) = self.incoming.find_mut(ssrc) else {
            warn!("rtp for unknown ssrc {ssrc}");
            return Err(Error::UnknownSsrc(ssrc));
        };
        let kind = group.kind_of(ssrc).ok_or(Error::UnknownSsrc(ssrc))?;

        let (packet, codec, extended_sequence_number) = match kind {
            SourceKind::Rtx => {
                if codec != Codec::Rtx {
                    return Err(Error::CodecMismatch(ssrc, payload_type, "rtx"));
                }
                let apt = self
                    .rtp_map
                    .associated_payload_type(payload_type)
                    .ok_or(Error::RtxAssociatedPayloadType(payload_type))?;
                let media_codec = self
                    .rtp_map
                    .codec(apt)
                    .ok_or(Error::RtxAssociatedPayloadType(apt))?;

                group.rtx.rollover.update(packet.header.sequence_number);
                group.rtx.update(size, packet.header.timestamp, now);

                let original = rtp::rtx::unwrap(&packet, group.media.ssrc, apt)?;
                let ext = group.media.rollover.update(original.header.sequence_number);
                (original, media_codec, ext)
            }
            SourceKind::Fec => {
                if !codec.is_fec() {
                    return Err(Error::CodecMismatch(ssrc, payload_type, "fec"));
                }
                let ext = group.fec.rollover.update(packet.header.sequence_number);
                group.fec.update(size, packet.header.timestamp, now);
                (packet, codec, ext)
            }
            SourceKind::Media => {
                if codec == Codec::Rtx || codec.is_fec() {
                    return Err(Error::CodecMismatch(ssrc, payload_type, "media"));
                }
                let ext = group.media.rollover.update(packet.header.sequence_number);
                group.media.update(size, packet.header.timestamp, now);
                (packet, codec, ext)
            }
        };

        let extensions = self.ext_map.parse(&packet.header);
        let mut feedback: Vec<rtcp::Packet> = vec![];

        if group.media_type == MediaType::Video {
            if let Some(transport_seq) = extensions.transport_sequence_number {
                let arrival_us = now.saturating_duration_since(self.epoch).as_micros() as i64;
                match self
                    .feedback
                    .on_packet(transport_seq, arrival_us, group.media.ssrc)
                {
                    Ok(cc) => feedback.push(cc.into()),
                    Err(err) => warn!("transport feedback for {transport_seq} failed: {err}"),
                }
            }
        }

        if kind != SourceKind::Fec {
            let lost = group.losses.add_packet(extended_sequence_number, now);
            if lost > 0 && kind == SourceKind::Media {
                debug!("ssrc {ssrc} lost {lost} packets before {extended_sequence_number}");
                feedback.push(
                    TransportLayerNack {
                        sender_ssrc: 0,
                        media_ssrc: group.media.ssrc,
                        nacks: group.losses.get_nacks(),
                    }
                    .into(),
                );
            }
        }

        trace!("rtp {codec} seq {extended_sequence_number} ({kind:?}) on {id}");
        self.ctx.read_outs.push_back(Delivery {
            group: group.info(id),
            packet: ReceivedPacket {
                media_type: group.media_type,
                codec,
                source: kind,
                packet,
                extended_sequence_number,
                extensions,
                arrival: now,
            },
        });

        for packet in feedback {
            if let Err(err) = self.send_rtcp(&[packet], now) {
                error!("sending feedback failed: {err}");
            }
        }
        Ok(())
    }

    fn write_rtp(&mut self, msg: OutgoingPacket, now: Instant) -> Result<()> {
        let Some((_, group)) = self.outgoing.find_mut(msg.ssrc) else {
            warn!("send on unknown ssrc {}", msg.ssrc);
            return Err(Error::UnknownSsrc(msg.ssrc));
        };
        let Some(payload_type) = self.rtp_map.payload_type(msg.codec) else {
            return Err(Error::UnmappedCodec(msg.codec.to_string()));
        };

        let mut packet = rtp::Packet {
            header: rtp::Header {
                version: 2,
                marker: msg.marker,
                payload_type,
                sequence_number: msg.sequence_number,
                timestamp: msg.timestamp,
                ssrc: msg.ssrc,
                ..Default::default()
            },
            payload: msg.payload,
        };
        // The transport-wide counter only advances once the packet is queued.
        let stamped = group.media_type == MediaType::Video
            && self
                .ext_map
                .set_transport_sequence_number(&mut packet.header, self.transport_sequence_number)?;

        let size = packet.marshal_size();
        if size > self.mtu {
            return Err(Error::PacketExceedsMtu(size, self.mtu));
        }

        let Some(peer) = self.candidates.active().map(|c| c.addr) else {
            debug!("no active candidate, dropping rtp");
            return Ok(());
        };
        let Some(context) = self.srtp.local() else {
            debug!("local crypto not ready, dropping rtp");
            return Ok(());
        };

        let raw = packet.marshal()?;
        let encrypted = context.encrypt_rtp(&raw).map_err(|err| {
            error!("srtp encrypt failed: {err}");
            err
        })?;

        if stamped {
            self.transport_sequence_number = self.transport_sequence_number.wrapping_add(1);
        }
        let ext = group.media.rollover.update(msg.sequence_number);
        group.packets.insert(ext, now, packet);
        group.media.update(size, msg.timestamp, now);
        group.packets.prune(now);

        trace!("rtp {} seq {ext} to {peer}", msg.ssrc);
        self.ctx.push_datagram(self.local_addr, peer, now, encrypted);
        Ok(())
    }
}

impl sansio::Protocol<TaggedBytesMut, TransportMessage<OutgoingPacket>, TransportCommand>
    for TransportHandler
{
    type Rout = Delivery;
    type Wout = TaggedBytesMut;
    type Eout = TransportEvent;
    type Error = Error;
    type Time = Instant;

    fn handle_read(&mut self, msg: TaggedBytesMut) -> Result<()> {
        let peer = msg.transport.peer_addr;
        let buf = &msg.message[..];
        trace!("read {} bytes from {peer}", buf.len());

        if self.dtls.is_handshake_record(buf) {
            self.read_dtls(peer, msg.now, buf)
        } else if match_srtcp(buf) {
            self.read_rtcp(msg.now, buf)
        } else {
            self.read_rtp(msg.now, buf)
        }
    }

    fn poll_read(&mut self) -> Option<Self::Rout> {
        self.ctx.read_outs.pop_front()
    }

    fn handle_write(&mut self, msg: TransportMessage<OutgoingPacket>) -> Result<()> {
        let now = msg.now;
        self.write_rtp(msg.message, now)
    }

    fn poll_write(&mut self) -> Option<Self::Wout> {
        self.ctx.write_outs.pop_front()
    }

    fn handle_event(&mut self, evt: TransportCommand) -> Result<()> {
        match evt {
            TransportCommand::SendPli(media_ssrc) => self.send_pli(media_ssrc, Instant::now()),
        }
    }

    fn poll_event(&mut self) -> Option<Self::Eout> {
        self.ctx.event_outs.pop_front()
    }

    fn handle_timeout(&mut self, _now: Instant) -> Result<()> {
        Ok(())
    }

    fn poll_timeout(&mut self) -> Option<Instant> {
        None
    }

    fn close(&mut self) -> Result<()> {
        self.ctx.read_outs.clear();
        self.ctx.write_outs.clear();
        self.ctx.event_outs.clear();
        Ok(())
    }
}
