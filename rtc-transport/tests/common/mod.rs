#![allow(dead_code)]

use std::collections::VecDeque;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use bytes::{Bytes, BytesMut};
use parking_lot::Mutex;
use rtc_transport::config::CodecMapping;
use rtc_transport::dtls::{DtlsEngine, Fingerprint, NoDtls, Setup};
use rtc_transport::{
    Codec, DatagramSender, GroupInfo, ReceivedPacket, RtcpObserver, SecureTransport,
    SrtpKeyingMaterial, StreamListener, TransportConfig,
};
use rtcp::goodbye::Goodbye;
use rtcp::payload_feedbacks::receiver_estimated_maximum_bitrate::ReceiverEstimatedMaximumBitrate;
use rtcp::receiver_report::ReceiverReport;
use rtcp::sender_report::SenderReport;
use rtcp::transport_feedbacks::temporary_maximum_bitrate::TemporaryMaximumBitrate;
use rtcp::transport_feedbacks::transport_layer_cc::TransportLayerCc;
use rtp::extension::TRANSPORT_CC_URI;
use shared::error::Result;
use shared::marshal::{Marshal, Unmarshal};
use srtp::{Context, ProtectionProfile};

pub const SUITE: &str = "AES_CM_128_HMAC_SHA1_80";
/// Key the transport encrypts with.
pub const LOCAL_KEY: [u8; 30] = [0x11; 30];
/// Key the transport decrypts with.
pub const REMOTE_KEY: [u8; 30] = [0x22; 30];
pub const TRANSPORT_CC_ID: u8 = 3;

pub const VP8: u8 = 96;
pub const VP8_RTX: u8 = 97;
pub const FLEXFEC: u8 = 98;
pub const OPUS: u8 = 111;

pub fn init_log() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub fn peer_addr() -> SocketAddr {
    SocketAddr::from(([192, 0, 2, 10], 40000))
}

pub fn config() -> TransportConfig {
    let mut config = TransportConfig::default();
    config.audio_codecs.push(CodecMapping {
        codec: Codec::Opus,
        payload_type: OPUS,
        rtx_payload_type: None,
    });
    config.video_codecs.push(CodecMapping {
        codec: Codec::Vp8,
        payload_type: VP8,
        rtx_payload_type: Some(VP8_RTX),
    });
    config.flexfec_payload_type = Some(FLEXFEC);
    config
        .extensions
        .insert(TRANSPORT_CC_URI.to_owned(), TRANSPORT_CC_ID);
    config
}

#[derive(Default)]
pub struct RecordingSender {
    sent: Mutex<Vec<(SocketAddr, Vec<u8>)>>,
}

impl DatagramSender for RecordingSender {
    fn send(&self, peer: SocketAddr, data: &[u8]) {
        self.sent.lock().push((peer, data.to_vec()));
    }
}

impl RecordingSender {
    pub fn take(&self) -> Vec<(SocketAddr, Vec<u8>)> {
        std::mem::take(&mut *self.sent.lock())
    }
}

#[derive(Default)]
pub struct RecordingListener {
    pub packets: Mutex<Vec<(GroupInfo, ReceivedPacket)>>,
    pub key_frame_requests: Mutex<Vec<(GroupInfo, u32)>>,
}

impl StreamListener for RecordingListener {
    fn on_rtp(&self, group: &GroupInfo, packet: &ReceivedPacket) {
        self.packets.lock().push((*group, packet.clone()));
    }

    fn on_full_intra_request(&self, group: &GroupInfo, ssrc: u32) {
        self.key_frame_requests.lock().push((*group, ssrc));
    }
}

#[derive(Default)]
pub struct RecordingObserver {
    pub sender_reports: Mutex<Vec<SenderReport>>,
    pub receiver_reports: Mutex<Vec<ReceiverReport>>,
    pub tmmb: Mutex<Vec<TemporaryMaximumBitrate>>,
    pub transport_feedback: Mutex<Vec<TransportLayerCc>>,
    pub remb: Mutex<Vec<ReceiverEstimatedMaximumBitrate>>,
    pub goodbyes: Mutex<Vec<Goodbye>>,
}

impl RtcpObserver for RecordingObserver {
    fn on_sender_report(&self, report: &SenderReport) {
        self.sender_reports.lock().push(report.clone());
    }
    fn on_receiver_report(&self, report: &ReceiverReport) {
        self.receiver_reports.lock().push(report.clone());
    }
    fn on_tmmb(&self, tmmb: &TemporaryMaximumBitrate) {
        self.tmmb.lock().push(tmmb.clone());
    }
    fn on_transport_feedback(&self, feedback: &TransportLayerCc) {
        self.transport_feedback.lock().push(feedback.clone());
    }
    fn on_remb(&self, remb: &ReceiverEstimatedMaximumBitrate) {
        self.remb.lock().push(remb.clone());
    }
    fn on_goodbye(&self, goodbye: &Goodbye) {
        self.goodbyes.lock().push(goodbye.clone());
    }
}

/// Handshake state shared between a test and its [`MemoryDtls`].
#[derive(Default)]
pub struct DtlsState {
    pub fed: Vec<Vec<u8>>,
    pub setup: Option<Setup>,
    pub fingerprint: Option<Fingerprint>,
    pub outbox: VecDeque<Bytes>,
    pub keys: Option<SrtpKeyingMaterial>,
    pub complete: bool,
}

pub const CLIENT_HELLO: &[u8] = &[22, 0xfe, 0xfd, 0x00, 0x01];
pub const SERVER_FLIGHT: &[u8] = &[22, 0xfe, 0xfd, 0x00, 0x02];

/// A DTLS engine that answers any record with one flight and then
/// completes, yielding the keys placed in its state.
pub struct MemoryDtls(pub Arc<Mutex<DtlsState>>);

impl DtlsEngine for MemoryDtls {
    fn feed(&mut self, buf: &[u8]) -> Result<()> {
        let mut state = self.0.lock();
        state.fed.push(buf.to_vec());
        state.outbox.push_back(Bytes::from_static(SERVER_FLIGHT));
        state.complete = true;
        Ok(())
    }

    fn drain(&mut self) -> Option<Bytes> {
        self.0.lock().outbox.pop_front()
    }

    fn poll_keys(&mut self) -> Option<SrtpKeyingMaterial> {
        let mut state = self.0.lock();
        if state.complete { state.keys.take() } else { None }
    }

    fn set_remote_parameters(&mut self, setup: Setup, fingerprint: &Fingerprint) -> Result<()> {
        let mut state = self.0.lock();
        if setup == Setup::Passive {
            state.outbox.push_back(Bytes::from_static(CLIENT_HELLO));
        }
        state.setup = Some(setup);
        state.fingerprint = Some(fingerprint.clone());
        Ok(())
    }
}

pub fn keying_material() -> SrtpKeyingMaterial {
    SrtpKeyingMaterial {
        profile: ProtectionProfile::Aes128CmHmacSha1_80,
        local_key: LOCAL_KEY.to_vec(),
        remote_key: REMOTE_KEY.to_vec(),
    }
}

/// A transport keyed through SDES with the peer as its active candidate.
pub fn secured_transport(sender: Arc<RecordingSender>) -> Result<SecureTransport> {
    let transport = SecureTransport::new(Box::new(NoDtls), sender);
    transport.apply_config(&config())?;
    transport.set_local_crypto_sdes(SUITE, &LOCAL_KEY)?;
    transport.set_remote_crypto_sdes(SUITE, &REMOTE_KEY)?;
    transport.add_remote_candidate(peer_addr(), 100, false, Instant::now());
    Ok(transport)
}

/// The remote end of a transport: it encrypts with the transport's remote
/// key and decrypts with its local key.
pub struct Peer {
    to_transport: Context,
    from_transport: Context,
}

impl Peer {
    pub fn new() -> Result<Self> {
        let profile = ProtectionProfile::Aes128CmHmacSha1_80;
        Ok(Peer {
            to_transport: Context::from_keying_material(&REMOTE_KEY, profile, None, None)?,
            from_transport: Context::from_keying_material(&LOCAL_KEY, profile, None, None)?,
        })
    }

    pub fn rtp(
        &mut self,
        ssrc: u32,
        payload_type: u8,
        seq: u16,
        transport_seq: Option<u16>,
        payload: &[u8],
    ) -> Result<Vec<u8>> {
        let mut packet = rtp::Packet {
            header: rtp::Header {
                version: 2,
                payload_type,
                sequence_number: seq,
                timestamp: seq as u32 * 3000,
                ssrc,
                ..Default::default()
            },
            payload: Bytes::copy_from_slice(payload),
        };
        if let Some(transport_seq) = transport_seq {
            packet.header.set_extension(
                TRANSPORT_CC_ID,
                Bytes::copy_from_slice(&transport_seq.to_be_bytes()),
            )?;
        }
        Ok(self.to_transport.encrypt_rtp(&packet.marshal()?)?.to_vec())
    }

    pub fn rtcp(&mut self, packets: &[rtcp::Packet]) -> Result<Vec<u8>> {
        let raw = rtcp::marshal(packets)?;
        Ok(self.to_transport.encrypt_rtcp(&raw)?.to_vec())
    }

    pub fn open_rtp(&mut self, data: &[u8]) -> Result<rtp::Packet> {
        let mut decrypted = self.from_transport.decrypt_rtp(data)?;
        rtp::Packet::unmarshal(&mut decrypted)
    }

    pub fn open_rtcp(&mut self, data: &[u8]) -> Result<Vec<rtcp::Packet>> {
        let mut decrypted: BytesMut = self.from_transport.decrypt_rtcp(data)?;
        rtcp::unmarshal(&mut decrypted)
    }
}
