mod common;

use std::sync::Arc;
use std::time::{Duration, Instant};

use bytes::Bytes;
use common::*;
use rtc_transport::{
    Codec, GroupId, MediaType, OutgoingPacket, OutgoingSourceGroup, RtcpObserver,
    SecureTransport, StreamListener,
};
use rtc_transport::dtls::NoDtls;
use rtcp::goodbye::Goodbye;
use rtcp::payload_feedbacks::full_intra_request::{FirEntry, FullIntraRequest};
use rtcp::payload_feedbacks::picture_loss_indication::PictureLossIndication;
use rtcp::payload_feedbacks::receiver_estimated_maximum_bitrate::ReceiverEstimatedMaximumBitrate;
use rtcp::sender_report::SenderReport;
use rtcp::transport_feedbacks::transport_layer_nack::{NackPair, TransportLayerNack};
use shared::error::{Error, Result};
use shared::marshal::MarshalSize;

const MEDIA: u32 = 1111;
const RTX: u32 = 5555;

fn vp8(seq: u16, payload: &'static [u8]) -> OutgoingPacket {
    OutgoingPacket {
        ssrc: MEDIA,
        codec: Codec::Vp8,
        sequence_number: seq,
        timestamp: seq as u32 * 3000,
        marker: false,
        payload: Bytes::from_static(payload),
    }
}

fn nack(packet_id: u16, lost_packets: u16) -> rtcp::Packet {
    TransportLayerNack {
        sender_ssrc: 1,
        media_ssrc: MEDIA,
        nacks: vec![NackPair {
            packet_id,
            lost_packets,
        }],
    }
    .into()
}

fn sending_transport(
    rtx: u32,
) -> Result<(SecureTransport, Arc<RecordingSender>, Arc<RecordingListener>, GroupId)> {
    init_log();
    let sender = Arc::new(RecordingSender::default());
    let transport = secured_transport(sender.clone())?;
    let listener = Arc::new(RecordingListener::default());
    let id = transport.add_outgoing_group(
        OutgoingSourceGroup::new(MediaType::Video, MEDIA, rtx, 0)
            .with_listener(listener.clone() as Arc<dyn StreamListener>),
    )?;
    Ok((transport, sender, listener, id))
}

fn transport_seq(packet: &rtp::Packet) -> Option<u16> {
    packet
        .header
        .get_extension(TRANSPORT_CC_ID)
        .map(|b| u16::from_be_bytes([b[0], b[1]]))
}

#[test]
fn test_send_encrypts_for_active_candidate() -> Result<()> {
    let (transport, sender, _, id) = sending_transport(RTX)?;
    let mut peer = Peer::new()?;
    let now = Instant::now();

    transport.send(vp8(100, b"frame-a"), now)?;
    transport.send(vp8(101, b"frame-b"), now)?;

    let sent = sender.take();
    assert_eq!(sent.len(), 2);
    for (i, (addr, data)) in sent.iter().enumerate() {
        assert_eq!(*addr, peer_addr());
        let packet = peer.open_rtp(data)?;
        assert_eq!(packet.header.ssrc, MEDIA);
        assert_eq!(packet.header.payload_type, VP8);
        assert_eq!(packet.header.sequence_number, 100 + i as u16);
        assert_eq!(transport_seq(&packet), Some(i as u16));
    }

    assert_eq!(transport.retransmission_buffer_len(id), Some(2));
    let stats = transport.outgoing_source_stats(MEDIA).expect("stats");
    assert_eq!(stats.packets, 2);
    let counters = transport.take_report_counters(MEDIA).expect("counters");
    assert_eq!(counters.packets, 2);
    assert_eq!(transport.take_report_counters(MEDIA).map(|c| c.packets), Some(0));
    Ok(())
}

#[test]
fn test_send_errors() -> Result<()> {
    let (transport, sender, _, _) = sending_transport(RTX)?;
    let now = Instant::now();

    let mut unknown = vp8(1, b"x");
    unknown.ssrc = 42;
    assert_eq!(transport.send(unknown, now), Err(Error::UnknownSsrc(42)));

    let mut unmapped = vp8(1, b"x");
    unmapped.codec = Codec::H264;
    assert_eq!(
        transport.send(unmapped, now),
        Err(Error::UnmappedCodec("h264".to_owned()))
    );

    let mut config = config();
    config.mtu = 200;
    transport.apply_config(&config)?;
    let big = OutgoingPacket {
        payload: Bytes::from(vec![0u8; 300]),
        ..vp8(1, b"")
    };
    assert!(matches!(
        transport.send(big, now),
        Err(Error::PacketExceedsMtu(_, 200))
    ));
    assert!(sender.take().is_empty());
    Ok(())
}

#[test]
fn test_send_dropped_before_crypto() -> Result<()> {
    init_log();
    let sender = Arc::new(RecordingSender::default());
    let transport = SecureTransport::new(Box::new(NoDtls), sender.clone());
    transport.apply_config(&config())?;
    transport.add_remote_candidate(peer_addr(), 100, false, Instant::now());
    let id = transport.add_outgoing_group(OutgoingSourceGroup::new(MediaType::Video, MEDIA, 0, 0))?;

    transport.send(vp8(1, b"x"), Instant::now())?;
    transport.send_pli(77, Instant::now())?;

    assert!(sender.take().is_empty());
    assert_eq!(transport.retransmission_buffer_len(id), Some(0));
    Ok(())
}

#[test]
fn test_dropped_sends_keep_transport_sequence() -> Result<()> {
    init_log();
    let sender = Arc::new(RecordingSender::default());
    let transport = SecureTransport::new(Box::new(NoDtls), sender.clone());
    transport.apply_config(&config())?;
    transport.add_outgoing_group(OutgoingSourceGroup::new(MediaType::Video, MEDIA, 0, 0))?;
    let mut peer = Peer::new()?;
    let now = Instant::now();

    // no candidate, then no crypto
    transport.send(vp8(1, b"x"), now)?;
    transport.add_remote_candidate(peer_addr(), 100, false, now);
    transport.send(vp8(2, b"x"), now)?;
    assert!(sender.take().is_empty());

    transport.set_local_crypto_sdes(SUITE, &LOCAL_KEY)?;
    transport.set_remote_crypto_sdes(SUITE, &REMOTE_KEY)?;
    transport.send(vp8(3, b"x"), now)?;

    let sent = sender.take();
    assert_eq!(sent.len(), 1);
    let packet = peer.open_rtp(&sent[0].1)?;
    assert_eq!(packet.header.sequence_number, 3);
    assert_eq!(transport_seq(&packet), Some(0));
    Ok(())
}

#[test]
fn test_nack_served_on_rtx() -> Result<()> {
    let (transport, sender, _, id) = sending_transport(RTX)?;
    let mut peer = Peer::new()?;
    let now = Instant::now();

    for seq in 100..105 {
        transport.send(vp8(seq, b"payload"), now)?;
    }
    sender.take();

    let later = now + Duration::from_millis(10);
    transport.on_data(peer_addr(), &peer.rtcp(&[nack(102, 0b1)])?, later)?;

    let sent = sender.take();
    assert_eq!(sent.len(), 2);
    for (i, (_, data)) in sent.iter().enumerate() {
        let packet = peer.open_rtp(data)?;
        assert_eq!(packet.header.ssrc, RTX);
        assert_eq!(packet.header.payload_type, VP8_RTX);
        assert_eq!(packet.header.sequence_number, i as u16);
        assert_eq!(transport_seq(&packet), Some(5 + i as u16));

        let original = rtp::rtx::unwrap(&packet, MEDIA, VP8)?;
        assert_eq!(original.header.sequence_number, 102 + i as u16);
        assert_eq!(original.payload, Bytes::from_static(b"payload"));
    }

    assert_eq!(transport.outgoing_source_stats(RTX).map(|s| s.packets), Some(2));
    assert_eq!(transport.retransmission_buffer_len(id), Some(5));
    Ok(())
}

#[test]
fn test_nack_without_rtx_resends_original() -> Result<()> {
    let (transport, sender, _, _) = sending_transport(0)?;
    let mut peer = Peer::new()?;
    let now = Instant::now();

    for seq in 10..13 {
        transport.send(vp8(seq, b"payload"), now)?;
    }
    sender.take();

    transport.on_data(peer_addr(), &peer.rtcp(&[nack(11, 0)])?, now)?;
    let sent = sender.take();
    assert_eq!(sent.len(), 1);
    let packet = peer.open_rtp(&sent[0].1)?;
    assert_eq!(packet.header.ssrc, MEDIA);
    assert_eq!(packet.header.sequence_number, 11);
    assert_eq!(packet.header.payload_type, VP8);
    Ok(())
}

#[test]
fn test_retransmission_over_mtu_is_refused() -> Result<()> {
    let (transport, sender, _, id) = sending_transport(RTX)?;
    let mut peer = Peer::new()?;
    let now = Instant::now();

    let mut config = config();
    config.mtu = 200;
    transport.apply_config(&config)?;

    // 12 byte header, 8 bytes of transport-wide extension, 180 bytes payload
    let full = OutgoingPacket {
        payload: Bytes::from(vec![7u8; 180]),
        ..vp8(1, b"")
    };
    transport.send(full, now)?;
    transport.send(vp8(2, b"small"), now)?;
    let sent = sender.take();
    assert_eq!(sent.len(), 2);
    assert_eq!(peer.open_rtp(&sent[0].1)?.marshal_size(), 200);

    assert_eq!(
        transport.resend(id, 1, now),
        Err(Error::PacketExceedsMtu(202, 200))
    );
    assert!(sender.take().is_empty());
    assert_eq!(transport.outgoing_source_stats(RTX).map(|s| s.packets), Some(0));

    // the oversized entry is skipped and the rest of the nack is served
    transport.on_data(peer_addr(), &peer.rtcp(&[nack(1, 0b1)])?, now)?;
    let sent = sender.take();
    assert_eq!(sent.len(), 1);
    let packet = peer.open_rtp(&sent[0].1)?;
    assert!(packet.marshal_size() <= 200);
    assert_eq!(packet.header.ssrc, RTX);
    assert_eq!(packet.header.sequence_number, 0);
    assert_eq!(transport_seq(&packet), Some(2));
    assert_eq!(rtp::rtx::unwrap(&packet, MEDIA, VP8)?.header.sequence_number, 2);
    Ok(())
}

#[test]
fn test_evicted_packet_requests_key_frame() -> Result<()> {
    let (transport, sender, listener, id) = sending_transport(RTX)?;
    let mut peer = Peer::new()?;
    let start = Instant::now();

    transport.send(vp8(1, b"a"), start)?;
    transport.send(vp8(2, b"b"), start + Duration::from_millis(150))?;
    transport.send(vp8(3, b"c"), start + Duration::from_millis(300))?;
    assert_eq!(transport.retransmission_buffer_len(id), Some(2));
    sender.take();

    let later = start + Duration::from_millis(310);
    transport.on_data(peer_addr(), &peer.rtcp(&[nack(1, 0b1)])?, later)?;

    assert!(sender.take().is_empty());
    assert_eq!(transport.retransmission_buffer_len(id), Some(0));
    let requests = listener.key_frame_requests.lock();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].0.id, id);
    assert_eq!(requests[0].1, MEDIA);
    Ok(())
}

#[test]
fn test_resend_directly() -> Result<()> {
    let (transport, sender, listener, id) = sending_transport(RTX)?;
    let now = Instant::now();

    transport.send(vp8(7, b"a"), now)?;
    sender.take();

    assert!(transport.resend(id, 7, now)?);
    assert_eq!(sender.take().len(), 1);
    assert!(!transport.resend(id, 8, now)?);
    assert!(sender.take().is_empty());
    assert_eq!(listener.key_frame_requests.lock().len(), 1);
    Ok(())
}

#[test]
fn test_key_frame_requests() -> Result<()> {
    let (transport, _, listener, _) = sending_transport(RTX)?;
    let mut peer = Peer::new()?;
    let now = Instant::now();

    let pli = PictureLossIndication {
        sender_ssrc: 1,
        media_ssrc: MEDIA,
    };
    transport.on_data(peer_addr(), &peer.rtcp(&[pli.into()])?, now)?;

    let fir = FullIntraRequest {
        sender_ssrc: 1,
        media_ssrc: 0,
        fir: vec![FirEntry {
            ssrc: MEDIA,
            sequence_number: 1,
        }],
    };
    transport.on_data(peer_addr(), &peer.rtcp(&[fir.into()])?, now)?;

    let unknown = PictureLossIndication {
        sender_ssrc: 1,
        media_ssrc: 31337,
    };
    transport.on_data(peer_addr(), &peer.rtcp(&[unknown.into()])?, now)?;

    let requests = listener.key_frame_requests.lock();
    assert_eq!(requests.len(), 2);
    assert!(requests.iter().all(|(_, ssrc)| *ssrc == MEDIA));
    Ok(())
}

#[test]
fn test_rtcp_reaches_observer() -> Result<()> {
    init_log();
    let sender = Arc::new(RecordingSender::default());
    let observer = Arc::new(RecordingObserver::default());
    let transport = secured_transport(sender)?
        .with_observer(observer.clone() as Arc<dyn RtcpObserver>);
    let mut peer = Peer::new()?;

    let sr = SenderReport {
        ssrc: 9,
        ntp_time: 0x0102_0304_0506_0708,
        rtp_time: 90_000,
        packet_count: 10,
        octet_count: 1000,
        ..Default::default()
    };
    let remb = ReceiverEstimatedMaximumBitrate {
        sender_ssrc: 9,
        bitrate: 1_000_000,
        ssrcs: vec![MEDIA],
    };
    let bye = Goodbye {
        sources: vec![9],
        reason: Bytes::from_static(b"done"),
    };
    let compound = peer.rtcp(&[sr.clone().into(), remb.clone().into(), bye.clone().into()])?;
    transport.on_data(peer_addr(), &compound, Instant::now())?;

    assert_eq!(*observer.sender_reports.lock(), vec![sr]);
    assert_eq!(*observer.remb.lock(), vec![remb]);
    assert_eq!(*observer.goodbyes.lock(), vec![bye]);
    assert!(observer.receiver_reports.lock().is_empty());
    Ok(())
}

#[test]
fn test_send_pli() -> Result<()> {
    let (transport, sender, _, _) = sending_transport(RTX)?;
    let mut peer = Peer::new()?;

    transport.send_pli(4242, Instant::now())?;
    let sent = sender.take();
    assert_eq!(sent.len(), 1);
    let packets = peer.open_rtcp(&sent[0].1)?;
    assert_eq!(
        packets,
        vec![rtcp::Packet::from(PictureLossIndication {
            sender_ssrc: 0,
            media_ssrc: 4242,
        })]
    );
    Ok(())
}

#[test]
fn test_reset_keeps_groups() -> Result<()> {
    let (transport, sender, _, id) = sending_transport(RTX)?;
    transport.set_local_ice_credentials("ufrag", "password");
    transport.reset();

    assert!(!transport.is_secured());
    assert!(transport.local_ice_credentials().is_empty());
    assert_eq!(transport.active_candidate(), None);
    assert_eq!(transport.retransmission_buffer_len(id), Some(0));

    transport.send(vp8(1, b"x"), Instant::now())?;
    assert!(sender.take().is_empty());
    Ok(())
}
