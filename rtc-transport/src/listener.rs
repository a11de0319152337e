//! Callbacks from the transport to the application layer.

use rtcp::{
    goodbye::Goodbye,
    payload_feedbacks::receiver_estimated_maximum_bitrate::ReceiverEstimatedMaximumBitrate,
    receiver_report::ReceiverReport,
    sender_report::SenderReport,
    transport_feedbacks::{
        temporary_maximum_bitrate::TemporaryMaximumBitrate, transport_layer_cc::TransportLayerCc,
    },
};

use crate::group::GroupInfo;
use crate::packet::ReceivedPacket;

/// Implemented by the owner of a source group.
pub trait StreamListener: Send + Sync {
    fn on_rtp(&self, group: &GroupInfo, packet: &ReceivedPacket);

    /// The remote side asked for a key frame on `ssrc`, or a retransmission
    /// could not be served.
    fn on_full_intra_request(&self, group: &GroupInfo, ssrc: u32);
}

/// Receives RTCP the transport parses but does not act on.
pub trait RtcpObserver: Send + Sync {
    fn on_sender_report(&self, _report: &SenderReport) {}
    fn on_receiver_report(&self, _report: &ReceiverReport) {}
    fn on_tmmb(&self, _tmmb: &TemporaryMaximumBitrate) {}
    fn on_transport_feedback(&self, _feedback: &TransportLayerCc) {}
    fn on_remb(&self, _remb: &ReceiverEstimatedMaximumBitrate) {}
    fn on_goodbye(&self, _goodbye: &Goodbye) {}
}

/// Events emitted by the transport handler.
#[derive(Debug, Clone, PartialEq)]
pub enum TransportEvent {
    FullIntraRequest { group: GroupInfo, ssrc: u32 },
    SenderReport(SenderReport),
    ReceiverReport(ReceiverReport),
    Tmmb(TemporaryMaximumBitrate),
    TransportFeedback(TransportLayerCc),
    Remb(ReceiverEstimatedMaximumBitrate),
    Goodbye(Goodbye),
}

impl TransportEvent {
    /// Hands an RTCP event to `observer`. Returns false for events that are
    /// not meant for it.
    pub fn notify(&self, observer: &dyn RtcpObserver) -> bool {
        match self {
            TransportEvent::SenderReport(sr) => observer.on_sender_report(sr),
            TransportEvent::ReceiverReport(rr) => observer.on_receiver_report(rr),
            TransportEvent::Tmmb(tmmb) => observer.on_tmmb(tmmb),
            TransportEvent::TransportFeedback(cc) => observer.on_transport_feedback(cc),
            TransportEvent::Remb(remb) => observer.on_remb(remb),
            TransportEvent::Goodbye(bye) => observer.on_goodbye(bye),
            TransportEvent::FullIntraRequest { .. } => return false,
        }
        true
    }
}
