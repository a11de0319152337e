//! Transport-wide congestion control feedback for received packets.

use std::collections::BTreeMap;

use rtcp::transport_feedbacks::transport_layer_cc::TransportLayerCc;
use rtp::sequence::RolloverCounter;
use shared::error::Result;

/// Builds one feedback message per received packet.
///
/// Each message reports the packet itself plus every transport sequence
/// number skipped since the highest one seen before it.
#[derive(Debug, Default, Clone)]
pub struct FeedbackRecorder {
    fb_pkt_count: u8,
    rollover: RolloverCounter,
}

impl FeedbackRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a packet with transport-wide sequence `seq` arriving at
    /// `arrival_us` and returns the feedback reporting it.
    pub fn on_packet(
        &mut self,
        seq: u16,
        arrival_us: i64,
        media_ssrc: u32,
    ) -> Result<TransportLayerCc> {
        let previous = self.rollover.highest();
        let ext = self.rollover.update(seq);

        let mut arrivals = BTreeMap::new();
        if let Some(previous) = previous {
            if ext > previous {
                for missing in previous + 1..ext {
                    arrivals.insert(missing, None);
                }
            }
        }
        arrivals.insert(ext, Some(arrival_us));

        let fb_pkt_count = self.fb_pkt_count;
        self.fb_pkt_count = self.fb_pkt_count.wrapping_add(1);

        TransportLayerCc::from_arrivals(0, media_ssrc, fb_pkt_count, &arrivals)
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
