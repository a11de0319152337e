//! Recently sent packets kept for NACK driven retransmission.

use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use rtp::Packet;

pub const MIN_RETENTION: Duration = Duration::from_millis(200);
pub const MAX_RETENTION: Duration = Duration::from_millis(500);

#[derive(Debug, Default, Clone)]
pub struct RetransmissionBuffer {
    packets: BTreeMap<u32, (Instant, Packet)>,
    rtt: Duration,
}

impl RetransmissionBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Packets stay for at least 200 ms, plus twice the round trip time,
    /// never longer than 500 ms.
    pub fn retention(&self) -> Duration {
        (MIN_RETENTION + self.rtt * 2).min(MAX_RETENTION)
    }

    pub fn set_rtt(&mut self, rtt: Duration) {
        self.rtt = rtt;
    }

    pub fn insert(&mut self, extended_sequence_number: u32, sent_at: Instant, packet: Packet) {
        self.packets
            .insert(extended_sequence_number, (sent_at, packet));
    }

    pub fn get(&self, extended_sequence_number: u32) -> Option<&Packet> {
        self.packets
            .get(&extended_sequence_number)
            .map(|(_, packet)| packet)
    }

    /// Drops packets older than the retention window, oldest first, stopping
    /// at the first one still inside it.
    pub fn prune(&mut self, now: Instant) {
        let Some(deadline) = now.checked_sub(self.retention()) else {
            return;
        };
        while let Some(entry) = self.packets.first_entry() {
            if entry.get().0 >= deadline {
                break;
            }
            entry.remove();
        }
    }

    pub fn clear(&mut self) {
        self.packets.clear();
    }

    pub fn len(&self) -> usize {
        self.packets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.packets.is_empty()
    }
}
