//! Sliding window loss detection over extended sequence numbers.

use std::time::Instant;

use rtcp::transport_feedbacks::transport_layer_nack::{NackPair, nack_pairs_from_sequence_numbers};

pub const DEFAULT_CAPACITY: usize = 1024;

/// Tracks packet arrivals in a fixed window of extended sequence numbers.
///
/// Slots are indexed by `seq % capacity`. The window spans `first` to
/// `first + len - 1`; the newest packet always sits in the last valid slot,
/// and every slot outside the window is empty.
#[derive(Debug, Clone)]
pub struct LossTracker {
    arrivals: Vec<Option<Instant>>,
    first: u32,
    len: usize,
    started: bool,
}

impl Default for LossTracker {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl LossTracker {
    pub fn new(capacity: usize) -> Self {
        LossTracker {
            arrivals: vec![None; capacity.max(1)],
            first: 0,
            len: 0,
            started: false,
        }
    }

    pub fn capacity(&self) -> usize {
        self.arrivals.len()
    }

    /// Lowest tracked extended sequence number.
    pub fn first(&self) -> u32 {
        self.first
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Records the arrival of `seq` and returns how many packets this arrival
    /// newly revealed as lost. Packets older than the window are ignored.
    pub fn add_packet(&mut self, seq: u32, arrival: Instant) -> usize {
        let cap = self.capacity();

        if !self.started {
            self.started = true;
            self.first = seq;
            self.len = 0;
        }
        if seq < self.first {
            return 0;
        }

        let mut pos = (seq - self.first) as usize;
        if pos >= cap {
            let shift = (pos + 1 - cap).min(cap);
            for i in 0..shift {
                let slot = self.slot(self.first.wrapping_add(i as u32));
                self.arrivals[slot] = None;
            }
            self.first = seq + 1 - cap as u32;
            self.len = self.len.saturating_sub(pos + 1 - cap);
            pos = cap - 1;
        }

        let mut lost = 0;
        if pos >= self.len {
            let mut i = pos;
            while i > 0 && self.arrivals[self.slot(self.first + i as u32 - 1)].is_none() {
                lost += 1;
                i -= 1;
            }
            self.len = pos + 1;
        }

        let slot = self.slot(seq);
        self.arrivals[slot] = Some(arrival);

        lost
    }

    pub fn arrival(&self, seq: u32) -> Option<Instant> {
        if seq < self.first || (seq - self.first) as usize >= self.len {
            return None;
        }
        self.arrivals[self.slot(seq)]
    }

    /// Extended sequence numbers inside the window that never arrived.
    pub fn missing(&self) -> Vec<u32> {
        (0..self.len as u32)
            .map(|i| self.first + i)
            .filter(|seq| self.arrivals[self.slot(*seq)].is_none())
            .collect()
    }

    /// NACK fields covering every missing packet in the window.
    pub fn get_nacks(&self) -> Vec<NackPair> {
        let missing: Vec<u16> = self.missing().into_iter().map(|seq| seq as u16).collect();
        nack_pairs_from_sequence_numbers(&missing)
    }

    pub fn reset(&mut self) {
        self.arrivals.iter_mut().for_each(|a| *a = None);
        self.first = 0;
        self.len = 0;
        self.started = false;
    }

    fn slot(&self, seq: u32) -> usize {
        seq as usize % self.arrivals.len()
    }
}
