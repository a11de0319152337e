use std::time::Instant;

use rtp::sequence::RolloverCounter;

/// Send or receive state of one SSRC.
#[derive(Debug, Default, Clone)]
pub struct Source {
    pub ssrc: u32,
    pub rollover: RolloverCounter,
    pub packets: u64,
    pub bytes: u64,
    pub packets_since_last_report: u32,
    pub bytes_since_last_report: u32,
    pub last_timestamp: u32,
    /// Wall clock time `last_timestamp` was sent or received at.
    pub last_time: Option<Instant>,
}

/// Point in time copy of a [`Source`]'s counters.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub struct SourceStats {
    pub ssrc: u32,
    pub extended_sequence_number: Option<u32>,
    pub cycles: u16,
    pub packets: u64,
    pub bytes: u64,
    pub packets_since_last_report: u32,
    pub bytes_since_last_report: u32,
    pub last_timestamp: u32,
}

/// Counters accumulated since the previous report.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub struct ReportCounters {
    pub packets: u32,
    pub bytes: u32,
}

impl Source {
    pub fn new(ssrc: u32) -> Self {
        Source {
            ssrc,
            ..Default::default()
        }
    }

    /// Counts one packet of `size` bytes carrying `timestamp` at `now`.
    pub fn update(&mut self, size: usize, timestamp: u32, now: Instant) {
        self.packets += 1;
        self.bytes += size as u64;
        self.packets_since_last_report = self.packets_since_last_report.wrapping_add(1);
        self.bytes_since_last_report = self.bytes_since_last_report.wrapping_add(size as u32);
        self.last_timestamp = timestamp;
        self.last_time = Some(now);
    }

    pub fn stats(&self) -> SourceStats {
        SourceStats {
            ssrc: self.ssrc,
            extended_sequence_number: self.rollover.highest(),
            cycles: self.rollover.cycles(),
            packets: self.packets,
            bytes: self.bytes,
            packets_since_last_report: self.packets_since_last_report,
            bytes_since_last_report: self.bytes_since_last_report,
            last_timestamp: self.last_timestamp,
        }
    }

    pub fn take_report_counters(&mut self) -> ReportCounters {
        let counters = ReportCounters {
            packets: self.packets_since_last_report,
            bytes: self.bytes_since_last_report,
        };
        self.packets_since_last_report = 0;
        self.bytes_since_last_report = 0;
        counters
    }

    pub fn reset(&mut self) {
        *self = Source::new(self.ssrc);
    }
}
