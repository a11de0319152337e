//! Wall clock and NTP timestamps for packet times taken from [`Instant`].

use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

/// Seconds between the NTP epoch (1900) and the unix epoch (1970).
pub const NTP_UNIX_OFFSET_SECS: u64 = 2_208_988_800;

const NANOS_PER_SEC: u64 = 1_000_000_000;

/// Converts a time since the unix epoch to a 32.32 fixed point NTP
/// timestamp.
pub fn unix_to_ntp(since_unix_epoch: Duration) -> u64 {
    let secs = since_unix_epoch.as_secs() + NTP_UNIX_OFFSET_SECS;
    let frac = ((since_unix_epoch.subsec_nanos() as u64) << 32) / NANOS_PER_SEC;
    secs << 32 | frac
}

/// Converts an NTP timestamp back to a time since the unix epoch. Returns
/// `None` for timestamps before 1970.
pub fn ntp_to_unix(ntp: u64) -> Option<Duration> {
    let secs = (ntp >> 32).checked_sub(NTP_UNIX_OFFSET_SECS)?;
    let nanos = ((ntp & 0xFFFF_FFFF) * NANOS_PER_SEC) >> 32;
    Some(Duration::new(secs, nanos as u32))
}

/// Pairs a monotonic [`Instant`] with the wall clock read at the same time.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SystemInstant {
    instant: Instant,
    since_unix_epoch: Duration,
}

impl SystemInstant {
    pub fn now() -> Self {
        SystemInstant {
            instant: Instant::now(),
            since_unix_epoch: SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .unwrap_or_default(),
        }
    }

    /// Wall clock time of `now`, as time since the unix epoch.
    pub fn unix(&self, now: Instant) -> Duration {
        match now.checked_duration_since(self.instant) {
            Some(after) => self.since_unix_epoch + after,
            None => self
                .since_unix_epoch
                .saturating_sub(self.instant.duration_since(now)),
        }
    }

    pub fn ntp(&self, now: Instant) -> u64 {
        unix_to_ntp(self.unix(now))
    }
}
