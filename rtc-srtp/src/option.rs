use shared::replay_detector::SlidingWindowDetector;

/// Largest SRTP packet index (48 bits).
pub const MAX_SRTP_INDEX: u64 = (1 << 48) - 1;
/// Largest SRTCP index (31 bits).
pub const MAX_SRTCP_INDEX: u64 = 0x7FFF_FFFF;

/// ContextOption builds the replay detector of each newly seen SSRC.
pub type ContextOption = Box<dyn Fn() -> Option<SlidingWindowDetector> + Send + Sync>;

/// Enables SRTP replay protection with the given window size.
pub fn srtp_replay_protection(window_size: usize) -> ContextOption {
    Box::new(move || Some(SlidingWindowDetector::new(window_size, MAX_SRTP_INDEX)))
}

/// Enables SRTCP replay protection with the given window size.
pub fn srtcp_replay_protection(window_size: usize) -> ContextOption {
    Box::new(move || Some(SlidingWindowDetector::new(window_size, MAX_SRTCP_INDEX)))
}

/// Disables SRTP replay protection.
pub fn srtp_no_replay_protection() -> ContextOption {
    Box::new(|| None)
}

/// Disables SRTCP replay protection.
pub fn srtcp_no_replay_protection() -> ContextOption {
    Box::new(|| None)
}
