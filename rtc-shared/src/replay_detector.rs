/// Detects replayed packets with a sliding bitmask window over a monotonically
/// increasing index (the SRTP packet index or the SRTCP index).
///
/// `check` is called before authentication and `accept` only after the packet
/// has been verified, so a forged packet never moves the window.
#[derive(Debug, Clone)]
pub struct SlidingWindowDetector {
    window_size: u64,
    max_seq: u64,
    latest_seq: u64,
    mask: u64,
    initialized: bool,
    pending: Option<u64>,
}

/// Largest window representable by the bitmask.
pub const MAX_WINDOW_SIZE: usize = 64;

impl SlidingWindowDetector {
    /// Creates a detector for indices in `0..=max_seq`. The window is clamped
    /// to [`MAX_WINDOW_SIZE`].
    pub fn new(window_size: usize, max_seq: u64) -> Self {
        Self {
            window_size: window_size.clamp(1, MAX_WINDOW_SIZE) as u64,
            max_seq,
            latest_seq: 0,
            mask: 0,
            initialized: false,
            pending: None,
        }
    }

    /// Returns false if `seq` was already accepted or is too old to tell.
    pub fn check(&mut self, seq: u64) -> bool {
        self.pending = None;

        if seq > self.max_seq {
            return false;
        }

        if !self.initialized || seq > self.latest_seq {
            self.pending = Some(seq);
            return true;
        }

        let diff = self.latest_seq - seq;
        if diff >= self.window_size {
            return false;
        }
        if self.mask & (1 << diff) != 0 {
            return false;
        }

        self.pending = Some(seq);
        true
    }

    /// Records the index passed to the last successful `check`.
    pub fn accept(&mut self) {
        let Some(seq) = self.pending.take() else {
            return;
        };

        if !self.initialized {
            self.initialized = true;
            self.latest_seq = seq;
            self.mask = 1;
            return;
        }

        if seq > self.latest_seq {
            let shift = seq - self.latest_seq;
            self.mask = if shift >= 64 { 0 } else { self.mask << shift };
            self.mask |= 1;
            self.latest_seq = seq;
        } else {
            self.mask |= 1 << (self.latest_seq - seq);
        }
    }

    /// Highest index accepted so far.
    pub fn latest(&self) -> Option<u64> {
        self.initialized.then_some(self.latest_seq)
    }
}
