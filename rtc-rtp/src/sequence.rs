/// Extends 16-bit RTP sequence numbers with a rollover count.
///
/// A wrap is detected when a sequence number below 0x0FFF follows one above
/// 0xF000. Late packets from the previous cycle are resolved against it
/// instead of being pushed into the next one.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub struct RolloverCounter {
    cycles: u16,
    highest: u32,
    started: bool,
}

const WRAP_LOW: u16 = 0x0FFF;
const WRAP_HIGH: u16 = 0xF000;

impl RolloverCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of completed sequence number cycles.
    pub fn cycles(&self) -> u16 {
        self.cycles
    }

    /// Highest extended sequence number seen so far.
    pub fn highest(&self) -> Option<u32> {
        self.started.then_some(self.highest)
    }

    /// Records a sequence number and returns its extended form.
    pub fn update(&mut self, seq: u16) -> u32 {
        if !self.started {
            self.started = true;
            self.highest = seq as u32;
            return self.highest;
        }

        let last = self.highest as u16;
        if seq < WRAP_LOW && last > WRAP_HIGH {
            self.cycles = self.cycles.wrapping_add(1);
        } else if seq > WRAP_HIGH && last < WRAP_LOW && self.cycles > 0 {
            return extend(self.cycles - 1, seq);
        }

        let ext = extend(self.cycles, seq);
        if ext > self.highest {
            self.highest = ext;
        }
        ext
    }

    /// Produces the next sequence number of a locally generated stream,
    /// starting at zero.
    pub fn advance(&mut self) -> u16 {
        let next = if self.started {
            self.highest.wrapping_add(1)
        } else {
            0
        };
        self.started = true;
        self.highest = next;
        self.cycles = (next >> 16) as u16;
        next as u16
    }

    /// Extended form of `seq` closest to the highest sequence number, without
    /// recording it.
    pub fn resolve(&self, seq: u16) -> u32 {
        let highest = self.highest as i64;
        let base = extend(self.cycles, seq) as i64;

        let mut best = base;
        for candidate in [base - 0x1_0000, base + 0x1_0000] {
            if (0..=u32::MAX as i64).contains(&candidate)
                && (candidate - highest).abs() < (best - highest).abs()
            {
                best = candidate;
            }
        }
        best as u32
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Combines a rollover count and a sequence number.
pub const fn extend(cycles: u16, seq: u16) -> u32 {
    (cycles as u32) << 16 | seq as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rollover_in_order() {
        let mut c = RolloverCounter::new();
        assert_eq!(c.highest(), None);
        assert_eq!(c.update(0xFFFD), 0xFFFD);
        assert_eq!(c.update(0xFFFE), 0xFFFE);
        assert_eq!(c.update(0xFFFF), 0xFFFF);
        assert_eq!(c.update(0x0000), 0x1_0000);
        assert_eq!(c.update(0x0001), 0x1_0001);
        assert_eq!(c.cycles(), 1);
        assert_eq!(c.highest(), Some(0x1_0001));
    }

    #[test]
    fn test_rollover_late_packet() {
        let mut c = RolloverCounter::new();
        c.update(0xFFF0);
        assert_eq!(c.update(0x0002), 0x1_0002);
        // reordered packet from before the wrap
        assert_eq!(c.update(0xFFF5), 0xFFF5);
        assert_eq!(c.highest(), Some(0x1_0002));
        assert_eq!(c.update(0x0003), 0x1_0003);
        assert_eq!(c.cycles(), 1);
    }

    #[test]
    fn test_rollover_reordered_same_cycle() {
        let mut c = RolloverCounter::new();
        c.update(100);
        assert_eq!(c.update(98), 98);
        assert_eq!(c.highest(), Some(100));
        assert_eq!(c.update(0x8000), 0x8000);
    }

    #[test]
    fn test_advance() {
        let mut c = RolloverCounter::new();
        assert_eq!(c.advance(), 0);
        assert_eq!(c.advance(), 1);

        let mut c = RolloverCounter::new();
        c.update(0xFFFF);
        assert_eq!(c.advance(), 0);
        assert_eq!(c.cycles(), 1);
        assert_eq!(c.highest(), Some(0x1_0000));
    }

    #[test]
    fn test_resolve() {
        let mut c = RolloverCounter::new();
        c.update(0xFFF0);
        c.update(0x0010);
        assert_eq!(c.resolve(0x0005), 0x1_0005);
        assert_eq!(c.resolve(0xFFF8), 0xFFF8);

        let mut c = RolloverCounter::new();
        c.update(10);
        assert_eq!(c.resolve(0xFFFE), 0xFFFE);
        assert_eq!(c.resolve(3), 3);
    }
}
