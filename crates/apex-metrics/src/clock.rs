//! Monotonic nanosecond clock.
//!
//! Thin wrapper over `quanta`, which reads the TSC where available and
//! calibrates it to wall nanoseconds once per process.

/// Shared nanosecond time source. Cloning is cheap; all clones read the
/// same calibrated counter, so timestamps are comparable across
/// components and threads.
#[derive(Clone)]
pub struct NanoClock {
    clock: quanta::Clock,
}

impl NanoClock {
    pub fn new() -> Self {
        Self {
            clock: quanta::Clock::new(),
        }
    }

    /// Raw counter value (TSC ticks or platform equivalent).
    #[inline(always)]
    pub fn raw(&self) -> u64 {
        self.clock.raw()
    }

    /// Monotonic nanoseconds.
    #[inline(always)]
    pub fn now_ns(&self) -> u64 {
        let raw = self.clock.raw();
        self.clock.delta_as_nanos(0, raw)
    }

    /// Nanoseconds between two raw readings.
    #[inline(always)]
    pub fn delta_as_nanos(&self, start: u64, end: u64) -> u64 {
        self.clock.delta_as_nanos(start, end)
    }
}

impl Default for NanoClock {
    fn default() -> Self {
        Self::new()
    }
}
