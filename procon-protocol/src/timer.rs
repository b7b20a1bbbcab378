use std::time::Instant;

/// Counter ticks per elapsed microsecond, expressed as a divisor: the host
/// expects 4 ticks per millisecond.
const MICROS_PER_TICK: u128 = 250;

/// 8-bit report timer driven by wall-clock deltas. It never fails, it only
/// wraps.
#[derive(Debug, Clone, Default)]
pub struct TimingCounter {
    counter: u8,
    last_sample: Option<Instant>,
}

impl TimingCounter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn value(&self) -> u8 {
        self.counter
    }

    pub fn tick(&mut self) -> u8 {
        self.tick_at(Instant::now())
    }

    /// Advances the counter to `now`. The first sample only records the
    /// timestamp and yields 0.
    pub fn tick_at(&mut self, now: Instant) -> u8 {
        let Some(last) = self.last_sample.replace(now) else {
            return 0;
        };

        let elapsed_ticks = now.saturating_duration_since(last).as_micros() / MICROS_PER_TICK;
        self.counter = self.counter.wrapping_add((elapsed_ticks % 256) as u8);
        self.counter
    }
}
