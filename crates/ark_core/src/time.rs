//! Deterministic frame clock
//!
//! Fixed tick rate; every frame advances time by exactly one tick regardless
//! of wall-clock time spent.

use std::time::Duration;

/// Default tick rate (60 Hz = 16.666ms per frame)
pub const DEFAULT_TICK_RATE_HZ: u32 = 60;

/// Frame counter and fixed delta.
#[derive(Debug, Clone)]
pub struct FrameClock {
    tick_rate_hz: u32,
    delta: Duration,
    frame: u64,
    elapsed: Duration,
}

impl FrameClock {
    /// A zero rate is clamped to 1 Hz.
    pub fn new(tick_rate_hz: u32) -> Self {
        let tick_rate_hz = tick_rate_hz.max(1);
        Self {
            tick_rate_hz,
            delta: Duration::from_secs(1) / tick_rate_hz,
            frame: 0,
            elapsed: Duration::ZERO,
        }
    }

    pub fn tick_rate_hz(&self) -> u32 {
        self.tick_rate_hz
    }

    /// Fixed time step per frame.
    pub fn delta(&self) -> Duration {
        self.delta
    }

    pub fn delta_secs(&self) -> f32 {
        self.delta.as_secs_f32()
    }

    /// Frames completed so far.
    pub fn frame(&self) -> u64 {
        self.frame
    }

    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    pub fn advance(&mut self) {
        self.frame += 1;
        self.elapsed += self.delta;
    }
}

impl Default for FrameClock {
    fn default() -> Self {
        Self::new(DEFAULT_TICK_RATE_HZ)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn advance_accumulates_fixed_delta() {
        let mut clock = FrameClock::new(50);
        assert_eq!(clock.delta(), Duration::from_millis(20));
        clock.advance();
        clock.advance();
        assert_eq!(clock.frame(), 2);
        assert_eq!(clock.elapsed(), Duration::from_millis(40));
    }

    #[test]
    fn zero_rate_is_clamped() {
        assert_eq!(FrameClock::new(0).tick_rate_hz(), 1);
    }
}
