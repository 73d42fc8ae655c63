//! Fixed-window sample buffer

use std::time::Duration;

/// Keeps the most recent `window` samples, overwriting the oldest.
pub(crate) struct RingBuffer<T> {
    samples: Vec<T>,
    window: usize,
    cursor: usize,
}

impl<T: Copy> RingBuffer<T> {
    pub(crate) fn new(window: usize) -> Self {
        let window = window.max(1);
        Self {
            samples: Vec::with_capacity(window),
            window,
            cursor: 0,
        }
    }

    pub(crate) fn push(&mut self, sample: T) {
        if self.samples.len() < self.window {
            self.samples.push(sample);
        } else {
            self.samples[self.cursor] = sample;
        }
        self.cursor = (self.cursor + 1) % self.window;
    }
}

impl RingBuffer<Duration> {
    pub(crate) fn average(&self) -> Duration {
        if self.samples.is_empty() {
            return Duration::ZERO;
        }
        self.samples.iter().sum::<Duration>() / self.samples.len() as u32
    }

    pub(crate) fn peak(&self) -> Duration {
        self.samples.iter().copied().max().unwrap_or(Duration::ZERO)
    }
}
