//! Ark Metrics - instrumentation for the ECS dispatch loop
//!
//! Everything here is gated behind the `metrics` feature. With the feature
//! off, every type collapses to an empty stub with the same API so call
//! sites in `ark_core` and `ark_runtime` never need their own `cfg`s.
//!
//! # Feature Flags
//!
//! - `metrics` - Enable collection (default: disabled)
//!
//! # Usage
//!
//! ```ignore
//! use ark_metrics::{FrameTimer, SystemProfiler};
//!
//! let mut profiler = SystemProfiler::new();
//! profiler.time_system("MovementSystem", || movement.update());
//!
//! let mut frames = FrameTimer::new(120);
//! frames.begin();
//! scene.frame();
//! frames.end();
//! println!("avg frame: {:.2}ms", frames.frame_time_ms());
//! ```

#[cfg(feature = "metrics")]
mod counter;
#[cfg(feature = "metrics")]
mod frame_timer;
#[cfg(feature = "metrics")]
mod ring_buffer;
#[cfg(feature = "metrics")]
mod system_profiler;

#[cfg(feature = "metrics")]
pub use counter::Counter;
#[cfg(feature = "metrics")]
pub use frame_timer::FrameTimer;
#[cfg(feature = "metrics")]
pub use system_profiler::{DispatchStats, SystemProfiler};

// ============================================================================
// No-op stubs when metrics disabled
// ============================================================================

#[cfg(not(feature = "metrics"))]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchStats {
    pub calls: u64,
    pub total: std::time::Duration,
    pub last: std::time::Duration,
}

#[cfg(not(feature = "metrics"))]
impl DispatchStats {
    pub fn average(&self) -> std::time::Duration { std::time::Duration::ZERO }
}

#[cfg(not(feature = "metrics"))]
#[derive(Debug, Default)]
pub struct SystemProfiler;

#[cfg(not(feature = "metrics"))]
impl SystemProfiler {
    pub fn new() -> Self { Self }
    pub fn time_system<F, R>(&mut self, _name: &str, f: F) -> R where F: FnOnce() -> R { f() }
    pub fn stats(&self, _name: &str) -> DispatchStats { DispatchStats::default() }
    pub fn forget(&mut self, _name: &str) {}
    pub fn reset(&mut self) {}
    pub fn iter(&self) -> impl Iterator<Item = (&str, &DispatchStats)> { std::iter::empty() }
}

#[cfg(not(feature = "metrics"))]
#[derive(Debug, Default)]
pub struct Counter;

#[cfg(not(feature = "metrics"))]
impl Counter {
    pub fn new() -> Self { Self }
    pub fn increment(&mut self, _name: &'static str, _by: u64) {}
    pub fn get(&self, _name: &str) -> u64 { 0 }
    pub fn reset_all(&mut self) {}
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, u64)> + '_ { std::iter::empty() }
}

#[cfg(not(feature = "metrics"))]
pub struct FrameTimer;

#[cfg(not(feature = "metrics"))]
impl FrameTimer {
    pub fn new(_window: usize) -> Self { Self }
    pub fn begin(&mut self) {}
    pub fn end(&mut self) {}
    pub fn frames(&self) -> u64 { 0 }
    pub fn fps(&self) -> f64 { 0.0 }
    pub fn frame_time_ms(&self) -> f64 { 0.0 }
    pub fn peak_frame_time_ms(&self) -> f64 { 0.0 }
}

#[cfg(test)]
mod tests {
    #[test]
    fn stubs_and_real_types_share_an_api() {
        let mut profiler = super::SystemProfiler::new();
        let out = profiler.time_system("noop", || 7);
        assert_eq!(out, 7);

        let stats = profiler.stats("noop");
        assert!(stats.average() <= stats.total);
        assert!(profiler.iter().count() <= 1);

        let mut counter = super::Counter::new();
        counter.increment("entities.spawned", 1);
        assert!(counter.iter().all(|(name, _)| name == "entities.spawned"));

        let mut timer = super::FrameTimer::new(8);
        timer.begin();
        timer.end();
    }
}
