//! Per-system dispatch timing

use std::collections::HashMap;
use std::time::{Duration, Instant};

/// Accumulated timings for one system.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchStats {
    pub calls: u64,
    pub total: Duration,
    pub last: Duration,
}

impl DispatchStats {
    pub fn average(&self) -> Duration {
        if self.calls == 0 {
            Duration::ZERO
        } else {
            self.total / self.calls as u32
        }
    }
}

/// Times every dispatch made through it, keyed by system name.
#[derive(Debug, Default)]
pub struct SystemProfiler {
    stats: HashMap<String, DispatchStats>,
}

impl SystemProfiler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn time_system<F, R>(&mut self, name: &str, f: F) -> R
    where
        F: FnOnce() -> R,
    {
        let start = Instant::now();
        let result = f();
        let elapsed = start.elapsed();

        if !self.stats.contains_key(name) {
            self.stats.insert(name.to_string(), DispatchStats::default());
        }
        if let Some(entry) = self.stats.get_mut(name) {
            entry.calls += 1;
            entry.total += elapsed;
            entry.last = elapsed;
        }
        result
    }

    pub fn stats(&self, name: &str) -> DispatchStats {
        self.stats.get(name).copied().unwrap_or_default()
    }

    /// Drop the record of a system that left the manager.
    pub fn forget(&mut self, name: &str) {
        self.stats.remove(name);
    }

    pub fn reset(&mut self) {
        self.stats.clear();
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &DispatchStats)> {
        self.stats.iter().map(|(name, stats)| (name.as_str(), stats))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_calls_per_system() {
        let mut profiler = SystemProfiler::new();
        profiler.time_system("Movement", || ());
        profiler.time_system("Movement", || ());
        profiler.time_system("Render", || ());

        assert_eq!(profiler.stats("Movement").calls, 2);
        assert_eq!(profiler.stats("Render").calls, 1);
        assert_eq!(profiler.stats("Missing"), DispatchStats::default());

        profiler.forget("Movement");
        assert_eq!(profiler.stats("Movement").calls, 0);
    }
}
