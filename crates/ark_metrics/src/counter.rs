//! Named counters for structural ECS events

use std::collections::BTreeMap;

/// Monotonic counters keyed by static names such as `"components.inserted"`.
///
/// Backed by a `BTreeMap` so snapshots come out in a stable order.
#[derive(Debug, Default)]
pub struct Counter {
    counters: BTreeMap<&'static str, u64>,
}

impl Counter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn increment(&mut self, name: &'static str, by: u64) {
        *self.counters.entry(name).or_insert(0) += by;
    }

    pub fn get(&self, name: &str) -> u64 {
        self.counters.get(name).copied().unwrap_or(0)
    }

    pub fn reset_all(&mut self) {
        self.counters.clear();
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'static str, u64)> + '_ {
        self.counters.iter().map(|(name, value)| (*name, *value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_is_sorted_by_name() {
        let mut counter = Counter::new();
        counter.increment("entities.spawned", 2);
        counter.increment("components.inserted", 5);
        counter.increment("entities.spawned", 1);

        let snapshot: Vec<_> = counter.iter().collect();
        assert_eq!(
            snapshot,
            vec![("components.inserted", 5), ("entities.spawned", 3)]
        );
    }
}
