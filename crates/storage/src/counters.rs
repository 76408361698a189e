//! Shared named counters
//!
//! Sessions accumulate counter deltas privately; finalizers apply them
//! here on commit.

use dashmap::DashMap;
use std::collections::BTreeMap;

/// Concurrent map of named `i64` counters
#[derive(Debug, Default)]
pub struct CounterRepository {
    counters: DashMap<String, i64>,
}

impl CounterRepository {
    /// Empty repository
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `delta` to `name` and return the new value
    pub fn adjust(&self, name: &str, delta: i64) -> i64 {
        let mut entry = self.counters.entry(name.to_string()).or_insert(0);
        *entry += delta;
        *entry
    }

    /// Current value of `name` (zero if never adjusted)
    pub fn get(&self, name: &str) -> i64 {
        self.counters.get(name).map(|v| *v).unwrap_or(0)
    }

    /// Sorted copy of every counter
    pub fn snapshot(&self) -> BTreeMap<String, i64> {
        self.counters
            .iter()
            .map(|entry| (entry.key().clone(), *entry.value()))
            .collect()
    }
}
