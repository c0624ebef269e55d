//! Per-session memoisation of trial valuations
//!
//! A solve evaluates the full valuation at many trial points, and the
//! acceptance step revisits points already tried. The table lives for one
//! session (one solve or one sweep) and is dropped with it.

use std::collections::HashMap;
use std::hash::Hash;

use super::solver::SolveFor;

/// Structural key for a trial point: the parameter and the exact bits of its value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TrialKey {
    pub parameter: SolveFor,
    pub value_bits: u64,
}

impl TrialKey {
    pub fn new(parameter: SolveFor, value: f64) -> Self {
        // Fold -0.0 into 0.0 so both hash alike
        let value = if value == 0.0 { 0.0 } else { value };
        Self {
            parameter,
            value_bits: value.to_bits(),
        }
    }

    pub fn value(&self) -> f64 {
        f64::from_bits(self.value_bits)
    }
}

/// Bounded memo table with hit/miss statistics
#[derive(Debug)]
pub struct MemoTable<K, V> {
    entries: HashMap<K, V>,
    capacity: usize,

    /// Statistics
    pub hits: u64,
    pub misses: u64,
}

impl<K: Hash + Eq, V: Clone> MemoTable<K, V> {
    /// Create a table holding at most `capacity` entries
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: HashMap::new(),
            capacity: capacity.max(1),
            hits: 0,
            misses: 0,
        }
    }

    /// Cached value for a key
    pub fn get(&mut self, key: &K) -> Option<V> {
        match self.entries.get(key) {
            Some(value) => {
                self.hits += 1;
                Some(value.clone())
            }
            None => {
                self.misses += 1;
                None
            }
        }
    }

    /// Store a value; once full, new keys are not retained
    pub fn insert(&mut self, key: K, value: V) {
        if self.entries.len() < self.capacity || self.entries.contains_key(&key) {
            self.entries.insert(key, value);
        }
    }

    /// Return the cached value or compute and store it
    pub fn get_or_try_insert_with<E, F>(&mut self, key: K, compute: F) -> Result<V, E>
    where
        F: FnOnce() -> Result<V, E>,
    {
        if let Some(value) = self.get(&key) {
            return Ok(value);
        }
        let value = compute()?;
        self.insert(key, value.clone());
        Ok(value)
    }

    /// Clear all entries and statistics
    pub fn clear(&mut self) {
        self.entries.clear();
        self.hits = 0;
        self.misses = 0;
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Cache hit rate
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}
