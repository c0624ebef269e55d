//! Shared cache of built mortality vectors
//!
//! Valuations running concurrently (one per request in a server, or one per
//! shock in a sensitivity sweep) read the same handful of tables. The cache
//! holds `Arc<MortalityVector>` values keyed by table, gender and aggravation,
//! bounded in size and age. It is owned by whoever builds the engine and
//! injected into it; there is no process-wide table store.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::RwLock;

use super::mortality::MortalityVector;
use super::MortalityProvider;
use crate::config::CacheSettings;
use crate::error::EngineResult;
use crate::participant::Gender;

/// Structural cache key; aggravation is held in basis points so it hashes exactly
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MortalityKey {
    pub code: String,
    pub gender: Gender,
    pub aggravation_bp: i64,
}

impl MortalityKey {
    pub fn new(code: &str, gender: Gender, aggravation_pct: f64) -> Self {
        Self {
            code: code.to_string(),
            gender,
            aggravation_bp: (aggravation_pct * 100.0).round() as i64,
        }
    }
}

struct CachedVector {
    vector: Arc<MortalityVector>,
    inserted_at: Instant,
}

/// Bounded, TTL-expiring cache in front of any [`MortalityProvider`]
pub struct MortalityCache<P> {
    inner: P,
    entries: RwLock<HashMap<MortalityKey, CachedVector>>,
    capacity: usize,
    ttl: Duration,
    hits: AtomicU64,
    misses: AtomicU64,
    evictions: AtomicU64,
}

impl<P: MortalityProvider> MortalityCache<P> {
    /// Create a cache with explicit bounds
    pub fn new(inner: P, capacity: usize, ttl: Duration) -> Self {
        Self {
            inner,
            entries: RwLock::new(HashMap::new()),
            capacity: capacity.max(1),
            ttl,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            evictions: AtomicU64::new(0),
        }
    }

    /// Create a cache from configuration
    pub fn with_settings(inner: P, settings: &CacheSettings) -> Self {
        Self::new(inner, settings.capacity, Duration::from_secs(settings.ttl_secs))
    }

    /// Underlying provider
    pub fn inner(&self) -> &P {
        &self.inner
    }

    /// Number of live entries
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Drop every entry and reset statistics
    pub fn clear(&self) {
        self.entries.write().clear();
        self.hits.store(0, Ordering::Relaxed);
        self.misses.store(0, Ordering::Relaxed);
        self.evictions.store(0, Ordering::Relaxed);
    }

    /// Remove expired entries
    pub fn purge_expired(&self) {
        let ttl = self.ttl;
        let mut entries = self.entries.write();
        let before = entries.len();
        entries.retain(|_, v| v.inserted_at.elapsed() <= ttl);
        let removed = before - entries.len();
        if removed > 0 {
            self.evictions.fetch_add(removed as u64, Ordering::Relaxed);
        }
    }

    /// (hits, misses, evictions)
    pub fn stats(&self) -> (u64, u64, u64) {
        (
            self.hits.load(Ordering::Relaxed),
            self.misses.load(Ordering::Relaxed),
            self.evictions.load(Ordering::Relaxed),
        )
    }

    /// Cache hit rate
    pub fn hit_rate(&self) -> f64 {
        let (hits, misses, _) = self.stats();
        let total = hits + misses;
        if total == 0 {
            0.0
        } else {
            hits as f64 / total as f64
        }
    }

    fn lookup(&self, key: &MortalityKey) -> Option<Arc<MortalityVector>> {
        let entries = self.entries.read();
        entries
            .get(key)
            .filter(|entry| entry.inserted_at.elapsed() <= self.ttl)
            .map(|entry| Arc::clone(&entry.vector))
    }

    fn store(&self, key: MortalityKey, vector: Arc<MortalityVector>) {
        let mut entries = self.entries.write();
        entries.insert(
            key,
            CachedVector {
                vector,
                inserted_at: Instant::now(),
            },
        );

        while entries.len() > self.capacity {
            let oldest = entries
                .iter()
                .min_by_key(|(_, v)| v.inserted_at)
                .map(|(k, _)| k.clone());
            match oldest {
                Some(k) => {
                    entries.remove(&k);
                    self.evictions.fetch_add(1, Ordering::Relaxed);
                }
                None => break,
            }
        }
    }
}

impl<P: MortalityProvider> MortalityProvider for MortalityCache<P> {
    fn get_table(&self, code: &str, gender: Gender, aggravation: f64) -> EngineResult<Arc<MortalityVector>> {
        let key = MortalityKey::new(code, gender, aggravation);

        if let Some(vector) = self.lookup(&key) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            return Ok(vector);
        }

        self.misses.fetch_add(1, Ordering::Relaxed);
        let vector = self.inner.get_table(code, gender, aggravation)?;
        log::debug!("Built mortality vector {} {:?} aggravation {}%", code, gender, aggravation);
        self.store(key, Arc::clone(&vector));
        Ok(vector)
    }

    fn available_tables(&self) -> Vec<String> {
        self.inner.available_tables()
    }
}
