//! Bounded in-memory result cache with least-recently-used eviction.
//!
//! Results are immutable once computed, so the cache hands out
//! `Arc<AdaptiveResult>` clones. The cache is an explicit value owned by
//! whoever runs computations; nothing here is global.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::debug;

use adaptrend_core::{AdaptiveResult, Bar, EngineConfig};

/// Identity of a computed result.
///
/// Two requests with equal keys produce identical results: the engine is
/// deterministic in (bars, config), and `data_hash` covers every bar.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub symbol: String,
    pub timeframe: String,
    pub bar_count: usize,
    pub data_hash: String,
    pub config_hash: String,
}

impl CacheKey {
    pub fn new(symbol: &str, timeframe: &str, bars: &[Bar], config: &EngineConfig) -> Self {
        Self {
            symbol: symbol.to_string(),
            timeframe: timeframe.to_string(),
            bar_count: bars.len(),
            data_hash: bars_hash(bars),
            config_hash: config.config_hash(),
        }
    }
}

/// BLAKE3 over every bar's timestamp and prices (hex).
pub fn bars_hash(bars: &[Bar]) -> String {
    let mut hasher = blake3::Hasher::new();
    for bar in bars {
        let ts = bar.timestamp.and_utc();
        hasher.update(&ts.timestamp().to_le_bytes());
        hasher.update(&ts.timestamp_subsec_nanos().to_le_bytes());
        for price in [bar.open, bar.high, bar.low, bar.close] {
            hasher.update(&price.to_le_bytes());
        }
    }
    hasher.finalize().to_hex().to_string()
}

impl std::fmt::Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}/{}/{}/{}/{}",
            self.symbol,
            self.timeframe,
            self.bar_count,
            &self.data_hash[..self.data_hash.len().min(12)],
            &self.config_hash[..self.config_hash.len().min(12)]
        )
    }
}

#[derive(Debug, Default)]
struct Entries {
    map: HashMap<CacheKey, Arc<AdaptiveResult>>,
    /// Least recently used at the front.
    order: VecDeque<CacheKey>,
}

impl Entries {
    fn touch(&mut self, key: &CacheKey) {
        if let Some(pos) = self.order.iter().position(|k| k == key) {
            if let Some(k) = self.order.remove(pos) {
                self.order.push_back(k);
            }
        }
    }
}

/// Cache for adaptive results, bounded to `capacity` entries.
#[derive(Debug)]
pub struct ResultCache {
    capacity: usize,
    entries: Mutex<Entries>,
}

impl ResultCache {
    pub const DEFAULT_CAPACITY: usize = 32;

    /// Creates a cache holding at most `capacity` results (minimum 1).
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            entries: Mutex::new(Entries::default()),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    fn lock(&self) -> MutexGuard<'_, Entries> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Retrieves a result and marks it most recently used.
    pub fn get(&self, key: &CacheKey) -> Option<Arc<AdaptiveResult>> {
        let mut entries = self.lock();
        let hit = entries.map.get(key).cloned();
        if hit.is_some() {
            entries.touch(key);
        }
        hit
    }

    pub fn contains(&self, key: &CacheKey) -> bool {
        self.lock().map.contains_key(key)
    }

    /// Stores a result, evicting the least recently used entry when full.
    ///
    /// Returns the evicted key, if any.
    pub fn put(&self, key: CacheKey, result: Arc<AdaptiveResult>) -> Option<CacheKey> {
        let mut entries = self.lock();
        if entries.map.insert(key.clone(), result).is_some() {
            entries.touch(&key);
            return None;
        }
        entries.order.push_back(key);

        if entries.map.len() <= self.capacity {
            return None;
        }
        let evicted = entries.order.pop_front()?;
        entries.map.remove(&evicted);
        debug!(key = %evicted, "evicted cached result");
        Some(evicted)
    }

    /// Removes a result from the cache.
    pub fn remove(&self, key: &CacheKey) -> Option<Arc<AdaptiveResult>> {
        let mut entries = self.lock();
        let removed = entries.map.remove(key);
        if removed.is_some() {
            entries.order.retain(|k| k != key);
        }
        removed
    }

    pub fn clear(&self) {
        let mut entries = self.lock();
        entries.map.clear();
        entries.order.clear();
    }

    pub fn len(&self) -> usize {
        self.lock().map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for ResultCache {
    fn default() -> Self {
        Self::new(Self::DEFAULT_CAPACITY)
    }
}
