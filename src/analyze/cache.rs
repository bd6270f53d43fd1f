//! Result cache keyed by trimmed, lower-cased comment text.
//!
//! Absolute TTL (no refresh on hit) and a hard capacity with oldest-inserted
//! eviction. Time comes from an injectable [`Clock`] so expiry is testable
//! without sleeping.
//!
//! Every [`ResultCache::clear`] starts a new generation. Writers that read
//! the generation before scoring use [`ResultCache::put_if_generation`], so a
//! result computed against a lexicon older than the last clear is dropped
//! instead of outliving it.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use metrics::counter;
use tracing::debug;

use super::tokenize::{anon_hash, cache_key};
use crate::metrics::{CACHE_EVICTIONS, CACHE_HITS, CACHE_MISSES};
use crate::sentiment::SentimentResult;

pub const DEFAULT_TTL: Duration = Duration::from_secs(30 * 60);
pub const DEFAULT_CAPACITY: usize = 1000;

/// Monotonic time source.
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Test clock: frozen until advanced.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<Instant>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            now: Mutex::new(Instant::now()),
        }
    }

    pub fn advance(&self, by: Duration) {
        let mut g = self.now.lock().unwrap_or_else(|p| p.into_inner());
        *g += by;
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        *self.now.lock().unwrap_or_else(|p| p.into_inner())
    }
}

#[derive(Debug, Clone)]
struct CacheEntry {
    result: SentimentResult,
    inserted: Instant,
}

#[derive(Debug, Default)]
struct Inner {
    map: HashMap<String, CacheEntry>,
    /// Keys in insertion order; front is the oldest.
    order: VecDeque<String>,
    generation: u64,
}

impl Inner {
    fn remove(&mut self, key: &str) -> Option<CacheEntry> {
        let entry = self.map.remove(key)?;
        if let Some(pos) = self.order.iter().position(|k| k == key) {
            self.order.remove(pos);
        }
        Some(entry)
    }
}

pub struct ResultCache {
    ttl: Duration,
    capacity: usize,
    clock: Arc<dyn Clock>,
    inner: Mutex<Inner>,
}

impl std::fmt::Debug for ResultCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResultCache")
            .field("ttl", &self.ttl)
            .field("capacity", &self.capacity)
            .field("len", &self.len())
            .finish()
    }
}

impl Default for ResultCache {
    fn default() -> Self {
        Self::new(DEFAULT_TTL, DEFAULT_CAPACITY)
    }
}

impl ResultCache {
    pub fn new(ttl: Duration, capacity: usize) -> Self {
        Self::with_clock(ttl, capacity, Arc::new(SystemClock))
    }

    /// Capacity 0 is treated as 1.
    pub fn with_clock(ttl: Duration, capacity: usize, clock: Arc<dyn Clock>) -> Self {
        Self {
            ttl,
            capacity: capacity.max(1),
            clock,
            inner: Mutex::new(Inner::default()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|p| p.into_inner())
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Hit only while younger than the TTL and well-formed; anything else is
    /// evicted and reported as a miss.
    pub fn get(&self, text: &str) -> Option<SentimentResult> {
        let key = cache_key(text);
        let now = self.clock.now();
        let mut g = self.lock();

        let verdict = g.map.get(&key).map(|e| {
            let fresh = now.saturating_duration_since(e.inserted) < self.ttl;
            (fresh && e.result.is_valid(), e.result.clone())
        });

        match verdict {
            Some((true, result)) => {
                counter!(CACHE_HITS).increment(1);
                debug!(target: "sentiment::cache", id = %anon_hash(&key), "cache hit");
                Some(result)
            }
            Some((false, _)) => {
                g.remove(&key);
                counter!(CACHE_EVICTIONS, "reason" => "expired").increment(1);
                counter!(CACHE_MISSES).increment(1);
                debug!(target: "sentiment::cache", id = %anon_hash(&key), "cache entry expired");
                None
            }
            None => {
                counter!(CACHE_MISSES).increment(1);
                debug!(target: "sentiment::cache", id = %anon_hash(&key), "cache miss");
                None
            }
        }
    }

    /// Current generation; read it before taking the lexicon snapshot the
    /// result will be scored against.
    pub fn generation(&self) -> u64 {
        self.lock().generation
    }

    /// Insert with the current timestamp. Re-putting a key moves it to the
    /// back of the eviction order; last writer wins.
    pub fn put(&self, text: &str, result: SentimentResult) {
        let mut g = self.lock();
        self.insert(&mut g, text, result);
    }

    /// [`put`](Self::put) unless the cache was cleared since `generation`
    /// was read. Returns whether the entry was stored.
    pub fn put_if_generation(&self, text: &str, result: SentimentResult, generation: u64) -> bool {
        let mut g = self.lock();
        if g.generation != generation {
            counter!(CACHE_EVICTIONS, "reason" => "stale").increment(1);
            debug!(
                target: "sentiment::cache",
                id = %anon_hash(&cache_key(text)),
                scored_at = generation,
                current = g.generation,
                "dropping result scored before the last clear"
            );
            return false;
        }
        self.insert(&mut g, text, result);
        true
    }

    fn insert(&self, g: &mut Inner, text: &str, result: SentimentResult) {
        let key = cache_key(text);
        let inserted = self.clock.now();

        g.remove(&key);
        while g.map.len() >= self.capacity {
            let Some(oldest) = g.order.pop_front() else {
                break;
            };
            g.map.remove(&oldest);
            counter!(CACHE_EVICTIONS, "reason" => "capacity").increment(1);
        }
        g.order.push_back(key.clone());
        g.map.insert(key, CacheEntry { result, inserted });
    }

    pub fn len(&self) -> usize {
        self.lock().map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every entry and start a new generation.
    pub fn clear(&self) {
        let mut g = self.lock();
        g.map.clear();
        g.order.clear();
        g.generation = g.generation.wrapping_add(1);
    }
}
