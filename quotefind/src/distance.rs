//! Levenshtein edit distance with a bounded, shareable memo.
//!
//! Word pairs are canonicalized (longer word first) before lookup, so
//! `("ab", "abc")` and `("abc", "ab")` hit the same cache slot.

use parking_lot::Mutex;
use serde::Serialize;
use std::collections::hash_map::RandomState;
use std::collections::{HashMap, VecDeque};
use std::hash::BuildHasher;
use std::sync::Arc;

/// Unit-cost Levenshtein distance over Unicode scalar values (not bytes).
pub fn edit_distance(a: &str, b: &str) -> usize {
    if a == b {
        return 0;
    }

    let a_chars: Vec<char> = a.chars().collect();
    let b_chars: Vec<char> = b.chars().collect();

    // Longer word drives the outer loop, the DP row is only as wide as the shorter one
    let (long, short) = if a_chars.len() >= b_chars.len() {
        (&a_chars, &b_chars)
    } else {
        (&b_chars, &a_chars)
    };
    let n = short.len();
    if n == 0 {
        return long.len();
    }

    let mut prev: Vec<usize> = (0..=n).collect();
    let mut curr = vec![0usize; n + 1];

    for (i, lc) in long.iter().enumerate() {
        curr[0] = i + 1;
        for j in 1..=n {
            let cost = usize::from(*lc != short[j - 1]);
            curr[j] = (prev[j] + 1)
                .min(curr[j - 1] + 1)
                .min(prev[j - 1] + cost);
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[n]
}

/// Cache key: (longer word, shorter word). Equal lengths order lexicographically.
pub type PairKey = (String, String);

pub fn canonical_pair(a: &str, b: &str) -> PairKey {
    let a_key = (a.chars().count(), a);
    let b_key = (b.chars().count(), b);
    if a_key >= b_key {
        (a.to_string(), b.to_string())
    } else {
        (b.to_string(), a.to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub entries: usize,
    pub capacity: usize,
}

#[derive(Debug)]
struct Slot {
    distance: usize,
    stamp: u64,
}

#[derive(Debug, Default)]
struct CacheInner {
    slots: HashMap<PairKey, Slot>,
    /// Recency queue, oldest first. An entry whose stamp differs from its
    /// slot's current stamp is stale and skipped on eviction.
    queue: VecDeque<(PairKey, u64)>,
    clock: u64,
    hits: u64,
    misses: u64,
}

impl CacheInner {
    fn tick(&mut self) -> u64 {
        self.clock += 1;
        self.clock
    }

    fn evict_to(&mut self, capacity: usize) {
        while self.slots.len() > capacity {
            let Some((key, stamp)) = self.queue.pop_front() else {
                break;
            };
            if self.slots.get(&key).map_or(false, |slot| slot.stamp == stamp) {
                self.slots.remove(&key);
            }
        }
    }

    /// Drop stale queue entries once they outnumber live slots
    fn compact(&mut self, capacity: usize) {
        if self.queue.len() <= capacity.saturating_mul(2).max(64) {
            return;
        }
        let mut live: Vec<(PairKey, u64)> = self
            .slots
            .iter()
            .map(|(key, slot)| (key.clone(), slot.stamp))
            .collect();
        live.sort_unstable_by_key(|(_, stamp)| *stamp);
        self.queue = live.into();
    }
}

/// Caches at least this large are split into `SHARD_COUNT` independently locked shards
pub const SHARDED_MIN_CAPACITY: usize = 4_096;
const SHARD_COUNT: usize = 16;

/// Least-recently-used memo of word-pair distances with a fixed entry bound.
///
/// Safe to share between concurrently running queries. Large caches are
/// sharded by key hash so parallel scoring threads rarely contend; recency is
/// then tracked per shard. Eviction only ever costs a recomputation; it never
/// changes a distance.
#[derive(Debug)]
pub struct DistanceCache {
    capacity: usize,
    shard_capacity: usize,
    shards: Box<[Mutex<CacheInner>]>,
    hasher: RandomState,
}

impl DistanceCache {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let shard_count = if capacity >= SHARDED_MIN_CAPACITY { SHARD_COUNT } else { 1 };
        Self {
            capacity,
            shard_capacity: capacity / shard_count,
            shards: (0..shard_count).map(|_| Mutex::new(CacheInner::default())).collect(),
            hasher: RandomState::new(),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn shard_count(&self) -> usize {
        self.shards.len()
    }

    fn shard(&self, key: &PairKey) -> &Mutex<CacheInner> {
        if self.shards.len() == 1 {
            return &self.shards[0];
        }
        let index = self.hasher.hash_one(key) as usize % self.shards.len();
        &self.shards[index]
    }

    pub fn len(&self) -> usize {
        self.shards.iter().map(|shard| shard.lock().slots.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get(&self, key: &PairKey) -> Option<usize> {
        let mut guard = self.shard(key).lock();
        let inner = &mut *guard;
        let stamp = inner.tick();

        let found = match inner.slots.get_mut(key) {
            Some(slot) => {
                slot.stamp = stamp;
                inner.queue.push_back((key.clone(), stamp));
                inner.hits += 1;
                Some(slot.distance)
            }
            None => {
                inner.misses += 1;
                None
            }
        };
        inner.compact(self.shard_capacity);
        found
    }

    pub fn insert(&self, key: PairKey, distance: usize) {
        let mut guard = self.shard(&key).lock();
        let inner = &mut *guard;
        let stamp = inner.tick();

        inner.queue.push_back((key.clone(), stamp));
        inner.slots.insert(key, Slot { distance, stamp });
        inner.evict_to(self.shard_capacity);
        inner.compact(self.shard_capacity);
    }

    pub fn clear(&self) {
        for shard in self.shards.iter() {
            let mut inner = shard.lock();
            inner.slots.clear();
            inner.queue.clear();
        }
    }

    pub fn stats(&self) -> CacheStats {
        let mut stats = CacheStats {
            capacity: self.capacity,
            ..CacheStats::default()
        };
        for shard in self.shards.iter() {
            let inner = shard.lock();
            stats.hits += inner.hits;
            stats.misses += inner.misses;
            stats.entries += inner.slots.len();
        }
        stats
    }
}

/// Memoizing edit-distance front end. Cloning shares the cache.
#[derive(Debug, Clone)]
pub struct EditDistanceComputer {
    cache: Arc<DistanceCache>,
}

impl EditDistanceComputer {
    pub fn new(cache_capacity: usize) -> Self {
        Self::with_cache(Arc::new(DistanceCache::new(cache_capacity)))
    }

    pub fn with_cache(cache: Arc<DistanceCache>) -> Self {
        Self { cache }
    }

    pub fn cache(&self) -> &DistanceCache {
        &self.cache
    }

    pub fn distance(&self, a: &str, b: &str) -> usize {
        if a == b {
            return 0;
        }
        let key = canonical_pair(a, b);
        if let Some(distance) = self.cache.get(&key) {
            return distance;
        }
        // Computed outside the lock; a racing insert of the same pair is harmless
        let distance = edit_distance(&key.0, &key.1);
        self.cache.insert(key, distance);
        distance
    }
}
