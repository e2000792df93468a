use crate::domain::model::{LookupResult, Source, Stats, TierHits};
use std::collections::{HashMap, VecDeque};

/// Capacity-bounded map with insertion-order (FIFO) eviction.
#[derive(Debug)]
pub struct MemoryCache {
    entries: HashMap<String, LookupResult>,
    order: VecDeque<String>,
    max_size: usize,
}

impl MemoryCache {
    pub fn new(max_size: usize) -> Self {
        Self {
            entries: HashMap::with_capacity(max_size.min(4096)),
            order: VecDeque::with_capacity(max_size.min(4096)),
            max_size,
        }
    }

    pub fn get(&self, key: &str) -> Option<&LookupResult> {
        self.entries.get(key)
    }

    /// Replacing an existing key keeps its original insertion position.
    pub fn put(&mut self, key: String, value: LookupResult) {
        if let Some(slot) = self.entries.get_mut(&key) {
            *slot = value;
            return;
        }
        if self.max_size == 0 {
            return;
        }

        while self.entries.len() >= self.max_size {
            match self.order.pop_front() {
                Some(oldest) => {
                    self.entries.remove(&oldest);
                }
                None => break,
            }
        }

        self.order.push_back(key.clone());
        self.entries.insert(key, value);
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.order.clear();
    }

    pub fn size(&self) -> usize {
        self.entries.len()
    }
}

#[derive(Debug, Default, Clone)]
pub struct Counters {
    pub hits: TierHits,
    pub misses: u64,
    pub errors: u64,
}

impl Counters {
    pub fn record_hit(&mut self, source: Source) {
        match source {
            Source::Memory => self.hits.memory += 1,
            Source::Db => self.hits.db += 1,
            Source::Api => self.hits.api += 1,
            Source::Fallback => self.hits.fallback += 1,
        }
    }

    pub fn hit_rate(&self) -> String {
        let hits = self.hits.total();
        let total = hits + self.misses;
        let rate = if total == 0 {
            0.0
        } else {
            hits as f64 / total as f64 * 100.0
        };
        format!("{:.2}%", rate)
    }
}

/// Shared mutable state of one resolver: guarded by a single mutex so an
/// eviction and its counter updates are observed together.
#[derive(Debug)]
pub struct EngineState {
    pub cache: MemoryCache,
    pub counters: Counters,
}

impl EngineState {
    pub fn new(max_size: usize) -> Self {
        Self {
            cache: MemoryCache::new(max_size),
            counters: Counters::default(),
        }
    }

    pub fn snapshot(&self) -> Stats {
        Stats {
            hits: self.counters.hits.clone(),
            misses: self.counters.misses,
            errors: self.counters.errors,
            cache_size: self.cache.size(),
            hit_rate: self.counters.hit_rate(),
        }
    }
}
