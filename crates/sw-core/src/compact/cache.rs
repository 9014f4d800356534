//! Bounded transition cache.
//!
//! Memoizes failure-resolved transitions as `(state, code) -> state`. The key
//! space is split over independently locked shards so concurrent readers
//! rarely contend. Each shard evicts its oldest entry once full. Two threads
//! racing to fill the same key store the same answer.

use std::collections::{HashMap, VecDeque};
use std::sync::{PoisonError, RwLock};

use crate::types::{Code, StateId};

const SHARDS: usize = 16;

#[derive(Debug, Default)]
struct Shard {
    entries: HashMap<u64, StateId>,
    order: VecDeque<u64>,
}

#[derive(Debug)]
pub struct TransitionCache {
    shards: Vec<RwLock<Shard>>,
    shard_capacity: usize,
}

#[inline]
fn key(state: StateId, code: Code) -> u64 {
    (u64::from(state) << 16) | u64::from(code)
}

impl TransitionCache {
    /// A cache holding about `capacity` entries; 0 disables it.
    pub fn new(capacity: usize) -> Self {
        let shard_capacity = if capacity == 0 {
            0
        } else {
            capacity.div_ceil(SHARDS)
        };
        Self {
            shards: (0..SHARDS).map(|_| RwLock::new(Shard::default())).collect(),
            shard_capacity,
        }
    }

    #[inline]
    fn shard(&self, key: u64) -> &RwLock<Shard> {
        // Spread consecutive states across shards
        let mixed = key ^ (key >> 16) ^ (key >> 29);
        &self.shards[(mixed as usize) % SHARDS]
    }

    pub fn get(&self, state: StateId, code: Code) -> Option<StateId> {
        if self.shard_capacity == 0 {
            return None;
        }
        let key = key(state, code);
        let shard = self.shard(key).read().unwrap_or_else(PoisonError::into_inner);
        shard.entries.get(&key).copied()
    }

    pub fn insert(&self, state: StateId, code: Code, target: StateId) {
        if self.shard_capacity == 0 {
            return;
        }
        let key = key(state, code);
        let mut shard = self.shard(key).write().unwrap_or_else(PoisonError::into_inner);
        if shard.entries.contains_key(&key) {
            return;
        }
        if shard.entries.len() >= self.shard_capacity {
            // Evict oldest
            if let Some(oldest) = shard.order.pop_front() {
                shard.entries.remove(&oldest);
            }
        }
        shard.order.push_back(key);
        shard.entries.insert(key, target);
    }

    pub fn clear(&self) {
        for lock in &self.shards {
            let mut shard = lock.write().unwrap_or_else(PoisonError::into_inner);
            shard.entries.clear();
            shard.order.clear();
        }
    }

    pub fn len(&self) -> usize {
        self.shards
            .iter()
            .map(|lock| lock.read().unwrap_or_else(PoisonError::into_inner).entries.len())
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Upper bound on entries across all shards.
    pub fn capacity(&self) -> usize {
        self.shard_capacity * SHARDS
    }
}
