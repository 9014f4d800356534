//! Filter configuration.

use crate::codec::DEFAULT_MAX_CHARS;
use crate::types::IgnorableSet;

/// Default bound on memoized transitions (compact variant).
pub const DEFAULT_CACHE_CAPACITY: usize = 10_000;

/// Default number of queries a thread accumulates before flushing telemetry.
pub const DEFAULT_FLUSH_EVERY: u64 = 100;

/// Default asynchronous mutation pool size.
pub const DEFAULT_POOL_WORKERS: usize = 4;

/// Default bound of the asynchronous mutation queue.
pub const DEFAULT_POOL_QUEUE: usize = 1000;

/// Settings shared by both filter variants.
#[derive(Debug, Clone)]
pub struct FilterConfig {
    /// Distinct code units the codec may assign
    pub max_chars: usize,
    /// Memoized transitions kept by the compact variant (0 disables the cache)
    pub cache_capacity: usize,
    /// Units skipped by `contains`
    pub ignorable: IgnorableSet,
    /// Record per-query latency
    pub telemetry: bool,
    /// Per-thread flush threshold for telemetry
    pub telemetry_flush_every: u64,
    /// Worker threads for asynchronous mutation
    pub pool_workers: usize,
    /// Pending asynchronous mutations before callers run their own
    pub pool_queue_capacity: usize,
    /// Freeze the double-array variant right after construction
    pub read_only: bool,
    /// Initial double-array capacity; derived from the dictionary when unset
    pub initial_capacity: Option<usize>,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            max_chars: DEFAULT_MAX_CHARS,
            cache_capacity: DEFAULT_CACHE_CAPACITY,
            ignorable: IgnorableSet::default(),
            telemetry: true,
            telemetry_flush_every: DEFAULT_FLUSH_EVERY,
            pool_workers: DEFAULT_POOL_WORKERS,
            pool_queue_capacity: DEFAULT_POOL_QUEUE,
            read_only: true,
            initial_capacity: None,
        }
    }
}

impl FilterConfig {
    pub fn with_max_chars(mut self, max_chars: usize) -> Self {
        self.max_chars = max_chars;
        self
    }

    pub fn with_cache_capacity(mut self, capacity: usize) -> Self {
        self.cache_capacity = capacity;
        self
    }

    pub fn with_ignorable(mut self, ignorable: IgnorableSet) -> Self {
        self.ignorable = ignorable;
        self
    }

    pub fn with_telemetry(mut self, enabled: bool) -> Self {
        self.telemetry = enabled;
        self
    }

    pub fn with_flush_every(mut self, every: u64) -> Self {
        self.telemetry_flush_every = every.max(1);
        self
    }

    pub fn with_pool(mut self, workers: usize, queue_capacity: usize) -> Self {
        self.pool_workers = workers;
        self.pool_queue_capacity = queue_capacity;
        self
    }

    pub fn with_read_only(mut self, read_only: bool) -> Self {
        self.read_only = read_only;
        self
    }

    pub fn with_initial_capacity(mut self, capacity: usize) -> Self {
        self.initial_capacity = Some(capacity);
        self
    }
}

/// Initial double-array capacity for a dictionary: twice the total unit count
/// plus three slots per word, never below 1024.
pub fn estimate_capacity<S: AsRef<str>>(words: &[S]) -> usize {
    let total_units: usize = words
        .iter()
        .map(|w| w.as_ref().encode_utf16().count())
        .sum();
    (total_units * 2 + words.len() * 3).max(1024)
}
