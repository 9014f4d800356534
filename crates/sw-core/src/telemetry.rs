//! Per-query latency telemetry.
//!
//! Each thread accumulates counts locally and folds them into the shared
//! counters every `flush_every` queries, so the hot path touches no shared
//! cache line in the common case. Snapshots are therefore eventually
//! consistent: up to `flush_every - 1` queries per thread may be pending.

use std::cell::RefCell;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::{Duration, Instant};

use crate::types::PerformanceStats;

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

#[derive(Debug, Default)]
struct Counters {
    query_count: AtomicU64,
    total_time_ns: AtomicU64,
}

impl Counters {
    fn publish(&self, count: u64, nanos: u64) {
        self.query_count.fetch_add(count, Ordering::Relaxed);
        self.total_time_ns.fetch_add(nanos, Ordering::Relaxed);
    }
}

/// Pending counts of one instance on one thread.
#[derive(Debug)]
struct LocalStats {
    counters: Weak<Counters>,
    count: u64,
    nanos: u64,
}

impl LocalStats {
    fn is_orphaned(&self) -> bool {
        self.counters.strong_count() == 0
    }
}

thread_local! {
    // Keyed by telemetry instance so filters never mix their counts.
    // Entries whose instance is gone are pruned when a new key is added.
    static LOCAL: RefCell<HashMap<u64, LocalStats>> = RefCell::new(HashMap::new());
}

#[derive(Debug)]
pub struct Telemetry {
    id: u64,
    enabled: bool,
    flush_every: u64,
    counters: Arc<Counters>,
}

impl Telemetry {
    pub fn new(enabled: bool, flush_every: u64) -> Self {
        Self {
            id: NEXT_ID.fetch_add(1, Ordering::Relaxed),
            enabled,
            flush_every: flush_every.max(1),
            counters: Arc::new(Counters::default()),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Start timing a query; the elapsed time is recorded when the guard drops.
    #[inline]
    pub fn start(&self) -> QueryTimer<'_> {
        QueryTimer {
            telemetry: self,
            start: self.enabled.then(Instant::now),
        }
    }

    pub fn record(&self, elapsed: Duration) {
        if !self.enabled {
            return;
        }
        let nanos = u64::try_from(elapsed.as_nanos()).unwrap_or(u64::MAX);
        let pending = LOCAL.try_with(|local| {
            let mut local = local.borrow_mut();
            if !local.contains_key(&self.id) {
                local.retain(|_, stats| !stats.is_orphaned());
            }
            let stats = local.entry(self.id).or_insert_with(|| LocalStats {
                counters: Arc::downgrade(&self.counters),
                count: 0,
                nanos: 0,
            });
            stats.count += 1;
            stats.nanos = stats.nanos.saturating_add(nanos);
            if stats.count >= self.flush_every {
                let pending = (stats.count, stats.nanos);
                stats.count = 0;
                stats.nanos = 0;
                Some(pending)
            } else {
                None
            }
        });
        if let Ok(Some((count, nanos))) = pending {
            self.counters.publish(count, nanos);
        }
    }

    /// Push the calling thread's pending counts into the shared totals.
    pub fn flush_current_thread(&self) {
        let pending = LOCAL.try_with(|local| local.borrow_mut().remove(&self.id));
        if let Ok(Some(stats)) = pending {
            self.counters.publish(stats.count, stats.nanos);
        }
    }

    pub fn snapshot(&self) -> PerformanceStats {
        PerformanceStats::new(
            self.counters.query_count.load(Ordering::Relaxed),
            self.counters.total_time_ns.load(Ordering::Relaxed),
        )
    }
}

impl Drop for Telemetry {
    fn drop(&mut self) {
        let _ = LOCAL.try_with(|local| local.borrow_mut().remove(&self.id));
    }
}

/// Drop guard returned by [`Telemetry::start`].
pub struct QueryTimer<'a> {
    telemetry: &'a Telemetry,
    start: Option<Instant>,
}

impl Drop for QueryTimer<'_> {
    fn drop(&mut self) {
        if let Some(start) = self.start {
            self.telemetry.record(start.elapsed());
        }
    }
}
