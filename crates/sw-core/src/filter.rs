//! Public filter API.
//!
//! [`WordFilter`] is the query and mutation surface shared by both
//! representations. [`SensitiveWordFilter`] is the mutable compact variant;
//! the double-array variant lives in [`optimized`](crate::optimized).

use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard};

use log::{debug, info};
use rayon::prelude::*;

use crate::compact::CompactAutomaton;
use crate::config::FilterConfig;
use crate::error::Result;
use crate::matcher::{self, mask_unit};
use crate::mutation::{MutationHandle, MutationPool};
use crate::telemetry::Telemetry;
use crate::types::{IgnorableSet, PerformanceStats};

// =============================================================================
// Trait
// =============================================================================

/// Multi-pattern filter over a dictionary of forbidden words.
pub trait WordFilter: Send + Sync {
    /// True if any word occurs in `text` once ignorable units are skipped.
    fn contains(&self, text: &str) -> bool;

    /// Every occurrence, in encounter order, duplicates kept.
    fn match_all(&self, text: &str) -> Vec<String>;

    /// `text` with every occurrence overwritten by `mask`, one mask per
    /// UTF-16 code unit.
    fn replace(&self, text: &str, mask: char) -> String;

    /// [`replace`](Self::replace) over many texts in parallel. Output order
    /// follows input order.
    fn batch_replace(&self, texts: &[String], mask: char) -> Vec<String> {
        texts.par_iter().map(|text| self.replace(text, mask)).collect()
    }

    fn add_word(&self, word: &str) -> Result<()>;

    /// Insert a batch, then rebuild failure links once. Words are trimmed
    /// and blank ones ignored.
    fn add_words(&self, words: &[String]) -> Result<()>;

    fn add_word_async(&self, word: &str) -> MutationHandle<()> {
        self.add_words_async(vec![word.to_string()])
    }

    fn add_words_async(&self, words: Vec<String>) -> MutationHandle<()>;

    fn pattern_count(&self) -> usize;

    fn info(&self) -> FilterInfo;

    /// Process-wide query telemetry; see [`flush_stats`](Self::flush_stats).
    fn stats(&self) -> PerformanceStats;

    /// Push the calling thread's pending telemetry.
    fn flush_stats(&self);

    /// Stop the mutation workers. Later async mutations run synchronously.
    fn shutdown(&self);
}

/// Size and shape of a built filter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterInfo {
    pub variant: &'static str,
    pub pattern_count: usize,
    pub state_count: usize,
    pub char_count: usize,
    /// Double-array cells, if applicable
    pub capacity: Option<usize>,
    /// Approximate heap held by the double-array arrays
    pub heap_bytes: Option<usize>,
    pub read_only: bool,
}

pub(crate) fn encode(text: &str) -> Vec<u16> {
    text.encode_utf16().collect()
}

pub(crate) fn clean_words<S: AsRef<str>>(words: &[S]) -> Vec<&str> {
    words
        .iter()
        .map(|w| w.as_ref().trim())
        .filter(|w| !w.is_empty())
        .collect()
}

// =============================================================================
// Compact Filter
// =============================================================================

#[derive(Debug)]
struct CompactState {
    automaton: RwLock<CompactAutomaton>,
    ignorable: IgnorableSet,
    telemetry: Telemetry,
}

impl CompactState {
    fn read(&self) -> RwLockReadGuard<'_, CompactAutomaton> {
        self.automaton.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn add_words<S: AsRef<str>>(&self, words: &[S]) -> Result<()> {
        let words = clean_words(words);
        let mut automaton = self.automaton.write().unwrap_or_else(PoisonError::into_inner);

        let mut first_err = None;
        let mut added = 0;
        for word in &words {
            match automaton.insert(word) {
                Ok(_) => added += 1,
                Err(e) => {
                    first_err.get_or_insert(e);
                }
            }
        }
        automaton.build_failure_links();
        debug!("Added {} of {} words to compact automaton", added, words.len());

        match first_err {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

/// Mutable filter backed by the compact automaton.
///
/// Reads share a read lock; mutations take the write lock and rebuild every
/// failure link.
#[derive(Debug)]
pub struct SensitiveWordFilter {
    state: Arc<CompactState>,
    pool: MutationPool,
}

impl SensitiveWordFilter {
    pub fn new<S: AsRef<str>>(words: &[S], config: &FilterConfig) -> Result<Self> {
        let start = std::time::Instant::now();
        let words = clean_words(words);

        let mut automaton = CompactAutomaton::new(config.max_chars, config.cache_capacity);
        for word in &words {
            automaton.insert(word)?;
        }
        automaton.build_failure_links();

        info!(
            "Built compact automaton: {} patterns, {} states, {} chars in {:?}",
            automaton.pattern_count(),
            automaton.state_count(),
            automaton.char_count(),
            start.elapsed()
        );

        Ok(Self {
            state: Arc::new(CompactState {
                automaton: RwLock::new(automaton),
                ignorable: config.ignorable.clone(),
                telemetry: Telemetry::new(config.telemetry, config.telemetry_flush_every),
            }),
            pool: MutationPool::new(config.pool_workers, config.pool_queue_capacity),
        })
    }

    pub fn state_count(&self) -> usize {
        self.state.read().state_count()
    }

    /// Memoized transitions currently held.
    pub fn cache_len(&self) -> usize {
        self.state.read().cache_len()
    }
}

impl WordFilter for SensitiveWordFilter {
    fn contains(&self, text: &str) -> bool {
        let _timer = self.state.telemetry.start();
        let automaton = self.state.read();
        matcher::contains(&*automaton, &encode(text), &self.state.ignorable)
    }

    fn match_all(&self, text: &str) -> Vec<String> {
        let _timer = self.state.telemetry.start();
        let automaton = self.state.read();
        matcher::match_all(&*automaton, &encode(text))
    }

    fn replace(&self, text: &str, mask: char) -> String {
        let _timer = self.state.telemetry.start();
        let automaton = self.state.read();
        String::from_utf16_lossy(&matcher::replace(&*automaton, &encode(text), mask_unit(mask)))
    }

    fn add_word(&self, word: &str) -> Result<()> {
        self.state.add_words(&[word])
    }

    fn add_words(&self, words: &[String]) -> Result<()> {
        self.state.add_words(words)
    }

    fn add_words_async(&self, words: Vec<String>) -> MutationHandle<()> {
        let state = Arc::clone(&self.state);
        self.pool.submit(move || state.add_words(&words))
    }

    fn pattern_count(&self) -> usize {
        self.state.read().pattern_count()
    }

    fn info(&self) -> FilterInfo {
        let automaton = self.state.read();
        FilterInfo {
            variant: "compact",
            pattern_count: automaton.pattern_count(),
            state_count: automaton.state_count(),
            char_count: automaton.char_count(),
            capacity: None,
            heap_bytes: None,
            read_only: false,
        }
    }

    fn stats(&self) -> PerformanceStats {
        self.state.telemetry.snapshot()
    }

    fn flush_stats(&self) {
        self.state.telemetry.flush_current_thread();
    }

    fn shutdown(&self) {
        self.pool.shutdown();
    }
}
