//! Read-optimized filter over the double-array automaton.
//!
//! The filter starts mutable (reads behind a read lock) and can be frozen
//! once. Freezing moves the automaton into a `OnceLock` so reads take no
//! lock at all; later mutations fail with [`AutomatonError::ReadOnly`].

use std::sync::{Arc, OnceLock, PoisonError, RwLock};

use log::{error, info, warn};

use crate::config::FilterConfig;
use crate::double_array::DoubleArrayTrie;
use crate::error::{AutomatonError, Result};
use crate::filter::{clean_words, encode, FilterInfo, WordFilter};
use crate::matcher::{self, mask_unit};
use crate::mutation::{MutationHandle, MutationPool};
use crate::telemetry::Telemetry;
use crate::types::{IgnorableSet, PerformanceStats};

#[derive(Debug)]
struct DoubleArrayState {
    frozen: OnceLock<DoubleArrayTrie>,
    building: RwLock<Option<DoubleArrayTrie>>,
    ignorable: IgnorableSet,
    telemetry: Telemetry,
}

impl DoubleArrayState {
    fn with_trie<R>(&self, f: impl FnOnce(&DoubleArrayTrie) -> R) -> R {
        if let Some(trie) = self.frozen.get() {
            return f(trie);
        }
        let guard = self.building.read().unwrap_or_else(PoisonError::into_inner);
        if let Some(trie) = guard.as_ref() {
            return f(trie);
        }
        drop(guard);
        // Frozen between the two checks; `freeze` publishes before unlocking
        f(self.frozen.get_or_init(DoubleArrayTrie::default))
    }

    fn add_words<S: AsRef<str>>(&self, words: &[S]) -> Result<()> {
        if self.frozen.get().is_some() {
            warn!("Rejected mutation of {} words: filter is read-only", words.len());
            return Err(AutomatonError::ReadOnly);
        }
        let words = clean_words(words);
        let mut guard = self.building.write().unwrap_or_else(PoisonError::into_inner);
        match guard.as_mut() {
            Some(trie) => trie.insert_all(&words).map(|_| ()),
            None => {
                warn!("Rejected mutation of {} words: filter is read-only", words.len());
                Err(AutomatonError::ReadOnly)
            }
        }
    }

    fn freeze(&self) {
        let mut guard = self.building.write().unwrap_or_else(PoisonError::into_inner);
        if let Some(mut trie) = guard.take() {
            trie.freeze();
            if self.frozen.set(trie).is_err() {
                error!("Double-array filter frozen twice");
            }
        }
    }
}

/// Filter backed by the double-array automaton.
#[derive(Debug)]
pub struct DoubleArrayFilter {
    state: Arc<DoubleArrayState>,
    pool: MutationPool,
}

impl DoubleArrayFilter {
    /// Build over `words`. Frozen right away when `config.read_only` is set.
    pub fn new<S: AsRef<str>>(words: &[S], config: &FilterConfig) -> Result<Self> {
        let words = clean_words(words);
        let trie = DoubleArrayTrie::build(&words, config.max_chars, config.initial_capacity)?;

        let filter = Self {
            state: Arc::new(DoubleArrayState {
                frozen: OnceLock::new(),
                building: RwLock::new(Some(trie)),
                ignorable: config.ignorable.clone(),
                telemetry: Telemetry::new(config.telemetry, config.telemetry_flush_every),
            }),
            pool: MutationPool::new(config.pool_workers, config.pool_queue_capacity),
        };
        if config.read_only {
            filter.freeze();
        }
        Ok(filter)
    }

    /// Make the filter permanently read-only. Reads stop taking a lock.
    pub fn freeze(&self) {
        self.state.freeze();
        info!("Double-array filter is now read-only");
    }

    pub fn is_read_only(&self) -> bool {
        self.state.frozen.get().is_some()
    }

    pub fn capacity(&self) -> usize {
        self.state.with_trie(DoubleArrayTrie::capacity)
    }

    pub fn state_count(&self) -> usize {
        self.state.with_trie(DoubleArrayTrie::state_count)
    }

    pub fn relocations(&self) -> usize {
        self.state.with_trie(DoubleArrayTrie::relocations)
    }

    /// Lookups that hit an out-of-range state index. Stays 0 for a
    /// consistent automaton.
    pub fn invalid_lookups(&self) -> u64 {
        self.state.with_trie(DoubleArrayTrie::invalid_lookups)
    }
}

impl WordFilter for DoubleArrayFilter {
    fn contains(&self, text: &str) -> bool {
        let _timer = self.state.telemetry.start();
        let text = encode(text);
        self.state
            .with_trie(|trie| matcher::contains(trie, &text, &self.state.ignorable))
    }

    fn match_all(&self, text: &str) -> Vec<String> {
        let _timer = self.state.telemetry.start();
        let text = encode(text);
        self.state.with_trie(|trie| matcher::match_all(trie, &text))
    }

    fn replace(&self, text: &str, mask: char) -> String {
        let _timer = self.state.telemetry.start();
        let text = encode(text);
        let masked = self
            .state
            .with_trie(|trie| matcher::replace(trie, &text, mask_unit(mask)));
        String::from_utf16_lossy(&masked)
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
        self.state.with_trie(DoubleArrayTrie::pattern_count)
    }

    fn info(&self) -> FilterInfo {
        self.state.with_trie(|trie| FilterInfo {
            variant: "double-array",
            pattern_count: trie.pattern_count(),
            state_count: trie.state_count(),
            char_count: trie.char_count(),
            capacity: Some(trie.capacity()),
            heap_bytes: Some(trie.heap_bytes()),
            read_only: trie.is_frozen(),
        })
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

#[cfg(test)]
mod tests {
    use super::*;

    fn frozen(words: &[&str]) -> DoubleArrayFilter {
        DoubleArrayFilter::new(words, &FilterConfig::default()).unwrap()
    }

    fn mutable(words: &[&str]) -> DoubleArrayFilter {
        DoubleArrayFilter::new(words, &FilterConfig::default().with_read_only(false)).unwrap()
    }

    #[test]
    fn test_basic_queries() {
        let f = frozen(&["abc", "bcd"]);
        assert!(f.is_read_only());
        assert!(f.contains("xabcdx"));
        assert_eq!(f.match_all("xabcdx"), vec!["abc", "bcd"]);
        assert_eq!(f.replace("xabcdx", '*'), "x****x");
        assert_eq!(f.invalid_lookups(), 0);
    }

    #[test]
    fn test_inherited_match_masks_own_length() {
        let f = frozen(&["abcd", "bc"]);
        assert!(f.contains("abce"));
        assert_eq!(f.match_all("abce"), vec!["bc"]);
        assert_eq!(f.replace("abce", '*'), "a**e");
    }

    #[test]
    fn test_frozen_rejects_mutation() {
        let f = frozen(&["abc"]);
        assert!(matches!(f.add_word("def"), Err(AutomatonError::ReadOnly)));
        assert!(matches!(
            f.add_word_async("def").wait(),
            Err(AutomatonError::ReadOnly)
        ));
        assert!(!f.contains("def"));
        assert!(f.contains("abc"));
        assert_eq!(f.pattern_count(), 1);
    }

    #[test]
    fn test_mutable_then_freeze() {
        let f = mutable(&["abc"]);
        assert!(!f.is_read_only());
        f.add_word("bcd").unwrap();
        f.add_words(&["  xyz ".to_string(), String::new()]).unwrap();
        assert!(f.contains("xabcdx"));
        assert!(f.contains("xyz"));
        assert_eq!(f.pattern_count(), 3);

        f.freeze();
        assert!(f.is_read_only());
        assert!(matches!(f.add_word("q"), Err(AutomatonError::ReadOnly)));
        assert_eq!(f.match_all("xabcdx"), vec!["abc", "bcd"]);
        f.freeze();
        assert!(f.is_read_only());
    }

    #[test]
    fn test_growth_from_small_capacity() {
        let words: Vec<String> = (0..500).map(|i| format!("词{i}语")).collect();
        let config = FilterConfig::default().with_initial_capacity(16);
        let f = DoubleArrayFilter::new(&words, &config).unwrap();
        assert!(f.capacity() >= f.state_count());
        for word in &words {
            assert!(f.contains(&format!("前{word}后")), "missing {word}");
        }
        assert_eq!(f.invalid_lookups(), 0);
    }

    #[test]
    fn test_async_mutation_on_mutable() {
        let f = mutable(&[]);
        let handles: Vec<_> = (0..20).map(|i| f.add_word_async(&format!("w{i}z"))).collect();
        for handle in handles {
            handle.wait().unwrap();
        }
        assert_eq!(f.pattern_count(), 20);
        assert!(f.contains("..w7z.."));
    }

    #[test]
    fn test_info() {
        let f = frozen(&["ab"]);
        let info = f.info();
        assert_eq!(info.variant, "double-array");
        assert_eq!(info.pattern_count, 1);
        assert_eq!(info.state_count, 3);
        assert_eq!(info.capacity, Some(1024));
        // cells (8 bytes) + links + patterns (4 bytes each); labels dropped on freeze
        assert_eq!(info.heap_bytes, Some(1024 * 16));
        assert!(info.read_only);
    }

    #[test]
    fn test_empty_dictionary() {
        let f = frozen(&[]);
        assert!(!f.contains("anything"));
        assert!(f.match_all("anything").is_empty());
        assert_eq!(f.replace("anything", '*'), "anything");
    }
}
