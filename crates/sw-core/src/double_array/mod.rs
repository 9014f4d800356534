//! Double-array automaton.
//!
//! States live in one interleaved array of `(base, check)` cells. The child of
//! `s` on `code` is `t = base[s] + code`, valid only when `check[t] == s`.
//! Per-state failure links and terminal flags are packed into a parallel
//! `u32` array (see [`links`]).
//!
//! # Layout
//!
//! ```text
//! cells:    [ root | . | a | ab | ...]   (base, check) pairs
//! links:    [ 0    | 0 | 0 | 0x8000_0000 | ...]
//! patterns: [ -    | - | - | 0  | ...]
//! ```
//!
//! Arrays grow by doubling and never shrink. While the trie is mutable each
//! state also keeps the list of its child codes; relocation and the
//! breadth-first link build walk those lists. Freezing drops them.

pub mod links;

use std::collections::HashMap;
use std::mem;
use std::sync::atomic::{AtomicU64, Ordering};

use log::{debug, error, info, warn};

use crate::codec::{CharCodec, DEFAULT_MAX_CHARS};
use crate::config::estimate_capacity;
use crate::error::{AutomatonError, Result};
use crate::matcher::Automaton;
use crate::types::{Code, PatternId, StateId, NO_PATTERN, ROOT_STATE, UNMAPPED};

pub use links::{link_is_terminal, link_target, pack_link};

/// `check` of a free cell.
const FREE: i32 = -1;

/// `base` of a state without children.
const NO_BASE: i32 = -1;

/// `check` of the root cell; no state can claim it as parent.
const ROOT_CHECK: i32 = i32::MIN;

/// Lowest cell a child can occupy: bases and codes both start at 1.
const FIRST_CHILD_CELL: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Cell {
    base: i32,
    check: i32,
}

impl Cell {
    const FREE: Cell = Cell {
        base: NO_BASE,
        check: FREE,
    };
}

// =============================================================================
// Trie
// =============================================================================

pub struct DoubleArrayTrie {
    cells: Vec<Cell>,
    links: Vec<u32>,
    patterns: Vec<PatternId>,
    labels: Vec<Vec<Code>>,
    codec: CharCodec,
    words: Vec<String>,
    index: HashMap<String, PatternId>,
    state_count: usize,
    first_free: usize,
    relocations: usize,
    frozen: bool,
    invalid_lookups: AtomicU64,
}

impl DoubleArrayTrie {
    /// Build a complete automaton over `words`.
    ///
    /// Codes are ranked by unit frequency over the whole dictionary before
    /// any insertion. Empty words are skipped and duplicates keep their first
    /// id. The result is still mutable; see [`freeze`](Self::freeze).
    pub fn build<S: AsRef<str>>(
        words: &[S],
        max_chars: usize,
        initial_capacity: Option<usize>,
    ) -> Result<Self> {
        let start = std::time::Instant::now();
        let codec = CharCodec::frequency_ranked(words, max_chars)?;
        let capacity = initial_capacity.unwrap_or_else(|| estimate_capacity(words));
        let mut trie = Self::with_codec(codec, capacity);

        for word in words {
            trie.insert_word(word.as_ref())?;
        }
        trie.build_failure_links();

        info!(
            "Built double-array automaton: {} patterns, {} states, {} chars, capacity {}, {} relocations in {:?}",
            trie.words.len(),
            trie.state_count,
            trie.codec.char_count(),
            trie.cells.len(),
            trie.relocations,
            start.elapsed()
        );
        Ok(trie)
    }

    fn with_codec(codec: CharCodec, capacity: usize) -> Self {
        let capacity = capacity.max(FIRST_CHILD_CELL);
        let mut cells = vec![Cell::FREE; capacity];
        cells[ROOT_STATE as usize] = Cell {
            base: NO_BASE,
            check: ROOT_CHECK,
        };
        Self {
            cells,
            links: vec![0; capacity],
            patterns: vec![NO_PATTERN; capacity],
            labels: vec![Vec::new(); capacity],
            codec,
            words: Vec::new(),
            index: HashMap::new(),
            state_count: 1,
            first_free: FIRST_CHILD_CELL,
            relocations: 0,
            frozen: false,
            invalid_lookups: AtomicU64::new(0),
        }
    }

    /// Insert a batch and rebuild failure links once.
    ///
    /// Every word is attempted; the first error is returned after the links
    /// are rebuilt over what was inserted.
    pub fn insert_all<S: AsRef<str>>(&mut self, words: &[S]) -> Result<usize> {
        if self.frozen {
            warn!("Rejected {} words: double-array automaton is frozen", words.len());
            return Err(AutomatonError::ReadOnly);
        }

        let mut inserted = 0;
        let mut first_err = None;
        for word in words {
            match self.insert_word(word.as_ref()) {
                Ok(Some(_)) => inserted += 1,
                Ok(None) => {}
                Err(e) => {
                    first_err.get_or_insert(e);
                }
            }
        }
        self.build_failure_links();
        debug!("Inserted {} words into double-array automaton", inserted);

        match first_err {
            Some(e) => Err(e),
            None => Ok(inserted),
        }
    }

    /// Walk `word` from the root, creating states as needed.
    fn insert_word(&mut self, word: &str) -> Result<Option<PatternId>> {
        if word.is_empty() {
            return Ok(None);
        }
        if let Some(&id) = self.index.get(word) {
            return Ok(Some(id));
        }

        let codes = self.codec.assign_all(word)?;
        let mut state = ROOT_STATE as usize;
        for code in codes {
            state = self.step(state, code);
        }

        let id = self.words.len() as PatternId;
        self.patterns[state] = id;
        self.words.push(word.to_string());
        self.index.insert(word.to_string(), id);
        Ok(Some(id))
    }

    /// Follow or create the child of `s` on `code`.
    fn step(&mut self, s: usize, code: Code) -> usize {
        let base = self.cells[s].base;
        if base == NO_BASE {
            let b = self.find_base(&[code]);
            self.cells[s].base = b as i32;
            return self.claim(s, b + code as usize, code);
        }

        let t = base as usize + code as usize;
        self.ensure_index(t);
        let check = self.cells[t].check;
        if check == s as i32 {
            return t;
        }
        if check == FREE {
            return self.claim(s, t, code);
        }

        let b = self.relocate(s, code);
        self.claim(s, b + code as usize, code)
    }

    fn claim(&mut self, parent: usize, t: usize, code: Code) -> usize {
        self.ensure_index(t);
        self.cells[t] = Cell {
            base: NO_BASE,
            check: parent as i32,
        };
        self.links[t] = pack_link(ROOT_STATE, false);
        self.patterns[t] = NO_PATTERN;
        self.labels[t].clear();
        self.labels[parent].push(code);
        self.state_count += 1;

        if t == self.first_free {
            while self.first_free < self.cells.len() && self.cells[self.first_free].check != FREE {
                self.first_free += 1;
            }
        }
        t
    }

    /// Lowest base at or after the first free cell such that every code
    /// lands on a free cell. Cells past the end count as free.
    fn find_base(&self, codes: &[Code]) -> usize {
        let min_code = codes.iter().copied().min().unwrap_or(1) as usize;
        let mut base = self.first_free.saturating_sub(min_code).max(1);
        loop {
            let fits = codes.iter().all(|&code| {
                self.cells
                    .get(base + code as usize)
                    .map_or(true, |cell| cell.check == FREE)
            });
            if fits {
                return base;
            }
            base += 1;
        }
    }

    /// Move every child of `s` to a new base that also leaves room for
    /// `code`. Other states keep their cells.
    fn relocate(&mut self, s: usize, code: Code) -> usize {
        let old_base = self.cells[s].base as usize;
        let existing = mem::take(&mut self.labels[s]);
        let mut codes = existing.clone();
        codes.push(code);

        let new_base = self.find_base(&codes);
        let max_code = codes.iter().copied().max().unwrap_or(code) as usize;
        self.ensure_index(new_base + max_code);

        for &c in &existing {
            let old = old_base + c as usize;
            let new = new_base + c as usize;

            let moved = self.cells[old];
            self.cells[new] = Cell {
                base: moved.base,
                check: s as i32,
            };
            self.links[new] = self.links[old];
            self.patterns[new] = self.patterns[old];
            self.labels[new] = mem::take(&mut self.labels[old]);

            if moved.base != NO_BASE {
                for &g in &self.labels[new] {
                    self.cells[moved.base as usize + g as usize].check = new as i32;
                }
            }

            self.cells[old] = Cell::FREE;
            self.links[old] = 0;
            self.patterns[old] = NO_PATTERN;
            self.first_free = self.first_free.min(old);
        }
        while self.first_free < self.cells.len() && self.cells[self.first_free].check != FREE {
            self.first_free += 1;
        }

        self.labels[s] = existing;
        self.cells[s].base = new_base as i32;
        self.relocations += 1;
        debug!(
            "Relocated {} children of state {} from base {} to {}",
            self.labels[s].len(),
            s,
            old_base,
            new_base
        );
        new_base
    }

    /// Double capacity until `index` is addressable.
    fn ensure_index(&mut self, index: usize) {
        if index < self.cells.len() {
            return;
        }
        let old = self.cells.len();
        let mut len = old.max(1);
        while len <= index {
            len *= 2;
        }
        self.cells.resize(len, Cell::FREE);
        self.links.resize(len, 0);
        self.patterns.resize(len, NO_PATTERN);
        self.labels.resize_with(len, Vec::new);
        debug!("Grew double array from {} to {} cells", old, len);
    }

    /// Drop the mutation-only bookkeeping. Further insertion is rejected.
    pub fn freeze(&mut self) {
        if self.frozen {
            return;
        }
        self.frozen = true;
        self.labels = Vec::new();
        self.index = HashMap::new();
        info!(
            "Froze double-array automaton: {} states, capacity {}",
            self.state_count,
            self.cells.len()
        );
    }

    // =========================================================================
    // Lookup
    // =========================================================================

    /// Direct transition only; failure links are not followed.
    #[inline]
    pub fn transition(&self, state: StateId, code: Code) -> Option<StateId> {
        let Some(cell) = self.cells.get(state as usize) else {
            self.invalid_state(state);
            return None;
        };
        if cell.base == NO_BASE || code == UNMAPPED {
            return None;
        }
        let t = cell.base as usize + code as usize;
        match self.cells.get(t) {
            Some(child) if child.check == state as i32 => Some(t as StateId),
            _ => None,
        }
    }

    #[cold]
    fn invalid_state(&self, state: StateId) {
        self.invalid_lookups.fetch_add(1, Ordering::Relaxed);
        error!(
            "Invalid double-array state {} (capacity {}), falling back to root",
            state,
            self.cells.len()
        );
    }

    #[inline]
    fn link(&self, state: StateId) -> Option<u32> {
        let link = self.links.get(state as usize).copied();
        if link.is_none() {
            self.invalid_state(state);
        }
        link
    }

    // =========================================================================
    // Stats
    // =========================================================================

    pub fn capacity(&self) -> usize {
        self.cells.len()
    }

    pub fn state_count(&self) -> usize {
        self.state_count
    }

    pub fn pattern_count(&self) -> usize {
        self.words.len()
    }

    pub fn char_count(&self) -> usize {
        self.codec.char_count()
    }

    pub fn relocations(&self) -> usize {
        self.relocations
    }

    pub fn is_frozen(&self) -> bool {
        self.frozen
    }

    /// Lookups that hit an out-of-range state index.
    pub fn invalid_lookups(&self) -> u64 {
        self.invalid_lookups.load(Ordering::Relaxed)
    }

    pub fn patterns(&self) -> &[String] {
        &self.words
    }

    /// Approximate heap usage of the arrays.
    pub fn heap_bytes(&self) -> usize {
        self.cells.len() * mem::size_of::<Cell>()
            + self.links.len() * mem::size_of::<u32>()
            + self.patterns.len() * mem::size_of::<PatternId>()
            + self.labels.len() * mem::size_of::<Vec<Code>>()
            + self.labels.iter().map(|l| l.capacity() * mem::size_of::<Code>()).sum::<usize>()
    }
}

impl Default for DoubleArrayTrie {
    /// An automaton with no words.
    fn default() -> Self {
        Self::with_codec(CharCodec::first_seen(DEFAULT_MAX_CHARS), FIRST_CHILD_CELL)
    }
}

impl std::fmt::Debug for DoubleArrayTrie {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DoubleArrayTrie")
            .field("patterns", &self.words.len())
            .field("states", &self.state_count)
            .field("capacity", &self.cells.len())
            .field("frozen", &self.frozen)
            .finish()
    }
}

impl Automaton for DoubleArrayTrie {
    #[inline]
    fn code_of(&self, unit: u16) -> Code {
        self.codec.code_of(unit)
    }

    fn next_state(&self, state: StateId, code: Code) -> Option<StateId> {
        if code == UNMAPPED {
            return None;
        }
        let mut s = state;
        loop {
            if let Some(next) = self.transition(s, code) {
                return Some(next);
            }
            if s == ROOT_STATE {
                return None;
            }
            s = link_target(self.link(s)?);
        }
    }

    #[inline]
    fn is_terminal(&self, state: StateId) -> bool {
        self.link(state).is_some_and(link_is_terminal)
    }

    fn own_pattern(&self, state: StateId) -> Option<PatternId> {
        self.patterns
            .get(state as usize)
            .copied()
            .filter(|&p| p != NO_PATTERN)
    }

    fn next_output(&self, state: StateId) -> Option<StateId> {
        let mut f = link_target(self.link(state)?);
        // Terminal bits propagate down failure chains, so a non-terminal
        // state ends the search.
        while f != ROOT_STATE {
            let link = self.link(f)?;
            if !link_is_terminal(link) {
                return None;
            }
            if self.own_pattern(f).is_some() {
                return Some(f);
            }
            f = link_target(link);
        }
        None
    }

    fn depth(&self, state: StateId) -> usize {
        let mut depth = 0;
        let mut s = state as usize;
        while s != ROOT_STATE as usize {
            match self.cells.get(s) {
                Some(cell) if cell.check >= 0 && depth < self.cells.len() => {
                    s = cell.check as usize;
                    depth += 1;
                }
                _ => {
                    self.invalid_state(s as StateId);
                    break;
                }
            }
        }
        depth
    }

    fn pattern(&self, id: PatternId) -> Option<&str> {
        self.words.get(id as usize).map(String::as_str)
    }
}
