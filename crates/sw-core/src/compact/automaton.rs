use std::collections::{HashMap, VecDeque};

use log::debug;

use crate::codec::CharCodec;
use crate::compact::cache::TransitionCache;
use crate::compact::node::CompactTrie;
use crate::error::Result;
use crate::matcher::Automaton;
use crate::types::{Code, PatternId, StateId, NO_STATE, ROOT_STATE, UNMAPPED};

/// Aho-Corasick automaton over a pointer-style trie.
///
/// Mutable: words are added with [`insert`](Self::insert) and become
/// matchable after the next [`build_failure_links`](Self::build_failure_links).
#[derive(Debug)]
pub struct CompactAutomaton {
    trie: CompactTrie,
    codec: CharCodec,
    patterns: Vec<String>,
    index: HashMap<String, PatternId>,
    cache: TransitionCache,
}

impl CompactAutomaton {
    pub fn new(max_chars: usize, cache_capacity: usize) -> Self {
        Self {
            trie: CompactTrie::new(),
            codec: CharCodec::first_seen(max_chars),
            patterns: Vec::new(),
            index: HashMap::new(),
            cache: TransitionCache::new(cache_capacity),
        }
    }

    /// Add `word` to the trie. Returns `None` for an empty word and the
    /// existing id for a word already present.
    ///
    /// Failure links are stale until the next rebuild.
    pub fn insert(&mut self, word: &str) -> Result<Option<PatternId>> {
        if word.is_empty() {
            return Ok(None);
        }
        if let Some(&id) = self.index.get(word) {
            return Ok(Some(id));
        }

        let codes = self.codec.assign_all(word)?;
        let mut state = ROOT_STATE;
        for code in codes {
            state = match self.trie.child(state, code) {
                Some(next) => next,
                None => self.trie.add_child(state, code),
            };
        }

        let id = self.patterns.len() as PatternId;
        self.trie.node_mut(state).pattern = id;
        self.patterns.push(word.to_string());
        self.index.insert(word.to_string(), id);
        Ok(Some(id))
    }

    /// Recompute every failure and output link breadth-first, then drop all
    /// memoized transitions.
    pub fn build_failure_links(&mut self) {
        let mut queue = VecDeque::new();

        {
            let root = self.trie.node_mut(ROOT_STATE);
            root.fail = ROOT_STATE;
            root.output = NO_STATE;
        }
        for (_, child) in self.trie.node(ROOT_STATE).children() {
            let node = self.trie.node_mut(child);
            node.fail = ROOT_STATE;
            node.output = NO_STATE;
            queue.push_back(child);
        }

        while let Some(state) = queue.pop_front() {
            let fail = self.trie.node(state).fail;
            for (code, child) in self.trie.node(state).children() {
                let mut f = fail;
                let target = loop {
                    if let Some(next) = self.trie.child(f, code) {
                        break next;
                    }
                    if f == ROOT_STATE {
                        break ROOT_STATE;
                    }
                    f = self.trie.node(f).fail;
                };

                let target_node = self.trie.node(target);
                let output = if target_node.has_own_pattern() {
                    target
                } else {
                    target_node.output
                };
                let node = self.trie.node_mut(child);
                node.fail = target;
                node.output = output;
                queue.push_back(child);
            }
        }

        self.cache.clear();
        debug!(
            "Rebuilt failure links: {} states, {} patterns",
            self.trie.len(),
            self.patterns.len()
        );
    }

    pub fn state_count(&self) -> usize {
        self.trie.len()
    }

    pub fn pattern_count(&self) -> usize {
        self.patterns.len()
    }

    pub fn char_count(&self) -> usize {
        self.codec.char_count()
    }

    pub fn cache_len(&self) -> usize {
        self.cache.len()
    }

    pub fn patterns(&self) -> &[String] {
        &self.patterns
    }
}

impl Automaton for CompactAutomaton {
    #[inline]
    fn code_of(&self, unit: u16) -> Code {
        self.codec.code_of(unit)
    }

    fn next_state(&self, state: StateId, code: Code) -> Option<StateId> {
        if code == UNMAPPED {
            return None;
        }
        if let Some(next) = self.trie.child(state, code) {
            return Some(next);
        }
        if state == ROOT_STATE {
            return None;
        }
        if let Some(cached) = self.cache.get(state, code) {
            return Some(cached).filter(|&s| s != ROOT_STATE);
        }

        let mut f = self.trie.node(state).fail;
        let resolved = loop {
            if let Some(next) = self.trie.child(f, code) {
                break next;
            }
            if f == ROOT_STATE {
                break ROOT_STATE;
            }
            f = self.trie.node(f).fail;
        };
        self.cache.insert(state, code, resolved);
        Some(resolved).filter(|&s| s != ROOT_STATE)
    }

    #[inline]
    fn is_terminal(&self, state: StateId) -> bool {
        self.trie.is_terminal(state)
    }

    fn own_pattern(&self, state: StateId) -> Option<PatternId> {
        self.trie.pattern(state)
    }

    fn next_output(&self, state: StateId) -> Option<StateId> {
        Some(self.trie.node(state).output).filter(|&s| s != NO_STATE)
    }

    fn depth(&self, state: StateId) -> usize {
        self.trie.depth(state)
    }

    fn pattern(&self, id: PatternId) -> Option<&str> {
        self.patterns.get(id as usize).map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn build(words: &[&str]) -> CompactAutomaton {
        let mut automaton = CompactAutomaton::new(10_000, 1024);
        for word in words {
            automaton.insert(word).unwrap();
        }
        automaton.build_failure_links();
        automaton
    }

    fn walk(automaton: &CompactAutomaton, text: &str) -> StateId {
        let mut state = ROOT_STATE;
        for unit in text.encode_utf16() {
            state = automaton
                .next_state(state, automaton.code_of(unit))
                .unwrap_or(ROOT_STATE);
        }
        state
    }

    #[test]
    fn test_insert_assigns_ids_in_order() {
        let mut automaton = CompactAutomaton::new(10_000, 0);
        assert_eq!(automaton.insert("he").unwrap(), Some(0));
        assert_eq!(automaton.insert("she").unwrap(), Some(1));
        assert_eq!(automaton.insert("he").unwrap(), Some(0));
        assert_eq!(automaton.insert("").unwrap(), None);
        assert_eq!(automaton.pattern_count(), 2);
        assert_eq!(automaton.pattern(1), Some("she"));
    }

    #[test]
    fn test_shared_prefixes() {
        let automaton = build(&["abc", "abd", "ab"]);
        // root, a, b, c, d
        assert_eq!(automaton.state_count(), 5);
    }

    #[test]
    fn test_failure_links() {
        let automaton = build(&["he", "she", "his", "hers"]);
        let sh = walk(&automaton, "sh");
        let h = walk(&automaton, "h");
        assert_eq!(automaton.trie.node(sh).fail, h);
        let she = walk(&automaton, "she");
        let he = walk(&automaton, "he");
        assert_eq!(automaton.trie.node(she).fail, he);
        assert_eq!(automaton.next_output(she), Some(he));
        assert!(automaton.is_terminal(she));
    }

    #[test]
    fn test_inherited_terminal() {
        let automaton = build(&["abcd", "bc"]);
        let abc = walk(&automaton, "abc");
        assert!(automaton.own_pattern(abc).is_none());
        assert!(automaton.is_terminal(abc));
        let bc = automaton.next_output(abc).unwrap();
        assert_eq!(automaton.depth(bc), 2);
    }

    #[test]
    fn test_resolution_is_cached() {
        let automaton = build(&["ab", "bc"]);
        assert_eq!(automaton.cache_len(), 0);
        let a = walk(&automaton, "a");
        let c = automaton.code_of(u16::from(b'c'));
        // "a" has no 'c' child and the root has none either
        assert_eq!(automaton.next_state(a, c), None);
        assert_eq!(automaton.cache_len(), 1);
        assert_eq!(automaton.next_state(a, c), None);
        assert_eq!(automaton.cache_len(), 1);
    }

    #[test]
    fn test_rebuild_clears_cache() {
        let mut automaton = build(&["ab", "x"]);
        let a = walk(&automaton, "a");
        let x = walk(&automaton, "x");
        let x_code = automaton.code_of(u16::from(b'x'));
        assert_eq!(automaton.next_state(a, x_code), Some(x));
        assert_eq!(automaton.cache_len(), 1);

        automaton.insert("ax").unwrap();
        automaton.build_failure_links();
        assert_eq!(automaton.cache_len(), 0);
        assert_eq!(automaton.next_state(a, x_code), Some(walk(&automaton, "ax")));
    }

    #[test]
    fn test_unmapped_is_no_transition() {
        let automaton = build(&["ab"]);
        assert_eq!(automaton.next_state(ROOT_STATE, UNMAPPED), None);
        assert_eq!(automaton.code_of(u16::from(b'z')), UNMAPPED);
    }
}
