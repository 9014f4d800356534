//! Arena of compact trie nodes.
//!
//! Children with a small code sit in a dense slot array allocated on the first
//! such child; everything else goes to a sparse map. Leaves carry neither.

use std::collections::HashMap;

use crate::types::{Code, PatternId, StateId, NO_PATTERN, NO_STATE, ROOT_STATE};

/// Codes below this bound get a dense slot.
pub const COMMON_SLOTS: usize = 256;

// =============================================================================
// Node
// =============================================================================

#[derive(Debug, Clone)]
pub struct CompactNode {
    common: Option<Box<[StateId; COMMON_SLOTS]>>,
    rare: Option<HashMap<Code, StateId>>,
    /// Failure link; the root links to itself
    pub fail: StateId,
    /// Nearest state strictly on the failure chain that spells a word
    pub output: StateId,
    /// Own pattern id, or `NO_PATTERN`
    pub pattern: PatternId,
    /// Parent state; the root is its own parent
    pub parent: StateId,
}

impl CompactNode {
    fn new(parent: StateId) -> Self {
        Self {
            common: None,
            rare: None,
            fail: ROOT_STATE,
            output: NO_STATE,
            pattern: NO_PATTERN,
            parent,
        }
    }

    #[inline]
    pub fn child(&self, code: Code) -> Option<StateId> {
        let slot = code as usize;
        if slot < COMMON_SLOTS {
            self.common
                .as_ref()
                .map(|slots| slots[slot])
                .filter(|&s| s != NO_STATE)
        } else {
            self.rare.as_ref().and_then(|rare| rare.get(&code).copied())
        }
    }

    fn set_child(&mut self, code: Code, state: StateId) {
        let slot = code as usize;
        if slot < COMMON_SLOTS {
            self.common.get_or_insert_with(|| Box::new([NO_STATE; COMMON_SLOTS]))[slot] = state;
        } else {
            self.rare.get_or_insert_with(HashMap::new).insert(code, state);
        }
    }

    /// Children as `(code, state)` pairs, dense slots first in code order.
    pub fn children(&self) -> Vec<(Code, StateId)> {
        let mut out = Vec::new();
        if let Some(slots) = &self.common {
            out.extend(
                slots
                    .iter()
                    .enumerate()
                    .filter(|&(_, &s)| s != NO_STATE)
                    .map(|(code, &s)| (code as Code, s)),
            );
        }
        if let Some(rare) = &self.rare {
            let mut sparse: Vec<(Code, StateId)> = rare.iter().map(|(&c, &s)| (c, s)).collect();
            sparse.sort_unstable();
            out.extend(sparse);
        }
        out
    }

    pub fn has_own_pattern(&self) -> bool {
        self.pattern != NO_PATTERN
    }
}

// =============================================================================
// Trie
// =============================================================================

#[derive(Debug, Clone)]
pub struct CompactTrie {
    nodes: Vec<CompactNode>,
}

impl Default for CompactTrie {
    fn default() -> Self {
        Self::new()
    }
}

impl CompactTrie {
    /// A trie holding only the root.
    pub fn new() -> Self {
        Self {
            nodes: vec![CompactNode::new(ROOT_STATE)],
        }
    }

    #[inline]
    pub fn node(&self, state: StateId) -> &CompactNode {
        &self.nodes[state as usize]
    }

    #[inline]
    pub fn node_mut(&mut self, state: StateId) -> &mut CompactNode {
        &mut self.nodes[state as usize]
    }

    #[inline]
    pub fn child(&self, state: StateId, code: Code) -> Option<StateId> {
        self.node(state).child(code)
    }

    /// Append a fresh node as the child of `state` on `code`.
    pub fn add_child(&mut self, state: StateId, code: Code) -> StateId {
        let id = self.nodes.len() as StateId;
        self.nodes.push(CompactNode::new(state));
        self.node_mut(state).set_child(code, id);
        id
    }

    /// Transitions between `state` and the root, counted along parent links.
    pub fn depth(&self, state: StateId) -> usize {
        let mut depth = 0;
        let mut s = state;
        while s != ROOT_STATE {
            s = self.node(s).parent;
            depth += 1;
        }
        depth
    }

    /// Own pattern or an inherited one through the output link.
    #[inline]
    pub fn is_terminal(&self, state: StateId) -> bool {
        let node = self.node(state);
        node.has_own_pattern() || node.output != NO_STATE
    }

    pub fn pattern(&self, state: StateId) -> Option<PatternId> {
        Some(self.node(state).pattern).filter(|&p| p != NO_PATTERN)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.len() <= 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_common_and_rare_children() {
        let mut trie = CompactTrie::new();
        let a = trie.add_child(ROOT_STATE, 3);
        let b = trie.add_child(ROOT_STATE, 4000);
        assert_eq!(trie.child(ROOT_STATE, 3), Some(a));
        assert_eq!(trie.child(ROOT_STATE, 4000), Some(b));
        assert_eq!(trie.child(ROOT_STATE, 4), None);
        assert_eq!(trie.child(ROOT_STATE, 4001), None);
        assert_eq!(trie.node(ROOT_STATE).children(), vec![(3, a), (4000, b)]);
    }

    #[test]
    fn test_leaves_allocate_nothing() {
        let mut trie = CompactTrie::new();
        let leaf = trie.add_child(ROOT_STATE, 1);
        assert!(trie.node(leaf).common.is_none());
        assert!(trie.node(leaf).rare.is_none());
        assert!(trie.node(leaf).children().is_empty());
    }

    #[test]
    fn test_depth_and_parent() {
        let mut trie = CompactTrie::new();
        let a = trie.add_child(ROOT_STATE, 1);
        let b = trie.add_child(a, 2);
        assert_eq!(trie.depth(b), 2);
        assert_eq!(trie.depth(ROOT_STATE), 0);
        assert_eq!(trie.node(b).parent, a);
        assert_eq!(trie.len(), 3);
    }

    #[test]
    fn test_terminal_own_and_inherited() {
        let mut trie = CompactTrie::new();
        let a = trie.add_child(ROOT_STATE, 1);
        let b = trie.add_child(ROOT_STATE, 2);
        assert!(!trie.is_terminal(a));
        trie.node_mut(a).pattern = 0;
        assert!(trie.is_terminal(a));
        assert_eq!(trie.pattern(a), Some(0));
        trie.node_mut(b).output = a;
        assert!(trie.is_terminal(b));
        assert_eq!(trie.pattern(b), None);
    }
}
