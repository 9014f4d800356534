//! Core Matching Engine
//!
//! This is the hot path - every query goes through here. The scan loop is
//! shared by containment, enumeration and masking and is generic over the
//! trie representation through [`Automaton`].

use crate::types::{Code, IgnorableSet, PatternId, ScanFlags, StateId, ROOT_STATE};

// =============================================================================
// Automaton
// =============================================================================

/// Read-only view of a built automaton.
///
/// Implementations must be safe to query concurrently once their failure
/// links are built.
pub trait Automaton {
    /// Dense code for a code unit; unmapped units yield the sentinel code.
    fn code_of(&self, unit: u16) -> Code;

    /// Resolve the next state: the direct transition if one exists, otherwise
    /// the first transition on `code` found along the failure chain.
    /// `None` means the chain reached the root without a transition.
    fn next_state(&self, state: StateId, code: Code) -> Option<StateId>;

    /// True if `state` ends a dictionary word, either its own or one inherited
    /// through its failure chain.
    fn is_terminal(&self, state: StateId) -> bool;

    /// The word `state` itself spells, if it is one.
    fn own_pattern(&self, state: StateId) -> Option<PatternId>;

    /// Nearest state strictly along the failure chain of `state` that spells
    /// a word.
    fn next_output(&self, state: StateId) -> Option<StateId>;

    /// Number of transitions between `state` and the root.
    fn depth(&self, state: StateId) -> usize;

    fn pattern(&self, id: PatternId) -> Option<&str>;
}

/// States spelling a word that ends at `state`, longest first.
pub fn outputs<A: Automaton + ?Sized>(automaton: &A, state: StateId) -> impl Iterator<Item = StateId> + '_ {
    let first = if automaton.own_pattern(state).is_some() {
        Some(state)
    } else {
        automaton.next_output(state)
    };
    std::iter::successors(first, move |&s| automaton.next_output(s))
}

/// Length in units of the longest word ending at `state`.
pub fn longest_match_len<A: Automaton + ?Sized>(automaton: &A, state: StateId) -> usize {
    outputs(automaton, state)
        .next()
        .map_or(0, |s| automaton.depth(s))
}

// =============================================================================
// Scan Loop
// =============================================================================

/// Walk `text` through the automaton, calling `on_terminal(position, state)`
/// every time a terminal state is entered. Returns true if any was entered.
///
/// A failed transition away from a non-root state restarts at the root and
/// retries the same unit; at the root the unit is consumed.
pub fn scan<A, F>(
    automaton: &A,
    text: &[u16],
    flags: ScanFlags,
    ignorable: &IgnorableSet,
    mut on_terminal: F,
) -> bool
where
    A: Automaton + ?Sized,
    F: FnMut(usize, StateId),
{
    let skip = flags.contains(ScanFlags::SKIP_IGNORABLE);
    let first_only = flags.contains(ScanFlags::FIRST_MATCH);
    let mut matched = false;
    let mut state = ROOT_STATE;
    let mut i = 0;

    while i < text.len() {
        let unit = text[i];
        if skip && ignorable.contains(unit) {
            i += 1;
            continue;
        }

        match automaton.next_state(state, automaton.code_of(unit)) {
            Some(next) => {
                state = next;
                if automaton.is_terminal(state) {
                    matched = true;
                    on_terminal(i, state);
                    if first_only {
                        return true;
                    }
                }
                i += 1;
            }
            None if state == ROOT_STATE => i += 1,
            None => state = ROOT_STATE,
        }
    }

    matched
}

// =============================================================================
// Operations
// =============================================================================

/// True as soon as any dictionary word is found, ignoring units in
/// `ignorable`.
pub fn contains<A: Automaton + ?Sized>(automaton: &A, text: &[u16], ignorable: &IgnorableSet) -> bool {
    scan(automaton, text, ScanFlags::CONTAINS, ignorable, |_, _| {})
}

/// Every word occurrence in encounter order, duplicates retained. At a single
/// position the longest word comes first.
pub fn match_all_ids<A: Automaton + ?Sized>(automaton: &A, text: &[u16]) -> Vec<PatternId> {
    let ignorable = IgnorableSet::empty();
    let mut found = Vec::new();
    scan(automaton, text, ScanFlags::empty(), &ignorable, |_, state| {
        found.extend(outputs(automaton, state).filter_map(|s| automaton.own_pattern(s)));
    });
    found
}

/// [`match_all_ids`] resolved through the pattern table.
pub fn match_all<A: Automaton + ?Sized>(automaton: &A, text: &[u16]) -> Vec<String> {
    match_all_ids(automaton, text)
        .into_iter()
        .filter_map(|id| automaton.pattern(id).map(str::to_string))
        .collect()
}

/// Copy of `text` with the longest word ending at each terminal position
/// overwritten by `mask`. Overlapping matches are all masked.
pub fn replace<A: Automaton + ?Sized>(automaton: &A, text: &[u16], mask: u16) -> Vec<u16> {
    let ignorable = IgnorableSet::empty();
    let mut out = text.to_vec();
    scan(automaton, text, ScanFlags::empty(), &ignorable, |i, state| {
        let len = longest_match_len(automaton, state);
        let start = (i + 1).saturating_sub(len);
        out[start..=i].fill(mask);
    });
    out
}

/// Mask unit for `mask`; characters outside the BMP become U+FFFD.
pub fn mask_unit(mask: char) -> u16 {
    u16::try_from(u32::from(mask)).unwrap_or(0xFFFD)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compact::CompactAutomaton;
    use crate::double_array::DoubleArrayTrie;

    fn units(s: &str) -> Vec<u16> {
        s.encode_utf16().collect()
    }

    fn compact(words: &[&str]) -> CompactAutomaton {
        let mut automaton = CompactAutomaton::new(10_000, 1024);
        for word in words {
            automaton.insert(word).unwrap();
        }
        automaton.build_failure_links();
        automaton
    }

    fn double_array(words: &[&str]) -> DoubleArrayTrie {
        DoubleArrayTrie::build(words, 10_000, None).unwrap()
    }

    fn check_both(words: &[&str], f: impl Fn(&dyn Automaton)) {
        f(&compact(words));
        f(&double_array(words));
    }

    #[test]
    fn test_overlapping_words() {
        check_both(&["abc", "bcd"], |a| {
            let text = units("xabcdx");
            assert!(contains(a, &text, &IgnorableSet::default()));
            assert_eq!(match_all(a, &text), vec!["abc", "bcd"]);
            assert_eq!(String::from_utf16_lossy(&replace(a, &text, u16::from(b'*'))), "x****x");
        });
    }

    #[test]
    fn test_skip_rule_only_for_contains() {
        check_both(&["foo"], |a| {
            let text = units("f o o");
            assert!(contains(a, &text, &IgnorableSet::default()));
            assert!(!contains(a, &text, &IgnorableSet::empty()));
            assert!(match_all(a, &text).is_empty());
            assert_eq!(String::from_utf16_lossy(&replace(a, &text, u16::from(b'*'))), "f o o");
        });
    }

    #[test]
    fn test_inherited_match_uses_its_own_length() {
        check_both(&["abcd", "bc"], |a| {
            let text = units("abce");
            assert!(contains(a, &text, &IgnorableSet::default()));
            assert_eq!(match_all(a, &text), vec!["bc"]);
            assert_eq!(String::from_utf16_lossy(&replace(a, &text, u16::from(b'*'))), "a**e");
        });
    }

    #[test]
    fn test_all_words_ending_at_one_position() {
        check_both(&["she", "he", "e"], |a| {
            let text = units("ushe");
            assert_eq!(match_all(a, &text), vec!["she", "he", "e"]);
            assert_eq!(String::from_utf16_lossy(&replace(a, &text, u16::from(b'#'))), "u###");
        });
    }

    #[test]
    fn test_duplicates_retained_in_order() {
        check_both(&["ab", "b"], |a| {
            assert_eq!(match_all(a, &units("abxab")), vec!["ab", "b", "ab", "b"]);
        });
    }

    #[test]
    fn test_no_match() {
        check_both(&["abc"], |a| {
            let text = units("ab ac bc");
            assert!(!contains(a, &text, &IgnorableSet::empty()));
            assert!(match_all(a, &text).is_empty());
            assert_eq!(replace(a, &text, u16::from(b'*')), text);
        });
    }

    #[test]
    fn test_single_word_text() {
        check_both(&["敏感", "词"], |a| {
            assert_eq!(match_all(a, &units("敏感")), vec!["敏感"]);
        });
    }

    #[test]
    fn test_restart_after_failed_prefix() {
        check_both(&["aab"], |a| {
            let text = units("aaab");
            assert!(contains(a, &text, &IgnorableSet::default()));
            assert_eq!(String::from_utf16_lossy(&replace(a, &text, u16::from(b'*'))), "a***");
        });
    }

    #[test]
    fn test_unmapped_units_fall_back_to_root() {
        check_both(&["ab"], |a| {
            let text = units("a\u{2603}ab");
            assert_eq!(match_all(a, &text), vec!["ab"]);
        });
    }

    #[test]
    fn test_replace_idempotent() {
        check_both(&["abc", "bcd", "cd", "x"], |a| {
            let text = units("zabcdxcdabx");
            let once = replace(a, &text, u16::from(b'*'));
            let twice = replace(a, &once, u16::from(b'*'));
            assert_eq!(once, twice);
        });
    }

    #[test]
    fn test_empty_text_and_empty_dictionary() {
        check_both(&[], |a| {
            assert!(!contains(a, &units("anything"), &IgnorableSet::default()));
            assert!(match_all(a, &units("anything")).is_empty());
        });
        check_both(&["a"], |a| {
            assert!(!contains(a, &[], &IgnorableSet::default()));
            assert!(replace(a, &[], u16::from(b'*')).is_empty());
        });
    }

    #[test]
    fn test_mask_unit() {
        assert_eq!(mask_unit('*'), u16::from(b'*'));
        assert_eq!(mask_unit('■'), 0x25a0);
        assert_eq!(mask_unit('😀'), 0xFFFD);
    }
}
