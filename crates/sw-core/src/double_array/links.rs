//! Packed failure links for the double-array automaton.
//!
//! Each state carries one `u32`: the top bit flags "ends a dictionary word"
//! (own or inherited along the failure chain) and the low 31 bits hold the
//! failure target.

use std::collections::VecDeque;

use log::debug;

use super::DoubleArrayTrie;
use crate::types::{StateId, NO_PATTERN, ROOT_STATE};

const TERMINAL_BIT: u32 = 1 << 31;
const TARGET_MASK: u32 = !TERMINAL_BIT;

#[inline]
pub fn pack_link(target: StateId, terminal: bool) -> u32 {
    debug_assert!(target <= TARGET_MASK);
    if terminal {
        target | TERMINAL_BIT
    } else {
        target
    }
}

#[inline]
pub fn link_target(link: u32) -> StateId {
    link & TARGET_MASK
}

#[inline]
pub fn link_is_terminal(link: u32) -> bool {
    link & TERMINAL_BIT != 0
}

impl DoubleArrayTrie {
    /// Recompute every failure link and terminal bit breadth-first.
    pub(super) fn build_failure_links(&mut self) {
        let mut queue = VecDeque::new();
        self.links[ROOT_STATE as usize] = pack_link(ROOT_STATE, false);

        for i in 0..self.labels[ROOT_STATE as usize].len() {
            let code = self.labels[ROOT_STATE as usize][i];
            if let Some(child) = self.transition(ROOT_STATE, code) {
                let terminal = self.patterns[child as usize] != NO_PATTERN;
                self.links[child as usize] = pack_link(ROOT_STATE, terminal);
                queue.push_back(child);
            }
        }

        while let Some(state) = queue.pop_front() {
            let fail = link_target(self.links[state as usize]);
            for i in 0..self.labels[state as usize].len() {
                let code = self.labels[state as usize][i];
                let Some(child) = self.transition(state, code) else {
                    continue;
                };

                let mut f = fail;
                let target = loop {
                    if let Some(next) = self.transition(f, code) {
                        break next;
                    }
                    if f == ROOT_STATE {
                        break ROOT_STATE;
                    }
                    f = link_target(self.links[f as usize]);
                };

                let terminal = self.patterns[child as usize] != NO_PATTERN
                    || link_is_terminal(self.links[target as usize]);
                self.links[child as usize] = pack_link(target, terminal);
                queue.push_back(child);
            }
        }

        debug!("Rebuilt double-array failure links: {} states", self.state_count);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pack_roundtrip() {
        let link = pack_link(12345, true);
        assert_eq!(link_target(link), 12345);
        assert!(link_is_terminal(link));

        let link = pack_link(12345, false);
        assert_eq!(link_target(link), 12345);
        assert!(!link_is_terminal(link));
    }

    #[test]
    fn test_pack_extremes() {
        assert_eq!(link_target(pack_link(TARGET_MASK, true)), TARGET_MASK);
        assert_eq!(link_target(pack_link(ROOT_STATE, true)), ROOT_STATE);
        assert!(!link_is_terminal(pack_link(TARGET_MASK, false)));
    }
}
