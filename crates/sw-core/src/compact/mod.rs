//! Compact (pointer-style) automaton with a bounded transition cache.
//!
//! This is the mutable representation: words can be added at any time and
//! failure links are rebuilt wholesale after every batch.

mod automaton;
mod cache;
mod node;

pub use automaton::CompactAutomaton;
pub use cache::TransitionCache;
pub use node::{CompactNode, CompactTrie, COMMON_SLOTS};
