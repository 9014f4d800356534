//! Sensitive-Word Core Library
//!
//! This crate provides the multi-pattern matching engine used to detect,
//! enumerate and mask forbidden words in arbitrary text. It is built on the
//! Aho-Corasick automaton and offers two storage representations.
//!
//! # Architecture
//!
//! Text is processed as UTF-16 code units. A [`CharCodec`] maps every unit of
//! the dictionary to a dense code; the automaton is a trie over those codes
//! with breadth-first failure links. The compact variant keeps pointer-style
//! nodes and memoizes resolved transitions; it stays mutable. The
//! double-array variant flattens the trie into interleaved `(base, check)`
//! cells and is frozen for lock-free reads after construction.
//!
//! # Modules
//!
//! - `codec`: Code-unit to dense-code mapping
//! - `compact`: Pointer-style trie, transition cache and automaton
//! - `double_array`: Double-array trie and packed failure links
//! - `matcher`: Shared scan loop: contains, match_all, replace
//! - `filter`: `WordFilter` API and the compact filter
//! - `optimized`: Double-array filter with one-way freeze
//! - `mutation`: Bounded worker pool for asynchronous updates
//! - `telemetry`: Per-thread batched query latency counters
//! - `config`: Filter configuration
//! - `types`: Shared type definitions

pub mod codec;
pub mod compact;
pub mod config;
pub mod double_array;
pub mod error;
pub mod filter;
pub mod matcher;
pub mod mutation;
pub mod optimized;
pub mod telemetry;
pub mod types;

// Re-export commonly used types
pub use codec::{CharCodec, CodecStrategy};
pub use config::FilterConfig;
pub use error::{AutomatonError, Result};
pub use filter::{FilterInfo, SensitiveWordFilter, WordFilter};
pub use mutation::MutationHandle;
pub use optimized::DoubleArrayFilter;
pub use types::{IgnorableSet, PerformanceStats, ScanFlags};
