//! Core type definitions shared by both automaton representations.
//!
//! Text is processed as UTF-16 code units. Every state is addressed by a
//! stable integer index; the root is always state 0.

use std::fmt;

// =============================================================================
// Identifiers
// =============================================================================

/// Index of an automaton state.
pub type StateId = u32;

/// Index into the pattern table. Assigned in insertion order.
pub type PatternId = u32;

/// Dense code assigned to a code unit by the [`CharCodec`](crate::codec::CharCodec).
pub type Code = u16;

/// The root state.
pub const ROOT_STATE: StateId = 0;

/// Sentinel for "no state".
pub const NO_STATE: StateId = u32::MAX;

/// Sentinel for "state does not end a dictionary word".
pub const NO_PATTERN: PatternId = u32::MAX;

/// Code reserved for units the codec has never seen.
pub const UNMAPPED: Code = 0;

// =============================================================================
// Scan Flags
// =============================================================================

bitflags::bitflags! {
    /// Behaviour switches for the shared scan loop.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ScanFlags: u8 {
        /// Skip ignorable units without advancing the automaton
        const SKIP_IGNORABLE = 1 << 0;
        /// Stop at the first terminal state
        const FIRST_MATCH = 1 << 1;

        /// Containment check: skip and stop early
        const CONTAINS = Self::SKIP_IGNORABLE.bits() | Self::FIRST_MATCH.bits();
    }
}

// =============================================================================
// Ignorable Units
// =============================================================================

/// Whitespace and punctuation skipped by the containment scan.
pub const DEFAULT_IGNORABLE: &str = " \t\n\r,.;:\"'?!-()[]{}";

const UNIT_WORDS: usize = (1 << 16) / 64;

/// Bit set over the 16-bit code-unit space.
#[derive(Clone, PartialEq, Eq)]
pub struct IgnorableSet {
    bits: Box<[u64; UNIT_WORDS]>,
}

impl IgnorableSet {
    /// An empty set: nothing is skipped.
    pub fn empty() -> Self {
        Self {
            bits: Box::new([0u64; UNIT_WORDS]),
        }
    }

    /// Build a set from every code unit of `units`.
    pub fn from_units(units: &str) -> Self {
        let mut set = Self::empty();
        for unit in units.encode_utf16() {
            set.insert(unit);
        }
        set
    }

    #[inline]
    pub fn insert(&mut self, unit: u16) {
        self.bits[unit as usize >> 6] |= 1u64 << (unit & 63);
    }

    #[inline]
    pub fn contains(&self, unit: u16) -> bool {
        self.bits[unit as usize >> 6] & (1u64 << (unit & 63)) != 0
    }

    pub fn len(&self) -> usize {
        self.bits.iter().map(|w| w.count_ones() as usize).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.bits.iter().all(|&w| w == 0)
    }
}

impl Default for IgnorableSet {
    fn default() -> Self {
        Self::from_units(DEFAULT_IGNORABLE)
    }
}

impl fmt::Debug for IgnorableSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IgnorableSet").field("len", &self.len()).finish()
    }
}

// =============================================================================
// Performance Stats
// =============================================================================

/// Snapshot of the process-wide query counters.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PerformanceStats {
    /// Queries flushed into the shared counters
    pub query_count: u64,
    /// Cumulative latency of those queries
    pub total_time_ns: u64,
    /// `total_time_ns / query_count`, or 0 when nothing was recorded
    pub avg_time_ns: f64,
}

impl PerformanceStats {
    pub fn new(query_count: u64, total_time_ns: u64) -> Self {
        let avg_time_ns = if query_count > 0 {
            total_time_ns as f64 / query_count as f64
        } else {
            0.0
        };
        Self {
            query_count,
            total_time_ns,
            avg_time_ns,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_ignorable_set() {
        let set = IgnorableSet::default();
        for unit in DEFAULT_IGNORABLE.encode_utf16() {
            assert!(set.contains(unit));
        }
        assert!(!set.contains(u16::from(b'a')));
        assert!(!set.contains(0x4e2d)); // 中
        assert_eq!(set.len(), DEFAULT_IGNORABLE.len());
    }

    #[test]
    fn test_empty_ignorable_set() {
        let set = IgnorableSet::empty();
        assert!(set.is_empty());
        assert!(!set.contains(u16::from(b' ')));
    }

    #[test]
    fn test_ignorable_high_units() {
        let set = IgnorableSet::from_units("\u{3000}\u{ff0c}");
        assert!(set.contains(0x3000));
        assert!(set.contains(0xff0c));
        assert!(!set.contains(0xffff));
    }

    #[test]
    fn test_contains_flags() {
        assert!(ScanFlags::CONTAINS.contains(ScanFlags::SKIP_IGNORABLE));
        assert!(ScanFlags::CONTAINS.contains(ScanFlags::FIRST_MATCH));
        assert!(!ScanFlags::empty().contains(ScanFlags::FIRST_MATCH));
    }

    #[test]
    fn test_performance_stats_average() {
        assert_eq!(PerformanceStats::new(0, 0).avg_time_ns, 0.0);
        assert_eq!(PerformanceStats::new(4, 100).avg_time_ns, 25.0);
    }
}
