//! Character codec: maps UTF-16 code units to dense codes.
//!
//! Code 0 is reserved for units the codec has never seen. Codes are stable for
//! the lifetime of the automaton that owns the codec.

use std::collections::HashMap;

use crate::error::{AutomatonError, Result};
use crate::types::{Code, UNMAPPED};

/// Default number of distinct code units a dictionary may use.
pub const DEFAULT_MAX_CHARS: usize = 10_000;

const UNIT_SPACE: usize = 1 << 16;

/// How codes were handed out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodecStrategy {
    /// In order of first encounter during insertion
    FirstSeen,
    /// By descending frequency over the initial dictionary
    FrequencyRanked,
}

/// Dense code table over the 16-bit code-unit space.
#[derive(Clone)]
pub struct CharCodec {
    table: Box<[Code]>,
    units: Vec<u16>,
    capacity: usize,
    strategy: CodecStrategy,
}

impl CharCodec {
    /// Empty codec assigning codes on first sight.
    pub fn first_seen(capacity: usize) -> Self {
        Self::with_strategy(capacity, CodecStrategy::FirstSeen)
    }

    /// Codec whose most frequent units get the smallest codes, so that
    /// `base + code` stays close to `base` for hot units.
    ///
    /// Ties are broken by unit value so the layout is deterministic.
    pub fn frequency_ranked<I, S>(words: I, capacity: usize) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut frequency: HashMap<u16, u64> = HashMap::new();
        for word in words {
            for unit in word.as_ref().encode_utf16() {
                *frequency.entry(unit).or_default() += 1;
            }
        }

        let mut ranked: Vec<(u16, u64)> = frequency.into_iter().collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));

        let mut codec = Self::with_strategy(capacity, CodecStrategy::FrequencyRanked);
        for (unit, _) in ranked {
            codec.assign(unit)?;
        }
        Ok(codec)
    }

    fn with_strategy(capacity: usize, strategy: CodecStrategy) -> Self {
        let capacity = capacity.min(Code::MAX as usize);
        let mut units = Vec::with_capacity(capacity.min(1024) + 1);
        units.push(0);
        Self {
            table: vec![UNMAPPED; UNIT_SPACE].into_boxed_slice(),
            units,
            capacity,
            strategy,
        }
    }

    /// Code for `unit`, or [`UNMAPPED`].
    #[inline]
    pub fn code_of(&self, unit: u16) -> Code {
        self.table[unit as usize]
    }

    /// Code for `unit`, assigning the next free code if it has none.
    pub fn assign(&mut self, unit: u16) -> Result<Code> {
        let code = self.table[unit as usize];
        if code != UNMAPPED {
            return Ok(code);
        }
        if self.units.len() > self.capacity {
            return Err(AutomatonError::AlphabetOverflow {
                capacity: self.capacity,
            });
        }
        let code = self.units.len() as Code;
        self.table[unit as usize] = code;
        self.units.push(unit);
        Ok(code)
    }

    /// Encode every unit of `word`, assigning codes as needed.
    pub fn assign_all(&mut self, word: &str) -> Result<Vec<Code>> {
        word.encode_utf16().map(|unit| self.assign(unit)).collect()
    }

    /// Unit carrying `code`, if the code is assigned.
    pub fn unit_of(&self, code: Code) -> Option<u16> {
        if code == UNMAPPED {
            return None;
        }
        self.units.get(code as usize).copied()
    }

    /// One past the largest assigned code. Codes live in `[0, char_count)`.
    pub fn char_count(&self) -> usize {
        self.units.len()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn strategy(&self) -> CodecStrategy {
        self.strategy
    }
}

impl std::fmt::Debug for CharCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CharCodec")
            .field("char_count", &self.char_count())
            .field("capacity", &self.capacity)
            .field("strategy", &self.strategy)
            .finish()
    }
}
