//! Error type for automaton construction and mutation.

/// Errors surfaced by the engine.
///
/// Unmapped code units and inconsistent double-array indices are not errors:
/// the first resolve as "no transition", the second are logged and fall back
/// to the root.
#[derive(Debug, thiserror::Error)]
pub enum AutomatonError {
    #[error("dictionary exceeds alphabet capacity of {capacity} distinct code units")]
    AlphabetOverflow { capacity: usize },
    #[error("automaton is read-only")]
    ReadOnly,
    #[error("mutation failed: {0}")]
    MutationFailed(String),
}

pub type Result<T> = std::result::Result<T, AutomatonError>;
