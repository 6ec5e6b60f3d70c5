// Error types for the draft engine and session.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DraftError {
    /// A selector's per-round table was touched for a round that was never
    /// seeded with `set_round_info`. Indicates a construction bug.
    #[error("round {round_number} not registered for selector '{selector}'")]
    RoundNotRegistered { selector: String, round_number: usize },

    /// Persisted selection history cannot be matched against the freshly
    /// rebuilt selectors and pool.
    #[error("persisted draft does not match current structure: {0}")]
    StructuralMismatch(String),

    #[error("a draft needs at least one selector")]
    EmptyRoster,

    #[error(
        "pool of {total_entries} entries is too small for {selector_count} selectors \
         (need at least {minimum})"
    )]
    PoolTooSmall {
        total_entries: usize,
        selector_count: usize,
        minimum: usize,
    },

    #[error("pool of {total_entries} entries is too large to draft")]
    PoolTooLarge { total_entries: usize },

    #[error("no selector with color '{0}'")]
    UnknownSelector(String),

    #[error("no pool entry at position {0}")]
    UnknownEntry(u32),
}

impl DraftError {
    /// Whether this error means persisted state should be discarded.
    pub fn is_structural(&self) -> bool {
        matches!(self, DraftError::StructuralMismatch(_))
    }
}
