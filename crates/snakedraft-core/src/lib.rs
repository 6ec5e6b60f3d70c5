// Snake draft engine: selectors, turns, rounds, the draft itself, the
// session that binds picks to a candidate pool, and post-draft reviews.

pub mod draft;
pub mod error;
pub mod pool;
pub mod review;
pub mod round;
pub mod selector;
pub mod session;
pub mod turn;

pub use draft::{
    round_sizes, selections_per_selector, Draft, DraftEvent, DraftObserver, DraftStateData,
    MIN_REMAINING_SELECTIONS,
};
pub use error::DraftError;
pub use pool::{EntryPool, EntrySelection, ListEntry, SelectableEntry};
pub use review::{Review, ReviewError, Reviewer, MAX_SCORE, MIN_SCORE};
pub use selector::{Person, Selector};
pub use session::{BoardColumn, DraftSession, SessionSnapshot};
