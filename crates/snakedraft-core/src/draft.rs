// Draft orchestration: capacity, round layout, and the active-round cursor.

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::DraftError;
use crate::round::Round;
use crate::selector::Selector;

/// Entries that are always left in the pool, undrafted.
pub const MIN_REMAINING_SELECTIONS: usize = 3;

/// Snapshot of draft progress, published after every mutation.
///
/// Describes the position the *next* pick will occupy: the active turn,
/// the active round and the active selector's lifetime count.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DraftStateData {
    /// Picks made across the whole draft.
    pub global_order: u32,
    /// Picks made so far by the active selector (0 once the draft is complete).
    pub individual_selector_order: u32,
    /// 1-based turn number across the whole draft.
    pub global_turn_number: u32,
    /// 1-based count of turns offered to the active selector.
    pub individual_selector_turn_number: u32,
    /// Picks made in the active turn.
    pub turn_order: u32,
    /// 1-based round number.
    pub round_number: u32,
    /// Picks made in the active round.
    pub round_order: u32,
    /// 1-based turn position within the round.
    pub round_turn_number: u32,
    pub rounds_count: u32,
}

/// Notification delivered to draft observers.
#[derive(Debug, Clone, Copy)]
pub enum DraftEvent<'a> {
    /// Published once per mutating call.
    State(DraftStateData),
    /// The selector on the clock changed. `None` once the draft completes.
    ActiveSelector(Option<&'a Selector>),
    /// Completion flipped.
    Complete(bool),
}

/// Synchronous callback invoked from inside the mutating call.
pub type DraftObserver = Box<dyn FnMut(&DraftEvent<'_>) + Send>;

/// Per-selector quota for a pool of `total_entries`, after reserving
/// [`MIN_REMAINING_SELECTIONS`].
///
/// Every published counter is a `u32`, so the pool must fit in one.
pub fn selections_per_selector(
    total_entries: usize,
    selector_count: usize,
) -> Result<u32, DraftError> {
    if selector_count == 0 {
        return Err(DraftError::EmptyRoster);
    }
    let too_large = DraftError::PoolTooLarge { total_entries };
    let total = u32::try_from(total_entries).map_err(|_| too_large.clone())?;
    let selector_count_u32 = u32::try_from(selector_count).map_err(|_| too_large)?;
    let quota = total.saturating_sub(MIN_REMAINING_SELECTIONS as u32) / selector_count_u32;
    if quota == 0 {
        return Err(DraftError::PoolTooSmall {
            total_entries,
            selector_count,
            minimum: MIN_REMAINING_SELECTIONS + selector_count,
        });
    }
    Ok(quota)
}

/// Turn sizes for each round: repeatedly take the ceiling of half of what
/// is left until the quota is used up (10 -> [5, 3, 1, 1]).
pub fn round_sizes(per_selector_quota: u32) -> Vec<u32> {
    let mut remaining = per_selector_quota;
    let mut sizes = Vec::new();
    while remaining > 0 {
        let per_turn = remaining.div_ceil(2);
        sizes.push(per_turn);
        remaining -= per_turn;
    }
    sizes
}

/// Observable signals compared before and after a mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Signals {
    active: Option<usize>,
    complete: bool,
}

/// A snake draft over a fixed pool and a fixed set of selectors.
pub struct Draft {
    total_entries: usize,
    available_selections: usize,
    remaining_selections: usize,
    selections_made: usize,
    current_round_index: usize,
    rounds: Vec<Round>,
    selectors: Vec<Selector>,
    observers: Vec<DraftObserver>,
}

impl Draft {
    /// Lay out a draft of `total_entries` across `selectors`.
    ///
    /// Each selector's round table is cleared and reseeded, so selectors
    /// carried over from a previous draft start from zero.
    pub fn new(total_entries: usize, selectors: Vec<Selector>) -> Result<Self, DraftError> {
        let quota = selections_per_selector(total_entries, selectors.len())?;
        Ok(Self::with_quota(total_entries, quota, selectors))
    }

    /// Lay out a draft whose quota was already validated with
    /// [`selections_per_selector`].
    pub(crate) fn with_quota(
        total_entries: usize,
        quota: u32,
        mut selectors: Vec<Selector>,
    ) -> Self {
        let selector_count = selectors.len();
        let available_selections = quota as usize * selector_count;

        for selector in &mut selectors {
            selector.clear_round_info();
        }

        let mut rounds = Vec::new();
        let mut global_turn_offset = 0;
        for (idx, per_turn) in round_sizes(quota).into_iter().enumerate() {
            rounds.push(Round::new(
                per_turn,
                selector_count,
                global_turn_offset,
                idx % 2 == 1,
            ));
            for selector in &mut selectors {
                selector.set_round_info(idx + 1, per_turn);
            }
            global_turn_offset += selector_count;
        }

        info!(
            "Draft laid out: {} entries, {} selectors, {} available, {} rounds",
            total_entries,
            selector_count,
            available_selections,
            rounds.len()
        );

        Draft {
            total_entries,
            available_selections,
            remaining_selections: total_entries - available_selections,
            selections_made: 0,
            current_round_index: 0,
            rounds,
            selectors,
            observers: Vec::new(),
        }
    }

    pub fn total_entries(&self) -> usize {
        self.total_entries
    }

    pub fn available_selections(&self) -> usize {
        self.available_selections
    }

    pub fn remaining_selections(&self) -> usize {
        self.remaining_selections
    }

    pub fn selections_made(&self) -> usize {
        self.selections_made
    }

    pub fn current_round_index(&self) -> usize {
        self.current_round_index
    }

    pub fn rounds(&self) -> &[Round] {
        &self.rounds
    }

    pub fn current_round(&self) -> &Round {
        &self.rounds[self.current_round_index]
    }

    /// Turn quota of each round, in round order.
    pub fn round_sizes(&self) -> Vec<u32> {
        self.rounds.iter().map(Round::selections_per_turn).collect()
    }

    pub fn selectors(&self) -> &[Selector] {
        &self.selectors
    }

    /// The selector on the clock, or `None` once the draft is complete.
    pub fn active_selector(&self) -> Option<&Selector> {
        self.active_seat().map(|seat| &self.selectors[seat])
    }

    pub fn rename_selector(&mut self, color: &str, name: &str) -> Result<(), DraftError> {
        let selector = self
            .selectors
            .iter_mut()
            .find(|s| s.has_color(color))
            .ok_or_else(|| DraftError::UnknownSelector(color.to_string()))?;
        selector.rename(name);
        Ok(())
    }

    /// Register an observer. It immediately receives the current
    /// completion flag, active selector and state.
    pub fn subscribe(&mut self, mut observer: DraftObserver) {
        observer(&DraftEvent::Complete(self.is_complete()));
        observer(&DraftEvent::ActiveSelector(self.active_selector()));
        observer(&DraftEvent::State(self.state_data()));
        self.observers.push(observer);
    }

    /// Hand the selectors and observers over, e.g. to a rebuilt draft.
    pub fn into_parts(self) -> (Vec<Selector>, Vec<DraftObserver>) {
        (self.selectors, self.observers)
    }

    pub fn into_selectors(self) -> Vec<Selector> {
        self.selectors
    }

    pub fn make_selection(&mut self) -> Result<(), DraftError> {
        if self.is_complete() {
            return Ok(());
        }
        let before = self.signals();
        let idx = self.current_round_index;

        self.rounds[idx].make_selection(idx + 1, &mut self.selectors)?;
        self.selections_made += 1;
        if self.rounds[idx].is_complete() {
            self.advance_to_next_round();
        }

        debug!(
            "Selection {} of {} made (round {})",
            self.selections_made,
            self.available_selections,
            idx + 1
        );
        self.publish(before);
        Ok(())
    }

    pub fn undo_selection(&mut self) -> Result<(), DraftError> {
        if self.is_empty() {
            return Ok(());
        }
        let before = self.signals();

        if self.current_round().is_empty() {
            self.return_to_previous_round();
        }
        if self.is_complete() {
            // Completion never moves the cursor past the final round.
            self.current_round_index = self.rounds.len() - 1;
        }

        let idx = self.current_round_index;
        self.rounds[idx].undo_selection(idx + 1, &mut self.selectors)?;
        self.selections_made -= 1;

        debug!(
            "Selection undone, {} of {} remain (round {})",
            self.selections_made,
            self.available_selections,
            idx + 1
        );
        self.publish(before);
        Ok(())
    }

    pub fn is_complete(&self) -> bool {
        let selections_complete = self.selections_made >= self.available_selections;
        let is_last_round = self.current_round_index + 1 == self.rounds.len();
        selections_complete && is_last_round && self.current_round().is_complete()
    }

    pub fn is_empty(&self) -> bool {
        self.selections_made == 0
            && self.current_round_index == 0
            && self.current_round().is_empty()
    }

    /// Return to the empty state without rebuilding rounds or turns.
    pub fn reset(&mut self) -> Result<(), DraftError> {
        let before = self.signals();
        for round in &mut self.rounds {
            round.reset();
        }
        for selector in &mut self.selectors {
            for round_number in 1..=self.rounds.len() {
                selector.reset_count_info(round_number)?;
            }
        }
        self.selections_made = 0;
        self.current_round_index = 0;

        info!("Draft reset");
        self.publish(before);
        Ok(())
    }

    pub fn state_data(&self) -> DraftStateData {
        let round = self.current_round();
        let round_index = self.current_round_index;
        DraftStateData {
            global_order: self.selections_made as u32,
            individual_selector_order: self
                .active_selector()
                .map(Selector::current_order)
                .unwrap_or(0),
            global_turn_number: (round_index * round.turns().len()
                + round.current_turn_index()
                + 1) as u32,
            individual_selector_turn_number: (round_index + 1) as u32,
            turn_order: round.current_turn().selections_made(),
            round_number: (round_index + 1) as u32,
            round_order: round.selections_made(),
            round_turn_number: (round.current_turn_index() + 1) as u32,
            rounds_count: self.rounds.len() as u32,
        }
    }

    fn active_seat(&self) -> Option<usize> {
        if self.is_complete() {
            None
        } else {
            Some(self.current_round().active_selector())
        }
    }

    fn advance_to_next_round(&mut self) {
        if self.is_complete() {
            info!("Draft complete after {} selections", self.selections_made);
            return;
        }
        if !self.current_round().is_complete() {
            return;
        }
        self.current_round_index += 1;
    }

    fn return_to_previous_round(&mut self) {
        if self.is_empty() || !self.current_round().is_empty() {
            return;
        }
        self.current_round_index -= 1;
    }

    fn signals(&self) -> Signals {
        Signals {
            active: self.active_seat(),
            complete: self.is_complete(),
        }
    }

    fn publish(&mut self, before: Signals) {
        let after = self.signals();
        let state = self.state_data();
        let Draft {
            observers,
            selectors,
            ..
        } = self;

        for observer in observers.iter_mut() {
            if after.complete != before.complete {
                observer(&DraftEvent::Complete(after.complete));
            }
            if after.active != before.active {
                observer(&DraftEvent::ActiveSelector(
                    after.active.map(|seat| &selectors[seat]),
                ));
            }
            observer(&DraftEvent::State(state));
        }
    }
}

impl fmt::Debug for Draft {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Draft")
            .field("total_entries", &self.total_entries)
            .field("available_selections", &self.available_selections)
            .field("remaining_selections", &self.remaining_selections)
            .field("selections_made", &self.selections_made)
            .field("current_round_index", &self.current_round_index)
            .field("rounds", &self.rounds)
            .field("selectors", &self.selectors)
            .field("observers", &self.observers.len())
            .finish()
    }
}
