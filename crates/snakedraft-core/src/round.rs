// One pass through every selector, in snake order.

use crate::error::DraftError;
use crate::selector::Selector;
use crate::turn::Turn;

/// A single pass of turns, one per selector.
///
/// Turn order is the selector order, or its reverse on alternating rounds.
#[derive(Debug, Clone)]
pub struct Round {
    selections_per_round: u32,
    selections_made: u32,
    current_turn_index: usize,
    turns: Vec<Turn>,
}

impl Round {
    /// Build a round for `selector_count` selectors.
    ///
    /// `global_turn_offset` is the number of turns in all earlier rounds,
    /// so global turn numbers continue across the draft.
    pub(crate) fn new(
        selections_per_turn: u32,
        selector_count: usize,
        global_turn_offset: usize,
        reverse_order: bool,
    ) -> Self {
        let seats: Vec<usize> = if reverse_order {
            (0..selector_count).rev().collect()
        } else {
            (0..selector_count).collect()
        };

        let turns = seats
            .into_iter()
            .enumerate()
            .map(|(idx, seat)| {
                Turn::new(seat, selections_per_turn, global_turn_offset + idx + 1, idx + 1)
            })
            .collect();

        Round {
            selections_per_round: selections_per_turn * selector_count as u32,
            selections_made: 0,
            current_turn_index: 0,
            turns,
        }
    }

    pub fn selections_per_round(&self) -> u32 {
        self.selections_per_round
    }

    pub fn selections_made(&self) -> u32 {
        self.selections_made
    }

    pub fn current_turn_index(&self) -> usize {
        self.current_turn_index
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    pub fn current_turn(&self) -> &Turn {
        &self.turns[self.current_turn_index]
    }

    /// Quota of every turn in this round.
    pub fn selections_per_turn(&self) -> u32 {
        self.turns
            .first()
            .map(Turn::selections_per_turn)
            .unwrap_or(0)
    }

    /// Seat of the selector whose turn it is.
    pub fn active_selector(&self) -> usize {
        self.current_turn().selector_index()
    }

    pub fn make_selection(
        &mut self,
        round_number: usize,
        selectors: &mut [Selector],
    ) -> Result<(), DraftError> {
        if self.is_complete() {
            return Ok(());
        }
        let idx = self.current_turn_index;
        self.turns[idx].make_selection(round_number, selectors)?;
        self.selections_made += 1;
        if self.turns[idx].is_complete() {
            self.advance_to_next_turn();
        }
        Ok(())
    }

    pub fn undo_selection(
        &mut self,
        round_number: usize,
        selectors: &mut [Selector],
    ) -> Result<(), DraftError> {
        if self.is_empty() {
            return Ok(());
        }
        if self.current_turn().is_empty() {
            self.return_to_previous_turn();
        }
        let idx = self.current_turn_index;
        self.turns[idx].undo_selection(round_number, selectors)?;
        self.selections_made -= 1;
        Ok(())
    }

    pub fn is_complete(&self) -> bool {
        let selections_complete = self.selections_made >= self.selections_per_round;
        let is_last_turn = self.current_turn_index + 1 == self.turns.len();
        selections_complete && is_last_turn && self.current_turn().is_complete()
    }

    pub fn is_empty(&self) -> bool {
        self.selections_made == 0 && self.current_turn_index == 0 && self.current_turn().is_empty()
    }

    /// Zero every turn and rewind to the first one. Selector counters are
    /// reset by the draft.
    pub fn reset(&mut self) {
        self.selections_made = 0;
        self.current_turn_index = 0;
        for turn in &mut self.turns {
            turn.reset();
        }
    }

    fn advance_to_next_turn(&mut self) {
        if self.is_complete() || !self.current_turn().is_complete() {
            return;
        }
        self.current_turn_index += 1;
    }

    fn return_to_previous_turn(&mut self) {
        if self.is_empty() || !self.current_turn().is_empty() {
            return;
        }
        self.current_turn_index -= 1;
    }
}
