// A single selector's slot within a round.

use crate::error::DraftError;
use crate::selector::Selector;

/// Global and round-local position of a turn, both 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TurnNumbers {
    pub global: usize,
    pub round: usize,
}

/// One selector's allocation slot within a round.
///
/// `selector` indexes into the selector list owned by the draft. The local
/// `selections_made` mirrors the selector's per-round count.
#[derive(Debug, Clone)]
pub struct Turn {
    selector: usize,
    selections_per_turn: u32,
    selections_made: u32,
    global_turn_number: usize,
    round_turn_number: usize,
}

impl Turn {
    pub fn new(
        selector: usize,
        selections_per_turn: u32,
        global_turn_number: usize,
        round_turn_number: usize,
    ) -> Self {
        Turn {
            selector,
            selections_per_turn,
            selections_made: 0,
            global_turn_number,
            round_turn_number,
        }
    }

    pub fn selector_index(&self) -> usize {
        self.selector
    }

    pub fn selections_per_turn(&self) -> u32 {
        self.selections_per_turn
    }

    pub fn selections_made(&self) -> u32 {
        self.selections_made
    }

    pub fn turn_numbers(&self) -> TurnNumbers {
        TurnNumbers {
            global: self.global_turn_number,
            round: self.round_turn_number,
        }
    }

    /// Record one pick for this turn's selector in `round_number`.
    ///
    /// The selector is updated first so a failure leaves the turn untouched.
    pub fn make_selection(
        &mut self,
        round_number: usize,
        selectors: &mut [Selector],
    ) -> Result<(), DraftError> {
        if self.is_complete() {
            return Ok(());
        }
        self.selector_mut(selectors)?.make_selection(round_number)?;
        self.selections_made += 1;
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
        self.selector_mut(selectors)?.undo_selection(round_number)?;
        self.selections_made -= 1;
        Ok(())
    }

    pub fn is_complete(&self) -> bool {
        self.selections_made >= self.selections_per_turn
    }

    pub fn is_empty(&self) -> bool {
        self.selections_made == 0
    }

    pub fn reset(&mut self) {
        self.selections_made = 0;
    }

    fn selector_mut<'a>(
        &self,
        selectors: &'a mut [Selector],
    ) -> Result<&'a mut Selector, DraftError> {
        selectors
            .get_mut(self.selector)
            .ok_or_else(|| DraftError::UnknownSelector(format!("seat {}", self.selector)))
    }
}
