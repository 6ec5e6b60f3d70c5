// Draft participants and their per-round pick counters.

use serde::{Deserialize, Serialize};

use crate::error::DraftError;

/// The display identity of a participant. The color doubles as the stable
/// key used to match participants across restarts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Person {
    pub name: String,
    /// Hex color (e.g. "#e6194b"), compared case-insensitively.
    pub color: String,
    /// Foreground color to use on top of `color`.
    pub contrast: String,
}

impl Person {
    pub fn new(
        name: impl Into<String>,
        color: impl Into<String>,
        contrast: impl Into<String>,
    ) -> Self {
        Person {
            name: name.into(),
            color: color.into(),
            contrast: contrast.into(),
        }
    }
}

/// Counters for one round, as announced by the draft.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct RoundTally {
    made: u32,
    total: u32,
}

/// A participant in the draft.
///
/// Round numbers are 1-based. The per-round table is a vector indexed by
/// `round_number - 1`; a slot is `None` until the draft seeds it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selector {
    person: Person,
    current_order: u32,
    rounds: Vec<Option<RoundTally>>,
}

impl Selector {
    pub fn new(person: Person) -> Self {
        Selector {
            person,
            current_order: 0,
            rounds: Vec::new(),
        }
    }

    pub fn person(&self) -> &Person {
        &self.person
    }

    pub fn name(&self) -> &str {
        &self.person.name
    }

    pub fn color(&self) -> &str {
        &self.person.color
    }

    pub fn contrast(&self) -> &str {
        &self.person.contrast
    }

    /// Lifetime number of picks made by this selector in the current draft.
    pub fn current_order(&self) -> u32 {
        self.current_order
    }

    /// Same participant, judged by color only.
    pub fn equals(&self, other: &Selector) -> bool {
        self.has_color(other.color())
    }

    pub fn has_color(&self, color: &str) -> bool {
        self.person.color.eq_ignore_ascii_case(color)
    }

    pub fn rename(&mut self, name: impl Into<String>) {
        self.person.name = name.into();
    }

    /// Number of rounds this selector currently knows about.
    pub fn rounds_registered(&self) -> usize {
        self.rounds.iter().filter(|r| r.is_some()).count()
    }

    /// Seed the counters for `round_number` with zero picks made out of
    /// `selections_per_round` allowed.
    pub fn set_round_info(&mut self, round_number: usize, selections_per_round: u32) {
        let Some(idx) = round_number.checked_sub(1) else {
            return;
        };
        if self.rounds.len() <= idx {
            self.rounds.resize(idx + 1, None);
        }
        self.rounds[idx] = Some(RoundTally {
            made: 0,
            total: selections_per_round,
        });
    }

    /// Forget every round and zero the lifetime counter. Called before a
    /// new draft seeds its own rounds.
    pub fn clear_round_info(&mut self) {
        self.rounds.clear();
        self.current_order = 0;
    }

    pub fn make_selection(&mut self, round_number: usize) -> Result<(), DraftError> {
        let tally = self.tally_mut(round_number)?;
        tally.made += 1;
        self.current_order += 1;
        Ok(())
    }

    pub fn undo_selection(&mut self, round_number: usize) -> Result<(), DraftError> {
        let tally = self.tally_mut(round_number)?;
        tally.made = tally.made.saturating_sub(1);
        self.current_order = self.current_order.saturating_sub(1);
        Ok(())
    }

    /// Zero the lifetime counter and this round's picks. The round's quota
    /// is structural and survives.
    pub fn reset_count_info(&mut self, round_number: usize) -> Result<(), DraftError> {
        self.tally_mut(round_number)?.made = 0;
        self.current_order = 0;
        Ok(())
    }

    pub fn selections_made_for_round(&self, round_number: usize) -> Result<u32, DraftError> {
        self.tally(round_number).map(|t| t.made)
    }

    pub fn total_selections_for_round(&self, round_number: usize) -> Result<u32, DraftError> {
        self.tally(round_number).map(|t| t.total)
    }

    fn tally(&self, round_number: usize) -> Result<RoundTally, DraftError> {
        round_number
            .checked_sub(1)
            .and_then(|idx| self.rounds.get(idx).copied().flatten())
            .ok_or_else(|| self.not_registered(round_number))
    }

    fn tally_mut(&mut self, round_number: usize) -> Result<&mut RoundTally, DraftError> {
        let name = &self.person.name;
        match round_number
            .checked_sub(1)
            .and_then(|idx| self.rounds.get_mut(idx))
        {
            Some(Some(tally)) => Ok(tally),
            _ => Err(DraftError::RoundNotRegistered {
                selector: name.clone(),
                round_number,
            }),
        }
    }

    fn not_registered(&self, round_number: usize) -> DraftError {
        DraftError::RoundNotRegistered {
            selector: self.person.name.clone(),
            round_number,
        }
    }
}

impl From<Person> for Selector {
    fn from(person: Person) -> Self {
        Selector::new(person)
    }
}
