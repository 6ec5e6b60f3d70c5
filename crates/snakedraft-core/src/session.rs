// Draft session: binds abstract picks to concrete pool entries.
//
// A session owns the candidate pool and, whenever the pool and roster can
// support one, a Draft. Participant or pool changes reset every pick and
// rebuild the draft; selectors keep their identity across rebuilds.

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::draft::{selections_per_selector, Draft, DraftObserver, DraftStateData};
use crate::error::DraftError;
use crate::pool::{EntryPool, ListEntry, SelectableEntry};
use crate::selector::{Person, Selector};

/// Everything needed to rebuild a session: selector identities in seat
/// order and every pool entry with its selection.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub selectors: Vec<Person>,
    pub entries: Vec<SelectableEntry>,
}

impl SessionSnapshot {
    /// Number of entries recorded as selected.
    pub fn pick_count(&self) -> usize {
        self.entries.iter().filter(|e| e.is_selected()).count()
    }
}

/// One selector's picks, in the order they were made.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoardColumn {
    pub selector: Person,
    pub picks: Vec<SelectableEntry>,
}

pub struct DraftSession {
    pool: EntryPool,
    draft: Option<Draft>,
    /// Selectors and observers parked while no draft can be built.
    idle_selectors: Vec<Selector>,
    idle_observers: Vec<DraftObserver>,
}

impl DraftSession {
    pub fn new(entries: Vec<ListEntry>, people: Vec<Person>) -> Self {
        let mut session = DraftSession {
            pool: EntryPool::new(entries),
            draft: None,
            idle_selectors: Vec::new(),
            idle_observers: Vec::new(),
        };
        session.add_people(people);
        session.rebuild();
        session
    }

    /// Rebuild a session from a snapshot by replaying its selections in
    /// global order through the normal selection path.
    pub fn restore(snapshot: SessionSnapshot) -> Result<Self, DraftError> {
        let entries = snapshot.entries.iter().map(|e| e.entry.clone()).collect();
        Self::restore_onto(entries, snapshot)
    }

    /// Like [`DraftSession::restore`], but over a freshly loaded pool.
    /// Recorded picks are matched to `entries` by title and year.
    pub fn restore_onto(
        entries: Vec<ListEntry>,
        snapshot: SessionSnapshot,
    ) -> Result<Self, DraftError> {
        let mut session = DraftSession::new(entries, snapshot.selectors);

        let mut history: Vec<&SelectableEntry> =
            snapshot.entries.iter().filter(|e| e.is_selected()).collect();
        history.sort_by_key(|e| e.global_order());

        for (idx, old) in history.iter().enumerate() {
            let Some(selection) = old.selection.as_ref() else {
                continue;
            };
            let expected = idx as u32 + 1;
            if selection.stamp.global_order != expected {
                return Err(DraftError::StructuralMismatch(format!(
                    "'{}' recorded as pick {} but replay is at pick {}",
                    old.entry.title, selection.stamp.global_order, expected
                )));
            }
            let index = session
                .pool
                .find_by_title_year(&old.entry.title, &old.entry.year)
                .ok_or_else(|| {
                    DraftError::StructuralMismatch(format!(
                        "entry '{}' ({}) is not in the pool",
                        old.entry.title, old.entry.year
                    ))
                })?;
            session.replay_selection(index, &selection.selector_color)?;
        }

        info!(
            "Session restored: {} selections replayed over {} entries",
            history.len(),
            session.pool.len()
        );
        Ok(session)
    }

    pub fn pool(&self) -> &EntryPool {
        &self.pool
    }

    pub fn draft(&self) -> Option<&Draft> {
        self.draft.as_ref()
    }

    pub fn selectors(&self) -> &[Selector] {
        match &self.draft {
            Some(draft) => draft.selectors(),
            None => &self.idle_selectors,
        }
    }

    pub fn state_data(&self) -> Option<DraftStateData> {
        self.draft.as_ref().map(Draft::state_data)
    }

    pub fn active_selector(&self) -> Option<&Selector> {
        self.draft.as_ref().and_then(Draft::active_selector)
    }

    pub fn is_complete(&self) -> bool {
        self.draft.as_ref().is_some_and(Draft::is_complete)
    }

    /// Register an observer on the current draft and on every draft this
    /// session rebuilds afterwards.
    pub fn subscribe(&mut self, observer: DraftObserver) {
        match self.draft.as_mut() {
            Some(draft) => draft.subscribe(observer),
            None => self.idle_observers.push(observer),
        }
    }

    /// Replace the pool. All picks are discarded.
    pub fn set_entries(&mut self, entries: Vec<ListEntry>) {
        self.pool = EntryPool::new(entries);
        self.rebuild();
    }

    /// Add selectors at the end of the seat order. Colors already in use
    /// are skipped.
    pub fn add_selectors(&mut self, people: Vec<Person>) {
        self.pool.reset();
        let mut selectors = self.take_selectors();
        for person in people {
            if selectors.iter().any(|s| s.has_color(&person.color)) {
                warn!("Skipping selector '{}': color {} already in use", person.name, person.color);
                continue;
            }
            selectors.push(Selector::new(person));
        }
        self.idle_selectors = selectors;
        self.rebuild();
    }

    pub fn remove_selector(&mut self, color: &str) -> Result<Person, DraftError> {
        let idx = self
            .selectors()
            .iter()
            .position(|s| s.has_color(color))
            .ok_or_else(|| DraftError::UnknownSelector(color.to_string()))?;
        let mut selectors = self.take_selectors();
        let removed = selectors.remove(idx);
        self.pool.reset();
        self.idle_selectors = selectors;
        self.rebuild();
        Ok(removed.person().clone())
    }

    /// Rename a selector in place. Picks are kept.
    pub fn rename_selector(&mut self, color: &str, name: &str) -> Result<(), DraftError> {
        match self.draft.as_mut() {
            Some(draft) => draft.rename_selector(color, name)?,
            None => self
                .idle_selectors
                .iter_mut()
                .find(|s| s.has_color(color))
                .ok_or_else(|| DraftError::UnknownSelector(color.to_string()))?
                .rename(name),
        }
        self.pool.rename_selector(color, name);
        Ok(())
    }

    pub fn clear_selectors(&mut self) {
        self.pool.reset();
        self.take_selectors();
        self.rebuild();
    }

    /// Claim the entry at `position` for the selector on the clock.
    ///
    /// Returns `Ok(false)` without changing anything when there is no
    /// draft, the draft is complete, or the entry is taken or disabled.
    pub fn select_entry(&mut self, position: u32) -> Result<bool, DraftError> {
        let index = self
            .pool
            .index_of(position)
            .ok_or(DraftError::UnknownEntry(position))?;
        self.select_at(index, None)
    }

    /// Release the most recently claimed entry and step the draft back.
    pub fn undo_last_selection(&mut self) -> Result<bool, DraftError> {
        let Some(draft) = self.draft.as_mut() else {
            return Ok(false);
        };
        let Some(index) = self.pool.last_selected() else {
            return Ok(false);
        };
        draft.undo_selection()?;
        self.pool.deselect_entry(index);
        debug!("Undid selection of entry {}", index);
        Ok(true)
    }

    /// Release every entry and return the draft to its first pick.
    pub fn reset(&mut self) -> Result<(), DraftError> {
        self.pool.reset();
        if let Some(draft) = self.draft.as_mut() {
            draft.reset()?;
        }
        Ok(())
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            selectors: self.selectors().iter().map(|s| s.person().clone()).collect(),
            entries: self.pool.entries().to_vec(),
        }
    }

    /// Each selector's picks in pick order, in seat order.
    pub fn board(&self) -> Vec<BoardColumn> {
        self.selectors()
            .iter()
            .map(|selector| {
                let mut picks: Vec<SelectableEntry> = self
                    .pool
                    .entries()
                    .iter()
                    .filter(|e| {
                        e.selection
                            .as_ref()
                            .is_some_and(|s| selector.has_color(&s.selector_color))
                    })
                    .cloned()
                    .collect();
                picks.sort_by_key(|e| e.global_order());
                BoardColumn {
                    selector: selector.person().clone(),
                    picks,
                }
            })
            .collect()
    }

    fn replay_selection(&mut self, index: usize, selector_color: &str) -> Result<(), DraftError> {
        if !self.select_at(index, Some(selector_color))? {
            let title = self
                .pool
                .get(index)
                .map(|e| e.entry.title.clone())
                .unwrap_or_default();
            return Err(DraftError::StructuralMismatch(format!(
                "selection of '{title}' could not be replayed"
            )));
        }
        Ok(())
    }

    /// Claim the entry at `index`. When `expected_color` is given, the
    /// selector on the clock must carry that color.
    fn select_at(&mut self, index: usize, expected_color: Option<&str>) -> Result<bool, DraftError> {
        let Some(picker) = self.active_selector().cloned() else {
            return Ok(false);
        };
        if let Some(color) = expected_color {
            if !self.roster_has(color) {
                return Err(DraftError::StructuralMismatch(format!(
                    "selector with color {color} is not in the roster"
                )));
            }
            if !picker.has_color(color) {
                return Err(DraftError::StructuralMismatch(format!(
                    "pick recorded for {color} but {} is on the clock",
                    picker.color()
                )));
            }
        }
        if !self.pool.is_selectable(index) {
            return Ok(false);
        }

        let Some(draft) = self.draft.as_mut() else {
            return Ok(false);
        };
        let upcoming = upcoming_pick(draft.state_data());
        draft.make_selection()?;
        self.pool.select_entry(index, &picker, upcoming);

        debug!(
            "{} claimed entry {} as pick {}",
            picker.name(),
            index,
            upcoming.global_order
        );
        Ok(true)
    }

    fn roster_has(&self, color: &str) -> bool {
        self.selectors().iter().any(|s| s.has_color(color))
    }

    fn add_people(&mut self, people: Vec<Person>) {
        for person in people {
            if self.idle_selectors.iter().any(|s| s.has_color(&person.color)) {
                warn!("Skipping selector '{}': color {} already in use", person.name, person.color);
                continue;
            }
            self.idle_selectors.push(Selector::new(person));
        }
    }

    /// Take the selectors out of the draft (or the idle list), parking the
    /// draft's observers until the next rebuild.
    fn take_selectors(&mut self) -> Vec<Selector> {
        match self.draft.take() {
            Some(draft) => {
                let (selectors, observers) = draft.into_parts();
                self.idle_observers.extend(observers);
                selectors
            }
            None => std::mem::take(&mut self.idle_selectors),
        }
    }

    fn rebuild(&mut self) {
        let selectors = self.take_selectors();
        let total = self.pool.available_entries();
        match selections_per_selector(total, selectors.len()) {
            Ok(quota) => {
                let mut draft = Draft::with_quota(total, quota, selectors);
                for observer in self.idle_observers.drain(..) {
                    draft.subscribe(observer);
                }
                self.draft = Some(draft);
            }
            Err(err) => {
                debug!("No draft for {} entries: {}", total, err);
                self.idle_selectors = selectors;
            }
        }
    }
}

/// The stamp recorded on an entry: the state as it will read once the
/// pick lands, counted from the pre-pick state.
fn upcoming_pick(state: DraftStateData) -> DraftStateData {
    DraftStateData {
        global_order: state.global_order + 1,
        individual_selector_order: state.individual_selector_order + 1,
        turn_order: state.turn_order + 1,
        round_order: state.round_order + 1,
        ..state
    }
}

impl fmt::Debug for DraftSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DraftSession")
            .field("pool", &self.pool)
            .field("draft", &self.draft)
            .field("idle_selectors", &self.idle_selectors)
            .field("idle_observers", &self.idle_observers.len())
            .finish()
    }
}
