// Candidate pool: the entries being drafted and who claimed them.

use serde::{Deserialize, Serialize};

use crate::draft::DraftStateData;
use crate::selector::Selector;

/// A single candidate in the pool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListEntry {
    /// 1-based position in the source list. Unique within a pool.
    pub position: u32,
    pub title: String,
    pub year: String,
    #[serde(default)]
    pub url_slug: String,
    #[serde(default)]
    pub poster_url: String,
    #[serde(default)]
    pub suggested_by: Option<String>,
    /// Disabled entries are shown but can never be drafted.
    #[serde(default)]
    pub disabled: bool,
}

/// Who claimed an entry, and the draft position of that pick.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntrySelection {
    pub selector_color: String,
    pub selector_name: String,
    pub stamp: DraftStateData,
}

/// A pool entry plus its selection, if any.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectableEntry {
    pub entry: ListEntry,
    #[serde(default)]
    pub selection: Option<EntrySelection>,
}

impl SelectableEntry {
    pub fn new(entry: ListEntry) -> Self {
        SelectableEntry {
            entry,
            selection: None,
        }
    }

    pub fn is_selected(&self) -> bool {
        self.selection.is_some()
    }

    pub fn is_disabled(&self) -> bool {
        self.entry.disabled
    }

    /// Global pick number that claimed this entry.
    pub fn global_order(&self) -> Option<u32> {
        self.selection.as_ref().map(|s| s.stamp.global_order)
    }

    /// Same title and year, used to match entries across restarts.
    pub fn matches(&self, title: &str, year: &str) -> bool {
        self.entry.title == title && self.entry.year == year
    }
}

/// The full candidate list with a running pick counter.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntryPool {
    entries: Vec<SelectableEntry>,
    current_order: u32,
}

impl EntryPool {
    pub fn new(entries: Vec<ListEntry>) -> Self {
        EntryPool {
            entries: entries.into_iter().map(SelectableEntry::new).collect(),
            current_order: 0,
        }
    }

    pub fn entries(&self) -> &[SelectableEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of picks currently recorded in the pool.
    pub fn current_order(&self) -> u32 {
        self.current_order
    }

    /// Entries that can be drafted, which sizes the draft.
    pub fn available_entries(&self) -> usize {
        self.entries.iter().filter(|e| !e.is_disabled()).count()
    }

    pub fn index_of(&self, position: u32) -> Option<usize> {
        self.entries.iter().position(|e| e.entry.position == position)
    }

    pub fn get(&self, index: usize) -> Option<&SelectableEntry> {
        self.entries.get(index)
    }

    pub fn find_by_title_year(&self, title: &str, year: &str) -> Option<usize> {
        self.entries.iter().position(|e| e.matches(title, year))
    }

    /// Whether the entry at `index` can still be claimed.
    pub fn is_selectable(&self, index: usize) -> bool {
        self.entries
            .get(index)
            .is_some_and(|e| !e.is_selected() && !e.is_disabled())
    }

    /// Claim an entry for `selector`. Selected or disabled entries are
    /// left alone; returns whether the entry was claimed.
    pub fn select_entry(&mut self, index: usize, selector: &Selector, stamp: DraftStateData) -> bool {
        if !self.is_selectable(index) {
            return false;
        }
        self.current_order += 1;
        self.entries[index].selection = Some(EntrySelection {
            selector_color: selector.color().to_string(),
            selector_name: selector.name().to_string(),
            stamp,
        });
        true
    }

    /// Release an entry. Unselected or disabled entries are left alone.
    pub fn deselect_entry(&mut self, index: usize) -> bool {
        let Some(entry) = self.entries.get_mut(index) else {
            return false;
        };
        if !entry.is_selected() || entry.is_disabled() {
            return false;
        }
        entry.selection = None;
        self.current_order = self.current_order.saturating_sub(1);
        true
    }

    /// Index of the most recently claimed entry.
    pub fn last_selected(&self) -> Option<usize> {
        if self.current_order == 0 {
            return None;
        }
        self.entries
            .iter()
            .position(|e| e.global_order() == Some(self.current_order))
    }

    /// Keep a claimed entry's recorded selector name in step with a rename.
    pub fn rename_selector(&mut self, color: &str, name: &str) {
        for entry in &mut self.entries {
            if let Some(selection) = entry.selection.as_mut() {
                if selection.selector_color.eq_ignore_ascii_case(color) {
                    selection.selector_name = name.to_string();
                }
            }
        }
    }

    /// Release every claimed entry.
    pub fn reset(&mut self) {
        for idx in 0..self.entries.len() {
            self.deselect_entry(idx);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::selector::Person;

    fn entry(position: u32, title: &str, disabled: bool) -> ListEntry {
        ListEntry {
            position,
            title: title.to_string(),
            year: "1999".to_string(),
            url_slug: String::new(),
            poster_url: String::new(),
            suggested_by: None,
            disabled,
        }
    }

    fn picker() -> Selector {
        Selector::new(Person::new("Alice", "#e6194b", "#ffffff"))
    }

    fn stamp(global_order: u32) -> DraftStateData {
        DraftStateData {
            global_order,
            ..Default::default()
        }
    }

    #[test]
    fn available_entries_skips_disabled() {
        let pool = EntryPool::new(vec![
            entry(1, "Alien", false),
            entry(2, "Brazil", true),
            entry(3, "Casablanca", false),
        ]);
        assert_eq!(pool.len(), 3);
        assert_eq!(pool.available_entries(), 2);
    }

    #[test]
    fn select_and_deselect_update_order() {
        let mut pool = EntryPool::new(vec![entry(1, "Alien", false), entry(2, "Brazil", false)]);
        assert!(pool.select_entry(1, &picker(), stamp(1)));
        assert_eq!(pool.current_order(), 1);
        assert_eq!(pool.last_selected(), Some(1));
        assert_eq!(
            pool.get(1).unwrap().selection.as_ref().unwrap().selector_name,
            "Alice"
        );

        // Already selected
        assert!(!pool.select_entry(1, &picker(), stamp(2)));
        assert_eq!(pool.current_order(), 1);

        assert!(pool.deselect_entry(1));
        assert_eq!(pool.current_order(), 0);
        assert_eq!(pool.last_selected(), None);
        assert!(!pool.deselect_entry(1));
    }

    #[test]
    fn disabled_entries_cannot_be_selected() {
        let mut pool = EntryPool::new(vec![entry(1, "Alien", true)]);
        assert!(!pool.is_selectable(0));
        assert!(!pool.select_entry(0, &picker(), stamp(1)));
        assert_eq!(pool.current_order(), 0);
    }

    #[test]
    fn reset_releases_everything() {
        let mut pool = EntryPool::new(vec![
            entry(1, "Alien", false),
            entry(2, "Brazil", false),
            entry(3, "Casablanca", false),
        ]);
        pool.select_entry(0, &picker(), stamp(1));
        pool.select_entry(2, &picker(), stamp(2));
        pool.reset();
        assert_eq!(pool.current_order(), 0);
        assert!(pool.entries().iter().all(|e| !e.is_selected()));
    }

    #[test]
    fn lookup_by_position_and_title() {
        let pool = EntryPool::new(vec![entry(4, "Alien", false), entry(9, "Brazil", false)]);
        assert_eq!(pool.index_of(9), Some(1));
        assert_eq!(pool.index_of(2), None);
        assert_eq!(pool.find_by_title_year("Alien", "1999"), Some(0));
        assert_eq!(pool.find_by_title_year("Alien", "1979"), None);
    }

    #[test]
    fn rename_updates_recorded_name() {
        let mut pool = EntryPool::new(vec![entry(1, "Alien", false)]);
        pool.select_entry(0, &picker(), stamp(1));
        pool.rename_selector("#E6194B", "Alicia");
        assert_eq!(
            pool.get(0).unwrap().selection.as_ref().unwrap().selector_name,
            "Alicia"
        );
    }
}
