//! Cross-page selection set.
//!
//! Membership is keyed on [`RecordId`] only and never looks at the page
//! buffer, so a record stays selected while its page is not loaded. The set
//! is shared (`Arc<SelectionSet>`) between row-toggle actions and the bulk
//! selector.
//!
//! Writers build the next set and swap it in under a short write lock.
//! Readers holding a [`SelectionSet::snapshot`] keep seeing the set as it was
//! when they took it, and nobody ever observes half of a `select_many`.

use std::collections::HashSet;
use std::sync::Arc;

use parking_lot::RwLock;
use serde::Serialize;

use crate::model::{Page, RecordId};

/// How much of one page is selected (drives the header checkbox).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PageSelectionState {
    None,
    Partial,
    All,
}

#[derive(Debug, Default)]
pub struct SelectionSet {
    ids: RwLock<Arc<HashSet<RecordId>>>,
}

impl SelectionSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    fn update<R>(&self, f: impl FnOnce(&mut HashSet<RecordId>) -> R) -> R {
        let mut guard = self.ids.write();
        f(Arc::make_mut(&mut *guard))
    }

    /// Flip membership of `id`. Returns whether it is selected afterwards.
    pub fn toggle(&self, id: RecordId) -> bool {
        self.update(|ids| {
            if ids.remove(&id) {
                false
            } else {
                ids.insert(id);
                true
            }
        })
    }

    pub fn is_selected(&self, id: RecordId) -> bool {
        self.ids.read().contains(&id)
    }

    /// Union `ids` into the set in one swap. Already-present and repeated
    /// identifiers are skipped. Returns how many were newly added.
    pub fn select_many<I>(&self, ids: I) -> usize
    where
        I: IntoIterator<Item = RecordId>,
    {
        let incoming: Vec<RecordId> = ids.into_iter().collect();
        if incoming.is_empty() {
            return 0;
        }
        self.update(|set| incoming.into_iter().filter(|id| set.insert(*id)).count())
    }

    /// Remove `ids` in one swap. Returns how many were actually removed.
    pub fn deselect_many<I>(&self, ids: I) -> usize
    where
        I: IntoIterator<Item = RecordId>,
    {
        let outgoing: Vec<RecordId> = ids.into_iter().collect();
        if outgoing.is_empty() {
            return 0;
        }
        self.update(|set| outgoing.iter().filter(|id| set.remove(id)).count())
    }

    pub fn clear(&self) {
        *self.ids.write() = Arc::new(HashSet::new());
    }

    pub fn len(&self) -> usize {
        self.ids.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.read().is_empty()
    }

    /// Immutable view of the current membership.
    pub fn snapshot(&self) -> Arc<HashSet<RecordId>> {
        Arc::clone(&self.ids.read())
    }

    /// Selected ids in ascending order, for stable display and JSON output.
    pub fn sorted_ids(&self) -> Vec<RecordId> {
        let mut ids: Vec<RecordId> = self.snapshot().iter().copied().collect();
        ids.sort_unstable();
        ids
    }

    pub fn page_selection_state(&self, page: &Page) -> PageSelectionState {
        if page.is_empty() {
            return PageSelectionState::None;
        }
        let set = self.snapshot();
        let selected = page.ids().filter(|id| set.contains(id)).count();
        match selected {
            0 => PageSelectionState::None,
            n if n == page.len() => PageSelectionState::All,
            _ => PageSelectionState::Partial,
        }
    }

    /// Header-checkbox behavior: select every row of `page`, or deselect them
    /// all if every row already is. Rows on other pages are untouched.
    pub fn toggle_page(&self, page: &Page) -> PageSelectionState {
        if self.page_selection_state(page) == PageSelectionState::All {
            self.deselect_many(page.ids());
        } else {
            self.select_many(page.ids());
        }
        self.page_selection_state(page)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Artwork;
    use proptest::prelude::*;

    fn ids(raw: &[u64]) -> Vec<RecordId> {
        raw.iter().copied().map(RecordId).collect()
    }

    fn page_of(raw: &[u64]) -> Page {
        Page {
            page_index: 0,
            items: raw.iter().copied().map(Artwork::with_id).collect(),
            total_count: 100,
        }
    }

    #[test]
    fn toggle_adds_then_removes() {
        let set = SelectionSet::new();
        assert!(set.toggle(RecordId(7)));
        assert!(set.is_selected(RecordId(7)));
        assert!(!set.toggle(RecordId(7)));
        assert!(set.is_empty());
    }

    #[test]
    fn select_many_skips_duplicates_and_present_ids() {
        let set = SelectionSet::new();
        set.toggle(RecordId(2));
        let added = set.select_many(ids(&[1, 2, 2, 3, 1]));
        assert_eq!(added, 2);
        assert_eq!(set.sorted_ids(), ids(&[1, 2, 3]));
    }

    #[test]
    fn snapshot_is_not_affected_by_later_writes() {
        let set = SelectionSet::new();
        set.select_many(ids(&[1, 2]));
        let before = set.snapshot();
        set.select_many(ids(&[3, 4]));
        set.toggle(RecordId(1));
        assert_eq!(before.len(), 2);
        assert!(before.contains(&RecordId(1)));
        assert_eq!(set.sorted_ids(), ids(&[2, 3, 4]));
    }

    #[test]
    fn clear_empties_the_set() {
        let set = SelectionSet::new();
        set.select_many(ids(&[5, 6, 7]));
        set.clear();
        assert_eq!(set.len(), 0);
        assert!(!set.is_selected(RecordId(5)));
    }

    #[test]
    fn deselect_many_counts_removed() {
        let set = SelectionSet::new();
        set.select_many(ids(&[1, 2, 3]));
        assert_eq!(set.deselect_many(ids(&[2, 9])), 1);
        assert_eq!(set.sorted_ids(), ids(&[1, 3]));
    }

    #[test]
    fn page_selection_state_tracks_rows() {
        let set = SelectionSet::new();
        let page = page_of(&[10, 11, 12]);
        assert_eq!(set.page_selection_state(&page), PageSelectionState::None);
        set.toggle(RecordId(11));
        assert_eq!(set.page_selection_state(&page), PageSelectionState::Partial);
        set.select_many(page.ids());
        assert_eq!(set.page_selection_state(&page), PageSelectionState::All);
        assert_eq!(
            set.page_selection_state(&Page::empty(3)),
            PageSelectionState::None
        );
    }

    #[test]
    fn toggle_page_leaves_other_pages_alone() {
        let set = SelectionSet::new();
        set.select_many(ids(&[1, 11]));
        let page = page_of(&[10, 11, 12]);

        assert_eq!(set.toggle_page(&page), PageSelectionState::All);
        assert_eq!(set.sorted_ids(), ids(&[1, 10, 11, 12]));

        assert_eq!(set.toggle_page(&page), PageSelectionState::None);
        assert_eq!(set.sorted_ids(), ids(&[1]));
    }

    proptest! {
        #[test]
        fn toggle_parity_decides_membership(toggles in prop::collection::vec(0u64..8, 0..64)) {
            let set = SelectionSet::new();
            for raw in &toggles {
                set.toggle(RecordId(*raw));
            }
            for raw in 0u64..8 {
                let count = toggles.iter().filter(|t| **t == raw).count();
                prop_assert_eq!(set.is_selected(RecordId(raw)), count % 2 == 1);
            }
        }

        #[test]
        fn select_many_is_idempotent(
            seed in prop::collection::vec(0u64..50, 0..20),
            batch in prop::collection::vec(0u64..50, 0..40),
        ) {
            let set = SelectionSet::new();
            set.select_many(ids(&seed));
            set.select_many(ids(&batch));
            let once = set.sorted_ids();
            prop_assert_eq!(set.select_many(ids(&batch)), 0);
            prop_assert_eq!(set.sorted_ids(), once);
        }
    }
}
