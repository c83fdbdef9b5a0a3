//! The surface a front end drives.
//!
//! `Browser` wires one catalog client into a pagination controller and a bulk
//! selector that share a single selection set. It exposes the three inbound
//! actions (toggle a row, change page, select first N) and a render-ready
//! [`BrowserView`].

use std::sync::Arc;

use serde::Serialize;

use crate::bulk::{BulkReport, BulkSelectError, BulkSelector};
use crate::catalog::CatalogClient;
use crate::model::{Artwork, RecordId};
use crate::pagination::{PageOutcome, PaginationController, PaginationState};
use crate::selection::{PageSelectionState, SelectionSet};

/// One row of the current page with its checkbox state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RowView {
    #[serde(flatten)]
    pub artwork: Artwork,
    pub selected: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BrowserView {
    pub pagination: PaginationState,
    /// Index of the page the rows belong to. Differs from
    /// `pagination.current_page_index` while a request is loading or after
    /// it failed.
    pub buffered_page_index: usize,
    pub page_count: usize,
    pub rows: Vec<RowView>,
    pub page_selection: PageSelectionState,
    pub selected_count: usize,
}

pub struct Browser {
    pagination: PaginationController,
    selection: Arc<SelectionSet>,
    bulk: BulkSelector,
}

impl Browser {
    pub fn new(client: Arc<dyn CatalogClient>, page_size: usize) -> Self {
        let selection = SelectionSet::shared();
        Self {
            pagination: PaginationController::new(Arc::clone(&client), page_size),
            bulk: BulkSelector::new(client, Arc::clone(&selection), page_size),
            selection,
        }
    }

    pub fn pagination(&self) -> &PaginationController {
        &self.pagination
    }

    pub fn selection(&self) -> &Arc<SelectionSet> {
        &self.selection
    }

    pub fn bulk(&self) -> &BulkSelector {
        &self.bulk
    }

    pub async fn activate(&self) -> Option<PageOutcome> {
        self.pagination.activate().await
    }

    pub async fn request_page(&self, index: usize) -> PageOutcome {
        self.pagination.request_page(index).await
    }

    pub fn toggle(&self, id: RecordId) -> bool {
        self.selection.toggle(id)
    }

    /// Header checkbox: select or deselect every row on the buffered page.
    pub fn toggle_current_page(&self) -> PageSelectionState {
        self.selection.toggle_page(&self.pagination.current_page())
    }

    /// Numeric-entry submission. Invalid text selects nothing.
    pub async fn select_first_n(&self, text: &str) -> Result<BulkReport, BulkSelectError> {
        self.bulk.select_first_n_input(text).await
    }

    pub fn clear_selection(&self) {
        self.selection.clear();
    }

    pub fn is_selected(&self, id: RecordId) -> bool {
        self.selection.is_selected(id)
    }

    pub fn view(&self) -> BrowserView {
        let snapshot = self.pagination.snapshot();
        let selected = self.selection.snapshot();
        let page_count = snapshot
            .state
            .total_count
            .div_ceil(snapshot.state.page_size);
        let page_selection = self.selection.page_selection_state(&snapshot.page);
        let rows = snapshot
            .page
            .items
            .into_iter()
            .map(|artwork| RowView {
                selected: selected.contains(&artwork.id),
                artwork,
            })
            .collect();

        BrowserView {
            pagination: snapshot.state,
            buffered_page_index: snapshot.page.page_index,
            page_count,
            rows,
            page_selection,
            selected_count: selected.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bulk::CancelToken;
    use crate::catalog::memory::{FIXTURE_ID_BASE, FixtureCatalog};

    #[tokio::test]
    async fn view_marks_selected_rows() {
        let browser = Browser::new(Arc::new(FixtureCatalog::synthetic(40)), 12);
        browser.activate().await;
        browser.toggle(RecordId(FIXTURE_ID_BASE + 1));

        let view = browser.view();
        assert_eq!(view.page_count, 4);
        assert_eq!(view.rows.len(), 12);
        assert!(!view.rows[0].selected);
        assert!(view.rows[1].selected);
        assert_eq!(view.page_selection, PageSelectionState::Partial);
        assert_eq!(view.selected_count, 1);
    }

    #[tokio::test]
    async fn toggle_current_page_selects_visible_rows() {
        let browser = Browser::new(Arc::new(FixtureCatalog::synthetic(40)), 12);
        browser.request_page(3).await;
        assert_eq!(browser.toggle_current_page(), PageSelectionState::All);
        assert_eq!(browser.selection().len(), 4);
        browser.clear_selection();
        assert_eq!(browser.view().selected_count, 0);
    }

    #[tokio::test]
    async fn cancelled_bulk_leaves_visible_page_alone() {
        let browser = Browser::new(Arc::new(FixtureCatalog::synthetic(40)), 12);
        browser.request_page(1).await;
        let before = browser.pagination().records();

        let cancel = CancelToken::new();
        cancel.cancel();
        let err = browser
            .bulk()
            .select_first_n_with(20, &cancel)
            .await
            .unwrap_err();
        assert_eq!(err, BulkSelectError::Cancelled { applied: 0 });
        assert!(browser.selection().is_empty());
        assert_eq!(browser.pagination().records(), before);
    }

    #[test]
    fn row_view_serializes_flat() {
        let row = RowView {
            artwork: Artwork::with_id(9),
            selected: true,
        };
        let json = serde_json::to_value(&row).unwrap();
        assert_eq!(json["id"], 9);
        assert_eq!(json["selected"], true);
    }
}
