//! Pagination controller and current-page buffer.
//!
//! The controller is the only writer of [`PaginationState`] and of the page
//! buffer. Every `request_page` call is tagged with a generation number taken
//! under the state lock; when a fetch completes, its result is applied only if
//! no newer request has been issued since. A slow response for an earlier
//! page is therefore dropped instead of clobbering the page the user asked for
//! last.
//!
//! Callers that fetch in the background split a request in two:
//! `begin_request` (or `begin_next`/`begin_previous`/`begin_retry`) takes the
//! generation synchronously, and `complete` does the fetch. The order of the
//! `begin_*` calls decides which request is latest.
//!
//! The lock is never held across the fetch, so navigation never blocks a
//! concurrent bulk selection (or another navigation).

use std::sync::Arc;

use parking_lot::Mutex;
use serde::Serialize;
use tracing::{debug, warn};

use crate::catalog::{CatalogClient, CatalogErrorKind, fetch_checked};
use crate::model::{Artwork, Page};

/// Observable pagination state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PaginationState {
    pub current_page_index: usize,
    pub page_size: usize,
    /// Last known collection size.
    pub total_count: usize,
    pub loading: bool,
    pub last_error: Option<CatalogErrorKind>,
}

/// What happened to one `request_page` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageOutcome {
    /// The fetched page replaced the buffer.
    Applied,
    /// A newer request was issued while this one was in flight; its result
    /// was discarded.
    Superseded,
    /// The fetch failed; the previous buffer is kept.
    Failed(CatalogErrorKind),
}

/// State plus buffer, cloned out in one lock acquisition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PaginationSnapshot {
    pub state: PaginationState,
    pub page: Page,
}

#[derive(Debug)]
struct Inner {
    state: PaginationState,
    page: Page,
    generation: u64,
    activated: bool,
}

/// A page request that has been issued but not yet fetched.
///
/// Created by the `begin_*` methods, which take the generation number
/// synchronously; the order in which requests are begun decides which one
/// is latest, regardless of when their fetches are polled. Dropping it
/// before [`PaginationController::complete`] finishes clears `loading` if it
/// is still the latest request.
#[derive(Debug)]
pub struct PendingPage {
    inner: Arc<Mutex<Inner>>,
    index: usize,
    page_size: usize,
    generation: u64,
}

impl PendingPage {
    pub fn index(&self) -> usize {
        self.index
    }
}

impl Drop for PendingPage {
    fn drop(&mut self) {
        let mut inner = self.inner.lock();
        if inner.generation == self.generation && inner.state.loading {
            debug!(
                page_index = self.index,
                generation = self.generation,
                "pagination: request dropped before completion"
            );
            inner.state.loading = false;
        }
    }
}

pub struct PaginationController {
    client: Arc<dyn CatalogClient>,
    inner: Arc<Mutex<Inner>>,
}

impl PaginationController {
    pub fn new(client: Arc<dyn CatalogClient>, page_size: usize) -> Self {
        let page_size = page_size.max(1);
        Self {
            client,
            inner: Arc::new(Mutex::new(Inner {
                state: PaginationState {
                    current_page_index: 0,
                    page_size,
                    total_count: 0,
                    loading: false,
                    last_error: None,
                },
                page: Page::empty(0),
                generation: 0,
                activated: false,
            })),
        }
    }

    /// Load the first page the first time the controller is shown.
    ///
    /// Later calls do nothing and return `None`.
    pub async fn activate(&self) -> Option<PageOutcome> {
        {
            let mut inner = self.inner.lock();
            if inner.activated {
                return None;
            }
            inner.activated = true;
        }
        Some(self.request_page(0).await)
    }

    /// Navigate to `index`, superseding any request still in flight.
    pub async fn request_page(&self, index: usize) -> PageOutcome {
        let pending = self.begin_request(index);
        self.complete(pending).await
    }

    /// Issue a request for `index` without fetching yet: bumps the
    /// generation, moves `current_page_index` and sets `loading`.
    pub fn begin_request(&self, index: usize) -> PendingPage {
        let mut inner = self.inner.lock();
        Self::begin_locked(&self.inner, &mut inner, index)
    }

    /// `begin_request` for the next page. `None` when already on the last
    /// known page.
    pub fn begin_next(&self) -> Option<PendingPage> {
        let mut inner = self.inner.lock();
        let next = inner.state.current_page_index + 1;
        (next < page_count(&inner.state)).then(|| Self::begin_locked(&self.inner, &mut inner, next))
    }

    /// `begin_request` for the previous page. `None` on the first page.
    pub fn begin_previous(&self) -> Option<PendingPage> {
        let mut inner = self.inner.lock();
        let previous = inner.state.current_page_index.checked_sub(1)?;
        Some(Self::begin_locked(&self.inner, &mut inner, previous))
    }

    /// `begin_request` for the current page index.
    pub fn begin_retry(&self) -> PendingPage {
        let mut inner = self.inner.lock();
        let index = inner.state.current_page_index;
        Self::begin_locked(&self.inner, &mut inner, index)
    }

    fn begin_locked(shared: &Arc<Mutex<Inner>>, inner: &mut Inner, index: usize) -> PendingPage {
        inner.generation += 1;
        inner.activated = true;
        inner.state.current_page_index = index;
        inner.state.loading = true;
        PendingPage {
            inner: Arc::clone(shared),
            index,
            page_size: inner.state.page_size,
            generation: inner.generation,
        }
    }

    /// Fetch a begun request and apply the result unless a newer request
    /// was begun in the meantime.
    pub async fn complete(&self, pending: PendingPage) -> PageOutcome {
        let (index, generation) = (pending.index, pending.generation);
        debug!(
            client = self.client.id(),
            page_index = index,
            generation,
            "pagination: requesting page"
        );

        let result = fetch_checked(self.client.as_ref(), index, pending.page_size).await;

        let mut inner = self.inner.lock();
        if inner.generation != generation {
            debug!(
                page_index = index,
                generation,
                latest = inner.generation,
                "pagination: discarding superseded response"
            );
            return PageOutcome::Superseded;
        }

        inner.state.loading = false;
        match result {
            Ok(page) => {
                debug!(
                    page_index = index,
                    items = page.len(),
                    total = page.total_count,
                    "pagination: page applied"
                );
                inner.state.total_count = page.total_count;
                inner.state.last_error = None;
                inner.page = page;
                PageOutcome::Applied
            }
            Err(err) => {
                let kind = err.kind();
                warn!(
                    page_index = index,
                    error = %err,
                    "pagination: fetch failed, keeping previous page"
                );
                inner.state.last_error = Some(kind);
                PageOutcome::Failed(kind)
            }
        }
    }

    /// Re-request the current page index (after a failure, typically).
    pub async fn retry(&self) -> PageOutcome {
        let pending = self.begin_retry();
        self.complete(pending).await
    }

    /// Advance one page. `None` when already on the last known page.
    pub async fn next_page(&self) -> Option<PageOutcome> {
        let pending = self.begin_next()?;
        Some(self.complete(pending).await)
    }

    /// Go back one page. `None` when already on the first page.
    pub async fn previous_page(&self) -> Option<PageOutcome> {
        let pending = self.begin_previous()?;
        Some(self.complete(pending).await)
    }

    pub fn state(&self) -> PaginationState {
        self.inner.lock().state.clone()
    }

    pub fn snapshot(&self) -> PaginationSnapshot {
        let inner = self.inner.lock();
        PaginationSnapshot {
            state: inner.state.clone(),
            page: inner.page.clone(),
        }
    }

    /// The buffered page (the last page that was successfully applied).
    pub fn current_page(&self) -> Page {
        self.inner.lock().page.clone()
    }

    pub fn records(&self) -> Vec<Artwork> {
        self.inner.lock().page.items.clone()
    }

    pub fn page_size(&self) -> usize {
        self.inner.lock().state.page_size
    }

    pub fn page_count(&self) -> usize {
        page_count(&self.inner.lock().state)
    }

    /// Row offset of the current page within the collection.
    pub fn first_row_offset(&self) -> usize {
        let inner = self.inner.lock();
        inner.state.current_page_index * inner.state.page_size
    }
}

fn page_count(state: &PaginationState) -> usize {
    state.total_count.div_ceil(state.page_size)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::memory::{FIXTURE_ID_BASE, FixtureCatalog};
    use crate::model::RecordId;
    use std::time::Duration;

    fn controller(count: usize) -> (Arc<FixtureCatalog>, PaginationController) {
        let catalog = Arc::new(FixtureCatalog::synthetic(count));
        let controller = PaginationController::new(catalog.clone(), 12);
        (catalog, controller)
    }

    #[tokio::test]
    async fn activate_loads_first_page_once() {
        let (catalog, controller) = controller(120);
        assert_eq!(controller.activate().await, Some(PageOutcome::Applied));
        assert_eq!(controller.activate().await, None);
        assert_eq!(catalog.fetch_count(), 1);

        let state = controller.state();
        assert_eq!(state.current_page_index, 0);
        assert_eq!(state.total_count, 120);
        assert!(!state.loading);
        assert_eq!(controller.page_count(), 10);
    }

    #[tokio::test]
    async fn request_page_replaces_buffer() {
        let (_, controller) = controller(120);
        assert_eq!(controller.request_page(4).await, PageOutcome::Applied);
        let page = controller.current_page();
        assert_eq!(page.page_index, 4);
        assert_eq!(page.items[0].id, RecordId(FIXTURE_ID_BASE + 48));
        assert_eq!(controller.first_row_offset(), 48);
    }

    #[tokio::test]
    async fn failure_keeps_previous_page_and_retry_recovers() {
        let (catalog, controller) = controller(120);
        controller.request_page(2).await;
        catalog.fail_page(3);

        assert_eq!(
            controller.request_page(3).await,
            PageOutcome::Failed(CatalogErrorKind::Network)
        );
        let snap = controller.snapshot();
        assert_eq!(snap.state.last_error, Some(CatalogErrorKind::Network));
        assert_eq!(snap.state.current_page_index, 3);
        assert!(!snap.state.loading);
        assert_eq!(snap.page.page_index, 2);

        catalog.heal_page(3);
        assert_eq!(controller.retry().await, PageOutcome::Applied);
        let snap = controller.snapshot();
        assert_eq!(snap.state.last_error, None);
        assert_eq!(snap.page.page_index, 3);
    }

    #[tokio::test]
    async fn next_and_previous_clamp_to_collection() {
        let (_, controller) = controller(30);
        assert_eq!(controller.previous_page().await, None);
        controller.activate().await;
        assert_eq!(controller.next_page().await, Some(PageOutcome::Applied));
        assert_eq!(controller.next_page().await, Some(PageOutcome::Applied));
        assert_eq!(controller.state().current_page_index, 2);
        assert_eq!(controller.next_page().await, None);
        assert_eq!(controller.previous_page().await, Some(PageOutcome::Applied));
        assert_eq!(controller.state().current_page_index, 1);
    }

    #[tokio::test]
    async fn begin_order_decides_latest_request() {
        let (_, controller) = controller(120);
        let first = controller.begin_request(4);
        let second = controller.begin_request(1);
        assert_eq!(controller.state().current_page_index, 1);

        // Fetch order does not matter, only the order requests were begun in.
        assert_eq!(controller.complete(second).await, PageOutcome::Applied);
        assert_eq!(controller.complete(first).await, PageOutcome::Superseded);
        assert_eq!(controller.current_page().page_index, 1);
        assert!(!controller.state().loading);
    }

    #[test]
    fn dropping_latest_pending_clears_loading() {
        let (catalog, controller) = controller(120);
        let stale = controller.begin_request(2);
        let latest = controller.begin_request(3);
        assert_eq!(latest.index(), 3);

        drop(stale);
        assert!(controller.state().loading);
        drop(latest);
        let state = controller.state();
        assert!(!state.loading);
        assert_eq!(state.current_page_index, 3);
        assert_eq!(catalog.fetch_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn aborted_fetch_does_not_leave_loading_set() {
        let catalog =
            Arc::new(FixtureCatalog::synthetic(120).with_latency(Duration::from_secs(60)));
        let controller = Arc::new(PaginationController::new(catalog.clone(), 12));

        let task = tokio::spawn({
            let controller = Arc::clone(&controller);
            async move { controller.request_page(4).await }
        });
        while catalog.fetch_count() == 0 {
            tokio::task::yield_now().await;
        }
        assert!(controller.state().loading);

        task.abort();
        assert!(task.await.unwrap_err().is_cancelled());
        let state = controller.state();
        assert!(!state.loading);
        assert_eq!(state.current_page_index, 4);
        assert_eq!(controller.current_page().page_index, 0);
    }

    #[test]
    fn zero_page_size_is_clamped() {
        let catalog = Arc::new(FixtureCatalog::synthetic(3));
        let controller = PaginationController::new(catalog, 0);
        assert_eq!(controller.page_size(), 1);
    }
}
