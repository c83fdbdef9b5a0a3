//! "Select the first N records" across page boundaries.
//!
//! The selector walks the catalog from page 0, one page at a time, collecting
//! identifiers in catalog order until it has `n` of them or the collection is
//! exhausted, then applies them to the shared [`SelectionSet`] in a single
//! `select_many`. It fetches through the same [`CatalogClient`] as the
//! pagination controller but shares no other state with it, so it neither
//! moves the visible page nor waits for navigation.
//!
//! A failed fetch (or a cancellation between fetches) stops the walk; what was
//! collected up to that point is still applied.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::catalog::{CatalogClient, CatalogError, fetch_checked};
use crate::model::RecordId;
use crate::selection::SelectionSet;

/// Rejected free-text bulk-select count.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InvalidInputError {
    #[error("count is empty")]
    Empty,

    #[error("count `{0}` is not a number")]
    NotANumber(String),

    #[error("count `{0}` is negative")]
    Negative(String),

    #[error("count `{0}` is not a whole number")]
    Fractional(String),
}

/// Parse the numeric-entry text into a record count.
///
/// Accepts whole numbers, including float spellings of them (`"15.0"`,
/// `"1e2"`). Negative, fractional, non-finite and non-numeric input is
/// rejected.
pub fn parse_select_count(text: &str) -> Result<usize, InvalidInputError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(InvalidInputError::Empty);
    }
    if let Ok(n) = trimmed.parse::<usize>() {
        return Ok(n);
    }
    let value: f64 = trimmed
        .parse()
        .map_err(|_| InvalidInputError::NotANumber(trimmed.to_string()))?;
    if !value.is_finite() {
        return Err(InvalidInputError::NotANumber(trimmed.to_string()));
    }
    if value < 0.0 {
        return Err(InvalidInputError::Negative(trimmed.to_string()));
    }
    if value.fract() != 0.0 {
        return Err(InvalidInputError::Fractional(trimmed.to_string()));
    }
    if value >= usize::MAX as f64 {
        return Ok(usize::MAX);
    }
    Ok(value as usize)
}

/// Cooperative stop signal, checked before each page fetch.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// Summary of a completed bulk selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize)]
pub struct BulkReport {
    pub requested: usize,
    /// Identifiers collected from the catalog (at most `requested`).
    pub accumulated: usize,
    /// Identifiers that were not selected before.
    pub newly_selected: usize,
    pub pages_fetched: usize,
}

/// A bulk selection that stopped early. Partial progress has been applied.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BulkSelectError {
    #[error("bulk selection interrupted after {applied} records: {source}")]
    Interrupted {
        applied: usize,
        #[source]
        source: CatalogError,
    },

    #[error("bulk selection cancelled after {applied} records")]
    Cancelled { applied: usize },
}

impl BulkSelectError {
    /// Identifiers that made it into the selection before the stop.
    pub fn applied(&self) -> usize {
        match self {
            Self::Interrupted { applied, .. } | Self::Cancelled { applied } => *applied,
        }
    }
}

pub struct BulkSelector {
    client: Arc<dyn CatalogClient>,
    selection: Arc<SelectionSet>,
    page_size: usize,
}

impl BulkSelector {
    pub fn new(
        client: Arc<dyn CatalogClient>,
        selection: Arc<SelectionSet>,
        page_size: usize,
    ) -> Self {
        Self {
            client,
            selection,
            page_size: page_size.max(1),
        }
    }

    /// Select the first `n` records in catalog order.
    pub async fn select_first_n(&self, n: usize) -> Result<BulkReport, BulkSelectError> {
        self.select_first_n_with(n, &CancelToken::new()).await
    }

    /// Bulk-select from the numeric entry box. Unparseable input is a no-op.
    pub async fn select_first_n_input(&self, text: &str) -> Result<BulkReport, BulkSelectError> {
        match parse_select_count(text) {
            Ok(n) => self.select_first_n(n).await,
            Err(err) => {
                debug!(input = text, error = %err, "bulk select: ignoring invalid count");
                Ok(BulkReport::default())
            }
        }
    }

    pub async fn select_first_n_with(
        &self,
        n: usize,
        cancel: &CancelToken,
    ) -> Result<BulkReport, BulkSelectError> {
        let mut report = BulkReport {
            requested: n,
            ..BulkReport::default()
        };
        if n == 0 {
            return Ok(report);
        }

        let mut accumulated: Vec<RecordId> = Vec::new();
        let mut page_index = 0usize;
        let mut failure: Option<BulkStop> = None;

        while accumulated.len() < n {
            if cancel.is_cancelled() {
                failure = Some(BulkStop::Cancelled);
                break;
            }
            let page = match fetch_checked(self.client.as_ref(), page_index, self.page_size).await
            {
                Ok(page) => page,
                Err(err) => {
                    failure = Some(BulkStop::Fetch(err));
                    break;
                }
            };
            report.pages_fetched += 1;

            let take = n - accumulated.len();
            accumulated.extend(page.ids().take(take));
            debug!(
                page_index,
                accumulated = accumulated.len(),
                requested = n,
                total = page.total_count,
                "bulk select: page accumulated"
            );

            if page.is_empty() || accumulated.len() >= page.total_count {
                break;
            }
            page_index += 1;
        }

        report.accumulated = accumulated.len();
        report.newly_selected = self.selection.select_many(accumulated);

        match failure {
            None => {
                info!(
                    requested = n,
                    accumulated = report.accumulated,
                    newly_selected = report.newly_selected,
                    pages = report.pages_fetched,
                    "bulk select: applied"
                );
                Ok(report)
            }
            Some(BulkStop::Cancelled) => {
                info!(applied = report.accumulated, "bulk select: cancelled");
                Err(BulkSelectError::Cancelled {
                    applied: report.accumulated,
                })
            }
            Some(BulkStop::Fetch(source)) => {
                warn!(
                    page_index,
                    applied = report.accumulated,
                    error = %source,
                    "bulk select: fetch failed, applied partial selection"
                );
                Err(BulkSelectError::Interrupted {
                    applied: report.accumulated,
                    source,
                })
            }
        }
    }
}

enum BulkStop {
    Cancelled,
    Fetch(CatalogError),
}
