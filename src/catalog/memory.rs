//! In-memory catalog used for offline runs (`--fixture`) and tests.

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use super::{CatalogClient, CatalogError};
use crate::model::{Artwork, Page, RecordId};

/// First identifier handed out by [`FixtureCatalog::synthetic`].
pub const FIXTURE_ID_BASE: u64 = 1000;

const ORIGINS: [&str; 5] = ["France", "Japan", "United States", "Italy", "Netherlands"];

/// Deterministic catalog held in memory, with optional latency and per-page
/// failure injection.
#[derive(Debug)]
pub struct FixtureCatalog {
    records: Vec<Artwork>,
    failing_pages: Mutex<HashSet<usize>>,
    latency: Option<Duration>,
    fetches: AtomicUsize,
}

impl FixtureCatalog {
    pub fn new(records: Vec<Artwork>) -> Self {
        Self {
            records,
            failing_pages: Mutex::new(HashSet::new()),
            latency: None,
            fetches: AtomicUsize::new(0),
        }
    }

    /// `count` generated artworks with ids `FIXTURE_ID_BASE..FIXTURE_ID_BASE + count`.
    pub fn synthetic(count: usize) -> Self {
        let records = (0..count as u64)
            .map(|i| Artwork {
                id: RecordId(FIXTURE_ID_BASE + i),
                title: Some(format!("Study No. {}", i + 1)),
                place_of_origin: Some(ORIGINS[(i as usize) % ORIGINS.len()].to_string()),
                artist_display: Some(format!("Fixture Artist {}", i % 17)),
                inscriptions: (i % 3 == 0).then(|| format!("signed lower right: {i}")),
                date_start: Some(1800 + (i as i64 % 200)),
                date_end: Some(1801 + (i as i64 % 200)),
            })
            .collect();
        Self::new(records)
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Make every fetch of `page_index` fail with a network error until healed.
    pub fn fail_page(&self, page_index: usize) {
        self.failing_pages.lock().insert(page_index);
    }

    pub fn heal_page(&self, page_index: usize) {
        self.failing_pages.lock().remove(&page_index);
    }

    pub fn records(&self) -> &[Artwork] {
        &self.records
    }

    pub fn ids(&self) -> Vec<RecordId> {
        self.records.iter().map(|a| a.id).collect()
    }

    /// Number of `fetch_page` calls served so far, failures included.
    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl CatalogClient for FixtureCatalog {
    fn id(&self) -> &str {
        "fixture"
    }

    async fn fetch_page(&self, page_index: usize, page_size: usize) -> Result<Page, CatalogError> {
        self.fetches.fetch_add(1, Ordering::Relaxed);
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        if self.failing_pages.lock().contains(&page_index) {
            return Err(CatalogError::Network(format!(
                "fixture page {page_index} is unreachable"
            )));
        }

        let start = page_index.saturating_mul(page_size).min(self.records.len());
        let end = start.saturating_add(page_size).min(self.records.len());
        Ok(Page {
            page_index,
            items: self.records[start..end].to_vec(),
            total_count: self.records.len(),
        })
    }
}
