//! Remote catalog access.
//!
//! This module provides:
//! - The `CatalogClient` trait the pagination and bulk-select code fetch through.
//! - `CatalogError` / `CatalogErrorKind`, the failure taxonomy surfaced to the UI.
//! - An HTTP client for the public artworks API (`http`) and an in-memory
//!   fixture catalog (`memory`) for offline runs and tests.
//!
//! Page indices are zero-based at the trait boundary. Implementations that
//! talk to a service with a different convention convert internally.

pub mod http;
pub mod memory;

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;

use crate::model::Page;

/// Errors a catalog fetch can fail with.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CatalogError {
    #[error("network failure: {0}")]
    Network(String),

    #[error("catalog returned HTTP {status}")]
    Status { status: u16 },

    #[error("request timed out: {0}")]
    Timeout(String),

    #[error("malformed catalog response: {0}")]
    MalformedResponse(String),
}

impl CatalogError {
    pub fn kind(&self) -> CatalogErrorKind {
        match self {
            Self::Network(_) | Self::Status { .. } => CatalogErrorKind::Network,
            Self::Timeout(_) => CatalogErrorKind::Timeout,
            Self::MalformedResponse(_) => CatalogErrorKind::MalformedResponse,
        }
    }
}

/// Coarse failure category recorded in pagination state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CatalogErrorKind {
    Network,
    Timeout,
    MalformedResponse,
}

impl CatalogErrorKind {
    /// Every catalog failure is safe to retry.
    pub fn is_retryable(self) -> bool {
        true
    }

    /// Short hint for status lines.
    pub fn hint(self) -> &'static str {
        match self {
            Self::Network => "Check your connection and retry the page.",
            Self::Timeout => "The catalog is slow to respond; retry the page.",
            Self::MalformedResponse => "The catalog sent an unexpected response; retry later.",
        }
    }
}

impl std::fmt::Display for CatalogErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Network => write!(f, "network"),
            Self::Timeout => write!(f, "timeout"),
            Self::MalformedResponse => write!(f, "malformed_response"),
        }
    }
}

/// A source of catalog pages.
#[async_trait]
pub trait CatalogClient: Send + Sync {
    /// Short identifier used in logs.
    fn id(&self) -> &str;

    /// Fetch page `page_index` (zero-based) holding at most `page_size` records.
    async fn fetch_page(&self, page_index: usize, page_size: usize) -> Result<Page, CatalogError>;
}

/// Fetch a page and reject responses that break the page invariants.
pub async fn fetch_checked(
    client: &dyn CatalogClient,
    page_index: usize,
    page_size: usize,
) -> Result<Page, CatalogError> {
    let page = client.fetch_page(page_index, page_size).await?;
    if page.page_index != page_index {
        return Err(CatalogError::MalformedResponse(format!(
            "asked for page {page_index}, got page {}",
            page.page_index
        )));
    }
    page.check_shape(page_size).map_err(CatalogError::MalformedResponse)?;
    Ok(page)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Artwork;

    struct Canned(Page);

    #[async_trait]
    impl CatalogClient for Canned {
        fn id(&self) -> &str {
            "canned"
        }

        async fn fetch_page(&self, _: usize, _: usize) -> Result<Page, CatalogError> {
            Ok(self.0.clone())
        }
    }

    #[test]
    fn status_errors_count_as_network() {
        assert_eq!(
            CatalogError::Status { status: 503 }.kind(),
            CatalogErrorKind::Network
        );
        assert_eq!(
            CatalogError::Timeout("10s".into()).kind(),
            CatalogErrorKind::Timeout
        );
    }

    #[test]
    fn kind_display_is_snake_case() {
        assert_eq!(CatalogErrorKind::MalformedResponse.to_string(), "malformed_response");
        assert_eq!(
            serde_json::to_string(&CatalogErrorKind::Network).unwrap(),
            "\"network\""
        );
    }

    #[tokio::test]
    async fn fetch_checked_rejects_wrong_page_index() {
        let client = Canned(Page {
            page_index: 4,
            items: vec![Artwork::with_id(1)],
            total_count: 100,
        });
        let err = fetch_checked(&client, 2, 12).await.unwrap_err();
        assert_eq!(err.kind(), CatalogErrorKind::MalformedResponse);
    }

    #[tokio::test]
    async fn fetch_checked_rejects_oversized_page() {
        let client = Canned(Page {
            page_index: 0,
            items: (0..5).map(Artwork::with_id).collect(),
            total_count: 100,
        });
        let err = fetch_checked(&client, 0, 4).await.unwrap_err();
        assert!(matches!(err, CatalogError::MalformedResponse(_)));
    }
}
