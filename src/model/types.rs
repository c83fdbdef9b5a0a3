//! Catalog entity structs.

use serde::{Deserialize, Serialize};

/// Stable identity of a catalog record.
///
/// Selection membership is keyed on this alone, so a record stays selected
/// no matter which page (if any) currently holds it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(pub u64);

impl std::fmt::Display for RecordId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Display::fmt(&self.0, f)
    }
}

impl From<u64> for RecordId {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

/// One artwork as returned by the catalog service.
///
/// Everything except `id` is display-only; the service sends `null` for many
/// of these fields, so they are all optional.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Artwork {
    pub id: RecordId,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub place_of_origin: Option<String>,
    #[serde(default)]
    pub artist_display: Option<String>,
    #[serde(default)]
    pub inscriptions: Option<String>,
    #[serde(default)]
    pub date_start: Option<i64>,
    #[serde(default)]
    pub date_end: Option<i64>,
}

impl Artwork {
    /// Bare record carrying only an identifier.
    pub fn with_id(id: u64) -> Self {
        Self {
            id: RecordId(id),
            title: None,
            place_of_origin: None,
            artist_display: None,
            inscriptions: None,
            date_start: None,
            date_end: None,
        }
    }

    /// Title for list output, falling back to the id.
    pub fn display_title(&self) -> String {
        match self.title.as_deref() {
            Some(t) if !t.trim().is_empty() => t.to_string(),
            _ => format!("#{}", self.id),
        }
    }
}

/// One fetched batch of records plus pagination metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page {
    /// Zero-based page index this batch represents.
    pub page_index: usize,
    pub items: Vec<Artwork>,
    /// Number of records in the whole remote collection.
    pub total_count: usize,
}

impl Page {
    pub fn empty(page_index: usize) -> Self {
        Self {
            page_index,
            items: Vec::new(),
            total_count: 0,
        }
    }

    pub fn ids(&self) -> impl Iterator<Item = RecordId> + '_ {
        self.items.iter().map(|a| a.id)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Check the page against the size it was requested with.
    ///
    /// Returns a description of the first violated invariant, if any.
    pub fn check_shape(&self, page_size: usize) -> Result<(), String> {
        if self.items.len() > page_size {
            return Err(format!(
                "page {} holds {} items, more than the page size {page_size}",
                self.page_index,
                self.items.len()
            ));
        }
        if !self.items.is_empty() && self.page_index.saturating_mul(page_size) >= self.total_count
        {
            return Err(format!(
                "page {} is non-empty but starts past the collection total {}",
                self.page_index, self.total_count
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page(page_index: usize, n: u64, total_count: usize) -> Page {
        Page {
            page_index,
            items: (0..n).map(Artwork::with_id).collect(),
            total_count,
        }
    }

    #[test]
    fn artwork_decodes_with_null_display_fields() {
        let json = r#"{"id": 27992, "title": null, "date_start": 1884, "date_end": null}"#;
        let art: Artwork = serde_json::from_str(json).unwrap();
        assert_eq!(art.id, RecordId(27992));
        assert_eq!(art.title, None);
        assert_eq!(art.date_start, Some(1884));
        assert_eq!(art.display_title(), "#27992");
    }

    #[test]
    fn check_shape_accepts_short_final_page() {
        assert!(page(9, 3, 111).check_shape(12).is_ok());
        assert!(page(0, 0, 0).check_shape(12).is_ok());
    }

    #[test]
    fn check_shape_rejects_oversized_page() {
        let err = page(0, 13, 120).check_shape(12).unwrap_err();
        assert!(err.contains("more than the page size"));
    }

    #[test]
    fn check_shape_rejects_page_past_total() {
        assert!(page(10, 2, 120).check_shape(12).is_err());
    }
}
