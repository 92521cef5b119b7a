//! Detail page extraction.
//!
//! [`extract_record`] is a pure function over a [`DetailSnapshot`], the
//! serialized cell text of the detail table; [`DetailExtractor`] obtains
//! that snapshot from a live page.

use std::time::Duration;

use serde::Deserialize;

use crate::error::CrawlError;
use crate::fields::canonical_key;
use crate::page::wait::wait_for_selector;
use crate::page::Page;
use crate::site;
use crate::types::DetailRecord;

/// One table cell as rendered in the detail view.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct SnapshotCell {
    pub text: String,
    /// Cell carries the registry's label styling.
    #[serde(default)]
    pub label: bool,
    /// Text of the highlighted sub-element, if the cell has one.
    #[serde(default)]
    pub highlight: Option<String>,
}

impl SnapshotCell {
    #[must_use]
    pub fn label(text: &str) -> Self {
        Self {
            text: text.to_owned(),
            label: true,
            highlight: None,
        }
    }

    #[must_use]
    pub fn value(text: &str) -> Self {
        Self {
            text: text.to_owned(),
            label: false,
            highlight: None,
        }
    }

    #[must_use]
    pub fn highlighted(text: &str, highlight: &str) -> Self {
        Self {
            text: text.to_owned(),
            label: false,
            highlight: Some(highlight.to_owned()),
        }
    }
}

/// Rows of cells, in document order.
pub type DetailSnapshot = Vec<Vec<SnapshotCell>>;

/// Trims and collapses internal whitespace runs to a single space.
#[must_use]
pub fn normalize_text(raw: &str) -> String {
    raw.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Builds a record from a detail snapshot.
///
/// Cells are consumed pairwise: a cell with label styling followed by any
/// cell forms a `(label, value)` pair; cells that cannot start a pair are
/// skipped one at a time. Pairs whose label matches no mapping entry are
/// ignored. If two pairs map to the same key, the later one wins.
#[must_use]
pub fn extract_record(snapshot: &[Vec<SnapshotCell>]) -> DetailRecord {
    let mut record = DetailRecord::new();

    for row in snapshot {
        let mut i = 0;
        while i < row.len() {
            let cell = &row[i];
            if !cell.label || i + 1 >= row.len() {
                i += 1;
                continue;
            }

            let label = normalize_text(&cell.text);
            if let Some(key) = canonical_key(&label) {
                record.insert(key, cell_value(&row[i + 1]));
            }
            i += 2;
        }
    }

    record
}

/// Value of a cell: the highlighted span when present and non-blank, else
/// the normalized cell text; `None` when both are blank.
fn cell_value(cell: &SnapshotCell) -> Option<String> {
    let highlighted = cell
        .highlight
        .as_deref()
        .map(str::trim)
        .filter(|h| !h.is_empty());
    if let Some(h) = highlighted {
        return Some(h.to_owned());
    }

    let text = normalize_text(&cell.text);
    (!text.is_empty()).then_some(text)
}

/// Drives a detail page to a stable state and extracts its record.
pub struct DetailExtractor {
    timeout: Duration,
}

impl DetailExtractor {
    #[must_use]
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    /// Navigates `page` to `url`, waits for the detail panel and table, and
    /// extracts the record.
    ///
    /// # Errors
    ///
    /// - [`CrawlError::Page`] with a timeout if the panel or table never
    ///   appears (retryable).
    /// - [`CrawlError::Snapshot`] if the in-page script returns an
    ///   unexpected shape.
    pub async fn extract<P: Page + ?Sized>(
        &self,
        page: &P,
        url: &str,
    ) -> Result<DetailRecord, CrawlError> {
        page.navigate(url).await?;
        wait_for_selector(page, site::DETAIL_PANEL, self.timeout).await?;
        wait_for_selector(page, site::DETAIL_TABLE, self.timeout).await?;

        let raw = page.evaluate(site::DETAIL_SNAPSHOT_SCRIPT).await?;
        let snapshot = serde_json::from_value::<Option<DetailSnapshot>>(raw).map_err(|e| {
            CrawlError::Snapshot {
                context: format!("detail page {url}"),
                source: e,
            }
        })?;

        let record = extract_record(snapshot.as_deref().unwrap_or_default());
        tracing::debug!(url, fields = record.len(), "extracted detail record");
        Ok(record)
    }
}

#[cfg(test)]
#[path = "extract_test.rs"]
mod tests;
