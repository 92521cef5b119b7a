//! Result-list pagination.
//!
//! The walker harvests detail links from the current result page, hands
//! each one to the scheduler, and clicks the next-page control until the
//! registry marks it disabled or removes it.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use crate::error::CrawlError;
use crate::page::wait::settle;
use crate::page::Page;
use crate::queue::LinkQueue;
use crate::site;
use crate::types::{ResultRow, TaskLabel};

/// Totals for one walk over the result list.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WalkSummary {
    pub pages: usize,
    pub rows: usize,
    /// The walk stopped at the page bound while a next page was still offered.
    pub truncated: bool,
}

/// Running totals of a walk that may be resumed after a failed attempt on
/// the same page. Each result page is harvested and counted once.
#[derive(Debug, Default)]
pub struct WalkProgress {
    pages: AtomicUsize,
    rows: AtomicUsize,
    truncated: AtomicBool,
    /// The page currently shown has already been harvested.
    current_harvested: AtomicBool,
}

impl WalkProgress {
    #[must_use]
    pub fn summary(&self) -> WalkSummary {
        WalkSummary {
            pages: self.pages.load(Ordering::Relaxed),
            rows: self.rows.load(Ordering::Relaxed),
            truncated: self.truncated.load(Ordering::Relaxed),
        }
    }
}

pub struct PaginationWalker {
    page_settle: Duration,
    max_pages: usize,
}

impl PaginationWalker {
    /// `max_pages` bounds the walk on a site whose next-page control never
    /// becomes disabled. It is clamped to at least one page.
    #[must_use]
    pub fn new(page_settle: Duration, max_pages: usize) -> Self {
        Self {
            page_settle,
            max_pages: max_pages.max(1),
        }
    }

    /// Walks every result page starting from the one currently shown,
    /// enqueueing each row under [`TaskLabel::Detail`].
    ///
    /// # Errors
    ///
    /// Propagates page failures and a malformed row-link snapshot. Rows
    /// enqueued before the failure stay enqueued.
    pub async fn walk<P, Q>(&self, page: &P, queue: &Q) -> Result<WalkSummary, CrawlError>
    where
        P: Page + ?Sized,
        Q: LinkQueue + ?Sized,
    {
        let progress = WalkProgress::default();
        self.resume(page, queue, &progress).await?;
        Ok(progress.summary())
    }

    /// Like [`walk`](Self::walk), but continues the totals in `progress`.
    /// After a failed attempt the page left showing is not harvested again,
    /// and the page bound applies to the pages of every attempt together.
    ///
    /// # Errors
    ///
    /// As for [`walk`](Self::walk).
    pub async fn resume<P, Q>(
        &self,
        page: &P,
        queue: &Q,
        progress: &WalkProgress,
    ) -> Result<(), CrawlError>
    where
        P: Page + ?Sized,
        Q: LinkQueue + ?Sized,
    {
        loop {
            if !progress.current_harvested.load(Ordering::Relaxed) {
                let rows = harvest_rows(page).await?;
                let pages = progress.pages.fetch_add(1, Ordering::Relaxed) + 1;
                tracing::info!(page = pages, rows = rows.len(), "harvested result page");
                progress.rows.fetch_add(rows.len(), Ordering::Relaxed);
                for row in rows {
                    queue.enqueue(row.url, TaskLabel::Detail);
                }
                progress.current_harvested.store(true, Ordering::Relaxed);
            }

            if !has_enabled_next(page).await? {
                break;
            }
            if progress.pages.load(Ordering::Relaxed) >= self.max_pages {
                tracing::warn!(
                    max_pages = self.max_pages,
                    "page bound reached while a next page is still offered; stopping"
                );
                progress.truncated.store(true, Ordering::Relaxed);
                break;
            }

            page.click(site::NEXT_PAGE).await?;
            progress.current_harvested.store(false, Ordering::Relaxed);
            settle(self.page_settle).await;
        }

        Ok(())
    }
}

async fn harvest_rows<P: Page + ?Sized>(page: &P) -> Result<Vec<ResultRow>, CrawlError> {
    let raw = page.evaluate(site::ROW_LINKS_SCRIPT).await?;
    let urls = serde_json::from_value::<Vec<String>>(raw).map_err(|e| CrawlError::Snapshot {
        context: "result row links".to_owned(),
        source: e,
    })?;
    Ok(urls.into_iter().map(|url| ResultRow { url }).collect())
}

/// The next-page control counts only when it exists and is not disabled.
async fn has_enabled_next<P: Page + ?Sized>(page: &P) -> Result<bool, CrawlError> {
    if !page.exists(site::NEXT_PAGE).await? {
        return Ok(false);
    }
    let class = page.attribute(site::NEXT_PAGE, "class").await?;
    let aria_disabled = page.attribute(site::NEXT_PAGE, "aria-disabled").await?;
    Ok(!is_disabled(class.as_deref(), aria_disabled.as_deref()))
}

fn is_disabled(class: Option<&str>, aria_disabled: Option<&str>) -> bool {
    let by_class = class.is_some_and(|c| c.split_whitespace().any(|name| name == "disabled"));
    let by_aria = aria_disabled.is_some_and(|v| v.trim().eq_ignore_ascii_case("true"));
    by_class || by_aria
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disabled_class_disables_control() {
        assert!(is_disabled(Some("next-page disabled"), None));
    }

    #[test]
    fn class_match_is_whole_word() {
        assert!(!is_disabled(Some("next-page not-disabled"), None));
    }

    #[test]
    fn aria_disabled_disables_control() {
        assert!(is_disabled(Some("next-page"), Some("TRUE")));
        assert!(!is_disabled(Some("next-page"), Some("false")));
    }

    #[test]
    fn missing_attributes_mean_enabled() {
        assert!(!is_disabled(None, None));
    }

    #[test]
    fn max_pages_is_clamped_to_one() {
        let walker = PaginationWalker::new(Duration::ZERO, 0);
        assert_eq!(walker.max_pages, 1);
    }
}
