//! In-process crawl host.
//!
//! Runs the single listing task (form submission, then pagination) on one
//! page and dispatches every discovered detail link to a bounded pool of
//! workers, each on its own page. Transient failures are retried with
//! backoff; a failed detail is logged and skipped, a failed listing aborts
//! the crawl.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use futures::stream::{self, StreamExt};
use tmreg_core::{AppConfig, SearchCriteria};

use crate::error::CrawlError;
use crate::extract::DetailExtractor;
use crate::form::{require_success, FormSettings, SearchFormController};
use crate::page::{close_quietly, Page, PageFactory};
use crate::pagination::{PaginationWalker, WalkProgress};
use crate::queue::RequestQueue;
use crate::retry::retry_with_backoff;
use crate::sink::RecordSink;
use crate::types::TaskLabel;

/// Everything the crawl host needs besides the page engine.
#[derive(Debug, Clone)]
pub struct CrawlSettings {
    pub search_url: String,
    pub form: FormSettings,
    pub detail_timeout: Duration,
    pub page_settle: Duration,
    pub max_pages: usize,
    pub max_concurrent_details: usize,
    pub max_retries: u32,
    pub retry_backoff_base_secs: u64,
}

impl CrawlSettings {
    #[must_use]
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            search_url: config.search_url.clone(),
            form: FormSettings {
                form_timeout: Duration::from_secs(config.form_timeout_secs),
                results_timeout: Duration::from_secs(config.results_timeout_secs),
                keystroke_delay: Duration::from_millis(config.keystroke_delay_ms),
                checkbox_settle: Duration::from_millis(config.checkbox_settle_ms),
                date_input_format: config.date_input_format.clone(),
            },
            detail_timeout: Duration::from_secs(config.detail_timeout_secs),
            page_settle: Duration::from_millis(config.page_settle_ms),
            max_pages: config.max_pages,
            max_concurrent_details: config.max_concurrent_details,
            max_retries: config.max_retries,
            retry_backoff_base_secs: config.retry_backoff_base_secs,
        }
    }
}

/// Per-crawl state shared by every attempt of the listing task.
///
/// `form_filled` is set once the search reaches `Success` and is never
/// cleared for the rest of the crawl, so a retried listing attempt resumes
/// pagination instead of submitting the form again.
#[derive(Debug, Default)]
pub struct CrawlState {
    form_filled: AtomicBool,
}

impl CrawlState {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn form_filled(&self) -> bool {
        self.form_filled.load(Ordering::Acquire)
    }

    fn mark_form_filled(&self) {
        self.form_filled.store(true, Ordering::Release);
    }
}

/// Counters reported at the end of a crawl.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CrawlSummary {
    pub form_submissions: usize,
    pub pages_walked: usize,
    pub rows_discovered: usize,
    pub records_stored: usize,
    pub records_discarded: usize,
    pub details_failed: usize,
    pub truncated: bool,
}

/// Result of a completed crawl. The records are held in `sink` until the
/// caller exports them.
#[derive(Debug)]
pub struct CrawlReport {
    pub summary: CrawlSummary,
    pub sink: RecordSink,
}

#[derive(Debug, Default)]
struct Counters {
    form_submissions: AtomicUsize,
    pages_walked: AtomicUsize,
    records_stored: AtomicUsize,
    records_discarded: AtomicUsize,
    details_failed: AtomicUsize,
    truncated: AtomicBool,
}

pub struct Crawler<F: PageFactory> {
    factory: F,
    settings: CrawlSettings,
    form: SearchFormController,
    walker: PaginationWalker,
    extractor: DetailExtractor,
}

impl<F: PageFactory> Crawler<F> {
    #[must_use]
    pub fn new(factory: F, settings: CrawlSettings) -> Self {
        let form = SearchFormController::new(settings.form.clone());
        let walker = PaginationWalker::new(settings.page_settle, settings.max_pages);
        let extractor = DetailExtractor::new(settings.detail_timeout);
        Self {
            factory,
            settings,
            form,
            walker,
            extractor,
        }
    }

    /// Runs one crawl for `criteria`.
    ///
    /// # Errors
    ///
    /// Returns the listing task's error: a terminal query error
    /// ([`CrawlError::NoResults`] / [`CrawlError::TooManyResults`]) at once,
    /// or a transient error once retries are exhausted. Detail failures never
    /// surface here; they are counted in [`CrawlSummary::details_failed`].
    pub async fn run(&self, criteria: &SearchCriteria) -> Result<CrawlReport, CrawlError> {
        let state = CrawlState::new();
        let sink = RecordSink::new();
        let counters = Counters::default();
        let (queue, rx) = RequestQueue::channel();

        tracing::info!(
            start = %criteria.start_date(),
            end = %criteria.end_date(),
            search_url = %self.settings.search_url,
            "starting crawl"
        );

        let listing = async {
            let result = self
                .run_listing(&self.settings.search_url, criteria, &state, &queue, &counters)
                .await;
            let discovered = queue.accepted();
            // Dropping the queue closes the channel so the detail stream ends
            // once the backlog drains.
            drop(queue);
            result.map(|()| discovered)
        };

        let max_concurrent = self.settings.max_concurrent_details.max(1);
        let sink_ref = &sink;
        let counters_ref = &counters;
        let details = stream::unfold(rx, |mut rx| async move {
            rx.recv().await.map(|request| (request, rx))
        })
        .for_each_concurrent(max_concurrent, move |request| async move {
            match request.label {
                TaskLabel::Detail => {
                    self.run_detail(&request.url, sink_ref, counters_ref).await;
                }
                TaskLabel::Listing => {
                    tracing::warn!(
                        url = %request.url,
                        "listing requests are only accepted as the crawl seed; ignoring"
                    );
                }
            }
        });

        let (listing_result, ()) = tokio::join!(listing, details);
        let rows_discovered = listing_result?;

        let summary = CrawlSummary {
            form_submissions: counters.form_submissions.load(Ordering::Relaxed),
            pages_walked: counters.pages_walked.load(Ordering::Relaxed),
            rows_discovered,
            records_stored: counters.records_stored.load(Ordering::Relaxed),
            records_discarded: counters.records_discarded.load(Ordering::Relaxed),
            details_failed: counters.details_failed.load(Ordering::Relaxed),
            truncated: counters.truncated.load(Ordering::Relaxed),
        };
        tracing::info!(
            pages = summary.pages_walked,
            rows = summary.rows_discovered,
            stored = summary.records_stored,
            discarded = summary.records_discarded,
            failed = summary.details_failed,
            "crawl finished"
        );

        Ok(CrawlReport { summary, sink })
    }

    /// Listing task: one page for its whole lifetime, across retries.
    async fn run_listing(
        &self,
        url: &str,
        criteria: &SearchCriteria,
        state: &CrawlState,
        queue: &RequestQueue,
        counters: &Counters,
    ) -> Result<(), CrawlError> {
        let page = self.factory.open().await?;
        let page = &page;
        let progress = WalkProgress::default();
        let progress = &progress;

        let result = retry_with_backoff(
            self.settings.max_retries,
            self.settings.retry_backoff_base_secs,
            move || async move {
                if state.form_filled() {
                    tracing::info!("search form already submitted; resuming pagination");
                } else {
                    page.navigate(url).await?;
                    counters.form_submissions.fetch_add(1, Ordering::Relaxed);
                    let submission = self.form.submit(page, criteria).await?;
                    require_success(
                        submission.outcome,
                        submission.message.as_deref(),
                        self.settings.form.results_timeout,
                    )?;
                    state.mark_form_filled();
                }

                self.walker.resume(page, queue, progress).await
            },
        )
        .await;

        let walk = progress.summary();
        counters.pages_walked.store(walk.pages, Ordering::Relaxed);
        counters.truncated.store(walk.truncated, Ordering::Relaxed);

        close_quietly(page).await;
        if let Err(e) = &result {
            tracing::error!(url, error = %e, retriable = e.is_retriable(), "listing task failed");
        }
        result
    }

    /// Detail task: a fresh page per attempt. Failures are contained here.
    async fn run_detail(&self, url: &str, sink: &RecordSink, counters: &Counters) {
        let result = retry_with_backoff(
            self.settings.max_retries,
            self.settings.retry_backoff_base_secs,
            move || async move {
                let page = self.factory.open().await?;
                let extracted = self.extractor.extract(&page, url).await;
                close_quietly(&page).await;
                extracted
            },
        )
        .await;

        match result {
            Ok(record) => {
                if sink.push(url, record) {
                    counters.records_stored.fetch_add(1, Ordering::Relaxed);
                } else {
                    counters.records_discarded.fetch_add(1, Ordering::Relaxed);
                }
            }
            Err(e) => {
                counters.details_failed.fetch_add(1, Ordering::Relaxed);
                tracing::warn!(url, error = %e, "skipping detail page");
            }
        }
    }
}
