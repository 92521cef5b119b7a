//! Search form controller.
//!
//! Drives the registry's advanced search form from a freshly loaded page to
//! a submitted query and classifies what the registry answered.

use std::time::Duration;

use serde::Deserialize;
use tmreg_core::SearchCriteria;

use crate::error::{CrawlError, PageError};
use crate::page::wait::{
    mark_document, settle, wait_for_any_after_navigation, wait_for_navigation, wait_for_selector,
};
use crate::page::{keys, Page};
use crate::site;
use crate::types::SearchOutcome;

/// Elements that signal the registry has answered a submitted search.
const OUTCOME_MARKERS: &[&str] = &[site::RESULTS_TABLE, site::MESSAGE];

/// Checked state of one form checkbox.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CheckboxState {
    pub id: String,
    pub checked: bool,
}

/// Timing knobs for driving the form.
#[derive(Debug, Clone)]
pub struct FormSettings {
    pub form_timeout: Duration,
    pub results_timeout: Duration,
    pub keystroke_delay: Duration,
    pub checkbox_settle: Duration,
    /// `strftime` pattern for the values typed into the date fields.
    pub date_input_format: String,
}

/// Ids of checkboxes whose state disagrees with the desired state, in form
/// order. A checkbox is desired checked iff its id is in `targets`.
#[must_use]
pub fn checkboxes_to_toggle(states: &[CheckboxState], targets: &[&str]) -> Vec<String> {
    states
        .iter()
        .filter(|state| state.checked != targets.contains(&state.id.as_str()))
        .map(|state| state.id.clone())
        .collect()
}

/// Classifies the registry message shown after submission.
///
/// Matching is on the trimmed, lower-cased text. The "no results" phrase is
/// checked first, so a message containing both phrases is `EmptyResult`.
#[must_use]
pub fn classify_message(message: Option<&str>) -> SearchOutcome {
    let Some(message) = message else {
        return SearchOutcome::Success;
    };
    let lowered = message.trim().to_lowercase();
    if lowered.contains(site::NO_RESULTS_PHRASE) {
        SearchOutcome::EmptyResult
    } else if lowered.contains(site::TOO_MANY_RESULTS_PHRASE) {
        SearchOutcome::OverflowResult
    } else {
        SearchOutcome::Success
    }
}

/// Converts a classified outcome into the crawl's error policy: `Success`
/// passes, terminal outcomes fail permanently, `Ambiguous` fails retryably.
///
/// # Errors
///
/// [`CrawlError::NoResults`], [`CrawlError::TooManyResults`] or
/// [`CrawlError::Ambiguous`] for the corresponding outcomes.
pub fn require_success(
    outcome: SearchOutcome,
    message: Option<&str>,
    results_timeout: Duration,
) -> Result<(), CrawlError> {
    let text = || message.map(str::trim).unwrap_or_default().to_owned();
    match outcome {
        SearchOutcome::Success => Ok(()),
        SearchOutcome::EmptyResult => Err(CrawlError::NoResults { message: text() }),
        SearchOutcome::OverflowResult => Err(CrawlError::TooManyResults { message: text() }),
        SearchOutcome::Ambiguous => Err(CrawlError::Ambiguous {
            timeout_ms: u64::try_from(results_timeout.as_millis()).unwrap_or(u64::MAX),
        }),
    }
}

/// Outcome of a submission together with the registry message that decided it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Submission {
    pub outcome: SearchOutcome,
    pub message: Option<String>,
}

pub struct SearchFormController {
    settings: FormSettings,
}

impl SearchFormController {
    #[must_use]
    pub fn new(settings: FormSettings) -> Self {
        Self { settings }
    }

    /// Fills and submits the search form on `page`, which must already show
    /// the search page.
    ///
    /// # Errors
    ///
    /// Returns a retryable [`CrawlError::Page`] if the form never appears or
    /// an element interaction fails. Classification failures are reported
    /// through [`Submission::outcome`], not as errors.
    pub async fn submit<P: Page + ?Sized>(
        &self,
        page: &P,
        criteria: &SearchCriteria,
    ) -> Result<Submission, CrawlError> {
        wait_for_selector(page, site::FORM_CONTAINER, self.settings.form_timeout).await?;

        let toggled = self.reconcile_checkboxes(page).await?;
        tracing::debug!(toggled, "checkbox selection reconciled");

        // The registry's "from" field takes the end of the range and "to"
        // takes the start.
        let format = self.settings.date_input_format.as_str();
        let from_value = criteria.end_date().format(format).to_string();
        let to_value = criteria.start_date().format(format).to_string();
        self.fill_date(page, site::DATE_FROM_INPUT, &from_value).await?;
        self.fill_date(page, site::DATE_TO_INPUT, &to_value).await?;

        mark_document(page).await?;
        page.click(site::SUBMIT_BUTTON).await?;
        let submission = self.await_outcome(page).await?;
        tracing::info!(
            outcome = ?submission.outcome,
            message = submission.message.as_deref().unwrap_or(""),
            "search submitted"
        );
        Ok(submission)
    }

    /// Brings every form checkbox to its desired state and returns how many
    /// were toggled. Applying it to an already reconciled form toggles none.
    ///
    /// Toggling one box can change others (a group's "any" box clears its
    /// members), so the form is re-read after every toggle and only the first
    /// disagreeing box is acted on.
    ///
    /// # Errors
    ///
    /// Propagates page failures and a malformed checkbox snapshot. Fails with
    /// [`PageError::UnexpectedResponse`] if the form has not converged after
    /// two toggles per checkbox.
    pub async fn reconcile_checkboxes<P: Page + ?Sized>(
        &self,
        page: &P,
    ) -> Result<usize, CrawlError> {
        let mut toggled = 0;
        loop {
            let states = checkbox_states(page).await?;
            let Some(id) = checkboxes_to_toggle(&states, site::CHECKBOX_TARGETS)
                .into_iter()
                .next()
            else {
                return Ok(toggled);
            };

            if toggled >= states.len() * 2 {
                return Err(PageError::UnexpectedResponse {
                    context: "search form checkboxes".to_owned(),
                    reason: format!("still disagreeing after {toggled} toggles, next {id}"),
                }
                .into());
            }

            tracing::debug!(id = %id, "toggling checkbox");
            page.click(&id_selector(&id)).await?;
            settle(self.settings.checkbox_settle).await;
            toggled += 1;
        }
    }

    /// Replaces a date field's contents by typing `value` key by key; the
    /// widget's live formatting breaks if the whole string arrives at once.
    async fn fill_date<P: Page + ?Sized>(
        &self,
        page: &P,
        selector: &str,
        value: &str,
    ) -> Result<(), PageError> {
        page.click(selector).await?;
        page.press_keys(selector, keys::SELECT_ALL).await?;
        page.press_keys(selector, keys::BACKSPACE).await?;
        page.type_text(selector, value, self.settings.keystroke_delay)
            .await
    }

    /// Waits for the post-submit navigation and for either the result table
    /// or the message banner, then classifies the page.
    ///
    /// The markers only count on the document that replaced the submitted
    /// one; the search page can carry its own message banner.
    async fn await_outcome<P: Page + ?Sized>(&self, page: &P) -> Result<Submission, CrawlError> {
        let timeout = self.settings.results_timeout;
        let settled = tokio::try_join!(
            wait_for_navigation(page, timeout),
            wait_for_any_after_navigation(page, OUTCOME_MARKERS, timeout),
        );

        match settled {
            Ok(_) => {}
            Err(PageError::Timeout { .. }) => {
                return Ok(Submission {
                    outcome: SearchOutcome::Ambiguous,
                    message: None,
                });
            }
            Err(e) => return Err(e.into()),
        }

        let message = page
            .text(site::MESSAGE)
            .await?
            .map(|m| m.trim().to_owned())
            .filter(|m| !m.is_empty());
        Ok(Submission {
            outcome: classify_message(message.as_deref()),
            message,
        })
    }
}

async fn checkbox_states<P: Page + ?Sized>(page: &P) -> Result<Vec<CheckboxState>, CrawlError> {
    let raw = page.evaluate(site::CHECKBOX_STATES_SCRIPT).await?;
    serde_json::from_value(raw).map_err(|e| CrawlError::Snapshot {
        context: "search form checkboxes".to_owned(),
        source: e,
    })
}

/// CSS selector for an element id. Ids coming from the page may contain
/// characters that are not valid in a bare `#id` selector.
fn id_selector(id: &str) -> String {
    let escaped = id.replace('\\', "\\\\").replace('"', "\\\"");
    format!("[id=\"{escaped}\"]")
}
