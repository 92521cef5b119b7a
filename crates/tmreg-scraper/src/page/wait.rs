//! Bounded waits built on the [`Page`] primitives.
//!
//! Every wait polls with a declared predicate and gives up after an explicit
//! timeout, surfacing [`PageError::Timeout`] instead of blocking forever.

use std::future::Future;
use std::time::Duration;

use super::Page;
use crate::error::PageError;

pub(crate) const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Tags the current document so [`wait_for_navigation`] can tell it apart
/// from the one that replaces it.
pub const MARK_DOCUMENT_SCRIPT: &str = "window.__tmreg_nav = true; return true;";

/// `"marked"` while the tagged document is still loaded, else the ready
/// state of whatever document replaced it.
pub const NAVIGATION_STATE_SCRIPT: &str =
    "return window.__tmreg_nav === true ? 'marked' : document.readyState;";

fn timeout_error(what: String, timeout: Duration) -> PageError {
    PageError::Timeout {
        what,
        timeout_ms: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
    }
}

/// Polls `check` until it yields `Some`, or fails with a timeout naming `what`.
async fn poll_until<T, F, Fut>(what: String, timeout: Duration, mut check: F) -> Result<T, PageError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<Option<T>, PageError>>,
{
    let polling = async {
        loop {
            if let Some(found) = check().await? {
                return Ok(found);
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    };

    match tokio::time::timeout(timeout, polling).await {
        Ok(result) => result,
        Err(_) => Err(timeout_error(what, timeout)),
    }
}

/// Waits until an element matching `selector` exists.
pub async fn wait_for_selector<P: Page + ?Sized>(
    page: &P,
    selector: &str,
    timeout: Duration,
) -> Result<(), PageError> {
    tracing::debug!(selector, ?timeout, "waiting for selector");
    poll_until(format!("selector \"{selector}\""), timeout, move || async move {
        Ok(page.exists(selector).await?.then_some(()))
    })
    .await
}

/// Tags the current document ahead of an action that navigates away.
pub async fn mark_document<P: Page + ?Sized>(page: &P) -> Result<(), PageError> {
    page.evaluate(MARK_DOCUMENT_SCRIPT).await?;
    Ok(())
}

/// Waits until the document tagged by [`mark_document`] has been replaced
/// and the new one has finished loading.
///
/// The old document keeps reporting `complete` after a submit click until
/// the browser swaps it out, so the ready state alone cannot tell the two
/// apart. Without a prior [`mark_document`] this only waits for `complete`.
pub async fn wait_for_navigation<P: Page + ?Sized>(
    page: &P,
    timeout: Duration,
) -> Result<(), PageError> {
    poll_until("navigation to complete".to_owned(), timeout, move || async move {
        let state = page.evaluate(NAVIGATION_STATE_SCRIPT).await?;
        Ok((state.as_str() == Some("complete")).then_some(()))
    })
    .await
}

/// Waits until any of `selectors` matches on a document other than the one
/// tagged by [`mark_document`], and returns the index of the first one found,
/// checking in slice order. Meant to run alongside [`wait_for_navigation`]
/// after an action that replaces the page.
pub async fn wait_for_any_after_navigation<P: Page + ?Sized>(
    page: &P,
    selectors: &[&str],
    timeout: Duration,
) -> Result<usize, PageError> {
    poll_until(
        format!("any of {selectors:?} on the next document"),
        timeout,
        move || async move {
            let state = page.evaluate(NAVIGATION_STATE_SCRIPT).await?;
            if state.as_str() == Some("marked") {
                return Ok(None);
            }
            for (i, selector) in selectors.iter().enumerate() {
                if page.exists(selector).await? {
                    return Ok(Some(i));
                }
            }
            Ok(None)
        },
    )
    .await
}

/// Fixed settle delay after an action whose effect renders asynchronously.
pub async fn settle(delay: Duration) {
    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }
}
