//! Page engine capability.
//!
//! The crawler never renders anything itself; it drives a page through the
//! primitives on [`Page`] and opens isolated page resources through a
//! [`PageFactory`]. [`webdriver`] provides the production implementation.

pub mod wait;
pub mod webdriver;

use std::time::Duration;

use async_trait::async_trait;

use crate::error::PageError;

/// Key sequences understood by [`Page::press_keys`], using the WebDriver
/// code points for special keys.
pub mod keys {
    /// Control+A, then release the modifier.
    pub const SELECT_ALL: &str = "\u{E009}a\u{E000}";
    pub const BACKSPACE: &str = "\u{E003}";
}

/// One live, isolated page resource.
///
/// A page is never shared between two tasks at the same time; every method
/// takes `&self` so a task can hold it across await points.
#[async_trait]
pub trait Page: Send + Sync {
    async fn navigate(&self, url: &str) -> Result<(), PageError>;

    async fn current_url(&self) -> Result<String, PageError>;

    /// Whether at least one element currently matches `selector`.
    async fn exists(&self, selector: &str) -> Result<bool, PageError>;

    async fn click(&self, selector: &str) -> Result<(), PageError>;

    /// Sends a raw key sequence to the first element matching `selector`.
    async fn press_keys(&self, selector: &str, keys: &str) -> Result<(), PageError>;

    /// Text content of the first element matching `selector`, or `None` when
    /// nothing matches.
    async fn text(&self, selector: &str) -> Result<Option<String>, PageError>;

    async fn attribute(&self, selector: &str, name: &str) -> Result<Option<String>, PageError>;

    /// Runs `script` in the page and returns its JSON-serialized result.
    /// Scripts use `return` to produce a value.
    async fn evaluate(&self, script: &str) -> Result<serde_json::Value, PageError>;

    /// Releases the page resource. Further calls fail.
    async fn close(&self) -> Result<(), PageError>;

    /// Types `text` one character at a time with `delay` between keystrokes.
    async fn type_text(&self, selector: &str, text: &str, delay: Duration) -> Result<(), PageError> {
        let mut buf = [0u8; 4];
        for (i, ch) in text.chars().enumerate() {
            if i > 0 && !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            self.press_keys(selector, ch.encode_utf8(&mut buf)).await?;
        }
        Ok(())
    }
}

/// Opens isolated page resources, one per crawl task.
#[async_trait]
pub trait PageFactory: Send + Sync {
    type Page: Page + 'static;

    async fn open(&self) -> Result<Self::Page, PageError>;
}

/// Closes `page`, logging instead of failing: a page that cannot be closed
/// must not turn a finished task into a failed one.
pub(crate) async fn close_quietly<P: Page + ?Sized>(page: &P) {
    if let Err(e) = page.close().await {
        tracing::debug!(error = %e, "failed to close page");
    }
}
