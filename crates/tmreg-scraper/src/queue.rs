//! Hand-off between discovery and the scheduler.

use std::collections::HashSet;
use std::sync::Mutex;

use tokio::sync::mpsc;

use crate::types::TaskLabel;

/// A unit of work for the scheduler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub url: String,
    pub label: TaskLabel,
}

/// Accepts discovered links for later dispatch to the handler matching
/// `label`. Implementations decide ordering and deduplication.
pub trait LinkQueue: Send + Sync {
    fn enqueue(&self, url: String, label: TaskLabel);
}

/// Channel-backed queue that drops URLs it has already accepted.
///
/// The receiving side sees the stream end once every `RequestQueue` has been
/// dropped.
pub struct RequestQueue {
    tx: mpsc::UnboundedSender<Request>,
    seen: Mutex<HashSet<String>>,
}

impl RequestQueue {
    #[must_use]
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<Request>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            Self {
                tx,
                seen: Mutex::new(HashSet::new()),
            },
            rx,
        )
    }

    /// Number of distinct URLs accepted so far.
    #[must_use]
    pub fn accepted(&self) -> usize {
        self.seen.lock().map_or(0, |seen| seen.len())
    }
}

impl LinkQueue for RequestQueue {
    fn enqueue(&self, url: String, label: TaskLabel) {
        let fresh = match self.seen.lock() {
            Ok(mut seen) => seen.insert(url.clone()),
            Err(poisoned) => poisoned.into_inner().insert(url.clone()),
        };
        if !fresh {
            tracing::debug!(url = %url, "skipping duplicate request");
            return;
        }
        if self.tx.send(Request { url, label }).is_err() {
            tracing::warn!("request queue receiver dropped; discarding request");
        }
    }
}
