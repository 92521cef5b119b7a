use thiserror::Error;

/// Failures reported by a page engine while driving one page resource.
#[derive(Debug, Error)]
pub enum PageError {
    #[error("HTTP error talking to the page engine: {0}")]
    Http(#[from] reqwest::Error),

    #[error("page engine error \"{error}\": {message}")]
    Engine { error: String, message: String },

    #[error("no element matches selector \"{selector}\"")]
    ElementNotFound { selector: String },

    #[error("timed out after {timeout_ms}ms waiting for {what}")]
    Timeout { what: String, timeout_ms: u64 },

    #[error("unexpected page engine response for {context}: {reason}")]
    UnexpectedResponse { context: String, reason: String },

    #[error("JSON deserialization error for {context}: {source}")]
    Deserialize {
        context: String,
        #[source]
        source: serde_json::Error,
    },
}

impl PageError {
    /// Whether the same step could succeed if attempted again.
    ///
    /// Missing elements count as transient: the page may simply not have
    /// finished rendering. Engine errors are transient only for the codes in
    /// [`TRANSIENT_ENGINE_ERRORS`]; a script or selector the engine rejects
    /// fails the same way every time.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            PageError::Http(_) | PageError::ElementNotFound { .. } | PageError::Timeout { .. } => {
                true
            }
            PageError::Engine { error, .. } => TRANSIENT_ENGINE_ERRORS.contains(&error.as_str()),
            PageError::UnexpectedResponse { .. } | PageError::Deserialize { .. } => false,
        }
    }
}

/// WebDriver error codes caused by the page still rendering or the browser
/// being slow, rather than by the command itself.
pub const TRANSIENT_ENGINE_ERRORS: &[&str] = &[
    "stale element reference",
    "no such element",
    "element not interactable",
    "element click intercepted",
    "timeout",
    "script timeout",
];

/// Failures surfaced by the crawl pipeline.
#[derive(Debug, Error)]
pub enum CrawlError {
    #[error(transparent)]
    Page(#[from] PageError),

    #[error(
        "registry reported no results for the requested date range \"{message}\"; \
         broaden the date range"
    )]
    NoResults { message: String },

    #[error(
        "registry reported too many results for the requested date range \"{message}\"; \
         narrow the date range"
    )]
    TooManyResults { message: String },

    #[error("neither a result table nor a registry message appeared within {timeout_ms}ms of submitting the search")]
    Ambiguous { timeout_ms: u64 },

    #[error("malformed page snapshot for {context}: {source}")]
    Snapshot {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to write records to {path}: {source}")]
    Export {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to serialize records: {0}")]
    Serialize(#[source] serde_json::Error),
}

impl CrawlError {
    /// Returns `true` if a scheduler should retry the task that produced
    /// this error.
    ///
    /// Retriable:
    /// - [`CrawlError::Page`] when the underlying [`PageError`] is transient.
    /// - [`CrawlError::Ambiguous`], the results page never settled.
    ///
    /// Terminal (never retried):
    /// - [`CrawlError::NoResults`] / [`CrawlError::TooManyResults`], the query
    ///   itself is unsatisfiable as posed.
    /// - snapshot, export and serialization failures.
    #[must_use]
    pub fn is_retriable(&self) -> bool {
        match self {
            CrawlError::Page(err) => err.is_transient(),
            CrawlError::Ambiguous { .. } => true,
            CrawlError::NoResults { .. }
            | CrawlError::TooManyResults { .. }
            | CrawlError::Snapshot { .. }
            | CrawlError::Export { .. }
            | CrawlError::Serialize(_) => false,
        }
    }

    /// Terminal query errors: the registry answered, but the date range
    /// must change before a crawl can succeed.
    #[must_use]
    pub fn is_terminal_query(&self) -> bool {
        matches!(
            self,
            CrawlError::NoResults { .. } | CrawlError::TooManyResults { .. }
        )
    }
}
