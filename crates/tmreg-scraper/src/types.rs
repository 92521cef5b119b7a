//! Domain types shared across the crawl pipeline.

use std::collections::BTreeMap;

use serde::Serialize;

/// Classification of the page state after submitting the search form.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchOutcome {
    Success,
    /// The registry reported that nothing matched. Terminal.
    EmptyResult,
    /// The registry refused to list a result set this large. Terminal.
    OverflowResult,
    /// Neither a result table nor a message appeared in time. Retryable.
    Ambiguous,
}

/// A detail-page link discovered in a result table. The URL is its identity.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResultRow {
    pub url: String,
}

/// Which handler a queued request is dispatched to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskLabel {
    Listing,
    Detail,
}

/// One extracted trademark record: canonical field key to value.
///
/// A key whose label was found with an empty value is present as `None`
/// (serialized `null`); a key whose label never appeared is absent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct DetailRecord(BTreeMap<String, Option<String>>);

impl DetailRecord {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: &str, value: Option<String>) {
        self.0.insert(key.to_owned(), value);
    }

    /// `None` when the key is absent, `Some(None)` when present as null.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<Option<&str>> {
        self.0.get(key).map(Option::as_deref)
    }

    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }
}
