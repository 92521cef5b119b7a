//! Search criteria for one crawl: an inclusive calendar date range.

use chrono::NaiveDate;

use crate::CoreError;

/// The only accepted input format for dates on the command line.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Parses a strict `YYYY-MM-DD` calendar date.
///
/// chrono accepts unpadded fields such as `2024-1-5`; those are rejected
/// here by requiring the value to round-trip through [`DATE_FORMAT`].
///
/// # Errors
///
/// Returns [`CoreError::InvalidDate`] if `value` is not a valid, zero-padded
/// calendar date.
pub fn parse_date(value: &str) -> Result<NaiveDate, CoreError> {
    let date =
        NaiveDate::parse_from_str(value, DATE_FORMAT).map_err(|e| CoreError::InvalidDate {
            value: value.to_owned(),
            reason: e.to_string(),
        })?;

    if date.format(DATE_FORMAT).to_string() != value {
        return Err(CoreError::InvalidDate {
            value: value.to_owned(),
            reason: "fields must be zero-padded".to_owned(),
        });
    }

    Ok(date)
}

/// Date range submitted to the registry search form.
///
/// Invariant: `start_date <= end_date`. Fields are private so the invariant
/// cannot be broken after construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchCriteria {
    start_date: NaiveDate,
    end_date: NaiveDate,
}

impl SearchCriteria {
    /// # Errors
    ///
    /// Returns [`CoreError::InvertedRange`] if `start_date > end_date`.
    pub fn new(start_date: NaiveDate, end_date: NaiveDate) -> Result<Self, CoreError> {
        if start_date > end_date {
            return Err(CoreError::InvertedRange {
                start: start_date.format(DATE_FORMAT).to_string(),
                end: end_date.format(DATE_FORMAT).to_string(),
            });
        }
        Ok(Self {
            start_date,
            end_date,
        })
    }

    /// Validates two raw `YYYY-MM-DD` arguments into criteria.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidDate`] for a malformed date and
    /// [`CoreError::InvertedRange`] when the start is after the end.
    pub fn parse(start: &str, end: &str) -> Result<Self, CoreError> {
        Self::new(parse_date(start)?, parse_date(end)?)
    }

    #[must_use]
    pub fn start_date(&self) -> NaiveDate {
        self.start_date
    }

    #[must_use]
    pub fn end_date(&self) -> NaiveDate {
        self.end_date
    }
}
