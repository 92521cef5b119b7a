mod app_config;
mod config;
mod criteria;

use thiserror::Error;

pub use app_config::AppConfig;
pub use config::{load_app_config, load_app_config_from_env};
pub use criteria::{parse_date, SearchCriteria, DATE_FORMAT};

/// Errors raised while validating caller input, before any crawl starts.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CoreError {
    #[error("invalid date \"{value}\": expected YYYY-MM-DD ({reason})")]
    InvalidDate { value: String, reason: String },

    #[error("start date {start} is after end date {end}")]
    InvertedRange { start: String, end: String },
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for environment variable {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },
}
