use crate::app_config::AppConfig;
use crate::ConfigError;

pub(crate) const DEFAULT_SEARCH_URL: &str = "https://trademarks.example.org/search/advanced";

/// Load application configuration from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading env vars.
///
/// # Errors
///
/// Returns `ConfigError` if a variable is present but malformed.
pub fn load_app_config() -> Result<AppConfig, ConfigError> {
    dotenvy::dotenv().ok();
    load_app_config_from_env()
}

/// Load application configuration from environment variables already in the process.
///
/// Unlike [`load_app_config`], this does NOT load `.env` files.
///
/// # Errors
///
/// Returns `ConfigError` if a variable is present but malformed.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

/// Build application configuration using the provided env-var lookup function.
///
/// Every variable has a default, so an empty environment yields a usable
/// config; only malformed values fail.
fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    use std::path::PathBuf;

    let or_default = |var: &str, default: &str| -> String {
        lookup(var).unwrap_or_else(|_| default.to_string())
    };

    let parse_u64 = |var: &str, default: &str| -> Result<u64, ConfigError> {
        parse_as::<u64>(var, &or_default(var, default))
    };

    let parse_usize_min_one = |var: &str, default: &str| -> Result<usize, ConfigError> {
        let value = parse_as::<usize>(var, &or_default(var, default))?;
        if value == 0 {
            return Err(ConfigError::InvalidEnvVar {
                var: var.to_string(),
                reason: "must be at least 1".to_string(),
            });
        }
        Ok(value)
    };

    let webdriver_url = or_default("TMREG_WEBDRIVER_URL", "http://localhost:4444");
    let search_url = or_default("TMREG_SEARCH_URL", DEFAULT_SEARCH_URL);
    let output_path = PathBuf::from(or_default("TMREG_OUTPUT_PATH", "./trademarks.json"));
    let log_level = or_default("TMREG_LOG_LEVEL", "info");
    let headless = parse_bool("TMREG_HEADLESS", &or_default("TMREG_HEADLESS", "true"))?;

    let form_timeout_secs = parse_u64("TMREG_FORM_TIMEOUT_SECS", "20")?;
    let results_timeout_secs = parse_u64("TMREG_RESULTS_TIMEOUT_SECS", "30")?;
    let detail_timeout_secs = parse_u64("TMREG_DETAIL_TIMEOUT_SECS", "20")?;
    let keystroke_delay_ms = parse_u64("TMREG_KEYSTROKE_DELAY_MS", "100")?;
    let checkbox_settle_ms = parse_u64("TMREG_CHECKBOX_SETTLE_MS", "500")?;
    let page_settle_ms = parse_u64("TMREG_PAGE_SETTLE_MS", "2000")?;

    let max_pages = parse_usize_min_one("TMREG_MAX_PAGES", "1000")?;
    let max_concurrent_details = parse_usize_min_one("TMREG_MAX_CONCURRENT_DETAILS", "4")?;
    let max_retries = parse_as::<u32>(
        "TMREG_MAX_RETRIES",
        &or_default("TMREG_MAX_RETRIES", "3"),
    )?;
    let retry_backoff_base_secs = parse_u64("TMREG_RETRY_BACKOFF_BASE_SECS", "2")?;

    let date_input_format = or_default("TMREG_DATE_INPUT_FORMAT", "%d/%m/%Y");
    validate_date_format("TMREG_DATE_INPUT_FORMAT", &date_input_format)?;

    Ok(AppConfig {
        webdriver_url,
        search_url,
        output_path,
        log_level,
        headless,
        form_timeout_secs,
        results_timeout_secs,
        detail_timeout_secs,
        keystroke_delay_ms,
        checkbox_settle_ms,
        page_settle_ms,
        max_pages,
        max_concurrent_details,
        max_retries,
        retry_backoff_base_secs,
        date_input_format,
    })
}

fn parse_as<T>(var: &str, raw: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim()
        .parse::<T>()
        .map_err(|e| ConfigError::InvalidEnvVar {
            var: var.to_string(),
            reason: e.to_string(),
        })
}

fn parse_bool(var: &str, raw: &str) -> Result<bool, ConfigError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(ConfigError::InvalidEnvVar {
            var: var.to_string(),
            reason: format!("expected a boolean, got \"{other}\""),
        }),
    }
}

/// Rejects `strftime` patterns chrono cannot render, so a typo fails at
/// startup instead of panicking mid-crawl inside `Display`.
fn validate_date_format(var: &str, pattern: &str) -> Result<(), ConfigError> {
    use chrono::format::{Item, StrftimeItems};

    if pattern.trim().is_empty() {
        return Err(ConfigError::InvalidEnvVar {
            var: var.to_string(),
            reason: "must not be empty".to_string(),
        });
    }
    if StrftimeItems::new(pattern).any(|item| matches!(item, Item::Error)) {
        return Err(ConfigError::InvalidEnvVar {
            var: var.to_string(),
            reason: format!("\"{pattern}\" is not a valid strftime pattern"),
        });
    }
    Ok(())
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
