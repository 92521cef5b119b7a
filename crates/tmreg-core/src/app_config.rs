use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub webdriver_url: String,
    pub search_url: String,
    pub output_path: PathBuf,
    pub log_level: String,
    pub headless: bool,
    pub form_timeout_secs: u64,
    pub results_timeout_secs: u64,
    pub detail_timeout_secs: u64,
    pub keystroke_delay_ms: u64,
    pub checkbox_settle_ms: u64,
    pub page_settle_ms: u64,
    pub max_pages: usize,
    pub max_concurrent_details: usize,
    pub max_retries: u32,
    pub retry_backoff_base_secs: u64,
    /// `strftime` pattern used when typing dates into the registry form.
    pub date_input_format: String,
}
