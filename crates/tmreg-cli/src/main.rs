use chrono::NaiveDate;
use clap::error::ErrorKind;
use clap::{CommandFactory, Parser};
use tmreg_core::{CoreError, SearchCriteria};
use tmreg_scraper::{CrawlSettings, Crawler, WebDriverClient};
use tracing_subscriber::EnvFilter;

/// Per-command HTTP timeout for the WebDriver server. Page-level waits are
/// bounded separately by the configured form, results and detail timeouts.
const WEBDRIVER_REQUEST_TIMEOUT_SECS: u64 = 60;

#[derive(Debug, Parser)]
#[command(name = "tmreg-cli")]
#[command(about = "Crawl trademark applications filed within a date range")]
struct Cli {
    /// First application date to include (YYYY-MM-DD).
    #[arg(value_parser = parse_date_arg)]
    start_date: NaiveDate,

    /// Last application date to include (YYYY-MM-DD).
    #[arg(value_parser = parse_date_arg)]
    end_date: NaiveDate,
}

impl Cli {
    fn criteria(&self) -> Result<SearchCriteria, CoreError> {
        SearchCriteria::new(self.start_date, self.end_date)
    }
}

fn parse_date_arg(value: &str) -> Result<NaiveDate, String> {
    tmreg_core::parse_date(value).map_err(|e| e.to_string())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let criteria = match cli.criteria() {
        Ok(criteria) => criteria,
        Err(e) => Cli::command().error(ErrorKind::ValueValidation, e).exit(),
    };

    let config = tmreg_core::load_app_config()?;
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let client = WebDriverClient::new(
        &config.webdriver_url,
        config.headless,
        WEBDRIVER_REQUEST_TIMEOUT_SECS,
    )?;
    let crawler = Crawler::new(client, CrawlSettings::from_app_config(&config));

    let report = match crawler.run(&criteria).await {
        Ok(report) => report,
        Err(e) => {
            tracing::error!(
                error = %e,
                terminal = e.is_terminal_query(),
                "crawl aborted; no output written"
            );
            return Err(e.into());
        }
    };

    let exported = report.sink.export_json(&config.output_path)?;
    println!(
        "wrote {exported} records to {} ({} rows found, {} details failed)",
        config.output_path.display(),
        report.summary.rows_discovered,
        report.summary.details_failed,
    );

    Ok(())
}
