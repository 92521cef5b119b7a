pub mod crawler;
pub mod error;
pub mod extract;
pub mod fields;
pub mod form;
pub mod page;
pub mod pagination;
pub mod queue;
mod retry;
pub mod site;
pub mod sink;
pub mod types;

pub use crawler::{CrawlReport, CrawlSettings, CrawlState, CrawlSummary, Crawler};
pub use error::{CrawlError, PageError};
pub use extract::{extract_record, DetailExtractor, SnapshotCell};
pub use fields::canonical_key;
pub use form::{FormSettings, SearchFormController, Submission};
pub use page::webdriver::WebDriverClient;
pub use page::{Page, PageFactory};
pub use pagination::{PaginationWalker, WalkProgress, WalkSummary};
pub use queue::{LinkQueue, Request, RequestQueue};
pub use sink::RecordSink;
pub use types::{DetailRecord, ResultRow, SearchOutcome, TaskLabel};
