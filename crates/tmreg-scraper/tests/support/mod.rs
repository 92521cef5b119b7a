//! Scripted in-memory registry used by the integration tests.
//!
//! `FakeSite` plays the page engine: it hands out `FakePage`s that answer
//! the selectors and scripts in `tmreg_scraper::site` from a shared,
//! inspectable state. Nothing here touches a browser or the network.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde_json::{json, Value};

use tmreg_scraper::form::FormSettings;
use tmreg_scraper::page::keys;
use tmreg_scraper::page::wait::{MARK_DOCUMENT_SCRIPT, NAVIGATION_STATE_SCRIPT};
use tmreg_scraper::{site, CrawlSettings, Page, PageError, PageFactory};

pub const SEARCH_URL: &str = "https://registry.test/search/advanced";

/// What the registry shows after the search form is submitted.
#[derive(Debug, Clone)]
pub enum SearchResponse {
    /// Result pages, each a list of detail URLs.
    Results(Vec<Vec<String>>),
    /// A message banner and no result table.
    Message(String),
    /// Neither a table nor a message ever appears.
    Nothing,
}

#[derive(Debug, Clone)]
pub enum DetailPage {
    /// Rendered detail table, in the shape the snapshot script returns.
    Snapshot(Value),
    /// The detail panel never renders.
    Missing,
    /// The snapshot script returns something that is not a table.
    Malformed,
}

#[derive(Debug)]
pub struct SiteState {
    pub show_form: bool,
    pub checkboxes: Vec<(String, bool)>,
    /// `(group box, member boxes)`: toggling the group box sets every member
    /// to the group box's new state.
    pub checkbox_groups: Vec<(String, Vec<String>)>,
    /// Banner the search page itself shows under the form.
    pub search_banner: Option<String>,
    /// How long the submitted search page stays loaded after the click.
    pub navigation_delay: Option<Duration>,
    pub fields: HashMap<String, String>,
    pub response: SearchResponse,
    pub details: HashMap<String, DetailPage>,
    /// Clicks on the next-page control that fail before one succeeds.
    pub next_page_failures: usize,
    /// Result page index on which those failures happen.
    pub next_page_failure_on: usize,
    /// The next-page control never becomes disabled.
    pub endless_pagination: bool,

    pub submissions: usize,
    pub toggled: Vec<String>,
    pub navigations: Vec<String>,
    pub opened: usize,
    pub closed: usize,
    /// Detail URLs whose snapshot was requested, once per request.
    pub snapshots_served: Vec<String>,
}

impl Default for SiteState {
    fn default() -> Self {
        Self {
            show_form: true,
            checkboxes: Vec::new(),
            checkbox_groups: Vec::new(),
            search_banner: None,
            navigation_delay: None,
            fields: HashMap::new(),
            response: SearchResponse::Results(vec![Vec::new()]),
            details: HashMap::new(),
            next_page_failures: 0,
            next_page_failure_on: 0,
            endless_pagination: false,
            submissions: 0,
            toggled: Vec::new(),
            navigations: Vec::new(),
            opened: 0,
            closed: 0,
            snapshots_served: Vec::new(),
        }
    }
}

#[derive(Clone, Default)]
pub struct FakeSite {
    state: Arc<Mutex<SiteState>>,
}

impl FakeSite {
    pub fn new(state: SiteState) -> Self {
        Self {
            state: Arc::new(Mutex::new(state)),
        }
    }

    pub fn state(&self) -> MutexGuard<'_, SiteState> {
        self.state.lock().unwrap()
    }

    /// Opens a page already showing the search form.
    pub fn search_page(&self) -> FakePage {
        let page = self.new_page();
        *page.location.lock().unwrap() = Location::Search;
        page
    }

    fn new_page(&self) -> FakePage {
        self.state().opened += 1;
        FakePage {
            state: Arc::clone(&self.state),
            location: Mutex::new(Location::Blank),
            pending: Mutex::new(None),
            marked: Mutex::new(false),
            selected: Mutex::new(None),
        }
    }
}

#[async_trait]
impl PageFactory for FakeSite {
    type Page = FakePage;

    async fn open(&self) -> Result<FakePage, PageError> {
        Ok(self.new_page())
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Location {
    Blank,
    Search,
    Results(usize),
    Message(String),
    Pending,
    Detail(String),
    Elsewhere(String),
}

pub struct FakePage {
    state: Arc<Mutex<SiteState>>,
    location: Mutex<Location>,
    /// Document that replaces the current one once its time has come.
    pending: Mutex<Option<(Instant, Location)>>,
    /// Whether the current document carries the navigation marker.
    marked: Mutex<bool>,
    /// Date field whose contents are currently selected.
    selected: Mutex<Option<String>>,
}

impl FakePage {
    fn state(&self) -> MutexGuard<'_, SiteState> {
        self.state.lock().unwrap()
    }

    fn location(&self) -> Location {
        self.land_pending();
        self.location.lock().unwrap().clone()
    }

    fn set_location(&self, location: Location) {
        *self.location.lock().unwrap() = location;
        *self.marked.lock().unwrap() = false;
    }

    /// Swaps in the delayed document once it is due.
    fn land_pending(&self) {
        let due = {
            let mut pending = self.pending.lock().unwrap();
            match pending.as_ref() {
                Some((at, _)) if Instant::now() >= *at => pending.take(),
                _ => None,
            }
        };
        if let Some((_, next)) = due {
            self.set_location(next);
        }
    }

    fn toggle_checkbox(state: &mut SiteState, id: &str) {
        state.toggled.push(id.to_owned());
        let Some(checked) = state
            .checkboxes
            .iter_mut()
            .find(|(cb, _)| cb == id)
            .map(|cb| {
                cb.1 = !cb.1;
                cb.1
            })
        else {
            return;
        };
        let members: Vec<String> = state
            .checkbox_groups
            .iter()
            .filter(|(group, _)| group == id)
            .flat_map(|(_, members)| members.iter().cloned())
            .collect();
        for (cb, value) in &mut state.checkboxes {
            if members.contains(cb) {
                *value = checked;
            }
        }
    }

    fn results_pages(&self) -> Vec<Vec<String>> {
        match &self.state().response {
            SearchResponse::Results(pages) => pages.clone(),
            _ => Vec::new(),
        }
    }

    fn is_last_page(&self, index: usize) -> bool {
        let endless = self.state().endless_pagination;
        let pages = self.results_pages().len();
        !endless && index + 1 >= pages
    }

    fn checkbox_id(selector: &str) -> Option<&str> {
        selector.strip_prefix("[id=\"")?.strip_suffix("\"]")
    }

    fn not_found(selector: &str) -> PageError {
        PageError::ElementNotFound {
            selector: selector.to_owned(),
        }
    }

    fn detail_page(&self, url: &str) -> Option<DetailPage> {
        self.state().details.get(url).cloned()
    }
}

fn is_date_input(selector: &str) -> bool {
    selector == site::DATE_FROM_INPUT || selector == site::DATE_TO_INPUT
}

#[async_trait]
impl Page for FakePage {
    async fn navigate(&self, url: &str) -> Result<(), PageError> {
        self.state().navigations.push(url.to_owned());
        let location = if url == SEARCH_URL {
            Location::Search
        } else if self.detail_page(url).is_some() {
            Location::Detail(url.to_owned())
        } else {
            Location::Elsewhere(url.to_owned())
        };
        self.set_location(location);
        Ok(())
    }

    async fn current_url(&self) -> Result<String, PageError> {
        Ok(match self.location() {
            Location::Detail(url) | Location::Elsewhere(url) => url,
            Location::Blank => "about:blank".to_owned(),
            _ => SEARCH_URL.to_owned(),
        })
    }

    async fn exists(&self, selector: &str) -> Result<bool, PageError> {
        let location = self.location();
        let found = match location {
            Location::Search => {
                let state = self.state();
                if !state.show_form {
                    false
                } else if let Some(id) = Self::checkbox_id(selector) {
                    state.checkboxes.iter().any(|(cb, _)| cb == id)
                } else {
                    selector == site::FORM_CONTAINER
                        || selector == site::SUBMIT_BUTTON
                        || is_date_input(selector)
                        || (selector == site::MESSAGE && state.search_banner.is_some())
                }
            }
            Location::Results(_) => selector == site::RESULTS_TABLE || selector == site::NEXT_PAGE,
            Location::Message(_) => selector == site::MESSAGE,
            Location::Detail(url) => {
                let renders = !matches!(self.detail_page(&url), Some(DetailPage::Missing) | None);
                renders && (selector == site::DETAIL_PANEL || selector == site::DETAIL_TABLE)
            }
            Location::Blank | Location::Pending | Location::Elsewhere(_) => false,
        };
        Ok(found)
    }

    async fn click(&self, selector: &str) -> Result<(), PageError> {
        if !self.exists(selector).await? {
            return Err(Self::not_found(selector));
        }

        if let Some(id) = Self::checkbox_id(selector) {
            Self::toggle_checkbox(&mut self.state(), id);
        } else if selector == site::SUBMIT_BUTTON {
            let (next, delay) = {
                let mut state = self.state();
                state.submissions += 1;
                let next = match &state.response {
                    SearchResponse::Results(_) => Location::Results(0),
                    SearchResponse::Message(text) => Location::Message(text.clone()),
                    SearchResponse::Nothing => Location::Pending,
                };
                (next, state.navigation_delay)
            };
            match delay {
                Some(delay) => *self.pending.lock().unwrap() = Some((Instant::now() + delay, next)),
                None => self.set_location(next),
            }
        } else if selector == site::NEXT_PAGE {
            let on_page = match self.location() {
                Location::Results(index) => Some(index),
                _ => None,
            };
            {
                let mut state = self.state();
                if state.next_page_failures > 0 && on_page == Some(state.next_page_failure_on) {
                    state.next_page_failures -= 1;
                    return Err(PageError::Engine {
                        error: "stale element reference".to_owned(),
                        message: "next-page control was re-rendered".to_owned(),
                    });
                }
            }
            if let Location::Results(index) = self.location() {
                if !self.is_last_page(index) {
                    self.set_location(Location::Results(index + 1));
                }
            }
        } else if is_date_input(selector) {
            *self.selected.lock().unwrap() = None;
        }
        Ok(())
    }

    async fn press_keys(&self, selector: &str, sequence: &str) -> Result<(), PageError> {
        if !is_date_input(selector) || !self.exists(selector).await? {
            return Err(Self::not_found(selector));
        }

        let mut selected = self.selected.lock().unwrap();
        let mut state = self.state();
        let value = state.fields.entry(selector.to_owned()).or_default();

        if sequence == keys::SELECT_ALL {
            *selected = Some(selector.to_owned());
        } else if sequence == keys::BACKSPACE {
            if selected.take().is_some() {
                value.clear();
            } else {
                value.pop();
            }
        } else {
            if selected.take().is_some() {
                value.clear();
            }
            value.push_str(sequence);
        }
        Ok(())
    }

    async fn text(&self, selector: &str) -> Result<Option<String>, PageError> {
        match self.location() {
            Location::Message(text) if selector == site::MESSAGE => Ok(Some(text)),
            Location::Search if selector == site::MESSAGE => Ok(self.state().search_banner.clone()),
            _ => Ok(None),
        }
    }

    async fn attribute(&self, selector: &str, name: &str) -> Result<Option<String>, PageError> {
        let Location::Results(index) = self.location() else {
            return Ok(None);
        };
        if selector != site::NEXT_PAGE || name != "class" {
            return Ok(None);
        }
        let class = if self.is_last_page(index) {
            "next-page disabled"
        } else {
            "next-page"
        };
        Ok(Some(class.to_owned()))
    }

    async fn evaluate(&self, script: &str) -> Result<Value, PageError> {
        let location = self.location();
        if script == MARK_DOCUMENT_SCRIPT {
            *self.marked.lock().unwrap() = true;
            return Ok(json!(true));
        }
        if script == NAVIGATION_STATE_SCRIPT {
            let marked = *self.marked.lock().unwrap();
            return Ok(json!(if marked { "marked" } else { "complete" }));
        }
        if script == site::CHECKBOX_STATES_SCRIPT && location == Location::Search {
            let states: Vec<Value> = self
                .state()
                .checkboxes
                .iter()
                .map(|(id, checked)| json!({ "id": id, "checked": checked }))
                .collect();
            return Ok(Value::Array(states));
        }
        if script == site::ROW_LINKS_SCRIPT {
            if let Location::Results(index) = location {
                let rows = self.results_pages().get(index).cloned().unwrap_or_default();
                return Ok(json!(rows));
            }
            return Ok(json!([]));
        }
        if script == site::DETAIL_SNAPSHOT_SCRIPT {
            if let Location::Detail(url) = location {
                self.state().snapshots_served.push(url.clone());
                return Ok(match self.detail_page(&url) {
                    Some(DetailPage::Snapshot(value)) => value,
                    Some(DetailPage::Malformed) => json!({ "unexpected": true }),
                    Some(DetailPage::Missing) | None => Value::Null,
                });
            }
            return Ok(Value::Null);
        }

        Err(PageError::Engine {
            error: "javascript error".to_owned(),
            message: "script not scripted in fake site".to_owned(),
        })
    }

    async fn close(&self) -> Result<(), PageError> {
        self.state().closed += 1;
        Ok(())
    }
}

/// Rows of `(label, value)` cells in the shape the snapshot script returns.
pub fn detail_snapshot(pairs: &[(&str, &str)]) -> Value {
    let rows: Vec<Value> = pairs
        .iter()
        .map(|(label, value)| {
            json!([
                { "text": label, "label": true, "highlight": null },
                { "text": value, "label": false, "highlight": null }
            ])
        })
        .collect();
    Value::Array(rows)
}

pub fn detail_url(n: usize) -> String {
    format!("https://registry.test/trademark/{n}")
}

pub fn form_settings() -> FormSettings {
    FormSettings {
        form_timeout: Duration::from_millis(300),
        results_timeout: Duration::from_millis(300),
        keystroke_delay: Duration::ZERO,
        checkbox_settle: Duration::ZERO,
        date_input_format: "%d/%m/%Y".to_owned(),
    }
}

/// Fast settings: no delays, short timeouts, retries without backoff.
pub fn crawl_settings() -> CrawlSettings {
    CrawlSettings {
        search_url: SEARCH_URL.to_owned(),
        form: form_settings(),
        detail_timeout: Duration::from_millis(300),
        page_settle: Duration::ZERO,
        max_pages: 50,
        max_concurrent_details: 2,
        max_retries: 2,
        retry_backoff_base_secs: 0,
    }
}
