//! Registry page structure: selectors, in-page scripts and message phrases.
//!
//! Everything the crawler knows about the registry's markup lives here so a
//! layout change touches one file.

/// Container that holds the advanced search form.
pub const FORM_CONTAINER: &str = "#advanced-search-form";

/// Checkbox identifiers that must end up checked before submitting. Every
/// other checkbox in [`FORM_CONTAINER`] must end up unchecked.
pub const CHECKBOX_TARGETS: &[&str] = &[
    "office-national",
    "status-filed",
    "status-registered",
    "status-expired",
    "type-word",
    "type-figurative",
];

/// The registry's "from" field. It receives the caller's *end* date.
pub const DATE_FROM_INPUT: &str = "#application-date-from";
/// The registry's "to" field. It receives the caller's *start* date.
pub const DATE_TO_INPUT: &str = "#application-date-to";

pub const SUBMIT_BUTTON: &str = "#advanced-search-submit";

pub const RESULTS_TABLE: &str = "table.results-table";
/// Informational banner shown instead of (or above) the result table.
pub const MESSAGE: &str = ".search-message";

/// Next-page control. Carries the `disabled` class on the final page.
pub const NEXT_PAGE: &str = ".pagination .next-page";

pub const DETAIL_PANEL: &str = ".detail-panel";
pub const DETAIL_TABLE: &str = ".detail-panel table.detail-table";

/// Lower-cased phrase the registry shows when the query matched nothing.
pub const NO_RESULTS_PHRASE: &str = "no results";
/// Lower-cased phrase the registry shows when the query matched more rows
/// than it is willing to list.
pub const TOO_MANY_RESULTS_PHRASE: &str = "too many results";

/// Returns `[{ "id": string, "checked": bool }]` for every checkbox in the form.
pub const CHECKBOX_STATES_SCRIPT: &str = r"return Array.from(
  document.querySelectorAll('#advanced-search-form input[type=checkbox]')
).map(function (el) { return { id: el.id, checked: !!el.checked }; });";

/// Returns the absolute URL of the first link in every result row.
pub const ROW_LINKS_SCRIPT: &str = r"return Array.from(
  document.querySelectorAll('table.results-table tbody tr')
).map(function (row) {
  var link = row.querySelector('a[href]');
  return link ? link.href : null;
}).filter(function (href) { return !!href; });";

/// Returns the detail table as rows of cells:
/// `[[{ "text": string, "label": bool, "highlight": string | null }]]`.
pub const DETAIL_SNAPSHOT_SCRIPT: &str = r"var table = document.querySelector('.detail-panel table.detail-table');
if (!table) { return null; }
return Array.from(table.querySelectorAll('tr')).map(function (row) {
  return Array.from(row.querySelectorAll('td, th')).map(function (cell) {
    var mark = cell.querySelector('.highlight');
    return {
      text: cell.textContent || '',
      label: cell.classList.contains('label'),
      highlight: mark ? (mark.textContent || '') : null
    };
  });
});";
