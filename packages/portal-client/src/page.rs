//! HTML helpers for portal pages.
//!
//! Pages are parsed synchronously; `scraper::Html` is not `Send`, so callers
//! must never hold a parsed document across an await point.

use scraper::{ElementRef, Html, Selector};
use url::Url;

/// A fetched page and the URL it finally landed on after redirects.
#[derive(Debug, Clone)]
pub struct Page {
    pub url: Url,
    pub html: String,
}

impl Page {
    pub fn top_row(&self) -> Option<Vec<String>> {
        top_row(&self.html)
    }
}

/// Hidden CSRF token of the login form, if the portal renders one.
pub fn csrf_token(html: &str) -> Option<String> {
    let document = Html::parse_document(html);
    let selector = Selector::parse(r#"input[name="_token"]"#).ok()?;
    document
        .select(&selector)
        .next()
        .and_then(|input| input.value().attr("value"))
        .map(str::to_string)
}

/// Cell texts of the first body row of the first table on the page.
///
/// Returns `None` when the page has no table or the table body is empty.
pub fn top_row(html: &str) -> Option<Vec<String>> {
    let document = Html::parse_document(html);
    let row_selector = Selector::parse("table tbody tr").ok()?;
    let cell_selector = Selector::parse("td").ok()?;

    let row = document.select(&row_selector).next()?;
    Some(row.select(&cell_selector).map(cell_text).collect())
}

fn cell_text(cell: ElementRef<'_>) -> String {
    cell.text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}
