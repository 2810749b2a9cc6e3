// src/specs/results.rs
//! Results page → `DocumentRecord`s.
//!
//! The portal's results grid has no stable contract. Extraction goes in three
//! tiers, each less precise than the last:
//!
//! 1. the grid marked `id="table_0"`, else the first table whose own header
//!    row names a `Title` column;
//! 2. failing both, every `<tr>` in the page except layout rows;
//! 3. columns by header text, falling back per field to fixed positions.
//!
//! Every downgrade is reported as an [`ExtractionAmbiguity`] and never aborts.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;
use scraper::{ElementRef, Html};
use tracing::{debug, warn};
use url::Url;

use crate::config::consts::FILE_SERVICE;
use crate::core::html::{has_nested_rows, is_tag, own_rows, row_cells, sel, text_of};
use crate::core::sanitize::contains_ci;
use crate::record::DocumentRecord;

/// Positional fallback, from the results grid as last observed:
///
/// ```text
/// 0 Select | 1 Content ID | 2 Record Series | 3 Primary ID | 4 Secondary ID
/// 5 Document Type | 6 Title | 7 Begin Date
/// ```
///
/// Expect these to drift when the portal changes its grid. Update, don't remove.
pub const FALLBACK_DOCUMENT_TYPE_COL: usize = 5;
pub const FALLBACK_TITLE_COL: usize = 6;
pub const FALLBACK_DATE_COL: usize = 7;

pub const HEADER_DOCUMENT_TYPE: &str = "Document Type";
pub const HEADER_TITLE: &str = "Title";
/// In order of preference.
pub const HEADER_DATES: [&str; 3] = ["Begin Date", "Date Received", "Date"];

const RESULTS_TABLE_MARKER: &str = "table#table_0";
const KEYWORD_GATE: &str = "technical review";
const NO_RESULTS_MARKER: &str = "no search results";

static DATE_TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b\d{1,2}/\d{1,2}/\d{2,4}\b").expect("date token regex"));

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Field {
    DocumentType,
    Title,
    Date,
}

/// Soft extraction problem: precision drops, the search goes on.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ExtractionAmbiguity {
    /// No marked or titled results table; scanned every row of the page.
    NoResultsTable,
    /// No header row; every field is positional.
    NoHeaderRow,
    /// Header row present but this field's column wasn't named.
    MissingHeader(Field),
}

/// Column index per semantic field.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ColumnMap {
    pub document_type: usize,
    pub title: usize,
    pub date: usize,
    /// Title column came from a header, so the title cell can be trusted
    /// for the keyword gate.
    pub reliable: bool,
}

impl ColumnMap {
    pub fn positional() -> Self {
        Self {
            document_type: FALLBACK_DOCUMENT_TYPE_COL,
            title: FALLBACK_TITLE_COL,
            date: FALLBACK_DATE_COL,
            reliable: false,
        }
    }

    pub fn from_headers(headers: &[String], notes: &mut Vec<ExtractionAmbiguity>) -> Self {
        let find = |name: &str| headers.iter().position(|h| h.eq_ignore_ascii_case(name));
        let mut pick = |found: Option<usize>, field: Field, fallback: usize| {
            found.unwrap_or_else(|| {
                notes.push(ExtractionAmbiguity::MissingHeader(field));
                fallback
            })
        };

        let title = find(HEADER_TITLE);
        let reliable = title.is_some();
        let document_type = find(HEADER_DOCUMENT_TYPE);
        let date = HEADER_DATES.iter().find_map(|h| find(*h));

        Self {
            document_type: pick(document_type, Field::DocumentType, FALLBACK_DOCUMENT_TYPE_COL),
            title: pick(title, Field::Title, FALLBACK_TITLE_COL),
            date: pick(date, Field::Date, FALLBACK_DATE_COL),
            reliable,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Extraction {
    pub records: Vec<DocumentRecord>,
    pub ambiguities: Vec<ExtractionAmbiguity>,
    /// Content rows inspected, kept or not.
    pub rows_seen: usize,
}

impl Extraction {
    fn append(&mut self, mut other: Extraction) {
        self.records.append(&mut other.records);
        self.ambiguities.append(&mut other.ambiguities);
        self.rows_seen += other.rows_seen;
    }
}

/// The portal's explicit empty-result page.
pub fn is_no_results(html: &str) -> bool {
    html.to_lowercase().contains(NO_RESULTS_MARKER)
}

/// The marked results grid is in the page. A live page may hold a stale or
/// half-rendered grid; callers polling for results pair this with `is_no_results`.
pub fn has_results_table(html: &str) -> bool {
    let doc = Html::parse_document(html);
    doc.select(&sel(RESULTS_TABLE_MARKER)).next().is_some()
}

/// `…?IdcService=GET_FILE…` over http(s).
pub fn is_file_retrieval(url: &Url) -> bool {
    matches!(url.scheme(), "http" | "https")
        && url
            .query_pairs()
            .any(|(k, v)| k.eq_ignore_ascii_case("IdcService") && v.eq_ignore_ascii_case(FILE_SERVICE))
}

/// Content id from a download URL: `dID`, else `dDocName`.
pub fn content_id(url: &Url) -> Option<String> {
    let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
    ["dID", "dDocName"].iter().find_map(|key| {
        pairs
            .iter()
            .find(|(k, v)| k.eq_ignore_ascii_case(key) && !v.trim().is_empty())
            .map(|(_, v)| v.trim().to_string())
    })
}

/// Several pages of one search, concatenated in page order.
/// Result ids don't repeat across pages, so there is no cross-page dedup.
pub fn extract_pages<S: AsRef<str>>(pages: &[S], base: &Url) -> Extraction {
    let mut all = Extraction::default();
    for (i, page) in pages.iter().enumerate() {
        let one = extract_page(page.as_ref(), base);
        debug!(page = i + 1, kept = one.records.len(), seen = one.rows_seen, "page extracted");
        all.append(one);
    }
    all
}

pub fn extract_page(html: &str, base: &Url) -> Extraction {
    let doc = Html::parse_document(html);
    let mut out = Extraction::default();

    let rows: Vec<ElementRef<'_>> = match locate_table(&doc) {
        Some(table) => own_rows(&table),
        None => {
            out.ambiguities.push(ExtractionAmbiguity::NoResultsTable);
            doc.select(&sel("tr")).filter(|r| !has_nested_rows(r)).collect()
        }
    };

    let map = match rows.iter().find(|r| is_header_row(r)) {
        Some(header) => {
            let names: Vec<String> = row_cells(header).iter().map(text_of).collect();
            ColumnMap::from_headers(&names, &mut out.ambiguities)
        }
        None => {
            out.ambiguities.push(ExtractionAmbiguity::NoHeaderRow);
            ColumnMap::positional()
        }
    };

    if !out.ambiguities.is_empty() {
        warn!(ambiguities = ?out.ambiguities, "results layout not fully recognised, using fallbacks");
    }

    let mut seen_urls: HashSet<String> = HashSet::new();
    for row in &rows {
        if is_header_row(row) {
            continue;
        }
        let cells = row_cells(row);
        if !cells.iter().any(|c| is_tag(c, "td")) {
            continue;
        }
        out.rows_seen += 1;

        let Some(record) = extract_row(row, &cells, &map, base) else { continue };
        if seen_urls.insert(record.download_url.to_string()) {
            out.records.push(record);
        }
    }

    out
}

fn locate_table<'a>(doc: &'a Html) -> Option<ElementRef<'a>> {
    if let Some(marked) = doc.select(&sel(RESULTS_TABLE_MARKER)).next() {
        return Some(marked);
    }
    doc.select(&sel("table")).find(|table| {
        own_rows(table).iter().any(|row| {
            is_header_row(row)
                && row_cells(row).iter().any(|c| text_of(c).eq_ignore_ascii_case(HEADER_TITLE))
        })
    })
}

/// `<th>` cells, a `*header*` class, or at least two recognised column names.
fn is_header_row(row: &ElementRef<'_>) -> bool {
    let cells = row_cells(row);
    if cells.iter().any(|c| is_tag(c, "th")) {
        return true;
    }
    if row
        .value()
        .attr("class")
        .is_some_and(|c| c.to_ascii_lowercase().contains("header"))
    {
        return true;
    }
    let named = cells
        .iter()
        .map(text_of)
        .filter(|t| {
            t.eq_ignore_ascii_case(HEADER_TITLE)
                || t.eq_ignore_ascii_case(HEADER_DOCUMENT_TYPE)
                || HEADER_DATES.iter().any(|h| t.eq_ignore_ascii_case(h))
        })
        .count();
    named >= 2
}

fn extract_row(
    row: &ElementRef<'_>,
    cells: &[ElementRef<'_>],
    map: &ColumnMap,
    base: &Url,
) -> Option<DocumentRecord> {
    let (anchor, url) = row.select(&sel("a[href]")).find_map(|a| {
        let href = a.value().attr("href")?.trim();
        let url = base.join(href).ok()?;
        is_file_retrieval(&url).then_some((a, url))
    })?;

    let cell = |i: usize| cells.get(i).map(text_of).unwrap_or_default();
    let row_text = text_of(row);
    let anchor_text = text_of(&anchor);

    let document_type = cell(map.document_type);
    let mut title = cell(map.title);
    if title.is_empty() {
        title = anchor_text.clone();
    }

    let gate = contains_ci(&title, KEYWORD_GATE)
        || contains_ci(&document_type, KEYWORD_GATE)
        || (!map.reliable && contains_ci(&row_text, KEYWORD_GATE));
    if !gate {
        debug!(%title, "row dropped by keyword gate");
        return None;
    }

    let mut date_string = cell(map.date);
    if date_string.is_empty() && !map.reliable {
        if let Some(m) = DATE_TOKEN.find(&row_text) {
            date_string = m.as_str().to_string();
        }
    }

    let identifier = content_id(&url).unwrap_or(anchor_text);
    Some(DocumentRecord::new(identifier, document_type, title, date_string, url))
}
