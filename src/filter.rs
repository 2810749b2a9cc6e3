// src/filter.rs
use chrono::NaiveDate;

use crate::core::sanitize::contains_ci;
use crate::record::DocumentRecord;

/// Date range, inclusive at both ends. Either end may be open.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DateWindow {
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

impl DateWindow {
    pub fn new(start: Option<NaiveDate>, end: Option<NaiveDate>) -> Self {
        Self { start, end }
    }

    /// Jan 1 of `start_year` through Dec 31 of `end_year`.
    /// Years chrono can't represent leave that end open.
    pub fn from_years(start_year: Option<i32>, end_year: Option<i32>) -> Self {
        Self {
            start: start_year.and_then(|y| NaiveDate::from_ymd_opt(y, 1, 1)),
            end: end_year.and_then(|y| NaiveDate::from_ymd_opt(y, 12, 31)),
        }
    }

    pub fn is_open(&self) -> bool {
        self.start.is_none() && self.end.is_none()
    }

    /// Start after end: nothing dated can match.
    pub fn is_inverted(&self) -> bool {
        matches!((self.start, self.end), (Some(s), Some(e)) if s > e)
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start.is_none_or(|s| date >= s) && self.end.is_none_or(|e| date <= e)
    }

    /// Undated records always pass.
    pub fn admits(&self, record: &DocumentRecord) -> bool {
        record.parsed_date.is_none_or(|d| self.contains(d))
    }

    /// Narrowest window satisfying both. Used when dates and years are both given.
    pub fn intersect(self, other: DateWindow) -> DateWindow {
        DateWindow {
            start: later(self.start, other.start),
            end: earlier(self.end, other.end),
        }
    }
}

fn later(a: Option<NaiveDate>, b: Option<NaiveDate>) -> Option<NaiveDate> {
    match (a, b) {
        (Some(a), Some(b)) => Some(a.max(b)),
        (a, b) => a.or(b),
    }
}

fn earlier(a: Option<NaiveDate>, b: Option<NaiveDate>) -> Option<NaiveDate> {
    match (a, b) {
        (Some(a), Some(b)) => Some(a.min(b)),
        (a, b) => a.or(b),
    }
}

/// Records inside `window`, plus every record whose date is unknown. Order kept.
pub fn filter_by_window(records: Vec<DocumentRecord>, window: &DateWindow) -> Vec<DocumentRecord> {
    if window.is_open() {
        return records;
    }
    records.into_iter().filter(|r| window.admits(r)).collect()
}

/// Post-extraction narrowing chosen by the caller.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Filter {
    /// Extra case-insensitive term, matched on title or document type.
    pub keyword: Option<String>,
    pub window: DateWindow,
}

impl Filter {
    pub fn matches_keyword(&self, record: &DocumentRecord) -> bool {
        match self.keyword.as_deref().map(str::trim) {
            None | Some("") => true,
            Some(k) => contains_ci(&record.title, k) || contains_ci(&record.document_type, k),
        }
    }

    pub fn apply(&self, records: Vec<DocumentRecord>) -> Vec<DocumentRecord> {
        let kept: Vec<DocumentRecord> =
            records.into_iter().filter(|r| self.matches_keyword(r)).collect();
        filter_by_window(kept, &self.window)
    }
}
