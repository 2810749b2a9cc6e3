// src/record.rs
use std::fmt;

use chrono::NaiveDate;
use url::Url;

use crate::error::DateParseError;

pub const UNKNOWN_IDENTIFIER: &str = "unknown";

/// One document row from a results page.
/// Built fresh per search; nothing here is cached or persisted.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DocumentRecord {
    /// Portal content id (`dID`), or `"unknown"`. Not unique across searches.
    pub identifier: String,
    pub document_type: String,
    pub title: String,
    /// Date text exactly as rendered; may be empty.
    pub date_string: String,
    /// Derived from `date_string`. Advisory only.
    pub parsed_date: Option<NaiveDate>,
    pub download_url: Url,
}

impl DocumentRecord {
    pub fn new(
        identifier: impl Into<String>,
        document_type: impl Into<String>,
        title: impl Into<String>,
        date_string: impl Into<String>,
        download_url: Url,
    ) -> Self {
        let date_string = date_string.into();
        let parsed_date = parse_portal_date(&date_string).ok();
        let identifier = identifier.into();
        Self {
            identifier: if identifier.trim().is_empty() { s!(UNKNOWN_IDENTIFIER) } else { identifier },
            document_type: document_type.into(),
            title: title.into(),
            date_string,
            parsed_date,
            download_url,
        }
    }

    /// "2019-03-14 · Technical Review - Air Permit (555)"
    pub fn label(&self) -> String {
        let date = self
            .parsed_date
            .map(|d| d.format("%Y-%m-%d").to_string())
            .unwrap_or_else(|| s!("undated"));
        format!("{date} · {} ({})", self.title, self.identifier)
    }
}

impl fmt::Display for DocumentRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label())
    }
}

/// Parse the portal's date text.
///
/// Accepts `M/D/YYYY`, `M/D/YY` and ISO `YYYY-MM-DD`, optionally followed by
/// a time part (`03/14/2019 10:31 AM`), which is ignored.
pub fn parse_portal_date(text: &str) -> Result<NaiveDate, DateParseError> {
    let token = text.split_whitespace().next().unwrap_or("");
    let err = || DateParseError(s!(text));
    if token.is_empty() {
        return Err(err());
    }

    if token.contains('-') {
        return NaiveDate::parse_from_str(token, "%Y-%m-%d").map_err(|_| err());
    }

    let year_len = token.rsplit('/').next().map_or(0, str::len);
    let fmt = match year_len {
        4 => "%m/%d/%Y",
        2 => "%m/%d/%y",
        _ => return Err(err()),
    };
    NaiveDate::parse_from_str(token, fmt).map_err(|_| err())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url() -> Url {
        Url::parse("https://records.tceq.texas.gov/cs/idcplg?IdcService=GET_FILE&dID=1").unwrap()
    }

    #[test]
    fn parses_portal_formats() {
        let d = NaiveDate::from_ymd_opt(2019, 3, 14).unwrap();
        assert_eq!(parse_portal_date("03/14/2019"), Ok(d));
        assert_eq!(parse_portal_date("3/14/2019"), Ok(d));
        assert_eq!(parse_portal_date("03/14/19"), Ok(d));
        assert_eq!(parse_portal_date("  03/14/2019 10:31 AM"), Ok(d));
        assert_eq!(parse_portal_date("2019-03-14"), Ok(d));
    }

    #[test]
    fn rejects_garbage_and_blank() {
        assert!(parse_portal_date("").is_err());
        assert!(parse_portal_date("Pending").is_err());
        assert!(parse_portal_date("13/45/2019").is_err());
        assert!(parse_portal_date("3/14/019").is_err());
    }

    #[test]
    fn unparsable_date_keeps_record() {
        let rec = DocumentRecord::new("1", "Permits", "Technical Review", "n/a", url());
        assert_eq!(rec.date_string, "n/a");
        assert_eq!(rec.parsed_date, None);
    }

    #[test]
    fn blank_identifier_becomes_unknown() {
        let rec = DocumentRecord::new("  ", "", "T", "", url());
        assert_eq!(rec.identifier, UNKNOWN_IDENTIFIER);
        assert_eq!(rec.label(), "undated · T (unknown)");
    }
}
