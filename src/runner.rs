// src/runner.rs
use std::path::Path;

use tracing::{info, warn};
use url::Url;

use crate::{
    config::options::{FetcherKind, Settings},
    core::net::{Net, Politeness},
    download::{self, DownloadReport},
    error::{DownloadError, TransportError},
    fetch::{FetchOutcome, ResultsFetcher, SearchQuery},
    filter::Filter,
    progress::Progress,
    record::DocumentRecord,
    specs::results::{self, ExtractionAmbiguity},
};

/// Everything one search produced. Passed on by value; nothing is cached.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SearchReport {
    pub query: SearchQuery,
    pub fetcher: FetcherKind,
    /// Results pages fetched (0 when the portal reported no results).
    pub pages: usize,
    pub rows_seen: usize,
    /// Records the extractor produced, before filtering.
    pub extracted: usize,
    pub ambiguities: Vec<ExtractionAmbiguity>,
    /// Records that survived the filter, in results order.
    pub records: Vec<DocumentRecord>,
}

impl SearchReport {
    fn empty(query: &SearchQuery, fetcher: FetcherKind) -> Self {
        Self {
            query: query.clone(),
            fetcher,
            pages: 0,
            rows_seen: 0,
            extracted: 0,
            ambiguities: Vec::new(),
            records: Vec::new(),
        }
    }
}

/// fetch → extract → filter, for one facility.
/// Only a `TransportError` stops it; extraction trouble lands in `ambiguities`.
pub fn search(
    fetcher: &mut dyn ResultsFetcher,
    query: &SearchQuery,
    keyword: Option<&str>,
    base: &Url,
    progress: &mut dyn Progress,
) -> Result<SearchReport, TransportError> {
    let kind = fetcher.kind();
    progress.log(&format!("Searching {} via {kind:?}...", query.facility_id));
    if query.window.is_inverted() {
        warn!(window = ?query.window, "start date is after end date; only undated records can match");
    }

    let pages = match fetcher.fetch_results_html(query)? {
        FetchOutcome::NoResults => {
            progress.log("No search results.");
            return Ok(SearchReport::empty(query, kind));
        }
        FetchOutcome::Pages(pages) => pages,
    };

    let extraction = results::extract_pages(&pages, base);
    let extracted = extraction.records.len();
    let filter = Filter { keyword: keyword.map(str::to_string), window: query.window };
    let records = filter.apply(extraction.records);

    info!(
        rn = %query.facility_id,
        pages = pages.len(),
        rows = extraction.rows_seen,
        extracted,
        kept = records.len(),
        "search done"
    );
    progress.log(&format!("{} of {} document(s) kept.", records.len(), extracted));

    Ok(SearchReport {
        query: query.clone(),
        fetcher: kind,
        pages: pages.len(),
        rows_seen: extraction.rows_seen,
        extracted,
        ambiguities: extraction.ambiguities,
        records,
    })
}

/// Download `records` with a fresh HTTP session built from `settings`.
pub fn download(
    records: &[DocumentRecord],
    out_dir: &Path,
    settings: &Settings,
    progress: &mut dyn Progress,
) -> Result<DownloadReport, DownloadError> {
    let net = Net::new(&settings.http, Politeness::from_options(&settings.politeness))?;
    let between = Politeness::new(
        std::time::Duration::from_millis(settings.politeness.download_pause_ms),
        settings.politeness.jitter_ms,
    );
    download::download_all(&net, records, out_dir, between, progress)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::DateWindow;
    use crate::progress::NullProgress;

    /// Replays canned outcomes instead of touching the network.
    struct Canned(Option<Result<FetchOutcome, TransportError>>);

    impl ResultsFetcher for Canned {
        fn kind(&self) -> FetcherKind {
            FetcherKind::Http
        }
        fn fetch_results_html(&mut self, _: &SearchQuery) -> Result<FetchOutcome, TransportError> {
            self.0.take().unwrap_or(Ok(FetchOutcome::NoResults))
        }
    }

    fn base() -> Url {
        Url::parse("https://records.tceq.texas.gov/cs/idcplg").unwrap()
    }

    const PAGE: &str = r#"<table id="table_0">
        <tr><th>Document Type</th><th>Title</th><th>Begin Date</th></tr>
        <tr><td>Permits</td><td><a href="?IdcService=GET_FILE&dID=1">Technical Review A</a></td><td>03/14/2019</td></tr>
        <tr><td>Permits</td><td><a href="?IdcService=GET_FILE&dID=2">Technical Review B</a></td><td>06/01/2021</td></tr>
        <tr><td>Permits</td><td><a href="?IdcService=GET_FILE&dID=3">Technical Review C</a></td><td></td></tr>
        <tr><td>Permits</td><td><a href="?IdcService=GET_FILE&dID=4">Cover Letter</a></td><td>06/01/2021</td></tr>
    </table>"#;

    #[test]
    fn pipeline_extracts_then_filters() {
        let mut fetcher = Canned(Some(Ok(FetchOutcome::Pages(vec![s!(PAGE)]))));
        let query = SearchQuery::new("RN100223445", DateWindow::from_years(Some(2020), Some(2025)));
        let report = search(&mut fetcher, &query, None, &base(), &mut NullProgress).unwrap();

        assert_eq!(report.pages, 1);
        assert_eq!(report.rows_seen, 4);
        assert_eq!(report.extracted, 3);
        let ids: Vec<&str> = report.records.iter().map(|r| r.identifier.as_str()).collect();
        assert_eq!(ids, ["2", "3"]);
    }

    #[test]
    fn no_results_is_an_empty_report() {
        let mut fetcher = Canned(Some(Ok(FetchOutcome::NoResults)));
        let query = SearchQuery::new("RN1", DateWindow::default());
        let report = search(&mut fetcher, &query, None, &base(), &mut NullProgress).unwrap();
        assert_eq!(report.pages, 0);
        assert!(report.records.is_empty());
    }

    #[test]
    fn transport_error_stops_the_search() {
        let mut fetcher = Canned(Some(Err(TransportError::ElementNotFound(s!("identifier input")))));
        let query = SearchQuery::new("RN1", DateWindow::default());
        let err = search(&mut fetcher, &query, None, &base(), &mut NullProgress).unwrap_err();
        assert!(matches!(err, TransportError::ElementNotFound(_)));
    }

    #[test]
    fn keyword_narrows_results() {
        let mut fetcher = Canned(Some(Ok(FetchOutcome::Pages(vec![s!(PAGE)]))));
        let query = SearchQuery::new("RN1", DateWindow::default());
        let report = search(&mut fetcher, &query, Some("review b"), &base(), &mut NullProgress).unwrap();
        assert_eq!(report.records.len(), 1);
        assert_eq!(report.records[0].identifier, "2");
    }
}
