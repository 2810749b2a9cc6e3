// src/fetch/mod.rs
//! Results fetchers: turn a facility id into raw results-page HTML.
//!
//! Two strategies behind one trait. `http` talks to the portal's form endpoint
//! directly; `browser` (cargo feature `browser`) drives Chromium through the
//! same form a person would use. Neither parses results: that is
//! `specs::results`.

pub mod http;
#[cfg(feature = "browser")]
pub mod browser;

use crate::config::options::{FetcherKind, Settings};
use crate::error::TransportError;
use crate::filter::DateWindow;

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SearchQuery {
    /// Central Registry RN, e.g. `RN100223445`.
    pub facility_id: String,
    /// Applied after extraction; the portal search itself is not date-bounded.
    pub window: DateWindow,
}

impl SearchQuery {
    pub fn new(facility_id: impl Into<String>, window: DateWindow) -> Self {
        Self { facility_id: facility_id.into(), window }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FetchOutcome {
    /// One HTML document per results page, in page order.
    Pages(Vec<String>),
    /// The portal answered with its explicit empty-result page.
    NoResults,
}

impl FetchOutcome {
    pub fn pages(&self) -> &[String] {
        match self {
            FetchOutcome::Pages(p) => p,
            FetchOutcome::NoResults => &[],
        }
    }
}

pub trait ResultsFetcher {
    fn kind(&self) -> FetcherKind;

    /// Run one search. Any `Err` aborts the search; resources held for the
    /// call are released either way.
    fn fetch_results_html(&mut self, query: &SearchQuery) -> Result<FetchOutcome, TransportError>;
}

/// Strategy for `kind`, configured from `settings`.
pub fn build(kind: FetcherKind, settings: &Settings) -> Result<Box<dyn ResultsFetcher>, TransportError> {
    match kind {
        FetcherKind::Http => Ok(Box::new(http::HttpFetcher::from_settings(settings)?)),
        #[cfg(feature = "browser")]
        FetcherKind::Browser => Ok(Box::new(browser::BrowserFetcher::from_settings(settings)?)),
        #[cfg(not(feature = "browser"))]
        FetcherKind::Browser => Err(TransportError::Unsupported("browser")),
    }
}
