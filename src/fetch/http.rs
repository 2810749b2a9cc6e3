// src/fetch/http.rs
// Direct form POST: load the search form for cookies and hidden fields,
// then submit the search payload the way the form's Search button does.

use tracing::{debug, info};
use url::Url;

use super::{FetchOutcome, ResultsFetcher, SearchQuery};
use crate::config::options::{FetcherKind, PortalOptions, Settings};
use crate::core::net::{Net, Politeness};
use crate::error::TransportError;
use crate::specs::{results, search_form};

pub struct HttpFetcher {
    net: Net,
    portal: PortalOptions,
}

impl HttpFetcher {
    pub fn new(net: Net, portal: PortalOptions) -> Self {
        Self { net, portal }
    }

    pub fn from_settings(settings: &Settings) -> Result<Self, TransportError> {
        let net = Net::new(&settings.http, Politeness::from_options(&settings.politeness))?;
        Ok(Self::new(net, settings.portal.clone()))
    }

    fn submit(&self, facility_id: &str) -> Result<String, TransportError> {
        let form_url: Url = self.portal.search_form_url()?;
        let form_html = self.net.get_text(&form_url, None)?;
        let hidden = search_form::hidden_fields(&form_html);
        debug!(fields = hidden.len(), "search form loaded");

        let payload = search_form::search_payload(&hidden, &self.portal, facility_id);
        let action = self.portal.base_url()?;
        self.net.post_form(&action, &payload, &form_url, &self.portal.origin)
    }
}

impl ResultsFetcher for HttpFetcher {
    fn kind(&self) -> FetcherKind {
        FetcherKind::Http
    }

    fn fetch_results_html(&mut self, query: &SearchQuery) -> Result<FetchOutcome, TransportError> {
        info!(rn = %query.facility_id, "searching (http)");
        let html = self.submit(&query.facility_id)?;
        if results::is_no_results(&html) {
            info!(rn = %query.facility_id, "portal reports no results");
            return Ok(FetchOutcome::NoResults);
        }
        // ResultCount asks for everything on one page.
        Ok(FetchOutcome::Pages(vec![html]))
    }
}
