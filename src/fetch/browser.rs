// src/fetch/browser.rs
// Drives Chromium through the public search form: for when the portal stops
// answering bare form POSTs. Blocking on the outside, a private
// current-thread tokio runtime on the inside.

use std::future::Future;
use std::path::PathBuf;
use std::time::Duration;

use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::error::CdpError;
use chromiumoxide::page::{Page, ScreenshotParams};
use futures::StreamExt;
use tokio::task::JoinHandle;
use tokio::time::{sleep, Instant};
use tracing::{debug, info, warn};
use url::Url;

use super::{FetchOutcome, ResultsFetcher, SearchQuery};
use crate::config::consts::{IDENTIFIER_FIELD, IDENTIFIER_FIELD_LABEL};
use crate::config::options::{BrowserOptions, FetcherKind, PortalOptions, Settings};
use crate::core::net::Politeness;
use crate::error::TransportError;
use crate::specs::results;

const MORE_RESULTS_ALT: &str = "Link To More Results";
const RN_MARK: &str = "[data-tr-target='rn']";
const KEYWORD_MARK: &str = "[data-tr-target='kw']";

/// A form dropdown: element id (also tried as `name`), then its position
/// among the page's selects.
#[derive(Clone, Copy, Debug)]
struct SelectSlot {
    id: &'static str,
    index: usize,
}

const RECORD_SERIES: SelectSlot = SelectSlot { id: "xRecordSeries", index: 0 };
const DOCUMENT_TYPE: SelectSlot = SelectSlot { id: "xInsightDocumentType", index: 1 };

pub struct BrowserFetcher {
    portal: PortalOptions,
    opts: BrowserOptions,
    user_agent: String,
    pause: Politeness,
}

impl BrowserFetcher {
    pub fn new(
        portal: PortalOptions,
        opts: BrowserOptions,
        user_agent: impl Into<String>,
        pause: Politeness,
    ) -> Self {
        Self { portal, opts, user_agent: user_agent.into(), pause }
    }

    pub fn from_settings(settings: &Settings) -> Result<Self, TransportError> {
        settings.portal.search_form_url()?;
        Ok(Self::new(
            settings.portal.clone(),
            settings.browser.clone(),
            settings.http.user_agent.clone(),
            Politeness::from_options(&settings.politeness),
        ))
    }

    fn config(&self) -> Result<BrowserConfig, TransportError> {
        let mut b = BrowserConfig::builder()
            .window_size(1366, 768)
            .request_timeout(self.opts.wait())
            .arg("--disable-blink-features=AutomationControlled")
            .arg(format!("--user-agent={}", self.user_agent));
        if !self.opts.headless {
            b = b.with_head();
        }
        if let Some(exe) = &self.opts.executable {
            b = b.chrome_executable(exe);
        }
        b.build().map_err(TransportError::Browser)
    }

    fn pacing(&self) -> Pacing {
        Pacing { wait: self.opts.wait(), poll: self.opts.poll(), pause: self.pause }
    }

    /// Owns the browser for exactly one search.
    async fn run(&self, query: &SearchQuery) -> Result<FetchOutcome, TransportError> {
        let form_url = self.portal.search_form_url()?;
        let (browser, mut handler) = Browser::launch(self.config()?).await.map_err(cdp)?;
        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    debug!(error = %e, "cdp event error");
                }
            }
        });
        search_then_close(ChromeSession { fetcher: self, form_url, browser, handler_task }, query).await
    }

    async fn drive(&self, page: &Page, query: &SearchQuery) -> Result<FetchOutcome, TransportError> {
        let pacing = self.pacing();
        let series = self.portal.record_series.as_str();
        let doc_type = self.portal.document_type.as_str();

        // Record series first: picking it reloads the document-type options.
        pacing.until("record series select", || option_present(page, RECORD_SERIES, series)).await?;
        if !eval_bool(page, &set_select_js(RECORD_SERIES, series)).await? {
            return Err(TransportError::ElementNotFound(format!("record series option {series}")));
        }
        let doc_type_ready = pacing
            .until("document type options", || option_present(page, DOCUMENT_TYPE, doc_type))
            .await;
        let doc_type_set = match doc_type_ready {
            Ok(()) => eval_bool(page, &set_select_js(DOCUMENT_TYPE, doc_type)).await?,
            Err(TransportError::Timeout { .. }) => false,
            Err(e) => return Err(e),
        };
        if !doc_type_set {
            warn!(doc_type, "document type not selectable, searching without it");
        }

        let field_js = select_identifier_field_js();
        pacing.until("identifier field select", || eval_bool(page, &field_js)).await?;

        if !eval_bool(page, &mark_visible_js("input[name='input0']", "input.wideInput", "rn")).await? {
            return Err(TransportError::ElementNotFound(s!("identifier input")));
        }
        type_into(page, RN_MARK, query.facility_id.trim()).await?;

        if eval_bool(page, &mark_visible_js("input[name='ftx'][type='text']", "#MiniSearchText", "kw")).await? {
            type_into(page, KEYWORD_MARK, &self.portal.keyword).await?;
        } else {
            warn!("keyword input not found, searching without it");
        }

        let count = self.portal.result_count.to_string();
        eval_bool(page, &force_result_count_js(&count)).await?;

        pacing.pause().await;
        if !eval_bool(page, CLICK_SEARCH_JS).await? {
            return Err(TransportError::ElementNotFound(s!("search button")));
        }
        info!(rn = %query.facility_id, "search submitted (browser)");

        pacing
            .until("results", move || async move {
                Ok::<_, TransportError>(results_settled(&content(page).await?))
            })
            .await?;
        let first = content(page).await?;
        if results::is_no_results(&first) {
            info!(rn = %query.facility_id, "portal reports no results");
            return Ok(FetchOutcome::NoResults);
        }

        let pages = collect_pages(page, first, self.opts.max_pages, &pacing).await?;
        Ok(FetchOutcome::Pages(pages))
    }

    async fn screenshot(&self, page: &Page) {
        let dir = &self.opts.screenshot_dir;
        if let Err(e) = std::fs::create_dir_all(dir) {
            warn!(error = %e, dir = %dir.display(), "screenshot dir");
            return;
        }
        let path: PathBuf =
            dir.join(format!("failure-{}.png", chrono::Local::now().format("%Y%m%d-%H%M%S")));
        match page.save_screenshot(ScreenshotParams::builder().full_page(true).build(), &path).await {
            Ok(_) => info!(path = %path.display(), "saved diagnostic screenshot"),
            Err(e) => warn!(error = %e, "screenshot failed"),
        }
    }
}

/// Timing for one browser search: how long to wait for the page, how often
/// to look, and the pause before each click that hits the portal.
#[derive(Clone, Copy, Debug)]
struct Pacing {
    wait: Duration,
    poll: Duration,
    pause: Politeness,
}

impl Pacing {
    async fn pause(&self) {
        let d = self.pause.next_delay();
        if !d.is_zero() {
            debug!(delay_ms = d.as_millis() as u64, "politeness pause");
            sleep(d).await;
        }
    }

    /// Re-run `check` every poll interval until it says yes or the wait runs
    /// out. Browser errors count as "not yet": the page may be mid-navigation.
    async fn until<F, Fut>(&self, what: &str, mut check: F) -> Result<(), TransportError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<bool, TransportError>>,
    {
        let deadline = Instant::now() + self.wait;
        loop {
            match check().await {
                Ok(true) => return Ok(()),
                Ok(false) => {}
                Err(TransportError::Browser(e)) => debug!(what, error = %e, "not ready"),
                Err(e) => return Err(e),
            }
            if Instant::now() >= deadline {
                return Err(TransportError::Timeout { url: s!(what), timeout: self.wait });
            }
            sleep(self.poll).await;
        }
    }
}

/// What pagination needs from the live results page.
trait ResultsPage {
    async fn html(&self) -> Result<String, TransportError>;
    /// Clicks the last "more results" link; false when there is none.
    async fn click_more(&self) -> Result<bool, TransportError>;
}

impl ResultsPage for Page {
    async fn html(&self) -> Result<String, TransportError> {
        content(self).await
    }

    async fn click_more(&self) -> Result<bool, TransportError> {
        eval_bool(self, &click_more_results_js()).await
    }
}

/// `first` plus every page reached through "more results", up to `max_pages`.
async fn collect_pages<P: ResultsPage>(
    page: &P,
    first: String,
    max_pages: usize,
    pacing: &Pacing,
) -> Result<Vec<String>, TransportError> {
    let mut pages = vec![first];
    loop {
        if pages.len() >= max_pages {
            warn!(max_pages, "page cap reached, stopping pagination");
            break;
        }
        pacing.pause().await;
        if !page.click_more().await? {
            break;
        }
        let Some(last) = pages.last() else { break };
        let last = last.as_str();
        pacing
            .until("next results page", move || async move {
                let html = page.html().await?;
                Ok::<_, TransportError>(html != last && results_settled(&html))
            })
            .await?;
        let html = page.html().await?;
        debug!(page = pages.len() + 1, "results page captured");
        pages.push(html);
    }
    Ok(pages)
}

/// One launched browser: searched once, then closed.
trait Session: Sized {
    async fn search(&mut self, query: &SearchQuery) -> Result<FetchOutcome, TransportError>;
    async fn close(self);
}

/// Closes the session whether or not the search succeeded.
async fn search_then_close<S: Session>(
    mut session: S,
    query: &SearchQuery,
) -> Result<FetchOutcome, TransportError> {
    let outcome = session.search(query).await;
    session.close().await;
    outcome
}

struct ChromeSession<'a> {
    fetcher: &'a BrowserFetcher,
    form_url: Url,
    browser: Browser,
    handler_task: JoinHandle<()>,
}

impl Session for ChromeSession<'_> {
    async fn search(&mut self, query: &SearchQuery) -> Result<FetchOutcome, TransportError> {
        self.fetcher.pacing().pause().await;
        let page = self.browser.new_page(self.form_url.as_str()).await.map_err(cdp)?;
        let res = self.fetcher.drive(&page, query).await;
        if let Err(e) = &res {
            warn!(error = %e, "browser search failed");
            self.fetcher.screenshot(&page).await;
        }
        res
    }

    async fn close(mut self) {
        if let Err(e) = self.browser.close().await {
            debug!(error = %e, "browser close");
        }
        if let Err(e) = self.browser.wait().await {
            debug!(error = %e, "browser wait");
        }
        self.handler_task.abort();
    }
}

impl ResultsFetcher for BrowserFetcher {
    fn kind(&self) -> FetcherKind {
        FetcherKind::Browser
    }

    fn fetch_results_html(&mut self, query: &SearchQuery) -> Result<FetchOutcome, TransportError> {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| TransportError::Browser(format!("runtime: {e}")))?;
        rt.block_on(self.run(query))
    }
}

fn cdp(e: CdpError) -> TransportError {
    TransportError::Browser(e.to_string())
}

fn results_settled(html: &str) -> bool {
    results::has_results_table(html) || results::is_no_results(html)
}

async fn content(page: &Page) -> Result<String, TransportError> {
    page.content().await.map_err(cdp)
}

async fn eval_bool(page: &Page, js: &str) -> Result<bool, TransportError> {
    page.evaluate(js.to_string())
        .await
        .map_err(cdp)?
        .into_value::<bool>()
        .map_err(|e| TransportError::Browser(format!("script result: {e}")))
}

async fn option_present(page: &Page, slot: SelectSlot, value: &str) -> Result<bool, TransportError> {
    let js = format!(
        "(() => {{ const s = {}; return !!s && [...s.options].some(o => o.value === {}); }})()",
        find_select_expr(slot),
        js_str(value)
    );
    eval_bool(page, &js).await
}

async fn type_into(page: &Page, marker: &str, text: &str) -> Result<(), TransportError> {
    let el = page.find_element(marker).await.map_err(cdp)?;
    el.click().await.map_err(cdp)?;
    el.type_str(text).await.map_err(cdp)?;
    Ok(())
}

/// JS string literal, single-quoted.
fn js_str(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('\'');
    for ch in s.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '\'' => out.push_str("\\'"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            c => out.push(c),
        }
    }
    out.push('\'');
    out
}

/// JS expression for `slot`: by id, by name, then by position.
fn find_select_expr(slot: SelectSlot) -> String {
    format!(
        "(document.getElementById({id}) || document.querySelector(\"select[name='{name}']\") || document.querySelectorAll('select')[{index}])",
        id = js_str(slot.id),
        name = slot.id,
        index = slot.index
    )
}

fn set_select_js(slot: SelectSlot, value: &str) -> String {
    format!(
        r#"(() => {{
  const s = {find};
  if (!s || ![...s.options].some(o => o.value === {v})) return false;
  s.value = {v};
  s.dispatchEvent(new Event('change', {{ bubbles: true }}));
  return s.value === {v};
}})()"#,
        find = find_select_expr(slot),
        v = js_str(value)
    )
}

/// The select offering the registry-number field, else the 4th select on the page.
fn select_identifier_field_js() -> String {
    format!(
        r#"(() => {{
  const all = [...document.querySelectorAll('select')];
  let s = all.find(x => [...x.options].some(o => o.text.includes({label})));
  if (!s && all.length >= 4) s = all[3];
  if (!s) return false;
  s.value = {field};
  s.dispatchEvent(new Event('change', {{ bubbles: true }}));
  return s.value === {field};
}})()"#,
        label = js_str(IDENTIFIER_FIELD_LABEL),
        field = js_str(IDENTIFIER_FIELD)
    )
}

/// Tags the first visible match of `primary` (else `fallback`) with `data-tr-target`.
fn mark_visible_js(primary: &str, fallback: &str, mark: &str) -> String {
    format!(
        r#"(() => {{
  const vis = e => !!(e.offsetWidth || e.offsetHeight || e.getClientRects().length);
  let c = [...document.querySelectorAll({p})].filter(vis);
  if (!c.length) c = [...document.querySelectorAll({f})].filter(vis);
  if (!c.length) return false;
  c[0].setAttribute('data-tr-target', {m});
  c[0].value = '';
  return true;
}})()"#,
        p = js_str(primary),
        f = js_str(fallback),
        m = js_str(mark)
    )
}

fn force_result_count_js(count: &str) -> String {
    format!(
        "(() => {{ document.querySelectorAll(\"input[name='ResultCount']\").forEach(e => e.value = {}); return true; }})()",
        js_str(count)
    )
}

/// Last "Search" button, else the plain submit input.
const CLICK_SEARCH_JS: &str = r#"(() => {
  const btns = [...document.querySelectorAll("button, input[type='submit'], input[type='button']")]
    .filter(b => (b.value || b.textContent || '').trim() === 'Search');
  const b = btns.length ? btns[btns.length - 1] : document.querySelector("input[type='submit'][value='Search']");
  if (!b) return false;
  b.click();
  return true;
})()"#;

fn click_more_results_js() -> String {
    format!(
        r#"(() => {{
  const links = [...document.querySelectorAll('a')].filter(a => a.querySelector("img[alt=" + JSON.stringify({alt}) + "]"));
  if (!links.length) return false;
  links[links.length - 1].click();
  return true;
}})()"#,
        alt = js_str(MORE_RESULTS_ALT)
    )
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use super::*;

    fn block_on<F: Future>(f: F) -> F::Output {
        tokio::runtime::Builder::new_current_thread().enable_time().build().unwrap().block_on(f)
    }

    fn quick() -> Pacing {
        Pacing { wait: Duration::from_millis(200), poll: Duration::from_millis(5), pause: Politeness::none() }
    }

    fn table(n: usize) -> String {
        format!("<table id=\"table_0\"><tr><td>page {n}</td></tr></table>")
    }

    /// Results pages behind "more results" links. `flaky` reads fail like a
    /// page in mid-navigation right after each click.
    struct FakePage {
        pages: Vec<String>,
        at: Cell<usize>,
        clicks: Cell<usize>,
        flaky: usize,
        failing: Cell<usize>,
    }

    impl FakePage {
        fn new(pages: Vec<String>) -> Self {
            Self { pages, at: Cell::new(0), clicks: Cell::new(0), flaky: 0, failing: Cell::new(0) }
        }
    }

    impl ResultsPage for FakePage {
        async fn html(&self) -> Result<String, TransportError> {
            if self.failing.get() > 0 {
                self.failing.set(self.failing.get() - 1);
                return Err(TransportError::Browser(s!("Cannot find context with specified id")));
            }
            Ok(self.pages[self.at.get()].clone())
        }

        async fn click_more(&self) -> Result<bool, TransportError> {
            self.clicks.set(self.clicks.get() + 1);
            if self.at.get() + 1 >= self.pages.len() {
                return Ok(false);
            }
            self.at.set(self.at.get() + 1);
            self.failing.set(self.flaky);
            Ok(true)
        }
    }

    #[test]
    fn pagination_stops_without_more_link() {
        let page = FakePage::new(vec![table(1), table(2), table(3)]);
        let pages = block_on(collect_pages(&page, table(1), 25, &quick())).unwrap();
        assert_eq!(pages, vec![table(1), table(2), table(3)]);
        assert_eq!(page.clicks.get(), 3);
    }

    #[test]
    fn pagination_respects_page_cap() {
        let page = FakePage::new((1..=5).map(table).collect());
        let pages = block_on(collect_pages(&page, table(1), 2, &quick())).unwrap();
        assert_eq!(pages, vec![table(1), table(2)]);
        assert_eq!(page.clicks.get(), 1);
    }

    #[test]
    fn navigation_errors_while_waiting_are_retried() {
        let mut page = FakePage::new(vec![table(1), table(2)]);
        page.flaky = 3;
        let pages = block_on(collect_pages(&page, table(1), 25, &quick())).unwrap();
        assert_eq!(pages.len(), 2);
    }

    #[test]
    fn unchanged_page_times_out() {
        let page = FakePage::new(vec![table(1), table(1)]);
        let err = block_on(collect_pages(&page, table(1), 25, &quick())).unwrap_err();
        assert!(matches!(err, TransportError::Timeout { .. }), "{err}");
    }

    #[test]
    fn wait_gives_up_on_other_errors_at_once() {
        let calls = Cell::new(0);
        let err = block_on(quick().until("identifier field select", || {
            calls.set(calls.get() + 1);
            async { Err::<bool, _>(TransportError::ElementNotFound(s!("select"))) }
        }))
        .unwrap_err();
        assert!(matches!(err, TransportError::ElementNotFound(_)));
        assert_eq!(calls.get(), 1);
    }

    struct FakeSession<'a> {
        outcome: Option<Result<FetchOutcome, TransportError>>,
        closed: &'a Cell<bool>,
    }

    impl Session for FakeSession<'_> {
        async fn search(&mut self, _query: &SearchQuery) -> Result<FetchOutcome, TransportError> {
            self.outcome.take().unwrap_or(Ok(FetchOutcome::NoResults))
        }

        async fn close(self) {
            self.closed.set(true);
        }
    }

    #[test]
    fn session_closed_after_failed_search() {
        let closed = Cell::new(false);
        let session = FakeSession {
            outcome: Some(Err(TransportError::ElementNotFound(s!("identifier input")))),
            closed: &closed,
        };
        let res = block_on(search_then_close(session, &SearchQuery::new("RN100223445", Default::default())));
        assert!(matches!(res, Err(TransportError::ElementNotFound(_))));
        assert!(closed.get());
    }

    #[test]
    fn session_closed_after_successful_search() {
        let closed = Cell::new(false);
        let session = FakeSession { outcome: Some(Ok(FetchOutcome::Pages(vec![table(1)]))), closed: &closed };
        let res = block_on(search_then_close(session, &SearchQuery::new("RN100223445", Default::default())));
        assert_eq!(res.unwrap().pages().len(), 1);
        assert!(closed.get());
    }

    #[test]
    fn js_strings_are_escaped() {
        assert_eq!(js_str("Technical Review"), "'Technical Review'");
        assert_eq!(js_str("a'b\\c"), "'a\\'b\\\\c'");
    }

    #[test]
    fn scripts_embed_values() {
        let js = set_select_js(DOCUMENT_TYPE, "27");
        assert!(js.contains("document.getElementById('xInsightDocumentType')"));
        assert!(js.contains("select[name='xInsightDocumentType']"));
        assert!(js.contains("querySelectorAll('select')[1]"));
        assert!(js.contains("s.value = '27';"));
        assert!(select_identifier_field_js().contains("'Central Registry RN'"));
        assert!(mark_visible_js("input[name='input0']", "input.wideInput", "rn")
            .contains("'input[name=\\'input0\\']'"));
    }

    #[test]
    fn settled_on_table_or_marker() {
        assert!(results_settled("<table id=\"table_0\"></table>"));
        assert!(results_settled("<p>No search results</p>"));
        assert!(!results_settled("<p>Loading…</p>"));
    }

    #[test]
    fn config_respects_headed_and_executable() {
        let mut settings = Settings::default();
        settings.browser.headless = false;
        settings.browser.executable = Some(PathBuf::from("/opt/chromium/chrome"));
        let fetcher = BrowserFetcher::from_settings(&settings).unwrap();
        assert!(fetcher.config().is_ok());
        assert_eq!(fetcher.kind(), FetcherKind::Browser);
    }
}
