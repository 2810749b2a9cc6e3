// src/core/net.rs
// Blocking HTTP session for the portal: cookies, browser-like headers,
// capped retries with exponential backoff, and a politeness pause before
// every outbound request.

use std::{thread, time::Duration};

use rand::Rng;
use reqwest::blocking::{Client, RequestBuilder, Response};
use reqwest::header::{self, HeaderMap, HeaderValue};
use reqwest::Method;
use tracing::{debug, warn};
use url::Url;

use crate::config::consts::RETRY_STATUSES;
use crate::config::options::{HttpOptions, PolitenessOptions};
use crate::error::TransportError;

const MAX_BACKOFF: Duration = Duration::from_secs(30);

/// Fixed pause plus random jitter, so requests don't arrive on a metronome.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Politeness {
    pause: Duration,
    jitter_ms: u64,
}

impl Politeness {
    pub fn new(pause: Duration, jitter_ms: u64) -> Self {
        Self { pause, jitter_ms }
    }

    pub fn from_options(opts: &PolitenessOptions) -> Self {
        Self::new(Duration::from_millis(opts.pause_ms), opts.jitter_ms)
    }

    pub fn none() -> Self {
        Self::new(Duration::ZERO, 0)
    }

    /// Next pause length; varies per call when jitter is set.
    pub fn next_delay(&self) -> Duration {
        let extra = if self.jitter_ms > 0 {
            rand::thread_rng().gen_range(0..=self.jitter_ms)
        } else {
            0
        };
        self.pause + Duration::from_millis(extra)
    }

    pub fn wait(&self) {
        let d = self.next_delay();
        if !d.is_zero() {
            debug!(delay_ms = d.as_millis() as u64, "politeness pause");
            thread::sleep(d);
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Attempts per request, first try included. 0 behaves like 1.
    pub total: u32,
    pub backoff: Duration,
}

impl RetryPolicy {
    pub fn from_options(opts: &HttpOptions) -> Self {
        Self { total: opts.retry_total.max(1), backoff: Duration::from_millis(opts.retry_backoff_ms) }
    }

    pub fn allows_method(method: &Method) -> bool {
        matches!(*method, Method::GET | Method::HEAD | Method::OPTIONS | Method::POST)
    }

    pub fn retries_status(status: u16) -> bool {
        RETRY_STATUSES.contains(&status)
    }

    /// Delay before retry number `retry` (1-based): backoff·2^(retry-1), capped.
    /// A server `Retry-After` (seconds) wins when it is longer.
    pub fn delay(&self, retry: u32, retry_after_secs: Option<u64>) -> Duration {
        let exp = 1u32 << retry.saturating_sub(1).min(16);
        let mut d = self.backoff.saturating_mul(exp).min(MAX_BACKOFF);
        if let Some(secs) = retry_after_secs {
            d = d.max(Duration::from_secs(secs).min(MAX_BACKOFF));
        }
        d
    }
}

/// One cookie-carrying session. Not shared across searches.
pub struct Net {
    client: Client,
    retry: RetryPolicy,
    politeness: Politeness,
    timeout: Duration,
}

impl Net {
    pub fn new(http: &HttpOptions, politeness: Politeness) -> Result<Self, TransportError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::ACCEPT,
            HeaderValue::from_static("text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8"),
        );
        headers.insert(header::ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.9"));

        let client = Client::builder()
            .user_agent(http.user_agent.clone())
            .default_headers(headers)
            .cookie_store(true)
            .gzip(true)
            .connect_timeout(http.connect_timeout())
            .timeout(http.request_timeout())
            .build()
            .map_err(|source| TransportError::Request { url: s!("<client>"), source })?;

        Ok(Self {
            client,
            retry: RetryPolicy::from_options(http),
            politeness,
            timeout: http.request_timeout(),
        })
    }

    /// GET and return the body as text.
    pub fn get_text(&self, url: &Url, referer: Option<&Url>) -> Result<String, TransportError> {
        let resp = self.send(Method::GET, url, || {
            let req = self.client.get(url.clone());
            match referer {
                Some(r) => req.header(header::REFERER, r.as_str()),
                None => req,
            }
        })?;
        self.read_text(url, resp)
    }

    /// POST an urlencoded form the way the browser's search button does.
    pub fn post_form(
        &self,
        url: &Url,
        form: &[(String, String)],
        referer: &Url,
        origin: &str,
    ) -> Result<String, TransportError> {
        let resp = self.send(Method::POST, url, || {
            self.client
                .post(url.clone())
                .header(header::REFERER, referer.as_str())
                .header(header::ORIGIN, origin)
                .form(form)
        })?;
        self.read_text(url, resp)
    }

    /// GET with the body left unread, for streaming to disk.
    pub fn get_stream(&self, url: &Url) -> Result<Response, TransportError> {
        self.send(Method::GET, url, || self.client.get(url.clone()))
    }

    fn read_text(&self, url: &Url, resp: Response) -> Result<String, TransportError> {
        resp.text().map_err(|e| self.classify(url, e))
    }

    fn classify(&self, url: &Url, e: reqwest::Error) -> TransportError {
        if e.is_timeout() {
            TransportError::Timeout { url: url.to_string(), timeout: self.timeout }
        } else {
            TransportError::Request { url: url.to_string(), source: e }
        }
    }

    fn send<F>(&self, method: Method, url: &Url, build: F) -> Result<Response, TransportError>
    where
        F: Fn() -> RequestBuilder,
    {
        let may_retry = RetryPolicy::allows_method(&method);
        let mut attempt = 1u32;
        self.politeness.wait();

        loop {
            debug!(%method, %url, attempt, "request");
            match build().send() {
                Ok(resp) if resp.status().is_success() => return Ok(resp),
                Ok(resp) => {
                    let status = resp.status().as_u16();
                    if may_retry && attempt < self.retry.total && RetryPolicy::retries_status(status) {
                        let delay = self.retry.delay(attempt, retry_after_secs(&resp));
                        warn!(status, %url, attempt, delay_ms = delay.as_millis() as u64, "retrying");
                        thread::sleep(delay);
                        attempt += 1;
                        continue;
                    }
                    return Err(TransportError::Status { status, url: url.to_string(), attempts: attempt });
                }
                Err(e) => {
                    let transient = e.is_timeout() || e.is_connect();
                    if may_retry && attempt < self.retry.total && transient {
                        let delay = self.retry.delay(attempt, None);
                        warn!(error = %e, %url, attempt, "transient failure, retrying");
                        thread::sleep(delay);
                        attempt += 1;
                        continue;
                    }
                    return Err(self.classify(url, e));
                }
            }
        }
    }
}

fn retry_after_secs(resp: &Response) -> Option<u64> {
    resp.headers()
        .get(header::RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.trim().parse::<u64>().ok())
}
