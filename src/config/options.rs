// src/config/options.rs
use std::path::{Path, PathBuf};
use std::time::Duration;

use config::{Config, Environment, File, FileFormat};
use serde::Deserialize;
use url::Url;

use super::consts::*;
use crate::error::SettingsError;

/// Which transport produces the results HTML.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
#[cfg_attr(feature = "cli", derive(clap::ValueEnum))]
pub enum FetcherKind {
    #[default]
    Http,
    Browser,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub fetcher: FetcherKind,
    pub portal: PortalOptions,
    pub http: HttpOptions,
    pub politeness: PolitenessOptions,
    pub browser: BrowserOptions,
    pub download: DownloadOptions,
}

impl Settings {
    /// Defaults, then the TOML file at `path` (if present), then `TR_SCRAPE__*` env vars.
    /// e.g. `TR_SCRAPE__HTTP__RETRY_TOTAL=5`, `TR_SCRAPE__FETCHER=browser`
    pub fn load(path: Option<&Path>) -> Result<Self, SettingsError> {
        let path = path.unwrap_or_else(|| Path::new(SETTINGS_FILE));
        let cfg = Config::builder()
            .add_source(File::from(path).format(FileFormat::Toml).required(false))
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;
        let settings: Settings = cfg.try_deserialize()?;
        settings.portal.base_url()?;
        Ok(settings)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct PortalOptions {
    pub base_url: String,
    pub origin: String,
    pub record_series: String,
    pub document_type: String,
    pub keyword: String,
    pub result_count: u32,
}

impl Default for PortalOptions {
    fn default() -> Self {
        Self {
            base_url: s!(PORTAL_BASE_URL),
            origin: s!(PORTAL_ORIGIN),
            record_series: s!(RECORD_SERIES),
            document_type: s!(DOCUMENT_TYPE_PERMITS),
            keyword: s!(KEYWORD),
            result_count: RESULT_COUNT,
        }
    }
}

impl PortalOptions {
    pub fn base_url(&self) -> Result<Url, url::ParseError> {
        Url::parse(&self.base_url)
    }

    /// `<base>?IdcService=TCEQ_SEARCH`
    pub fn search_form_url(&self) -> Result<Url, url::ParseError> {
        let mut url = self.base_url()?;
        url.query_pairs_mut().clear().append_pair("IdcService", SEARCH_FORM_SERVICE);
        Ok(url)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct HttpOptions {
    pub user_agent: String,
    pub connect_timeout_secs: u64,
    pub request_timeout_secs: u64,
    /// Total attempts per request, first try included.
    pub retry_total: u32,
    pub retry_backoff_ms: u64,
}

impl Default for HttpOptions {
    fn default() -> Self {
        Self {
            user_agent: s!(USER_AGENT),
            connect_timeout_secs: CONNECT_TIMEOUT_SECS,
            request_timeout_secs: REQUEST_TIMEOUT_SECS,
            retry_total: RETRY_TOTAL,
            retry_backoff_ms: RETRY_BACKOFF_MS,
        }
    }
}

impl HttpOptions {
    pub fn connect_timeout(&self) -> Duration { Duration::from_secs(self.connect_timeout_secs) }
    pub fn request_timeout(&self) -> Duration { Duration::from_secs(self.request_timeout_secs) }
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct PolitenessOptions {
    pub pause_ms: u64,
    pub jitter_ms: u64,
    pub download_pause_ms: u64,
}

impl Default for PolitenessOptions {
    fn default() -> Self {
        Self {
            pause_ms: REQUEST_PAUSE_MS,
            jitter_ms: JITTER_MS,
            download_pause_ms: DOWNLOAD_PAUSE_MS,
        }
    }
}

impl PolitenessOptions {
    /// No pauses at all. Tests and local fixtures only.
    pub fn none() -> Self {
        Self { pause_ms: 0, jitter_ms: 0, download_pause_ms: 0 }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct BrowserOptions {
    pub headless: bool,
    pub wait_secs: u64,
    pub poll_ms: u64,
    pub max_pages: usize,
    pub screenshot_dir: PathBuf,
    /// Chromium binary; autodetected when unset.
    pub executable: Option<PathBuf>,
}

impl Default for BrowserOptions {
    fn default() -> Self {
        Self {
            headless: true,
            wait_secs: BROWSER_WAIT_SECS,
            poll_ms: BROWSER_POLL_MS,
            max_pages: BROWSER_MAX_PAGES,
            screenshot_dir: PathBuf::from(SCREENSHOT_DIR),
            executable: None,
        }
    }
}

impl BrowserOptions {
    pub fn wait(&self) -> Duration { Duration::from_secs(self.wait_secs) }
    pub fn poll(&self) -> Duration { Duration::from_millis(self.poll_ms.max(10)) }
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct DownloadOptions {
    pub out_dir: PathBuf,
}

impl Default for DownloadOptions {
    fn default() -> Self {
        Self { out_dir: PathBuf::from(DEFAULT_OUT_DIR).join(DEFAULT_DOWNLOAD_SUBDIR) }
    }
}
