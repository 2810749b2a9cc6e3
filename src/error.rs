// src/error.rs
use std::io;
use std::time::Duration;

use thiserror::Error;

/// Hard failure of a fetch: the current search aborts.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("timed out after {timeout:?}: {url}")]
    Timeout { url: String, timeout: Duration },

    #[error("HTTP {status} from {url} after {attempts} attempt(s)")]
    Status { status: u16, url: String, attempts: u32 },

    #[error("request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("browser error: {0}")]
    Browser(String),

    #[error("element not found: {0}")]
    ElementNotFound(String),

    #[error("{0} fetcher not available in this build")]
    Unsupported(&'static str),
}

/// One document failed to download. Never aborts the batch.
#[derive(Debug, Error)]
pub enum DownloadError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("write failed for {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: io::Error,
    },
}

/// Malformed date text. Soft: the record keeps an unknown date.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unrecognised date text {0:?}")]
pub struct DateParseError(pub String);

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error(transparent)]
    Config(#[from] config::ConfigError),

    #[error("invalid portal URL: {0}")]
    Url(#[from] url::ParseError),
}
