// src/lib.rs

#[macro_use]
pub mod macros;

pub mod config;
pub mod core;
pub mod error;
pub mod record;
pub mod specs;

pub mod fetch;
pub mod filter;
pub mod runner;

pub mod csv;
pub mod download;
pub mod progress;

pub mod log;
#[cfg(feature = "cli")]
pub mod cli;

pub use error::{DateParseError, DownloadError, TransportError};
pub use fetch::{FetchOutcome, ResultsFetcher, SearchQuery};
pub use record::DocumentRecord;
