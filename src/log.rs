// src/log.rs
// Subscriber setup for the binary. The library itself only emits `tracing`
// events and never installs anything.

use std::error::Error;
use std::fs;
use std::path::Path;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Registry};

use crate::config::consts::{LOG_FILE, STORE_DIR};

pub const DEFAULT_FILTER: &str = "warn,tr_scrape=info";
pub const VERBOSE_FILTER: &str = "warn,tr_scrape=debug";

/// Compact stderr output plus a plain-text `.store/debug.log`.
/// `RUST_LOG` wins over `verbose`. Keep the guard alive until exit or the
/// file loses its tail.
pub fn init(verbose: bool) -> Result<WorkerGuard, Box<dyn Error + Send + Sync>> {
    init_in(Path::new(STORE_DIR), verbose)
}

pub fn init_in(dir: &Path, verbose: bool) -> Result<WorkerGuard, Box<dyn Error + Send + Sync>> {
    fs::create_dir_all(dir)?;
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(if verbose { VERBOSE_FILTER } else { DEFAULT_FILTER }));

    let (file_writer, guard) = tracing_appender::non_blocking(tracing_appender::rolling::never(dir, LOG_FILE));
    let file_layer = fmt::Layer::new()
        .with_writer(file_writer)
        .with_target(true)
        .with_ansi(false);
    let console_layer = fmt::Layer::new()
        .compact()
        .with_writer(std::io::stderr)
        .with_target(false);

    Registry::default()
        .with(env_filter)
        .with(file_layer)
        .with(console_layer)
        .try_init()?;
    Ok(guard)
}
