// src/cli.rs
use std::{fs::File, io::BufWriter, path::PathBuf};

use chrono::NaiveDate;
use clap::Parser;
use color_eyre::eyre::{Result, WrapErr};

use crate::config::options::{FetcherKind, Settings};
use crate::download::ensure_directory;
use crate::fetch::{self, SearchQuery};
use crate::filter::DateWindow;
use crate::progress::Progress;
use crate::record::{parse_portal_date, DocumentRecord};
use crate::{csv, runner};

/// Find and fetch "Technical Review" documents for a facility on TCEQ Records Online.
#[derive(Parser, Debug, Clone, PartialEq, Eq)]
#[command(name = "tr_scrape", version, about)]
pub struct Args {
    /// Central Registry RN, e.g. RN100223445
    #[arg(long, value_parser = parse_rn)]
    pub rn: String,

    /// Earliest document date (YYYY-MM-DD or MM/DD/YYYY), inclusive
    #[arg(long, value_parser = parse_date)]
    pub start_date: Option<NaiveDate>,

    /// Latest document date, inclusive
    #[arg(long, value_parser = parse_date)]
    pub end_date: Option<NaiveDate>,

    /// Earliest year, from Jan 1
    #[arg(long)]
    pub start_year: Option<i32>,

    /// Latest year, through Dec 31
    #[arg(long)]
    pub end_year: Option<i32>,

    /// Extra term the title or document type must contain
    #[arg(long)]
    pub keyword: Option<String>,

    /// Transport for the search; overrides the settings file
    #[arg(long, value_enum)]
    pub fetcher: Option<FetcherKind>,

    /// Show the browser window (browser fetcher only)
    #[arg(long)]
    pub headed: bool,

    /// Write the kept records to this CSV file
    #[arg(long)]
    pub export: Option<PathBuf>,

    /// Download every kept document
    #[arg(long)]
    pub download: bool,

    /// Download directory; overrides the settings file
    #[arg(long)]
    pub out: Option<PathBuf>,

    /// Settings file (TOML). Defaults to ./tr_scrape.toml when present
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Debug-level logging
    #[arg(short, long)]
    pub verbose: bool,
}

impl Args {
    pub fn window(&self) -> DateWindow {
        DateWindow::new(self.start_date, self.end_date)
            .intersect(DateWindow::from_years(self.start_year, self.end_year))
    }

    /// Flags on top of the loaded settings.
    pub fn apply(&self, settings: &mut Settings) {
        if let Some(kind) = self.fetcher {
            settings.fetcher = kind;
        }
        if self.headed {
            settings.browser.headless = false;
        }
        if let Some(out) = &self.out {
            settings.download.out_dir = out.clone();
        }
    }
}

fn parse_rn(s: &str) -> Result<String, String> {
    let rn = s.trim();
    if rn.is_empty() {
        return Err(s!("RN must not be empty"));
    }
    Ok(rn.to_ascii_uppercase())
}

fn parse_date(s: &str) -> Result<NaiveDate, String> {
    parse_portal_date(s).map_err(|e| e.to_string())
}

/// Status lines on stderr; stdout is left for the results table.
struct CliProgress;

impl Progress for CliProgress {
    fn begin(&mut self, total: usize) {
        eprintln!("Downloading {total} document(s)...");
    }
    fn log(&mut self, msg: &str) {
        eprintln!("{msg}");
    }
    fn item_done(&mut self, label: &str, path: &std::path::Path) {
        eprintln!("  saved  {label} -> {}", path.display());
    }
    fn item_failed(&mut self, label: &str, error: &str) {
        eprintln!("  FAILED {label}: {error}");
    }
}

pub fn run(args: Args) -> Result<()> {
    let mut settings = Settings::load(args.config.as_deref()).wrap_err("loading settings")?;
    args.apply(&mut settings);

    let base = settings.portal.base_url()?;
    let query = SearchQuery::new(args.rn.clone(), args.window());
    let mut fetcher = fetch::build(settings.fetcher, &settings)?;
    let mut progress = CliProgress;

    let report = runner::search(fetcher.as_mut(), &query, args.keyword.as_deref(), &base, &mut progress)
        .wrap_err_with(|| format!("search for {} failed", args.rn))?;

    if !report.ambiguities.is_empty() {
        eprintln!("Note: results layout not fully recognised ({:?}); check the list.", report.ambiguities);
    }
    print!("{}", render_table(&report.records));

    if let Some(path) = &args.export {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            ensure_directory(parent)?;
        }
        let file = File::create(path).wrap_err_with(|| format!("creating {}", path.display()))?;
        csv::write_records(BufWriter::new(file), &report.records)?;
        eprintln!("Wrote {} row(s) to {}", report.records.len(), path.display());
    }

    if args.download && !report.records.is_empty() {
        let out_dir = settings.download.out_dir.clone();
        let done = runner::download(&report.records, &out_dir, &settings, &mut progress)?;
        if !done.is_clean() {
            eprintln!("{} download(s) failed; see log for details.", done.failed.len());
        }
    }
    Ok(())
}

/// Plain fixed-width listing of the kept records.
pub fn render_table(records: &[DocumentRecord]) -> String {
    if records.is_empty() {
        return s!("No Technical Review documents found.\n");
    }
    let head = ["Date", "Document Type", "Title", "ID"];
    let rows: Vec<[&str; 4]> = records
        .iter()
        .map(|r| [r.date_string.as_str(), r.document_type.as_str(), r.title.as_str(), r.identifier.as_str()])
        .collect();

    let mut widths = head.map(|h| h.chars().count());
    for row in &rows {
        for (w, cell) in widths.iter_mut().zip(row) {
            *w = (*w).max(cell.chars().count());
        }
    }

    let line = |cells: &[&str; 4]| {
        let padded: Vec<String> = cells.iter().zip(widths).map(|(c, w)| format!("{c:<w$}")).collect();
        format!("{}\n", padded.join("  ").trim_end())
    };
    let mut out = line(&head);
    for row in &rows {
        out.push_str(&line(row));
    }
    out
}
