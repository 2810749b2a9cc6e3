// src/download.rs

use std::{
    collections::HashMap,
    fs::{self, File},
    io::{BufWriter, Write},
    path::{Path, PathBuf},
};

use tracing::{info, warn};
use url::Url;

use crate::config::consts::TITLE_STEM_MAX;
use crate::core::net::{Net, Politeness};
use crate::core::sanitize::{sanitize_identifier, sanitize_title};
use crate::error::{DownloadError, TransportError};
use crate::progress::Progress;
use crate::record::DocumentRecord;

const EXT: &str = "pdf";

/// What a batch produced. Failures are per item and never stop the batch.
#[derive(Debug, Default)]
pub struct DownloadReport {
    pub saved: Vec<PathBuf>,
    pub failed: Vec<(DocumentRecord, DownloadError)>,
}

impl DownloadReport {
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}

/// `<YYYY-MM-DD|undated>_<title>_<identifier>`, no extension.
/// "Technical Review - Air Permit", 03/14/2019, 555 → `2019-03-14_Technical Review Air Permit_555`
pub fn file_stem_for(record: &DocumentRecord) -> String {
    let date = record
        .parsed_date
        .map(|d| d.format("%Y-%m-%d").to_string())
        .unwrap_or_else(|| s!("undated"));
    let mut title = sanitize_title(&record.title, TITLE_STEM_MAX);
    if title.is_empty() {
        title = s!("untitled");
    }
    format!("{date}_{title}_{}", sanitize_identifier(&record.identifier))
}

pub fn ensure_directory(dir: &Path) -> Result<(), DownloadError> {
    let io_err = |source: std::io::Error| DownloadError::Io { path: dir.display().to_string(), source };
    if dir.exists() && !dir.is_dir() {
        return Err(io_err(std::io::Error::new(
            std::io::ErrorKind::AlreadyExists,
            "path exists but is not a directory",
        )));
    }
    if !dir.exists() {
        fs::create_dir_all(dir).map_err(io_err)?;
    }
    Ok(())
}

/// Duplicate handling **only within this batch**.
/// First occurrence: `<stem>.ext`; later ones `<stem> (N).ext`, N from 2.
pub fn resolve_file_name(
    dir: &Path,
    stem: &str,
    seen_names: &mut HashMap<String, usize>,
    ext: &str,
) -> PathBuf {
    let count = seen_names.entry(stem.to_string()).or_insert(0);
    let filename = if *count == 0 {
        format!("{stem}.{ext}")
    } else {
        format!("{stem} ({}).{ext}", *count + 1)
    };
    *count += 1;
    dir.join(filename)
}

/// Stream one document to `path`. A failed transfer leaves no file behind.
pub fn download_one(net: &Net, url: &Url, path: &Path) -> Result<u64, DownloadError> {
    let mut resp = net.get_stream(url)?;
    let io_err = |source: std::io::Error| DownloadError::Io { path: path.display().to_string(), source };

    let file = File::create(path).map_err(io_err)?;
    let mut out = BufWriter::new(file);
    let written = resp
        .copy_to(&mut out)
        .map_err(|source| DownloadError::from(TransportError::Request { url: url.to_string(), source }))
        .and_then(|n| out.flush().map(|_| n).map_err(io_err));
    drop(out);

    if written.is_err() {
        let _ = fs::remove_file(path);
    }
    written
}

/// Download every record into `out_dir`, pausing between items.
/// Only a missing/unusable `out_dir` fails the whole call.
pub fn download_all(
    net: &Net,
    records: &[DocumentRecord],
    out_dir: &Path,
    pause: Politeness,
    progress: &mut dyn Progress,
) -> Result<DownloadReport, DownloadError> {
    ensure_directory(out_dir)?;
    progress.begin(records.len());

    let mut report = DownloadReport::default();
    let mut seen: HashMap<String, usize> = HashMap::new();

    for (i, record) in records.iter().enumerate() {
        if i > 0 {
            pause.wait();
        }
        let label = record.label();
        let path = resolve_file_name(out_dir, &file_stem_for(record), &mut seen, EXT);

        match download_one(net, &record.download_url, &path) {
            Ok(bytes) => {
                info!(path = %path.display(), bytes, "saved");
                progress.item_done(&label, &path);
                report.saved.push(path);
            }
            Err(e) => {
                warn!(%label, error = %e, "download failed");
                progress.item_failed(&label, &e.to_string());
                report.failed.push((record.clone(), e));
            }
        }
    }

    progress.log(&format!("{} saved, {} failed", report.saved.len(), report.failed.len()));
    progress.finish();
    Ok(report)
}
