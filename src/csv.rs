// src/csv.rs
use std::io::{self, Write};

use crate::record::DocumentRecord;

pub const HEADERS: [&str; 5] = ["Date", "Document Type", "Title", "Identifier", "URL"];

fn needs_quotes(field: &str, sep: char) -> bool {
    field.contains(sep) || field.contains('"') || field.contains('\n') || field.contains('\r')
}

/// Write a single CSV row to any writer.
pub fn write_row<W: Write, S: AsRef<str>>(mut w: W, row: &[S], sep: char) -> io::Result<()> {
    let mut first = true;
    for cell in row {
        let cell = cell.as_ref();
        if !first { write!(w, "{}", sep)?; } else { first = false; }
        if needs_quotes(cell, sep) {
            let escaped = cell.replace('"', "\"\"");
            write!(w, "\"{}\"", escaped)?;
        } else {
            write!(w, "{}", cell)?;
        }
    }
    writeln!(w)
}

/// Export row. Date is the portal's own text, not the parsed date.
pub fn record_row(r: &DocumentRecord) -> [String; 5] {
    [
        r.date_string.clone(),
        r.document_type.clone(),
        r.title.clone(),
        r.identifier.clone(),
        r.download_url.to_string(),
    ]
}

/// Header line plus one row per record, in order.
pub fn write_records<W: Write>(mut w: W, records: &[DocumentRecord]) -> io::Result<()> {
    write_row(&mut w, &HEADERS, ',')?;
    for r in records {
        write_row(&mut w, &record_row(r), ',')?;
    }
    w.flush()
}
