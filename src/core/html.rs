// src/core/html.rs
// Small DOM helpers over `scraper`, tailored to the portal's table markup.
// Tag-name checks are ASCII case-insensitive; html5ever already lowercases.

use scraper::{ElementRef, Selector};

use super::sanitize::normalize_ws;

/// Parse a selector known at compile time.
/// Only called with literals covered by tests, so a bad one is a programming error.
pub fn sel(css: &str) -> Selector {
    match Selector::parse(css) {
        Ok(s) => s,
        Err(e) => panic!("invalid selector {css:?}: {e}"),
    }
}

pub fn is_tag(el: &ElementRef<'_>, name: &str) -> bool {
    el.value().name().eq_ignore_ascii_case(name)
}

/// All text below `el`, whitespace collapsed (`&nbsp;` included).
pub fn text_of(el: &ElementRef<'_>) -> String {
    let raw: String = el.text().collect::<Vec<_>>().join(" ");
    normalize_ws(&raw)
}

/// Direct `<td>`/`<th>` children of a row, in order.
/// Nested tables do not leak cells into the outer row.
pub fn row_cells<'a>(row: &ElementRef<'a>) -> Vec<ElementRef<'a>> {
    row.children()
        .filter_map(ElementRef::wrap)
        .filter(|c| is_tag(c, "td") || is_tag(c, "th"))
        .collect()
}

/// Nearest enclosing `<table>` of `el` (not counting `el` itself).
pub fn enclosing_table<'a>(el: &ElementRef<'a>) -> Option<ElementRef<'a>> {
    el.ancestors()
        .filter_map(ElementRef::wrap)
        .find(|a| is_tag(a, "table"))
}

/// Rows that belong to `table` itself, skipping rows of nested tables.
pub fn own_rows<'a>(table: &ElementRef<'a>) -> Vec<ElementRef<'a>> {
    let tr = sel("tr");
    table
        .select(&tr)
        .filter(|row| enclosing_table(row).map(|t| t.id()) == Some(table.id()))
        .collect()
}

/// Row wraps other rows (page layout), not data.
pub fn has_nested_rows(row: &ElementRef<'_>) -> bool {
    let tr = sel("tr");
    row.select(&tr).any(|inner| inner.id() != row.id())
}

#[cfg(test)]
mod tests {
    use super::*;
    use scraper::Html;

    #[test]
    fn own_rows_skip_nested_tables() {
        let doc = Html::parse_document(
            r#"<table id="outer">
                 <tr><td>a</td></tr>
                 <tr><td><table><tr><td>inner</td></tr></table></td></tr>
               </table>"#,
        );
        let outer = doc.select(&sel("#outer")).next().unwrap();
        let rows = own_rows(&outer);
        assert_eq!(rows.len(), 2);
        assert!(!has_nested_rows(&rows[0]));
        assert!(has_nested_rows(&rows[1]));
    }

    #[test]
    fn text_collapses_whitespace_and_nbsp() {
        let doc = Html::parse_fragment("<div> Technical&nbsp;&nbsp;Review \n <b>Memo</b></div>");
        let div = doc.select(&sel("div")).next().unwrap();
        assert_eq!(text_of(&div), "Technical Review Memo");
    }

    #[test]
    fn row_cells_are_direct_children_only() {
        let doc = Html::parse_document(
            "<table><tr><th>A</th><td>B<table><tr><td>x</td></tr></table></td></tr></table>",
        );
        let row = doc.select(&sel("tr")).next().unwrap();
        let cells = row_cells(&row);
        assert_eq!(cells.len(), 2);
        assert!(is_tag(&cells[0], "TH"));
    }
}
