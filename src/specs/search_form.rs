// src/specs/search_form.rs
// The portal's search form: hidden session fields plus the search payload.

use scraper::Html;

use crate::config::consts::{IDENTIFIER_FIELD, SEARCH_PERFORM_SERVICE, SORT_FIELD, SORT_ORDER};
use crate::config::options::PortalOptions;
use crate::core::html::sel;

/// Form the hidden fields are read from, when present.
const SEARCH_FORM: &str = "form[name='TCEQ_SEARCH']";

/// `name`/`value` of every `<input type=hidden>`.
/// Scoped to the search form when the page has one, else the whole page.
/// Later duplicates of a name replace earlier ones.
pub fn hidden_fields(html: &str) -> Vec<(String, String)> {
    let doc = Html::parse_document(html);
    let hidden = sel("input[type='hidden']");

    let inputs: Vec<_> = match doc.select(&sel(SEARCH_FORM)).next() {
        Some(form) => form.select(&hidden).collect(),
        None => doc.select(&hidden).collect(),
    };

    let mut out: Vec<(String, String)> = Vec::new();
    for input in inputs {
        let Some(name) = input.value().attr("name").map(str::trim).filter(|n| !n.is_empty()) else {
            continue;
        };
        let value = s!(input.value().attr("value").unwrap_or(""));
        set_field(&mut out, name, value);
    }
    out
}

/// Hidden fields overridden by the search parameters, in form order with
/// new keys appended.
pub fn search_payload(
    hidden: &[(String, String)],
    portal: &PortalOptions,
    facility_id: &str,
) -> Vec<(String, String)> {
    let mut form = hidden.to_vec();
    let result_count = portal.result_count.to_string();
    let overrides: [(&str, &str); 10] = [
        ("IdcService", SEARCH_PERFORM_SERVICE),
        ("xRecordSeries", portal.record_series.as_str()),
        ("select0", IDENTIFIER_FIELD),
        ("input0", facility_id.trim()),
        ("ftx", portal.keyword.as_str()),
        ("SortField", SORT_FIELD),
        ("SortOrder", SORT_ORDER),
        ("ResultCount", result_count.as_str()),
        ("SearchQueryFormat", "Universal"),
        ("IsExternalSearch", "1"),
    ];
    for (k, v) in overrides {
        set_field(&mut form, k, s!(v));
    }
    form
}

fn set_field(form: &mut Vec<(String, String)>, name: &str, value: String) {
    match form.iter_mut().find(|(k, _)| k == name) {
        Some(slot) => slot.1 = value,
        None => form.push((s!(name), value)),
    }
}
