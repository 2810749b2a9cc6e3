// benches/extract.rs
use criterion::{black_box, criterion_group, criterion_main, Criterion};

use tr_scrape::specs::results::extract_page;
use url::Url;

/// 200 rows, the most the portal returns per page; every third row is not a Technical Review.
fn synthetic_page() -> String {
    let mut html = String::from(
        "<html><body><table id=\"table_0\"><tr><th>Select</th><th>Content ID</th><th>Record Series</th>\
         <th>Primary ID</th><th>Secondary ID</th><th>Document Type</th><th>Title</th><th>Begin Date</th></tr>",
    );
    for i in 0..200 {
        let title = if i % 3 == 0 { "Cover letter" } else { "Technical Review - Air Permit" };
        html.push_str(&format!(
            "<tr><td><input type=\"checkbox\"></td>\
             <td><a href=\"/cs/idcplg?IdcService=GET_FILE&amp;dID={i}\">{i}</a></td>\
             <td>AIR / New Source Review Permit</td><td>RN100223445</td><td>{i}</td>\
             <td>Permits</td><td>{title}</td><td>{:02}/{:02}/20{:02}</td></tr>",
            i % 12 + 1,
            i % 28 + 1,
            i % 25
        ));
    }
    html.push_str("</table></body></html>");
    html
}

fn bench_extract(c: &mut Criterion) {
    let doc = synthetic_page();
    let base = Url::parse("https://records.tceq.texas.gov/cs/idcplg").expect("base url");

    c.bench_function("extract_page_200_rows", |b| {
        b.iter(|| {
            let out = extract_page(black_box(&doc), &base);
            black_box(out.records.len())
        })
    });
}

criterion_group!(benches, bench_extract);
criterion_main!(benches);
