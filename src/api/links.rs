use once_cell::sync::Lazy;
use regex::Regex;

/// Upload path shared by every oil-products report
pub const REPORT_UPLOAD_PATH: &str = "/upload/reports/oil_xls/";

static REPORT_LINK: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"href="(/upload/reports/oil_xls/oil_xls_\d{14}\.xls\?r=\d{4})""#)
        .expect("valid report link regex")
});

/// Collect relative report download links from a listing page.
///
/// Only lines mentioning the report upload path are inspected, and only the
/// first link on such a line is taken. Links keep page order and duplicates.
pub fn extract_xls_links(html: &str) -> Vec<String> {
    let marker = format!("href=\"{}", REPORT_UPLOAD_PATH);

    html.lines()
        .filter(|line| line.contains(&marker))
        .filter_map(|line| REPORT_LINK.captures(line.trim()))
        .filter_map(|captures| captures.get(1))
        .filter_map(|link| link.as_str().rsplit('/').next())
        .map(|filename| format!("{}{}", REPORT_UPLOAD_PATH, filename))
        .collect()
}
