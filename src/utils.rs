use anyhow::{Context, Result};
use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;
use std::path::Path;
use std::time::Duration;

/// Header cell that carries the trading date of a report, e.g. "Дата торгов: 15.03.2023"
static TRADING_DATE_HEADER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^Дата торгов: (\d{2}\.\d{2}\.\d{4})").expect("valid date header regex"));

/// Parse a `DD.MM.YYYY` date string
pub fn string_to_date(value: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), "%d.%m.%Y").ok()
}

/// Extract the trading date from a report header cell.
///
/// Returns `None` when the cell is not a date header or the date is not a real
/// calendar date.
pub fn parse_trading_date_header(cell: &str) -> Option<NaiveDate> {
    let captures = TRADING_DATE_HEADER.captures(cell)?;
    string_to_date(captures.get(1)?.as_str())
}

/// Record the wall-clock duration of the run
pub fn write_result_time_to_file(path: &Path, elapsed: Duration) -> Result<()> {
    std::fs::write(
        path,
        format!("Run execution time: {}.\n", elapsed.as_secs_f64()),
    )
    .with_context(|| format!("Failed to write run time to {}", path.display()))
}
