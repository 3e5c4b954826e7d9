use chrono::{Datelike, NaiveDate};
use serde::Serialize;
use std::path::PathBuf;
use std::time::Duration;

use crate::error::{ScrapeError, ScrapeResult};

/// Column positions in the report layout. Column 1 also carries the control markers.
pub const COL_PRODUCT_ID: usize = 1;
pub const COL_PRODUCT_NAME: usize = 2;
pub const COL_DELIVERY_BASIS_NAME: usize = 3;
pub const COL_VOLUME: usize = 4;
pub const COL_TOTAL: usize = 5;
pub const COL_COUNT: usize = 14;

/// One spreadsheet cell, reduced to what the reports actually contain
#[derive(Debug, Clone, PartialEq, Default)]
pub enum CellValue {
    #[default]
    Empty,
    Text(String),
    Number(f64),
}

impl CellValue {
    /// Text rendering used for marker comparisons
    pub fn as_text(&self) -> String {
        match self {
            CellValue::Empty => String::new(),
            CellValue::Text(s) => s.clone(),
            CellValue::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => format!("{}", *n as i64),
            CellValue::Number(n) => n.to_string(),
        }
    }

    /// Numeric value; report text cells may carry thousands separators or a decimal comma
    pub fn as_number(&self) -> Option<f64> {
        match self {
            CellValue::Empty => None,
            CellValue::Number(n) => Some(*n),
            CellValue::Text(s) => {
                let cleaned: String = s
                    .chars()
                    .filter(|c| !c.is_whitespace() && *c != '\u{a0}')
                    .map(|c| if c == ',' { '.' } else { c })
                    .collect();
                cleaned.parse().ok()
            }
        }
    }
}

impl From<&str> for CellValue {
    fn from(value: &str) -> Self {
        if value.is_empty() {
            CellValue::Empty
        } else {
            CellValue::Text(value.to_string())
        }
    }
}

impl From<f64> for CellValue {
    fn from(value: f64) -> Self {
        CellValue::Number(value)
    }
}

/// One row of the first sheet of a report file
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ReportRow {
    /// Zero-based position of the row in the sheet
    pub index: usize,
    pub cells: Vec<CellValue>,
}

impl ReportRow {
    pub fn new(index: usize, cells: Vec<CellValue>) -> Self {
        Self { index, cells }
    }

    /// Cell at `column`, `Empty` when the row is shorter
    pub fn cell(&self, column: usize) -> &CellValue {
        static EMPTY: CellValue = CellValue::Empty;
        self.cells.get(column).unwrap_or(&EMPTY)
    }

    pub fn text(&self, column: usize) -> String {
        self.cell(column).as_text()
    }

    fn number(&self, column: usize) -> ScrapeResult<f64> {
        let cell = self.cell(column);
        cell.as_number().ok_or_else(|| ScrapeError::InvalidCell {
            row: self.index,
            column,
            value: cell.as_text(),
        })
    }
}

/// Persisted trading result for one product on one trading date
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TradingResult {
    pub id: Option<i64>,
    pub exchange_product_id: String,
    pub exchange_product_name: String,
    pub oil_id: String,
    pub delivery_basis_id: String,
    pub delivery_basis_name: String,
    pub delivery_type_id: String,
    pub volume: f64,
    pub total: f64,
    pub count: i64,
    pub date: NaiveDate,
}

impl TradingResult {
    /// Build a record from a data row of a report dated `date`.
    ///
    /// The product id encodes the oil type (chars 0..4), the delivery basis
    /// (chars 4..7) and the delivery type (last char).
    pub fn from_report_row(row: &ReportRow, date: NaiveDate) -> ScrapeResult<Self> {
        let product_id = row.text(COL_PRODUCT_ID).trim().to_string();
        let chars: Vec<char> = product_id.chars().collect();
        if chars.len() < 7 {
            return Err(ScrapeError::InvalidProductId {
                row: row.index,
                product_id,
            });
        }

        let oil_id: String = chars[..4].iter().collect();
        let delivery_basis_id: String = chars[4..7].iter().collect();
        let delivery_type_id = chars[chars.len() - 1].to_string();

        Ok(TradingResult {
            id: None,
            exchange_product_name: row.text(COL_PRODUCT_NAME).trim().to_string(),
            delivery_basis_name: row.text(COL_DELIVERY_BASIS_NAME).trim().to_string(),
            volume: row.number(COL_VOLUME)?,
            total: row.number(COL_TOTAL)?,
            count: row.number(COL_COUNT)?.round() as i64,
            exchange_product_id: product_id,
            oil_id,
            delivery_basis_id,
            delivery_type_id,
            date,
        })
    }
}

/// Year at which the whole run stops, shared by the sheet walker and the run driver
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CutoffPolicy {
    pub year: i32,
}

impl CutoffPolicy {
    pub fn new(year: i32) -> Self {
        Self { year }
    }

    /// The archive is listed newest first, so anything at or before the cutoff year ends the run
    pub fn is_reached(&self, date: NaiveDate) -> bool {
        date.year() <= self.year
    }
}

impl Default for CutoffPolicy {
    fn default() -> Self {
        Self { year: 2022 }
    }
}

/// Outcome of one scrape run
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RunSummary {
    pub pages_visited: u32,
    pub files_processed: usize,
    pub rows_saved: usize,
    pub last_reporting_date: Option<NaiveDate>,
    pub reached_cutoff: bool,
}

/// Configuration for the application
#[derive(Debug, Clone)]
pub struct Config {
    pub database_path: String,
    pub listing_url: String,
    pub download_base: String,
    pub download_dir: PathBuf,
    pub cutoff: CutoffPolicy,
    pub start_page: u32,
    pub max_pages: Option<u32>,
    /// Consecutive pages without report links after which the archive counts as exhausted
    pub max_empty_pages: u32,
    pub retry_max_attempts: u32,
    pub retry_base_delay: Duration,
    pub retry_max_delay: Duration,
    pub http_timeout: Duration,
    pub result_time_path: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            database_path: "spimex.db".to_string(),
            listing_url: "https://spimex.com/markets/oil_products/trades/results/?page=page-"
                .to_string(),
            download_base: "https://spimex.com".to_string(),
            download_dir: PathBuf::from("."),
            cutoff: CutoffPolicy::default(),
            start_page: 1,
            max_pages: None,
            max_empty_pages: 3,
            retry_max_attempts: 10,
            retry_base_delay: Duration::from_millis(500),
            retry_max_delay: Duration::from_millis(30_000),
            http_timeout: Duration::from_secs(60),
            result_time_path: PathBuf::from("result_time.txt"),
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok(); // Load .env file if it exists
        Ok(Self::from_lookup(|key| std::env::var(key).ok()))
    }

    /// Build a configuration from any key lookup, falling back to defaults
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Config::default();
        let parse_or = |key: &str, default: u64| -> u64 {
            lookup(key).and_then(|v| v.parse().ok()).unwrap_or(default)
        };

        Config {
            database_path: lookup("DATABASE_PATH").unwrap_or(defaults.database_path),
            listing_url: lookup("SPIMEX_LISTING_URL").unwrap_or(defaults.listing_url),
            download_base: lookup("SPIMEX_DOWNLOAD_BASE").unwrap_or(defaults.download_base),
            download_dir: lookup("DOWNLOAD_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.download_dir),
            cutoff: lookup("CUTOFF_YEAR")
                .and_then(|v| v.parse().ok())
                .map(CutoffPolicy::new)
                .unwrap_or(defaults.cutoff),
            start_page: lookup("START_PAGE")
                .and_then(|v| v.parse().ok())
                .filter(|page: &u32| *page > 0)
                .unwrap_or(defaults.start_page),
            max_pages: lookup("MAX_PAGES").and_then(|v| v.parse().ok()),
            max_empty_pages: lookup("MAX_EMPTY_PAGES")
                .and_then(|v| v.parse().ok())
                .filter(|pages: &u32| *pages > 0)
                .unwrap_or(defaults.max_empty_pages),
            retry_max_attempts: lookup("RETRY_MAX_ATTEMPTS")
                .and_then(|v| v.parse().ok())
                .filter(|attempts: &u32| *attempts > 0)
                .unwrap_or(defaults.retry_max_attempts),
            retry_base_delay: Duration::from_millis(parse_or("RETRY_BASE_DELAY_MS", 500)),
            retry_max_delay: Duration::from_millis(parse_or("RETRY_MAX_DELAY_MS", 30_000)),
            http_timeout: Duration::from_secs(parse_or("HTTP_TIMEOUT_SECS", 60)),
            result_time_path: lookup("RESULT_TIME_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.result_time_path),
        }
    }
}
