//! Common test utilities and helpers

pub mod database;

pub use database::{init_fresh_test_database, TestDatabase};

use spimex_scraper::api::ReportSource;
use spimex_scraper::models::{CellValue, ReportRow};
use spimex_scraper::parser::SheetReader;
use spimex_scraper::{ScrapeError, ScrapeResult};
use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex};

/// Reads tab-separated text reports, so tests can serve sheets without a binary workbook
#[derive(Debug, Clone, Copy, Default)]
pub struct TsvSheetReader;

impl SheetReader for TsvSheetReader {
    fn read_first_sheet(&self, path: &Path) -> ScrapeResult<Vec<ReportRow>> {
        let text = std::fs::read_to_string(path)?;
        Ok(text
            .lines()
            .enumerate()
            .map(|(index, line)| {
                let cells = line
                    .split('\t')
                    .map(|cell| match cell.parse::<f64>() {
                        Ok(n) => CellValue::Number(n),
                        Err(_) => CellValue::from(cell),
                    })
                    .collect();
                ReportRow::new(index, cells)
            })
            .collect())
    }
}

/// In-memory listing and report source that fails a scripted number of listing fetches
#[derive(Debug, Default)]
pub struct ScriptedSource {
    listing_failures: Mutex<u32>,
    pages: HashMap<u32, String>,
    reports: HashMap<String, String>,
    listing_calls: Arc<Mutex<Vec<u32>>>,
}

impl ScriptedSource {
    /// The first `listing_failures` listing fetches answer `None`, whatever the page
    pub fn new(listing_failures: u32) -> Self {
        Self {
            listing_failures: Mutex::new(listing_failures),
            ..Self::default()
        }
    }

    pub fn with_page(mut self, page: u32, html: String) -> Self {
        self.pages.insert(page, html);
        self
    }

    pub fn with_report(mut self, link: String, body: String) -> Self {
        self.reports.insert(link, body);
        self
    }

    /// Page numbers of every listing fetch, in call order
    pub fn listing_calls(&self) -> Arc<Mutex<Vec<u32>>> {
        Arc::clone(&self.listing_calls)
    }
}

#[async_trait::async_trait]
impl ReportSource for ScriptedSource {
    async fn fetch_listing(&self, page: u32) -> Option<String> {
        self.listing_calls.lock().unwrap().push(page);

        let mut failures = self.listing_failures.lock().unwrap();
        if *failures > 0 {
            *failures -= 1;
            return None;
        }
        Some(self.pages.get(&page).cloned().unwrap_or_default())
    }

    async fn download_report(&self, link: &str, destination: &Path) -> ScrapeResult<()> {
        let body = self.reports.get(link).ok_or_else(|| ScrapeError::Status {
            url: link.to_string(),
            status: 404,
        })?;
        std::fs::write(destination, body)?;
        Ok(())
    }
}

/// Report fixtures in the layout of the exchange bulletins
pub mod fixtures {
    /// A traded instrument: product id, volume, total, count ("-" for no trades)
    pub type Trade<'a> = (&'a str, f64, f64, &'a str);

    fn line(cells: &[(usize, String)]) -> String {
        let mut row = vec![String::new(); 15];
        for (column, value) in cells {
            row[*column] = value.clone();
        }
        row.join("\t")
    }

    /// Build a report with a header dated `date` (DD.MM.YYYY) and the given trades
    pub fn report(date: &str, trades: &[Trade]) -> String {
        let mut lines = vec![
            line(&[(1, "Форма СЭТ-БТ".to_string())]),
            line(&[(1, format!("Дата торгов: {}", date))]),
            line(&[(1, "Секция Биржи: «Нефтепродукты» АО «СПбМТСБ»".to_string())]),
            line(&[(1, "Единица измерения: Метрическая тонна".to_string())]),
            line(&[(1, "Код Инструмента".to_string()), (2, "Наименование Инструмента".to_string())]),
        ];

        for (product_id, volume, total, count) in trades {
            lines.push(line(&[
                (1, product_id.to_string()),
                (2, "Бензин (АИ-92-К5), ст. Биклянь".to_string()),
                (3, "ст. Биклянь".to_string()),
                (4, volume.to_string()),
                (5, total.to_string()),
                (14, count.to_string()),
            ]));
        }

        lines.push(line(&[(1, "Итого:".to_string()), (14, trades.len().to_string())]));
        lines.push(line(&[(1, "Маклер СПбМТСБ".to_string())]));
        lines.join("\n")
    }

    /// Relative link of a report uploaded at `timestamp` (14 digits) with query `r`
    pub fn report_link(timestamp: &str, r: &str) -> String {
        format!("/upload/reports/oil_xls/oil_xls_{}.xls?r={}", timestamp, r)
    }

    /// Listing page HTML with one anchor per link
    pub fn listing_page(links: &[String]) -> String {
        let items: Vec<String> = links
            .iter()
            .map(|link| {
                format!(
                    "  <a class=\"accordeon-inner__item-title link xls\" href=\"{}\" target=\"_blank\">Бюллетень по итогам торгов</a>",
                    link
                )
            })
            .collect();

        format!(
            "<html>\n<body>\n<div class=\"accordeon-inner\">\n{}\n</div>\n</body>\n</html>",
            items.join("\n")
        )
    }
}

/// Path of a binary fixture under `tests/fixtures`
pub fn fixture_path(name: &str) -> std::path::PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("tests").join("fixtures").join(name)
}

/// Logging utilities for tests
pub mod logging {
    use tracing::info;

    /// Log test step
    pub fn log_test_step(step: &str) {
        info!("🧪 Test Step: {}", step);
    }
}
