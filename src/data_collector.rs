use anyhow::{anyhow, Context, Result};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::api::{extract_xls_links, ReportSource, RetryPolicy, SpimexClient};
use crate::database_sqlx::DatabaseManagerSqlx;
use crate::models::{Config, RunSummary};
use crate::parser::{scan_rows, ReportScan, SheetReader, XlsSheetReader};

/// Page cursor and halt flag of one run
#[derive(Debug)]
struct RunState {
    page: u32,
    keep_going: bool,
    empty_pages: u32,
}

/// Local file name for a report link: its last four characters plus `.xls`
pub fn report_filename(link: &str) -> String {
    let chars: Vec<char> = link.chars().collect();
    let tail: String = chars[chars.len().saturating_sub(4)..].iter().collect();
    format!("{}.xls", tail)
}

/// Downloaded report on disk, removed when dropped
struct TempReport {
    path: PathBuf,
}

impl TempReport {
    fn new(path: PathBuf) -> Self {
        Self { path }
    }

    fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for TempReport {
    fn drop(&mut self) {
        match std::fs::remove_file(&self.path) {
            Ok(()) => debug!("Removed {}", self.path.display()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!("Failed to remove {}: {}", self.path.display(), e),
        }
    }
}

/// Walks the archive listing and stores every report until the cutoff year
pub struct DataCollector {
    source: Arc<dyn ReportSource>,
    reader: Arc<dyn SheetReader>,
    database: DatabaseManagerSqlx,
    config: Config,
    retry_policy: RetryPolicy,
}

impl DataCollector {
    /// Create a new data collector
    pub fn new<S, R>(source: S, reader: R, database: DatabaseManagerSqlx, config: Config) -> Self
    where
        S: ReportSource + 'static,
        R: SheetReader + 'static,
    {
        let retry_policy = RetryPolicy::from_config(&config);
        Self {
            source: Arc::new(source),
            reader: Arc::new(reader),
            database,
            config,
            retry_policy,
        }
    }

    /// Collector wired to the live exchange site, the `.xls` reader and the configured database
    pub async fn from_config(config: Config) -> Result<Self> {
        let client = SpimexClient::new(&config).context("Failed to build HTTP client")?;
        let database = DatabaseManagerSqlx::new(&config.database_path)
            .await
            .with_context(|| format!("Failed to open database {}", config.database_path))?;
        Ok(Self::new(client, XlsSheetReader, database, config))
    }

    pub fn database(&self) -> &DatabaseManagerSqlx {
        &self.database
    }

    /// Run one full pass: listing pages from the start page until the cutoff year
    pub async fn run(&self) -> Result<RunSummary> {
        let mut state = RunState {
            page: self.config.start_page,
            keep_going: true,
            empty_pages: 0,
        };
        let mut summary = RunSummary::default();

        info!(
            "🚀 Starting scrape from page {} (cutoff year {})",
            state.page, self.config.cutoff.year
        );

        while state.keep_going {
            if let Some(max_pages) = self.config.max_pages {
                if summary.pages_visited >= max_pages {
                    info!("Reached the page limit of {}", max_pages);
                    break;
                }
            }

            let html = self.fetch_listing_with_retry(state.page).await?;
            summary.pages_visited += 1;

            let links = extract_xls_links(&html);
            if links.is_empty() {
                state.empty_pages += 1;
                if state.empty_pages >= self.config.max_empty_pages {
                    info!(
                        "No reports on the last {} pages (up to page {}), the archive is exhausted",
                        state.empty_pages, state.page
                    );
                    break;
                }
                info!("No reports on page {}, moving on", state.page);
                state.page += 1;
                continue;
            }
            state.empty_pages = 0;
            info!("📋 Page {}: {} reports", state.page, links.len());

            for link in &links {
                let scan = self.process_report(link).await?;

                summary.files_processed += 1;
                summary.rows_saved += scan.records.len();
                if scan.reporting_date.is_some() {
                    summary.last_reporting_date = scan.reporting_date;
                }

                if scan.reached_cutoff {
                    info!(
                        "🛑 {} is dated {:?}, cutoff year {} reached",
                        link, scan.reporting_date, self.config.cutoff.year
                    );
                    summary.reached_cutoff = true;
                    state.keep_going = false;
                    break;
                }
            }

            if state.keep_going {
                state.page += 1;
            }
        }

        info!(
            "✅ Scrape finished: {} pages, {} files, {} rows saved",
            summary.pages_visited, summary.files_processed, summary.rows_saved
        );
        Ok(summary)
    }

    /// Poll a listing page until it answers or the retry budget runs out
    async fn fetch_listing_with_retry(&self, page: u32) -> Result<String> {
        let mut attempt = 0;
        loop {
            attempt += 1;
            if let Some(html) = self.source.fetch_listing(page).await {
                return Ok(html);
            }
            if !self.retry_policy.should_retry(attempt) {
                return Err(anyhow!(
                    "Listing page {} unavailable after {} attempts",
                    page,
                    attempt
                ));
            }
            warn!(
                "Listing page {} unavailable (attempt {}/{}), trying again",
                page, attempt, self.retry_policy.max_attempts
            );
            self.retry_policy.wait(attempt).await;
        }
    }

    /// Download one report, store its trading rows and remove the local copy
    pub async fn process_report(&self, link: &str) -> Result<ReportScan> {
        let report = TempReport::new(self.config.download_dir.join(report_filename(link)));

        self.source
            .download_report(link, report.path())
            .await
            .with_context(|| format!("Failed to download {}", link))?;

        let reader = Arc::clone(&self.reader);
        let path = report.path().to_path_buf();
        let rows = tokio::task::spawn_blocking(move || reader.read_first_sheet(&path))
            .await?
            .with_context(|| format!("Failed to read report {}", link))?;

        let scan = scan_rows(&rows, self.config.cutoff)
            .with_context(|| format!("Failed to parse report {}", link))?;

        let saved = self
            .database
            .save_trading_results(&scan.records)
            .await
            .with_context(|| format!("Failed to store rows of {}", link))?;

        info!(
            "💾 {}: {} rows saved for {:?}, {} without trades",
            link, saved, scan.reporting_date, scan.skipped_rows
        );
        Ok(scan)
    }
}
