use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use std::time::Instant;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use spimex_scraper::data_collector::DataCollector;
use spimex_scraper::models::{Config, CutoffPolicy};
use spimex_scraper::utils::write_result_time_to_file;

/// Oil-products trading results scraper
#[derive(Parser)]
#[command(name = "spimex-scraper")]
#[command(version)]
#[command(about = "Download SPIMEX oil-products trading reports and store the results in SQLite")]
#[command(long_about = "
Walks the exchange's trading-results archive page by page, downloads every
daily .xls bulletin, extracts the traded instruments and stores them in a
local SQLite database. The run stops at the first report dated in the cutoff
year or earlier (2022 unless overridden).

Settings come from the environment (or a .env file); flags override them.
")]
struct Args {
    /// SQLite database path (DATABASE_PATH)
    #[arg(long)]
    database: Option<String>,

    /// First listing page to fetch (START_PAGE)
    #[arg(long)]
    start_page: Option<u32>,

    /// Stop after this many listing pages (MAX_PAGES)
    #[arg(long)]
    max_pages: Option<u32>,

    /// Stop after this many consecutive listing pages without reports (MAX_EMPTY_PAGES)
    #[arg(long)]
    max_empty_pages: Option<u32>,

    /// Stop once a report from this year or earlier is reached (CUTOFF_YEAR)
    #[arg(long)]
    cutoff_year: Option<i32>,

    /// Directory for temporary report downloads (DOWNLOAD_DIR)
    #[arg(long)]
    download_dir: Option<PathBuf>,

    /// Show per-row debug logging
    #[arg(long, short)]
    verbose: bool,
}

impl Args {
    fn apply(self, mut config: Config) -> Config {
        if let Some(database) = self.database {
            config.database_path = database;
        }
        if let Some(page) = self.start_page.filter(|page| *page > 0) {
            config.start_page = page;
        }
        if self.max_pages.is_some() {
            config.max_pages = self.max_pages;
        }
        if let Some(pages) = self.max_empty_pages.filter(|pages| *pages > 0) {
            config.max_empty_pages = pages;
        }
        if let Some(year) = self.cutoff_year {
            config.cutoff = CutoffPolicy::new(year);
        }
        if let Some(dir) = self.download_dir {
            config.download_dir = dir;
        }
        config
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let default_filter = if args.verbose {
        "spimex_scraper=debug"
    } else {
        "spimex_scraper=info"
    };
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .expect("setting default subscriber failed");

    let config = match Config::from_env() {
        Ok(config) => args.apply(config),
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            eprintln!("❌ Configuration Error: {}", e);
            std::process::exit(1);
        }
    };
    info!("📋 Configuration loaded, database at {}", config.database_path);

    let started = Instant::now();
    let result_time_path = config.result_time_path.clone();

    let collector = DataCollector::from_config(config).await?;
    let outcome = collector.run().await;
    collector.database().close().await;

    write_result_time_to_file(&result_time_path, started.elapsed())?;

    match outcome {
        Ok(summary) => {
            println!(
                "✅ {} rows from {} reports ({} pages), last trading date {}",
                summary.rows_saved,
                summary.files_processed,
                summary.pages_visited,
                summary
                    .last_reporting_date
                    .map(|d| d.to_string())
                    .unwrap_or_else(|| "n/a".to_string())
            );
            Ok(())
        }
        Err(e) => {
            error!("❌ Scrape failed: {:#}", e);
            Err(e)
        }
    }
}
