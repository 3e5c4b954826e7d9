use chrono::NaiveDate;
use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
    Row, Sqlite, SqlitePool, Transaction,
};
use tracing::{debug, info};

use crate::error::ScrapeResult;
use crate::models::TradingResult;

/// SQLX-based storage for trading results
#[derive(Clone)]
pub struct DatabaseManagerSqlx {
    pool: SqlitePool,
}

impl DatabaseManagerSqlx {
    /// Open (or create) the SQLite database and make sure the schema exists
    pub async fn new(database_url: &str) -> ScrapeResult<Self> {
        let filename = database_url.strip_prefix("sqlite:").unwrap_or(database_url);
        info!("💾 Connecting to database: {}", filename);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .acquire_timeout(std::time::Duration::from_secs(30))
            .connect_with(
                SqliteConnectOptions::new()
                    .filename(filename)
                    .create_if_missing(true),
            )
            .await?;

        sqlx::query("PRAGMA journal_mode = WAL").execute(&pool).await?;
        sqlx::query("PRAGMA synchronous = NORMAL").execute(&pool).await?;

        let db = Self { pool };
        db.create_schema().await?;
        Ok(db)
    }

    async fn create_schema(&self) -> ScrapeResult<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS spimex_trading_results (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                exchange_product_id TEXT NOT NULL,
                exchange_product_name TEXT NOT NULL,
                oil_id TEXT NOT NULL,
                delivery_basis_id TEXT NOT NULL,
                delivery_basis_name TEXT NOT NULL,
                delivery_type_id TEXT NOT NULL,
                volume REAL NOT NULL,
                total REAL NOT NULL,
                count INTEGER NOT NULL,
                date DATE NOT NULL,
                created_on DATETIME DEFAULT CURRENT_TIMESTAMP,
                updated_on DATETIME DEFAULT CURRENT_TIMESTAMP
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_spimex_trading_results_date ON spimex_trading_results(date)",
        )
        .execute(&self.pool)
        .await?;

        debug!("Database schema ready");
        Ok(())
    }

    async fn insert(tx: &mut Transaction<'_, Sqlite>, result: &TradingResult) -> ScrapeResult<()> {
        sqlx::query(
            r#"
            INSERT INTO spimex_trading_results (
                exchange_product_id, exchange_product_name, oil_id, delivery_basis_id,
                delivery_basis_name, delivery_type_id, volume, total, count, date
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&result.exchange_product_id)
        .bind(&result.exchange_product_name)
        .bind(&result.oil_id)
        .bind(&result.delivery_basis_id)
        .bind(&result.delivery_basis_name)
        .bind(&result.delivery_type_id)
        .bind(result.volume)
        .bind(result.total)
        .bind(result.count)
        .bind(result.date)
        .execute(&mut **tx)
        .await?;

        Ok(())
    }

    /// Insert one trading result in its own transaction
    pub async fn save_trading_result(&self, result: &TradingResult) -> ScrapeResult<()> {
        let mut tx = self.pool.begin().await?;
        Self::insert(&mut tx, result).await?;
        tx.commit().await?;
        Ok(())
    }

    /// Insert all results of one report in a single transaction.
    ///
    /// Nothing is written if any insert fails.
    pub async fn save_trading_results(&self, results: &[TradingResult]) -> ScrapeResult<usize> {
        if results.is_empty() {
            return Ok(0);
        }

        let mut tx = self.pool.begin().await?;
        for result in results {
            Self::insert(&mut tx, result).await?;
        }
        tx.commit().await?;

        debug!("Committed {} trading results", results.len());
        Ok(results.len())
    }

    /// Total number of stored trading results
    pub async fn count_trading_results(&self) -> ScrapeResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM spimex_trading_results")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    /// All trading results for one trading date, in insertion order
    pub async fn get_results_on_date(&self, date: NaiveDate) -> ScrapeResult<Vec<TradingResult>> {
        let rows = sqlx::query(
            r#"
            SELECT id, exchange_product_id, exchange_product_name, oil_id, delivery_basis_id,
                   delivery_basis_name, delivery_type_id, volume, total, count, date
            FROM spimex_trading_results
            WHERE date = ?
            ORDER BY id
            "#,
        )
        .bind(date)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|r| TradingResult {
                id: Some(r.get::<i64, _>("id")),
                exchange_product_id: r.get::<String, _>("exchange_product_id"),
                exchange_product_name: r.get::<String, _>("exchange_product_name"),
                oil_id: r.get::<String, _>("oil_id"),
                delivery_basis_id: r.get::<String, _>("delivery_basis_id"),
                delivery_basis_name: r.get::<String, _>("delivery_basis_name"),
                delivery_type_id: r.get::<String, _>("delivery_type_id"),
                volume: r.get::<f64, _>("volume"),
                total: r.get::<f64, _>("total"),
                count: r.get::<i64, _>("count"),
                date: r.get::<NaiveDate, _>("date"),
            })
            .collect())
    }

    /// Most recent trading date stored so far
    pub async fn get_latest_trading_date(&self) -> ScrapeResult<Option<NaiveDate>> {
        let date: Option<NaiveDate> =
            sqlx::query_scalar("SELECT MAX(date) FROM spimex_trading_results")
                .fetch_one(&self.pool)
                .await?;
        Ok(date)
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}
