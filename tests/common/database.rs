//! Test database utilities

use anyhow::Result;
use spimex_scraper::database_sqlx::DatabaseManagerSqlx;
use tempfile::TempDir;

/// Fresh database in its own temporary directory; removed on drop
pub struct TestDatabase {
    pub db: DatabaseManagerSqlx,
    pub path: String,
    _dir: TempDir,
}

/// Initialize a completely fresh test database (creates new file each time)
pub async fn init_fresh_test_database() -> Result<TestDatabase> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("spimex_test.db").to_string_lossy().to_string();
    let db = DatabaseManagerSqlx::new(&path).await?;

    Ok(TestDatabase { db, path, _dir: dir })
}
