//! Database integration tests

use chrono::NaiveDate;
use pretty_assertions::assert_eq;

use spimex_scraper::database_sqlx::DatabaseManagerSqlx;
use spimex_scraper::models::{CellValue, ReportRow, TradingResult};

use crate::common::{init_fresh_test_database, logging};

fn record(product_id: &str, date: NaiveDate) -> TradingResult {
    let mut cells = vec![CellValue::Empty; 15];
    cells[1] = product_id.into();
    cells[2] = "Топливо дизельное ЕВРО, сорт С".into();
    cells[3] = "ст. Новоярославская".into();
    cells[4] = CellValue::Number(180.0);
    cells[5] = CellValue::Number(11_700_000.0);
    cells[14] = CellValue::Number(3.0);

    TradingResult::from_report_row(&ReportRow::new(0, cells), date).expect("valid row")
}

#[tokio::test]
async fn test_reopening_keeps_saved_rows() {
    logging::log_test_step("Saving a report batch and reopening the database");

    let test_db = init_fresh_test_database().await.expect("Failed to create test database");
    let date = NaiveDate::from_ymd_opt(2023, 3, 15).unwrap();

    let batch = vec![record("DT5ENYA065F", date), record("DT5ENYA005A", date)];
    assert_eq!(test_db.db.save_trading_results(&batch).await.unwrap(), 2);
    test_db.db.close().await;

    // schema creation must be idempotent
    let reopened = DatabaseManagerSqlx::new(&test_db.path).await.unwrap();
    let stored = reopened.get_results_on_date(date).await.unwrap();

    assert_eq!(stored.len(), 2);
    assert_eq!(stored[0].oil_id, "DT5E");
    assert_eq!(stored[0].delivery_basis_id, "NYA");
    assert_eq!(stored[1].delivery_type_id, "A");
    assert_eq!(stored[1].volume, 180.0);
    assert_eq!(stored[1].total, 11_700_000.0);
    assert_eq!(stored[1].count, 3);
    assert_eq!(stored[1].date, date);
}

#[tokio::test]
async fn test_latest_trading_date_across_reports() {
    let test_db = init_fresh_test_database().await.unwrap();

    for day in [13, 15, 14] {
        let date = NaiveDate::from_ymd_opt(2023, 3, day).unwrap();
        test_db.db.save_trading_result(&record("A100STI060F", date)).await.unwrap();
    }

    assert_eq!(test_db.db.count_trading_results().await.unwrap(), 3);
    assert_eq!(
        test_db.db.get_latest_trading_date().await.unwrap(),
        NaiveDate::from_ymd_opt(2023, 3, 15)
    );
    assert!(test_db
        .db
        .get_results_on_date(NaiveDate::from_ymd_opt(2023, 3, 16).unwrap())
        .await
        .unwrap()
        .is_empty());
}
