use thiserror::Error;

/// Errors raised while fetching, parsing or storing trading reports
#[derive(Debug, Error)]
pub enum ScrapeError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("unexpected status {status} for {url}")]
    Status { url: String, status: u16 },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to read workbook: {0}")]
    Workbook(#[from] calamine::Error),

    #[error("workbook {0} has no sheets")]
    MissingSheet(String),

    #[error("invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("row {row}, column {column}: cannot read {value:?} as a number")]
    InvalidCell {
        row: usize,
        column: usize,
        value: String,
    },

    #[error("row {row}: product id {product_id:?} is too short")]
    InvalidProductId { row: usize, product_id: String },

    #[error("row {row}: data row appears before any trading date header")]
    RowBeforeHeader { row: usize },

    #[error("giving up on {url} after {attempts} attempts")]
    RetriesExhausted { url: String, attempts: u32 },

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

pub type ScrapeResult<T> = std::result::Result<T, ScrapeError>;
