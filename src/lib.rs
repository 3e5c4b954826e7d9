pub mod api;
pub mod data_collector;
pub mod database_sqlx;
pub mod error;
pub mod models;
pub mod parser;
pub mod utils;

pub use error::{ScrapeError, ScrapeResult};
