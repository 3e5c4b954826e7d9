//! Report sheet walker
//!
//! Scans the rows of one report sheet and decides which of them are trading
//! records. A report looks roughly like this (column 1):
//!
//! ```text
//! Форма СЭТ-БТ
//! Дата торгов: 15.03.2023          <- reporting date
//! Единица измерения: Метрическая тонна   <- data starts below
//! Код Инструмента                  <- column headers (skipped)
//! A100ANK060F  ...                 <- data rows
//! Итого:                           <- totals (skipped)
//! Маклер СПбМТСБ                   <- end of data
//! ```

use chrono::{Datelike, NaiveDate};
use tracing::{debug, warn};

use crate::error::{ScrapeError, ScrapeResult};
use crate::models::{CutoffPolicy, ReportRow, TradingResult, COL_COUNT, COL_PRODUCT_ID};
use crate::utils::parse_trading_date_header;

pub mod workbook;
pub use workbook::{SheetReader, XlsSheetReader};

/// Signature row that ends the data section
pub const SENTINEL: &str = "Маклер СПбМТСБ";

/// Marker row after which data rows start
pub const UNIT_MARKER: &str = "Единица измерения: Метрическая тонна";

/// Count placeholder for instruments that did not trade
pub const NO_TRADE: &str = "-";

/// Boilerplate and separator rows, ignored in every state
pub const SKIP_WORDS: &[&str] = &[
    "",
    "Итого:",
    "Итого по секции:",
    "Код\nИнструмента",
    "Код Инструмента",
];

/// Walker state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanState {
    SeekingHeader,
    Collecting,
    Done,
}

/// What a single row is, judged from its identifying column alone
#[derive(Debug, Clone, PartialEq)]
pub enum RowKind {
    DateHeader(NaiveDate),
    Skip,
    Sentinel,
    UnitMarker,
    Content { traded: bool },
}

/// What the walker does with a row
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowAction {
    Ignore,
    SetDate(NaiveDate),
    Record,
    SkipNoTrade,
}

/// Classify a row. Checks run in a fixed order: date header, skip words,
/// sentinel, unit marker.
pub fn classify_row(row: &ReportRow) -> RowKind {
    let key = row.text(COL_PRODUCT_ID);

    if let Some(date) = parse_trading_date_header(&key) {
        return RowKind::DateHeader(date);
    }
    if SKIP_WORDS.contains(&key.trim()) {
        return RowKind::Skip;
    }
    if key.trim() == SENTINEL {
        return RowKind::Sentinel;
    }
    if key.contains(UNIT_MARKER) {
        return RowKind::UnitMarker;
    }

    RowKind::Content {
        traded: row.text(COL_COUNT).trim() != NO_TRADE,
    }
}

/// Transition table of the walker
pub fn transition(state: ScanState, kind: &RowKind, cutoff: CutoffPolicy) -> (ScanState, RowAction) {
    use RowAction::*;
    use ScanState::*;

    match (state, kind) {
        (Done, _) => (Done, Ignore),
        (_, RowKind::DateHeader(date)) if cutoff.is_reached(*date) => (Done, SetDate(*date)),
        (state, RowKind::DateHeader(date)) => (state, SetDate(*date)),
        (state, RowKind::Skip) => (state, Ignore),
        (_, RowKind::Sentinel) => (Done, Ignore),
        (_, RowKind::UnitMarker) => (Collecting, Ignore),
        (SeekingHeader, RowKind::Content { .. }) => (SeekingHeader, Ignore),
        (Collecting, RowKind::Content { traded: true }) => (Collecting, Record),
        (Collecting, RowKind::Content { traded: false }) => (Collecting, SkipNoTrade),
    }
}

/// Result of scanning one report
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReportScan {
    pub reporting_date: Option<NaiveDate>,
    pub records: Vec<TradingResult>,
    pub skipped_rows: usize,
    pub reached_cutoff: bool,
}

impl ReportScan {
    pub fn year(&self) -> Option<i32> {
        self.reporting_date.map(|date| date.year())
    }
}

/// Incremental walker over the rows of one report
#[derive(Debug)]
pub struct ReportWalker {
    cutoff: CutoffPolicy,
    state: ScanState,
    scan: ReportScan,
}

impl ReportWalker {
    pub fn new(cutoff: CutoffPolicy) -> Self {
        Self {
            cutoff,
            state: ScanState::SeekingHeader,
            scan: ReportScan::default(),
        }
    }

    pub fn state(&self) -> ScanState {
        self.state
    }

    /// Feed the next row and return the state after it
    pub fn feed(&mut self, row: &ReportRow) -> ScrapeResult<ScanState> {
        let kind = classify_row(row);
        let (next, action) = transition(self.state, &kind, self.cutoff);

        match action {
            RowAction::Ignore => {}
            RowAction::SetDate(date) => {
                if self.state == ScanState::Collecting && self.scan.reporting_date != Some(date) {
                    warn!(
                        "Row {}: trading date changes from {:?} to {} inside the data section",
                        row.index, self.scan.reporting_date, date
                    );
                }
                self.scan.reporting_date = Some(date);
                if self.cutoff.is_reached(date) {
                    debug!("Row {}: trading date {} reaches the cutoff year {}", row.index, date, self.cutoff.year);
                    self.scan.reached_cutoff = true;
                }
            }
            RowAction::Record => {
                let date = self
                    .scan
                    .reporting_date
                    .ok_or(ScrapeError::RowBeforeHeader { row: row.index })?;
                self.scan.records.push(TradingResult::from_report_row(row, date)?);
            }
            RowAction::SkipNoTrade => {
                debug!("Row {}: no trades for {}", row.index, row.text(COL_PRODUCT_ID));
                self.scan.skipped_rows += 1;
            }
        }

        self.state = next;
        Ok(next)
    }

    pub fn finish(self) -> ReportScan {
        self.scan
    }
}

/// Walk the rows of one sheet until the data section ends
pub fn scan_rows(rows: &[ReportRow], cutoff: CutoffPolicy) -> ScrapeResult<ReportScan> {
    let mut walker = ReportWalker::new(cutoff);

    for row in rows {
        if walker.feed(row)? == ScanState::Done {
            break;
        }
    }

    Ok(walker.finish())
}
