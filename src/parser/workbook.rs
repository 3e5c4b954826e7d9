use calamine::{open_workbook_auto, Data, Reader};
use std::path::Path;
use tracing::debug;

use crate::error::{ScrapeError, ScrapeResult};
use crate::models::{CellValue, ReportRow};

/// Loads the rows of the first sheet of a downloaded report
pub trait SheetReader: Send + Sync {
    fn read_first_sheet(&self, path: &Path) -> ScrapeResult<Vec<ReportRow>>;
}

/// Reads legacy `.xls` (and any other format calamine detects from the extension)
#[derive(Debug, Clone, Copy, Default)]
pub struct XlsSheetReader;

impl SheetReader for XlsSheetReader {
    fn read_first_sheet(&self, path: &Path) -> ScrapeResult<Vec<ReportRow>> {
        let mut workbook = open_workbook_auto(path)?;
        let range = workbook
            .worksheet_range_at(0)
            .ok_or_else(|| ScrapeError::MissingSheet(path.display().to_string()))??;

        // calamine trims leading empty rows/columns; keep absolute positions
        let (first_row, first_col) = range
            .start()
            .map(|(row, col)| (row as usize, col as usize))
            .unwrap_or((0, 0));

        let rows: Vec<ReportRow> = range
            .rows()
            .enumerate()
            .map(|(offset, cells)| {
                let mut values = vec![CellValue::Empty; first_col];
                values.extend(cells.iter().map(cell_value));
                ReportRow::new(first_row + offset, values)
            })
            .collect();

        debug!("Read {} rows from {}", rows.len(), path.display());
        Ok(rows)
    }
}

fn cell_value(cell: &Data) -> CellValue {
    match cell {
        Data::Empty | Data::Error(_) => CellValue::Empty,
        Data::Int(i) => CellValue::Number(*i as f64),
        Data::Float(f) => CellValue::Number(*f),
        Data::String(s) => CellValue::from(s.as_str()),
        Data::Bool(b) => CellValue::Text(b.to_string()),
        Data::DateTime(dt) => CellValue::Number(dt.as_f64()),
        Data::DateTimeIso(s) | Data::DurationIso(s) => CellValue::from(s.as_str()),
    }
}
