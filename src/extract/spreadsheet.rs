//! Spreadsheets: the first worksheet as tab-separated text.
//!
//! The first row is the header. Every row, header included, is rendered with
//! exactly `range.width()` fields so column alignment never shifts: empty
//! cells become [`MISSING_CELL`] instead of vanishing, and tabs or line breaks
//! inside a cell are flattened to spaces.

use super::Extractor;
use crate::document::DocumentFormat;
use crate::error::Unavailable;
use calamine::{open_workbook, Data, ExcelDateTime, Range, Reader, Xlsx, XlsxError};
use std::path::Path;
use tracing::debug;

/// Placeholder written for a cell with no value.
pub const MISSING_CELL: &str = "nan";

/// Rendering of a date or date-time cell.
pub const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

pub struct SpreadsheetExtractor;

impl Extractor for SpreadsheetExtractor {
    fn format(&self) -> DocumentFormat {
        DocumentFormat::Spreadsheet
    }

    fn extract(&self, path: &Path) -> Result<String, Unavailable> {
        let mut workbook: Xlsx<_> = open_workbook(path).map_err(|e| match e {
            XlsxError::Io(io) => Unavailable::read(path, io),
            other => Unavailable::decode(path, format!("not a readable xlsx workbook: {other}")),
        })?;

        let range = match workbook.worksheet_range_at(0) {
            Some(Ok(range)) => range,
            Some(Err(e)) => {
                return Err(Unavailable::decode(path, format!("first worksheet: {e}")));
            }
            None => {
                debug!("{} has no worksheets", path.display());
                return Ok(String::new());
            }
        };

        debug!(
            "Worksheet 0 of {}: {} rows x {} columns",
            path.display(),
            range.height(),
            range.width()
        );
        Ok(render_range(&range))
    }
}

/// Render a cell range as TSV: header row, then data rows, each `\n`-terminated.
pub fn render_range(range: &Range<Data>) -> String {
    let mut out = String::new();

    for (row_idx, row) in range.rows().enumerate() {
        let fields: Vec<String> = row
            .iter()
            .enumerate()
            .map(|(col, cell)| match cell_text(cell) {
                Some(text) => text,
                None if row_idx == 0 => format!("Unnamed: {col}"),
                None => MISSING_CELL.to_string(),
            })
            .collect();
        out.push_str(&fields.join("\t"));
        out.push('\n');
    }

    out
}

fn cell_text(cell: &Data) -> Option<String> {
    let text = match cell {
        Data::Empty => return None,
        Data::String(s) | Data::DateTimeIso(s) | Data::DurationIso(s) => s.clone(),
        Data::DateTime(dt) => excel_datetime_text(dt),
        other => other.to_string(),
    };
    if text.trim().is_empty() {
        return None;
    }
    Some(text.replace(['\t', '\r', '\n'], " "))
}

/// Serial dates as `2024-01-01 00:00:00`, durations as `H:MM:SS`.
/// Falls back to the raw serial when the value is out of range.
fn excel_datetime_text(dt: &ExcelDateTime) -> String {
    if dt.is_duration() {
        if let Some(d) = dt.as_duration() {
            let secs = d.num_seconds();
            let sign = if secs < 0 { "-" } else { "" };
            let secs = secs.abs();
            return format!("{sign}{}:{:02}:{:02}", secs / 3600, secs / 60 % 60, secs % 60);
        }
    } else if let Some(naive) = dt.as_datetime() {
        return naive.format(DATETIME_FORMAT).to_string();
    }
    dt.to_string()
}
