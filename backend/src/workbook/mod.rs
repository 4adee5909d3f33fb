//! Spreadsheet workbook boundary.
//!
//! The grouping pipeline never talks to a spreadsheet library directly; it is
//! handed a [`WorkbookBackend`]. [`XlsxBackend`] is the production backend:
//! calamine reads `.xlsx` / `.xls` / `.ods` bytes, rust_xlsxwriter writes the
//! report.

use std::io::Cursor;

use calamine::{open_workbook_auto_from_rs, Data, Reader};
use rust_xlsxwriter::Workbook;

use crate::error::{WorkbookError, WorkbookResult};
use crate::models::{Grid, OutputRecord, Row, OUTPUT_RECORD_KEYS};

/// Default name of the report worksheet.
pub const DEFAULT_SHEET_NAME: &str = "处理结果";

/// Read and write capability for spreadsheet workbooks.
pub trait WorkbookBackend {
    /// Read the first sheet as a row-major grid of strings, header in row 0.
    fn read_workbook(&self, bytes: &[u8]) -> WorkbookResult<Grid>;

    /// Write records under a header row of [`OUTPUT_RECORD_KEYS`].
    fn write_workbook(&self, records: &[OutputRecord], sheet_name: &str) -> WorkbookResult<Vec<u8>>;
}

/// calamine / rust_xlsxwriter backend.
#[derive(Debug, Clone, Copy, Default)]
pub struct XlsxBackend;

impl WorkbookBackend for XlsxBackend {
    fn read_workbook(&self, bytes: &[u8]) -> WorkbookResult<Grid> {
        let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes.to_vec()))
            .map_err(|e| WorkbookError::Open(e.to_string()))?;

        let sheet_name = workbook
            .sheet_names()
            .first()
            .cloned()
            .ok_or(WorkbookError::NoSheets)?;

        let range = workbook
            .worksheet_range(&sheet_name)
            .map_err(|e| WorkbookError::Sheet {
                sheet: sheet_name.clone(),
                message: e.to_string(),
            })?;

        // Keep column indices absolute when the used range starts after A1.
        let (start_row, start_col) = range.start().unwrap_or((0, 0));
        let mut grid: Grid = vec![Row::new(); start_row as usize];

        for data_row in range.rows() {
            let mut row: Row = vec![String::new(); start_col as usize];
            row.extend(data_row.iter().map(cell_text));
            grid.push(row);
        }

        Ok(grid)
    }

    fn write_workbook(&self, records: &[OutputRecord], sheet_name: &str) -> WorkbookResult<Vec<u8>> {
        let mut workbook = Workbook::new();
        let worksheet = workbook.add_worksheet();
        worksheet
            .set_name(sheet_name)
            .map_err(|e| WorkbookError::Write(e.to_string()))?;

        for (col, key) in OUTPUT_RECORD_KEYS.iter().enumerate() {
            worksheet
                .write_string(0, col as u16, *key)
                .map_err(|e| WorkbookError::Write(e.to_string()))?;
        }

        for (i, record) in records.iter().enumerate() {
            if record.is_blank() {
                continue;
            }
            let row = (i + 1) as u32;
            // The count column is written as a number below.
            for (col, text) in record.to_row().iter().take(3).enumerate() {
                if !text.is_empty() {
                    worksheet
                        .write_string(row, col as u16, text.as_str())
                        .map_err(|e| WorkbookError::Write(e.to_string()))?;
                }
            }
            if let Some(count) = record.occurrence_count {
                worksheet
                    .write_number(row, 3, count as f64)
                    .map_err(|e| WorkbookError::Write(e.to_string()))?;
            }
        }

        workbook
            .save_to_buffer()
            .map_err(|e| WorkbookError::Write(e.to_string()))
    }
}

/// Render a cell the way a user sees it: integral floats lose the `.0`.
fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.clone(),
        Data::Float(f) if f.fract() == 0.0 && f.abs() < 1e15 => format!("{}", *f as i64),
        Data::Float(f) => f.to_string(),
        Data::Int(i) => i.to_string(),
        Data::Bool(b) => b.to_string().to_uppercase(),
        other => other.to_string(),
    }
}
