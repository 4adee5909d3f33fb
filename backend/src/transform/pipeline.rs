//! High-level batch drivers.
//!
//! - [`rewrite_shipment_csv`]: uploaded CSV bytes → decoded text → grid →
//!   rewrite rule of the chosen tab → CSV with BOM, named for download.
//! - [`AddressGrouping`]: workbook bytes → grid → grouped report → workbook.
//!
//! # Example
//!
//! ```rust,ignore
//! use parceldesk::{rewrite_shipment_csv, ExportOptions, ShipmentTab};
//!
//! let bytes = std::fs::read("yamato.csv")?;
//! let export = rewrite_shipment_csv(&bytes, ShipmentTab::OsakaScheduled, &ExportOptions::default())?;
//! std::fs::write(&export.file.file_name, &export.file.bytes)?;
//! ```

use chrono::{Local, NaiveDate, Utc};
use serde::Serialize;

use super::grouper::{group_addresses, summarize, GroupingColumns, GroupingSummary};
use crate::api::logs::{log_error, log_info, log_success};
use crate::error::{PipelineError, PipelineResult};
use crate::models::{Grid, OutputRecord, ShipmentTab};
use crate::parser::{decode_text, parse_grid};
use crate::serializer::{serialize_grid_bytes, SerializeOptions};
use crate::workbook::{WorkbookBackend, DEFAULT_SHEET_NAME};

pub const CSV_CONTENT_TYPE: &str = "text/csv;charset=utf-8";

pub const XLSX_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

/// Options for CSV exports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportOptions {
    /// Prefix the CSV with a UTF-8 BOM so Excel detects the encoding.
    pub include_bom: bool,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self { include_bom: true }
    }
}

/// A named artifact ready to be saved or sent as an attachment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportFile {
    pub file_name: String,
    pub content_type: &'static str,
    pub bytes: Vec<u8>,
}

/// Result of [`rewrite_shipment_csv`].
#[derive(Debug, Clone)]
pub struct ShipmentExport {
    pub tab: ShipmentTab,
    pub rows_in: usize,
    pub rows_out: usize,
    pub file: ExportFile,
}

/// `processed_<tabId>_<epochMillis>.csv`
pub fn shipment_file_name(tab: ShipmentTab, epoch_millis: i64) -> String {
    format!("processed_{}_{}.csv", tab.id(), epoch_millis)
}

/// `处理结果_<YYYY-MM-DD>.xlsx`
pub fn grouping_file_name(date: NaiveDate) -> String {
    format!("{}_{}.xlsx", DEFAULT_SHEET_NAME, date.format("%Y-%m-%d"))
}

/// Rewrite an uploaded courier CSV with the rule of `tab`.
pub fn rewrite_shipment_csv(
    bytes: &[u8],
    tab: ShipmentTab,
    options: &ExportOptions,
) -> PipelineResult<ShipmentExport> {
    log_info(format!("📄 {}: reading {} bytes", tab.label(), bytes.len()));
    let text = decode_text(bytes)?;
    let grid = parse_grid(&text, ',');
    log_info(format!(
        "Loaded {} rows × {} columns",
        grid.len(),
        grid.first().map(Vec::len).unwrap_or(0)
    ));

    let (processed, file) = rewrite_shipment_grid(&grid, tab, options, Utc::now().timestamp_millis())?;

    log_success(format!("Exported {} rows as {}", processed.len(), file.file_name));
    Ok(ShipmentExport {
        tab,
        rows_in: grid.len(),
        rows_out: processed.len(),
        file,
    })
}

/// Rewrite an already parsed grid and serialize it.
pub fn rewrite_shipment_grid(
    grid: &Grid,
    tab: ShipmentTab,
    options: &ExportOptions,
    epoch_millis: i64,
) -> PipelineResult<(Grid, ExportFile)> {
    let rule = tab.rule();
    let processed = rule.apply(grid).map_err(|e| {
        log_error(e.to_string());
        PipelineError::from(e)
    })?;

    let serialize_options = SerializeOptions::spreadsheet().with_bom(options.include_bom);
    let file = ExportFile {
        file_name: shipment_file_name(tab, epoch_millis),
        content_type: CSV_CONTENT_TYPE,
        bytes: serialize_grid_bytes(&processed, &serialize_options),
    };
    Ok((processed, file))
}

/// Result of an [`AddressGrouping`] run.
#[derive(Debug, Clone)]
pub struct GroupingReport {
    pub records: Vec<OutputRecord>,
    pub summary: GroupingSummary,
    pub file: ExportFile,
}

/// Address grouping over an injected workbook backend.
pub struct AddressGrouping<B: WorkbookBackend> {
    backend: B,
    columns: GroupingColumns,
}

impl<B: WorkbookBackend> AddressGrouping<B> {
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            columns: GroupingColumns::default(),
        }
    }

    pub fn with_columns(mut self, columns: GroupingColumns) -> Self {
        self.columns = columns;
        self
    }

    /// Group the first sheet of `bytes` and write the report workbook.
    pub fn run(&self, bytes: &[u8]) -> PipelineResult<GroupingReport> {
        log_info(format!("📊 Reading workbook ({} bytes)", bytes.len()));
        let grid = self.backend.read_workbook(bytes)?;
        self.run_grid(&grid, Local::now().date_naive())
    }

    /// Group an already loaded grid; `date` names the output file.
    pub fn run_grid(&self, grid: &Grid, date: NaiveDate) -> PipelineResult<GroupingReport> {
        if grid.len() < 2 {
            log_error(format!("Workbook has only {} row(s)", grid.len()));
            return Err(PipelineError::InsufficientData(grid.len()));
        }
        log_success(format!("Read {} data rows", grid.len() - 1));

        let records = group_addresses(grid, self.columns);
        let summary = summarize(&records);
        log_success(format!(
            "{} institutions, {} addresses, {} report lines",
            summary.institutions, summary.primary_addresses, summary.records
        ));

        let bytes = self.backend.write_workbook(&records, DEFAULT_SHEET_NAME)?;
        Ok(GroupingReport {
            records,
            summary,
            file: ExportFile {
                file_name: grouping_file_name(date),
                content_type: XLSX_CONTENT_TYPE,
                bytes,
            },
        })
    }
}
