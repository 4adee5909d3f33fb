//! # Parceldesk - courier shipment and office ledger tooling
//!
//! Parceldesk rewrites courier shipment CSV exports with the billing code of
//! a destination, groups address workbooks into an institution report, and
//! keeps two small office ledgers (compensation cases and form stock).
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐     ┌─────────────┐     ┌─────────────┐
//! │  CSV / XLSX │────▶│   Parser /  │────▶│  Transform  │────▶│  CSV / XLSX │
//! │ (SJIS/UTF8) │     │  Workbook   │     │ (rewrite,   │     │  download   │
//! └─────────────┘     └─────────────┘     │  grouping)  │     └─────────────┘
//!                                         └─────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use parceldesk::{rewrite_shipment_csv, ExportOptions, ShipmentTab};
//!
//! let bytes = std::fs::read("yamato.csv")?;
//! let export = rewrite_shipment_csv(&bytes, ShipmentTab::TokyoScheduled, &ExportOptions::default())?;
//! println!("{} rows → {}", export.rows_out, export.file.file_name);
//! ```
//!
//! ## Modules
//!
//! - [`error`] - Hierarchical error types
//! - [`models`] - Grids, report records, rewrite rules and tabs
//! - [`parser`] - Text decoding and grid parsing
//! - [`serializer`] - Grid to CSV
//! - [`workbook`] - Spreadsheet read/write backend
//! - [`transform`] - Rewrite, grouping, and pipeline
//! - [`ledger`] - Compensation ledger
//! - [`stock`] - Stock ledger
//! - [`store`] - Key-value persistence
//! - [`config`] - Environment settings
//! - [`api`] - HTTP API server

// Core modules
pub mod error;
pub mod models;

// Tabular I/O
pub mod parser;
pub mod serializer;
pub mod workbook;

// Transformation
pub mod transform;

// Office ledgers
pub mod ledger;
pub mod stock;
pub mod store;

// Settings
pub mod config;

// HTTP API
pub mod api;

// =============================================================================
// Re-exports - Error types
// =============================================================================

pub use error::{
    ConfigError,
    CsvError,
    InputError,
    PipelineError,
    RewriteError,
    ServerError,
    StoreError,
    WorkbookError,
};

// =============================================================================
// Re-exports - Models
// =============================================================================

pub use models::{
    Cell,
    Row,
    Grid,
    OutputRecord,
    Destination,
    LayoutKind,
    RewriteRule,
    ShipmentTab,
};

// =============================================================================
// Re-exports - Parsing / Serialization
// =============================================================================

pub use parser::{
    parse_grid,
    parse_grid_with,
    detect_encoding,
    detect_delimiter,
    decode_content,
    decode_text,
    QuoteMode,
};

pub use serializer::{serialize_grid, serialize_grid_bytes, SerializeOptions};

// =============================================================================
// Re-exports - Workbook
// =============================================================================

pub use workbook::{WorkbookBackend, XlsxBackend};

// =============================================================================
// Re-exports - Transform
// =============================================================================

pub use transform::grouper::{group_addresses, GroupingColumns, GroupingSummary};

pub use transform::pipeline::{
    rewrite_shipment_csv,
    rewrite_shipment_grid,
    AddressGrouping,
    ExportFile,
    ExportOptions,
    GroupingReport,
    ShipmentExport,
};

// =============================================================================
// Re-exports - Ledgers
// =============================================================================

pub use ledger::{CompensationEntry, EntryField, PaymentMethod};
pub use stock::{DeliveryForm, DeliveryRecord, MonthlyRow, StockState};
pub use store::{FileStore, KeyValueStore, MemoryStore};

pub use config::Settings;

// Server
pub mod server {
    pub use crate::api::server::start_server;
}
