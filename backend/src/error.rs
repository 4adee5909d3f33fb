//! Error types for parceldesk.
//!
//! - [`CsvError`] - text decoding and delimited-text parsing errors
//! - [`RewriteError`] - shipment rewrite rule failures
//! - [`WorkbookError`] - spreadsheet read/write failures
//! - [`StoreError`] - key-value persistence failures
//! - [`InputError`] - incomplete or invalid form input for the ledgers
//! - [`ConfigError`] - environment configuration errors
//! - [`PipelineError`] - batch driver errors
//! - [`ServerError`] - HTTP surface errors
//!
//! Conversions are provided with `From` so `?` crosses module boundaries.

use thiserror::Error;

// =============================================================================
// CSV / Text Errors
// =============================================================================

/// Errors while turning uploaded bytes into text or a grid.
#[derive(Debug, Error)]
pub enum CsvError {
    /// Failed to read file.
    #[error("Failed to read file: {0}")]
    IoError(#[from] std::io::Error),

    /// Bytes could not be decoded with the detected encoding.
    #[error("Failed to decode text: {0}")]
    EncodingError(String),

    /// Malformed input in the RFC 4180 reader.
    #[error("Invalid CSV format: {0}")]
    ParseError(String),
}

// =============================================================================
// Rewrite Errors
// =============================================================================

/// Failures of a shipment rewrite rule. Either variant aborts the rule
/// before any output is produced.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RewriteError {
    /// Fewer than two rows were supplied.
    #[error("Insufficient data: at least a header row and one data row are required")]
    InsufficientData,

    /// Column A and column B disagree on a data row (`row` is 1-based).
    #[error("Row {row}: column A ({column_a}) does not match column B ({column_b})")]
    ValidationMismatch {
        row: usize,
        column_a: String,
        column_b: String,
    },
}

// =============================================================================
// Workbook Errors
// =============================================================================

/// Errors from the spreadsheet workbook backend.
#[derive(Debug, Error)]
pub enum WorkbookError {
    /// The bytes are not a readable workbook.
    #[error("Failed to open workbook: {0}")]
    Open(String),

    /// The workbook holds no worksheet.
    #[error("Workbook contains no sheets")]
    NoSheets,

    /// The first sheet could not be read.
    #[error("Failed to read sheet '{sheet}': {message}")]
    Sheet { sheet: String, message: String },

    /// Writing the output workbook failed.
    #[error("Failed to write workbook: {0}")]
    Write(String),
}

// =============================================================================
// Store Errors
// =============================================================================

/// Errors from the key-value store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// IO error.
    #[error("Store IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error while encoding a value.
    #[error("Store JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

// =============================================================================
// Input Errors
// =============================================================================

/// Blocking form-input problems (missing fields, non-numeric values).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InputError {
    /// A required field is missing or a value is out of range.
    #[error("{0}")]
    UserInput(String),

    /// No entry with the given id.
    #[error("Entry not found: {0}")]
    NotFound(u64),
}

impl InputError {
    pub fn user(message: impl Into<String>) -> Self {
        InputError::UserInput(message.into())
    }
}

// =============================================================================
// Config Errors
// =============================================================================

/// Errors while reading settings from the environment.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// A variable is set but does not parse.
    #[error("Invalid value for {key}: '{value}'")]
    Invalid { key: String, value: String },
}

// =============================================================================
// Pipeline Errors
// =============================================================================

/// Errors from the batch drivers in [`crate::transform::pipeline`].
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Text decoding or parsing error.
    #[error("CSV error: {0}")]
    Csv(#[from] CsvError),

    /// Rewrite rule error.
    #[error("{0}")]
    Rewrite(#[from] RewriteError),

    /// Workbook backend error.
    #[error("Workbook error: {0}")]
    Workbook(#[from] WorkbookError),

    /// The workbook's first sheet has no data row below the header.
    #[error("Insufficient data: the workbook has {0} row(s), at least 2 are required")]
    InsufficientData(usize),

    /// Unknown shipment tab id.
    #[error("Unknown tab: {0}")]
    UnknownTab(String),
}

// =============================================================================
// Server Errors
// =============================================================================

/// HTTP server errors.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Pipeline error.
    #[error("{0}")]
    Pipeline(#[from] PipelineError),

    /// Store error.
    #[error("{0}")]
    Store(#[from] StoreError),

    /// Form input error.
    #[error("{0}")]
    Input(#[from] InputError),

    /// Invalid request.
    #[error("Invalid request: {0}")]
    BadRequest(String),
}

// =============================================================================
// Result Type Aliases
// =============================================================================

pub type CsvResult<T> = Result<T, CsvError>;

pub type RewriteResult<T> = Result<T, RewriteError>;

pub type WorkbookResult<T> = Result<T, WorkbookError>;

pub type StoreResult<T> = Result<T, StoreError>;

pub type InputResult<T> = Result<T, InputError>;

pub type ConfigResult<T> = Result<T, ConfigError>;

pub type PipelineResult<T> = Result<T, PipelineError>;

pub type ServerResult<T> = Result<T, ServerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_conversion_chain() {
        let rewrite_err = RewriteError::InsufficientData;
        let pipeline_err: PipelineError = rewrite_err.into();
        assert!(pipeline_err.to_string().contains("Insufficient"));

        let server_err: ServerError = pipeline_err.into();
        assert!(server_err.to_string().contains("Insufficient"));
    }

    #[test]
    fn test_validation_mismatch_format() {
        let err = RewriteError::ValidationMismatch {
            row: 3,
            column_a: "5".into(),
            column_b: "7".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("Row 3"));
        assert!(msg.contains("(5)"));
        assert!(msg.contains("(7)"));
    }

    #[test]
    fn test_user_input_message_passthrough() {
        let err: ServerError = InputError::user("count must be positive").into();
        assert_eq!(err.to_string(), "count must be positive");
    }
}
