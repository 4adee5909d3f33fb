//! Grid to delimited text.
//!
//! Quoting is minimal: a cell is wrapped in `"` (with inner quotes doubled)
//! only when it contains the delimiter, a quote or a line feed. Rows are
//! joined with `\n` and no trailing newline is written.

use crate::models::Grid;

/// The byte-order mark spreadsheet applications use to detect UTF-8.
pub const BOM: char = '\u{FEFF}';

/// Output options for [`serialize_grid`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SerializeOptions {
    pub delimiter: char,
    /// Prefix the output with a UTF-8 byte-order mark.
    pub include_bom: bool,
}

impl Default for SerializeOptions {
    fn default() -> Self {
        Self {
            delimiter: ',',
            include_bom: false,
        }
    }
}

impl SerializeOptions {
    /// Comma separated with a BOM, the shape Excel opens without mojibake.
    pub fn spreadsheet() -> Self {
        Self {
            delimiter: ',',
            include_bom: true,
        }
    }

    pub fn with_bom(mut self, include_bom: bool) -> Self {
        self.include_bom = include_bom;
        self
    }
}

/// Serialize a grid to text.
///
/// # Example
/// ```
/// use parceldesk::{serialize_grid, SerializeOptions};
///
/// let grid = vec![vec!["a".to_string(), "b,c".to_string()]];
/// assert_eq!(serialize_grid(&grid, &SerializeOptions::default()), "a,\"b,c\"");
/// ```
pub fn serialize_grid(grid: &Grid, options: &SerializeOptions) -> String {
    let mut out = String::new();
    if options.include_bom {
        out.push(BOM);
    }

    let mut delimiter_buf = [0u8; 4];
    let delimiter: &str = options.delimiter.encode_utf8(&mut delimiter_buf);

    let body = grid
        .iter()
        .map(|row| {
            row.iter()
                .map(|cell| escape_cell(cell, options.delimiter))
                .collect::<Vec<_>>()
                .join(delimiter)
        })
        .collect::<Vec<_>>()
        .join("\n");

    out.push_str(&body);
    out
}

/// Serialize a grid to UTF-8 bytes (BOM bytes `EF BB BF` when requested).
pub fn serialize_grid_bytes(grid: &Grid, options: &SerializeOptions) -> Vec<u8> {
    serialize_grid(grid, options).into_bytes()
}

fn escape_cell(cell: &str, delimiter: char) -> String {
    if cell.contains(delimiter) || cell.contains('"') || cell.contains('\n') {
        format!("\"{}\"", cell.replace('"', "\"\""))
    } else {
        cell.to_string()
    }
}
