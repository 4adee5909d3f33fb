//! Courier shipment row rewriting.
//!
//! Two layouts, each parameterized by a [`Destination`](crate::models::Destination):
//!
//! - **scheduled** (予定): the grid is rewritten column by column. The header
//!   marker `??` / `？？` is removed from A1, columns A and B must agree on
//!   every data row, column R receives the billing code and column M is cut
//!   to ten characters.
//! - **confirmed** (確定): the header is kept, a blank row is inserted under
//!   it and column A of every non-blank data row is replaced by the billing
//!   code.
//!
//! Rules borrow the input and return a new grid, so a failing rule leaves
//! nothing half-written.

use crate::error::{RewriteError, RewriteResult};
use crate::models::{cell, Grid, LayoutKind, RewriteRule, Row};

/// Column R: freight billing code.
pub const BILLING_CODE_COLUMN: usize = 17;

/// Column M: shipper name.
pub const SHIPPER_NAME_COLUMN: usize = 12;

/// Maximum shipper name length, in characters.
pub const SHIPPER_NAME_MAX_CHARS: usize = 10;

/// Header markers removed from A1 (full-width and half-width).
const HEADER_MARKERS: [&str; 2] = ["？？", "??"];

impl RewriteRule {
    /// Apply this rule to `grid`.
    ///
    /// Fails with [`RewriteError::InsufficientData`] for grids with fewer than
    /// two rows, before any rule-specific work.
    pub fn apply(&self, grid: &Grid) -> RewriteResult<Grid> {
        if grid.len() < 2 {
            return Err(RewriteError::InsufficientData);
        }

        match self.layout {
            LayoutKind::Scheduled => rewrite_scheduled(grid, self.code()),
            LayoutKind::Confirmed => Ok(rewrite_confirmed(grid, self.code())),
        }
    }
}

fn rewrite_scheduled(grid: &Grid, code: &str) -> RewriteResult<Grid> {
    check_matching_columns(grid)?;

    let mut processed = grid.clone();

    if let Some(a1) = processed.first_mut().and_then(|header| header.first_mut()) {
        *a1 = strip_header_markers(a1);
    }

    for row in processed.iter_mut() {
        if row.len() <= BILLING_CODE_COLUMN {
            row.resize(BILLING_CODE_COLUMN + 1, String::new());
        }
        row[BILLING_CODE_COLUMN] = code.to_string();

        let shipper = &mut row[SHIPPER_NAME_COLUMN];
        let cut = shipper.char_indices().nth(SHIPPER_NAME_MAX_CHARS).map(|(i, _)| i);
        if let Some(cut) = cut {
            shipper.truncate(cut);
        }
    }

    Ok(processed)
}

/// Columns A and B must hold the same value on data rows where both are set.
fn check_matching_columns(grid: &Grid) -> RewriteResult<()> {
    for (i, row) in grid.iter().enumerate().skip(1) {
        let (a, b) = (cell(row, 0), cell(row, 1));
        if !a.is_empty() && !b.is_empty() && a != b {
            return Err(RewriteError::ValidationMismatch {
                row: i + 1,
                column_a: a.to_string(),
                column_b: b.to_string(),
            });
        }
    }
    Ok(())
}

fn strip_header_markers(value: &str) -> String {
    HEADER_MARKERS
        .iter()
        .fold(value.to_string(), |acc, marker| acc.replace(marker, ""))
}

fn rewrite_confirmed(grid: &Grid, code: &str) -> Grid {
    let header = &grid[0];
    let mut processed = Vec::with_capacity(grid.len() + 1);

    processed.push(header.clone());
    processed.push(vec![String::new(); header.len()]);

    processed.extend(grid.iter().skip(1).map(|row| {
        let mut row: Row = row.clone();
        if let Some(first) = row.first_mut().filter(|first| !first.is_empty()) {
            *first = code.to_string();
        }
        row
    }));

    processed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Destination;

    fn row(cells: &[&str]) -> Row {
        cells.iter().map(|c| c.to_string()).collect()
    }

    fn scheduled(destination: Destination) -> RewriteRule {
        RewriteRule::new(LayoutKind::Scheduled, destination)
    }

    fn confirmed(destination: Destination) -> RewriteRule {
        RewriteRule::new(LayoutKind::Confirmed, destination)
    }

    #[test]
    fn test_scheduled_strips_header_markers() {
        let grid = vec![row(&["？？Label", "h2"]), row(&["1", "1"])];
        let out = scheduled(Destination::Tokyo).apply(&grid).unwrap();
        assert_eq!(out[0][0], "Label");

        let grid = vec![row(&["??Label??", "h2"]), row(&["1", "1"])];
        let out = scheduled(Destination::Tokyo).apply(&grid).unwrap();
        assert_eq!(out[0][0], "Label");
    }

    #[test]
    fn test_scheduled_mismatch_reports_row_and_values() {
        let grid = vec![row(&["h1", "h2"]), row(&["1", "1"]), row(&["5", "7"])];
        let err = scheduled(Destination::Osaka).apply(&grid).unwrap_err();
        assert_eq!(
            err,
            RewriteError::ValidationMismatch {
                row: 3,
                column_a: "5".into(),
                column_b: "7".into(),
            }
        );
    }

    #[test]
    fn test_scheduled_blank_column_skips_check() {
        let grid = vec![row(&["h1", "h2"]), row(&["5", ""]), row(&["", "7"]), row(&["5"])];
        assert!(scheduled(Destination::Tokyo).apply(&grid).is_ok());
    }

    #[test]
    fn test_scheduled_pads_and_sets_billing_code() {
        let grid = vec![row(&["h1", "h2", "h3", "h4", "h5"]), row(&["1", "1", "c", "d", "e"])];
        let out = scheduled(Destination::Osaka).apply(&grid).unwrap();
        for r in &out {
            assert_eq!(r.len(), 18);
            assert_eq!(r[17], "072463680100");
        }
        assert_eq!(out[1][2], "c");
        assert_eq!(out[1][5], "");
    }

    #[test]
    fn test_scheduled_overwrites_existing_column_r() {
        let mut long = vec!["x".to_string(); 20];
        long[0] = "1".into();
        long[1] = "1".into();
        let grid = vec![row(&["h"]), long];
        let out = scheduled(Destination::Tokyo).apply(&grid).unwrap();
        assert_eq!(out[1].len(), 20);
        assert_eq!(out[1][17], "072463680198");
        assert_eq!(out[1][18], "x");
    }

    #[test]
    fn test_scheduled_truncates_shipper_name() {
        let mut data = vec![String::new(); 13];
        data[12] = "ABCDEFGHIJKLMNO".into();
        let mut short = vec![String::new(); 13];
        short[12] = "山田運送".into();
        let mut wide = vec![String::new(); 13];
        wide[12] = "株式会社ヤマト運輸東京支店".into();
        let grid = vec![row(&["h"]), data, short, wide];

        let out = scheduled(Destination::Tokyo).apply(&grid).unwrap();
        assert_eq!(out[1][12], "ABCDEFGHIJ");
        assert_eq!(out[2][12], "山田運送");
        assert_eq!(out[3][12], "株式会社ヤマト運輸東");
    }

    #[test]
    fn test_confirmed_inserts_blank_row_and_replaces_code() {
        let grid = vec![
            row(&["code", "name", "qty"]),
            row(&["999", "a", "1"]),
            row(&["", "b", "2"]),
        ];
        let out = confirmed(Destination::Tokyo).apply(&grid).unwrap();

        assert_eq!(out.len(), 4);
        assert_eq!(out[0], grid[0]);
        assert_eq!(out[1], row(&["", "", ""]));
        assert_eq!(out[2], row(&["072463680198", "a", "1"]));
        assert_eq!(out[3], row(&["", "b", "2"]));
    }

    #[test]
    fn test_confirmed_keeps_header_markers() {
        let grid = vec![row(&["？？code"]), row(&["1"])];
        let out = confirmed(Destination::Osaka).apply(&grid).unwrap();
        assert_eq!(out[0][0], "？？code");
        assert_eq!(out[2][0], "072463680100");
    }

    #[test]
    fn test_insufficient_data_for_both_layouts() {
        let one_row = vec![row(&["??header", "x"])];
        for rule in [scheduled(Destination::Tokyo), confirmed(Destination::Osaka)] {
            assert_eq!(rule.apply(&one_row), Err(RewriteError::InsufficientData));
            assert_eq!(rule.apply(&Grid::new()), Err(RewriteError::InsufficientData));
        }
        assert_eq!(one_row[0][0], "??header");
    }

    #[test]
    fn test_input_untouched_on_mismatch() {
        let grid = vec![row(&["??h", "h2"]), row(&["5", "7"])];
        let before = grid.clone();
        assert!(scheduled(Destination::Tokyo).apply(&grid).is_err());
        assert_eq!(grid, before);
    }
}
