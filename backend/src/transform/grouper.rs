//! Group spreadsheet rows by institution and primary address.
//!
//! ```text
//! Source rows (D, H, I)               →  Report
//! ┌──────────────────────────────┐       ┌─────────────────────────────┐
//! │ B-Corp │ Tokyo  │ Minato     │       │ A-Corp                      │
//! │ A-Corp │ Osaka  │ Kita       │       │        │ Osaka │ Kita  │ 2  │
//! │ A-Corp │ Osaka  │ Kita       │  →    │        │       │ Naniwa│ 1  │
//! │ A-Corp │ Osaka  │ Naniwa     │       │                             │
//! └──────────────────────────────┘       │ B-Corp                      │
//!                                        │        │ Tokyo │ Minato│ 1  │
//!                                        │                             │
//!                                        └─────────────────────────────┘
//! ```
//!
//! Institutions are emitted in ascending byte order of their names, primary
//! addresses in the order they were first seen. Secondary addresses are
//! ranked by descending count; equal counts keep first-seen order.

use std::collections::{BTreeMap, HashMap};

use serde::Serialize;

use crate::models::{cell, Grid, OutputRecord};

/// Label used for rows whose institution cell is blank.
pub const UNCLASSIFIED: &str = "未分类";

/// Zero-based source columns read by the reducer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GroupingColumns {
    pub institution: usize,
    pub primary_address: usize,
    pub secondary_address: usize,
}

impl Default for GroupingColumns {
    /// Columns D, H and I of the courier address export.
    fn default() -> Self {
        Self {
            institution: 3,
            primary_address: 7,
            secondary_address: 8,
        }
    }
}

/// Counts describing one grouping run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupingSummary {
    pub institutions: usize,
    pub primary_addresses: usize,
    pub records: usize,
}

/// Group the data rows of `grid` (row 0 is a header) into report records.
pub fn group_addresses(grid: &Grid, columns: GroupingColumns) -> Vec<OutputRecord> {
    let mut institutions: BTreeMap<String, InstitutionBuilder> = BTreeMap::new();

    for row in grid.iter().skip(1) {
        let institution = match cell(row, columns.institution) {
            "" => UNCLASSIFIED,
            name => name,
        };
        let builder = institutions.entry(institution.to_string()).or_default();

        let primary = cell(row, columns.primary_address);
        if primary.is_empty() {
            continue;
        }
        builder.observe(primary, cell(row, columns.secondary_address));
    }

    institutions
        .into_iter()
        .flat_map(|(name, builder)| builder.build(name))
        .collect()
}

/// Summarize a report produced by [`group_addresses`].
pub fn summarize(records: &[OutputRecord]) -> GroupingSummary {
    GroupingSummary {
        institutions: records.iter().filter(|r| !r.institution.is_empty()).count(),
        primary_addresses: records.iter().filter(|r| !r.primary_address.is_empty()).count(),
        records: records.len(),
    }
}

/// Primary addresses of one institution, in first-seen order.
#[derive(Default)]
struct InstitutionBuilder {
    index: HashMap<String, usize>,
    primaries: Vec<PrimaryTally>,
}

struct PrimaryTally {
    address: String,
    index: HashMap<String, usize>,
    secondaries: Vec<(String, usize)>,
}

impl InstitutionBuilder {
    fn observe(&mut self, primary: &str, secondary: &str) {
        let slot = match self.index.get(primary) {
            Some(&slot) => slot,
            None => {
                self.primaries.push(PrimaryTally {
                    address: primary.to_string(),
                    index: HashMap::new(),
                    secondaries: Vec::new(),
                });
                self.index.insert(primary.to_string(), self.primaries.len() - 1);
                self.primaries.len() - 1
            }
        };

        if !secondary.is_empty() {
            self.primaries[slot].count(secondary);
        }
    }

    fn build(self, institution: String) -> Vec<OutputRecord> {
        let mut records = vec![OutputRecord::institution_header(institution)];

        for tally in self.primaries {
            let mut ranked = tally.secondaries;
            // Stable: ties stay in first-seen order.
            ranked.sort_by(|a, b| b.1.cmp(&a.1));

            let mut ranked = ranked.into_iter();
            match ranked.next() {
                Some((secondary, count)) => {
                    records.push(OutputRecord {
                        institution: String::new(),
                        primary_address: tally.address,
                        secondary_address: secondary,
                        occurrence_count: Some(count),
                    });
                    records.extend(ranked.map(|(secondary, count)| OutputRecord {
                        secondary_address: secondary,
                        occurrence_count: Some(count),
                        ..OutputRecord::default()
                    }));
                }
                None => records.push(OutputRecord {
                    primary_address: tally.address,
                    ..OutputRecord::default()
                }),
            }
        }

        records.push(OutputRecord::separator());
        records
    }
}

impl PrimaryTally {
    fn count(&mut self, secondary: &str) {
        match self.index.get(secondary) {
            Some(&slot) => self.secondaries[slot].1 += 1,
            None => {
                self.index.insert(secondary.to_string(), self.secondaries.len());
                self.secondaries.push((secondary.to_string(), 1));
            }
        }
    }
}
