//! Domain models shared by the transformation core.
//!
//! - [`Grid`] / [`Row`] / [`Cell`] - parsed delimited tables
//! - [`OutputRecord`] - one flattened line of the address grouping report
//! - [`Destination`] - billing destination and its code
//! - [`LayoutKind`] - scheduled vs confirmed courier layout
//! - [`RewriteRule`] - a layout paired with a destination
//! - [`ShipmentTab`] - the four processing presets offered to users

use serde::{Deserialize, Serialize};

// =============================================================================
// Tabular data
// =============================================================================

/// A single table entry. Numeric meaning is applied only where a rule needs it.
pub type Cell = String;

/// Cells addressed by column position (0 = "A", 17 = "R").
pub type Row = Vec<Cell>;

/// Rows in input order; row 0 is a header for most consumers.
pub type Grid = Vec<Row>;

/// Cell lookup that treats missing columns as blank.
pub fn cell(row: &[Cell], index: usize) -> &str {
    row.get(index).map(String::as_str).unwrap_or("")
}

// =============================================================================
// Grouping output
// =============================================================================

/// One line of the grouping report.
///
/// Blank fields continue the line above: a blank `institution` belongs to
/// the previous institution block, a blank `primary_address` to the previous
/// city.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutputRecord {
    pub institution: String,
    pub primary_address: String,
    pub secondary_address: String,
    pub occurrence_count: Option<usize>,
}

impl OutputRecord {
    pub fn institution_header(institution: impl Into<String>) -> Self {
        Self {
            institution: institution.into(),
            ..Self::default()
        }
    }

    pub fn separator() -> Self {
        Self::default()
    }

    pub fn is_blank(&self) -> bool {
        self.institution.is_empty()
            && self.primary_address.is_empty()
            && self.secondary_address.is_empty()
            && self.occurrence_count.is_none()
    }

    /// Cells in report column order; a missing count renders as "".
    pub fn to_row(&self) -> Row {
        vec![
            self.institution.clone(),
            self.primary_address.clone(),
            self.secondary_address.clone(),
            self.occurrence_count.map(|c| c.to_string()).unwrap_or_default(),
        ]
    }
}

/// Report header keys, in column order.
pub const OUTPUT_RECORD_KEYS: [&str; 4] = [
    "institution",
    "primaryAddress",
    "secondaryAddress",
    "occurrenceCount",
];

// =============================================================================
// Rewrite rules
// =============================================================================

/// Billing destination for courier charges.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Destination {
    /// Primary city.
    Tokyo,
    /// Secondary city.
    Osaka,
}

impl Destination {
    /// Freight billing code written into the rewritten rows.
    pub fn code(self) -> &'static str {
        match self {
            Destination::Tokyo => "072463680198",
            Destination::Osaka => "072463680100",
        }
    }

    pub fn slug(self) -> &'static str {
        match self {
            Destination::Tokyo => "tokyo",
            Destination::Osaka => "osaka",
        }
    }

    fn label(self) -> &'static str {
        match self {
            Destination::Tokyo => "東京",
            Destination::Osaka => "大阪",
        }
    }
}

/// Courier record layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LayoutKind {
    /// 予定 (yotei) data, rewritten in place.
    Scheduled,
    /// 確定 (kakutei) data, rebuilt with an inserted blank row.
    Confirmed,
}

impl LayoutKind {
    pub fn slug(self) -> &'static str {
        match self {
            LayoutKind::Scheduled => "yotei",
            LayoutKind::Confirmed => "kakutei",
        }
    }

    fn label(self) -> &'static str {
        match self {
            LayoutKind::Scheduled => "予定データ",
            LayoutKind::Confirmed => "確定データ",
        }
    }
}

/// A layout paired with the destination code it writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RewriteRule {
    pub layout: LayoutKind,
    pub destination: Destination,
}

impl RewriteRule {
    pub fn new(layout: LayoutKind, destination: Destination) -> Self {
        Self { layout, destination }
    }

    pub fn code(&self) -> &'static str {
        self.destination.code()
    }
}

// =============================================================================
// Shipment tabs
// =============================================================================

/// The processing presets, in display order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ShipmentTab {
    TokyoScheduled,
    TokyoConfirmed,
    OsakaScheduled,
    OsakaConfirmed,
}

impl ShipmentTab {
    pub const ALL: [ShipmentTab; 4] = [
        ShipmentTab::TokyoScheduled,
        ShipmentTab::TokyoConfirmed,
        ShipmentTab::OsakaScheduled,
        ShipmentTab::OsakaConfirmed,
    ];

    pub fn rule(self) -> RewriteRule {
        match self {
            ShipmentTab::TokyoScheduled => RewriteRule::new(LayoutKind::Scheduled, Destination::Tokyo),
            ShipmentTab::TokyoConfirmed => RewriteRule::new(LayoutKind::Confirmed, Destination::Tokyo),
            ShipmentTab::OsakaScheduled => RewriteRule::new(LayoutKind::Scheduled, Destination::Osaka),
            ShipmentTab::OsakaConfirmed => RewriteRule::new(LayoutKind::Confirmed, Destination::Osaka),
        }
    }

    /// Stable id used in export file names and URLs, e.g. `tokyo-yotei`.
    pub fn id(self) -> String {
        let rule = self.rule();
        format!("{}-{}", rule.destination.slug(), rule.layout.slug())
    }

    /// Display label, e.g. `東京予定データ`.
    pub fn label(self) -> String {
        let rule = self.rule();
        format!("{}{}", rule.destination.label(), rule.layout.label())
    }

    pub fn from_id(id: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|tab| tab.id() == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_destination_codes() {
        assert_eq!(Destination::Tokyo.code(), "072463680198");
        assert_eq!(Destination::Osaka.code(), "072463680100");
    }

    #[test]
    fn test_tab_ids_round_trip() {
        let ids: Vec<String> = ShipmentTab::ALL.iter().map(|t| t.id()).collect();
        assert_eq!(ids, vec!["tokyo-yotei", "tokyo-kakutei", "osaka-yotei", "osaka-kakutei"]);
        for tab in ShipmentTab::ALL {
            assert_eq!(ShipmentTab::from_id(&tab.id()), Some(tab));
        }
        assert_eq!(ShipmentTab::from_id("nagoya-yotei"), None);
    }

    #[test]
    fn test_tab_labels() {
        assert_eq!(ShipmentTab::TokyoScheduled.label(), "東京予定データ");
        assert_eq!(ShipmentTab::OsakaConfirmed.label(), "大阪確定データ");
    }

    #[test]
    fn test_output_record_json_keys() {
        let record = OutputRecord {
            institution: "A".into(),
            primary_address: "City".into(),
            secondary_address: "Ward".into(),
            occurrence_count: Some(2),
        };
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["institution"], "A");
        assert_eq!(json["primaryAddress"], "City");
        assert_eq!(json["secondaryAddress"], "Ward");
        assert_eq!(json["occurrenceCount"], 2);
    }

    #[test]
    fn test_cell_out_of_range_is_blank() {
        let row = vec!["a".to_string()];
        assert_eq!(cell(&row, 0), "a");
        assert_eq!(cell(&row, 5), "");
    }

    #[test]
    fn test_separator_is_blank() {
        assert!(OutputRecord::separator().is_blank());
        assert!(!OutputRecord::institution_header("X").is_blank());
        assert_eq!(OutputRecord::separator().to_row(), vec!["", "", "", ""]);
    }
}
