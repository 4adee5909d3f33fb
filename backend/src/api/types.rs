//! REST API types for the office front-end.
//!
//! Ledger and stock state are returned as stored; only totals and tab
//! metadata are derived here.

use axum::http::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::error::{InputError, PipelineError, ServerError};
use crate::ledger::{format_yen, ledger_total, CompensationEntry};
use crate::models::ShipmentTab;
use crate::stock::{monthly_stats, MonthlyRow, StockState};
use crate::transform::grouper::GroupingSummary;

/// One shipment processing preset.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TabInfo {
    pub id: String,
    pub label: String,
    /// `yotei` or `kakutei`
    pub layout: String,
    pub destination_code: String,
}

impl From<ShipmentTab> for TabInfo {
    fn from(tab: ShipmentTab) -> Self {
        let rule = tab.rule();
        TabInfo {
            id: tab.id(),
            label: tab.label(),
            layout: rule.layout.slug().to_string(),
            destination_code: rule.code().to_string(),
        }
    }
}

pub fn tab_list() -> Vec<TabInfo> {
    ShipmentTab::ALL.into_iter().map(TabInfo::from).collect()
}

/// Compensation ledger with its grand total.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerResponse {
    pub entries: Vec<CompensationEntry>,
    pub total: u64,
    /// `¥1,234`
    pub total_formatted: String,
}

impl From<Vec<CompensationEntry>> for LedgerResponse {
    fn from(entries: Vec<CompensationEntry>) -> Self {
        let total = ledger_total(&entries);
        LedgerResponse {
            entries,
            total,
            total_formatted: format_yen(Some(total)),
        }
    }
}

/// `PATCH /api/ledger/entries/{id}` body.
#[derive(Debug, Clone, Deserialize)]
pub struct EntryUpdate {
    pub field: String,
    #[serde(default)]
    pub value: String,
}

/// Body of the stock add/reset endpoints.
#[derive(Debug, Clone, Deserialize)]
pub struct AmountRequest {
    #[serde(default)]
    pub value: String,
}

/// Stock state plus its monthly breakdown.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StockResponse {
    #[serde(flatten)]
    pub state: StockState,
    pub monthly: Vec<MonthlyRow>,
}

impl From<StockState> for StockResponse {
    fn from(state: StockState) -> Self {
        let monthly = monthly_stats(&state);
        StockResponse { state, monthly }
    }
}

/// Metadata sent in the `X-Grouping-Summary` header of grouping downloads.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupingHeader {
    pub job_id: String,
    #[serde(flatten)]
    pub summary: GroupingSummary,
}

impl GroupingHeader {
    pub fn new(summary: GroupingSummary) -> Self {
        GroupingHeader {
            job_id: Uuid::new_v4().to_string(),
            summary,
        }
    }
}

/// Create an error response
pub fn error_response(error: &str) -> Value {
    json!({
        "jobId": Uuid::new_v4().to_string(),
        "status": "error",
        "error": error,
    })
}

/// HTTP status for a server error.
pub fn status_for(error: &ServerError) -> StatusCode {
    match error {
        ServerError::BadRequest(_) => StatusCode::BAD_REQUEST,
        ServerError::Input(InputError::NotFound(_)) => StatusCode::NOT_FOUND,
        ServerError::Input(InputError::UserInput(_)) => StatusCode::UNPROCESSABLE_ENTITY,
        ServerError::Pipeline(PipelineError::UnknownTab(_)) => StatusCode::NOT_FOUND,
        ServerError::Pipeline(PipelineError::Rewrite(_))
        | ServerError::Pipeline(PipelineError::InsufficientData(_))
        | ServerError::Pipeline(PipelineError::Csv(_)) => StatusCode::BAD_REQUEST,
        ServerError::Pipeline(PipelineError::Workbook(_)) | ServerError::Store(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{RewriteError, StoreError, WorkbookError};
    use crate::ledger::{add_entry, update_entry, EntryField};

    #[test]
    fn test_tab_list() {
        let tabs = tab_list();
        assert_eq!(tabs.len(), 4);
        assert_eq!(tabs[0].id, "tokyo-yotei");
        assert_eq!(tabs[0].label, "東京予定データ");
        assert_eq!(tabs[3].layout, "kakutei");
        assert_eq!(tabs[3].destination_code, "072463680100");

        let json = serde_json::to_value(&tabs[1]).unwrap();
        assert_eq!(json["destinationCode"], "072463680198");
    }

    #[test]
    fn test_ledger_response_total() {
        let entries = add_entry(&[], 1);
        let entries = update_entry(&entries, 1, EntryField::ItemPrice, "2500").unwrap();
        let response = LedgerResponse::from(entries);
        assert_eq!(response.total, 2500);
        assert_eq!(response.total_formatted, "¥2,500");
    }

    #[test]
    fn test_stock_response_is_flat() {
        let response = StockResponse::from(StockState {
            inventory: 12,
            ..StockState::default()
        });
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["inventory"], 12);
        assert!(json["monthly"].as_array().unwrap().is_empty());
    }

    #[test]
    fn test_error_response_shape() {
        let body = error_response("boom");
        assert_eq!(body["status"], "error");
        assert_eq!(body["error"], "boom");
        assert!(body["jobId"].is_string());
    }

    #[test]
    fn test_status_mapping() {
        let mismatch = ServerError::from(PipelineError::from(RewriteError::InsufficientData));
        assert_eq!(status_for(&mismatch), StatusCode::BAD_REQUEST);

        let input = ServerError::from(InputError::user("missing"));
        assert_eq!(status_for(&input), StatusCode::UNPROCESSABLE_ENTITY);

        assert_eq!(status_for(&ServerError::from(InputError::NotFound(1))), StatusCode::NOT_FOUND);

        let workbook = ServerError::from(PipelineError::from(WorkbookError::NoSheets));
        assert_eq!(status_for(&workbook), StatusCode::INTERNAL_SERVER_ERROR);

        let io = std::io::Error::new(std::io::ErrorKind::Other, "disk");
        assert_eq!(status_for(&ServerError::from(StoreError::from(io))), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
