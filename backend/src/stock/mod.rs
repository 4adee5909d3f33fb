//! Stock ledger (在庫枚数管理).
//!
//! Tracks the number of blank forms on hand and every hand-over to a
//! delivery company. Transitions are pure: they take the current
//! [`StockState`] and return the next one, and the caller supplies
//! today's date.

use std::collections::BTreeMap;

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::error::{InputError, InputResult};

/// Companies forms are handed to, in the order the monthly table lists them.
pub const COMPANIES: [&str; 9] = [
    "SPG",
    "極光",
    "ソフトラン",
    "桃太郎（藤沢）",
    "桃太郎（相模原）",
    "MJ",
    "PS",
    "TMG",
    "CROUD",
];

/// One hand-over of forms.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryRecord {
    pub id: u64,
    /// `YYYY-MM-DD`
    pub date: String,
    pub delivery_count: u64,
    pub company: String,
    #[serde(default)]
    pub recipient: String,
    #[serde(default)]
    pub person: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StockState {
    pub inventory: u64,
    /// `YYYY/MM/DD` of the last add or reset; `None` until then.
    #[serde(default)]
    pub update_date: Option<String>,
    #[serde(default)]
    pub records: Vec<DeliveryRecord>,
}

/// Raw delivery form as typed by the user.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryForm {
    #[serde(default)]
    pub date: String,
    #[serde(default)]
    pub delivery_count: String,
    #[serde(default)]
    pub company: String,
    #[serde(default)]
    pub recipient: String,
    #[serde(default)]
    pub person: String,
}

/// Per-company totals of one month.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthlyRow {
    /// `YYYY/MM`
    pub month: String,
    pub totals: Vec<CompanyTotal>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CompanyTotal {
    pub company: String,
    pub count: u64,
}

/// `YYYY/MM/DD`, the format of [`StockState::update_date`].
pub fn format_update_date(date: NaiveDate) -> String {
    date.format("%Y/%m/%d").to_string()
}

/// Correct the inventory by a signed amount.
pub fn add_stock(state: &StockState, amount_text: &str, today: NaiveDate) -> InputResult<StockState> {
    let amount: i64 = amount_text
        .trim()
        .parse()
        .map_err(|_| InputError::user("Enter a valid number to add"))?;

    let inventory = (state.inventory as i64)
        .checked_add(amount)
        .filter(|n| *n >= 0)
        .ok_or_else(|| InputError::user("Inventory cannot go below 0"))?;

    Ok(StockState {
        inventory: inventory as u64,
        update_date: Some(format_update_date(today)),
        records: state.records.clone(),
    })
}

/// Overwrite the inventory with an absolute count.
pub fn reset_stock(state: &StockState, value_text: &str, today: NaiveDate) -> InputResult<StockState> {
    let value: i64 = value_text
        .trim()
        .parse()
        .map_err(|_| InputError::user("Enter a valid number"))?;
    if value < 0 {
        return Err(InputError::user("Value must not be negative"));
    }

    Ok(StockState {
        inventory: value as u64,
        update_date: Some(format_update_date(today)),
        records: state.records.clone(),
    })
}

/// Append a hand-over and take its count out of the inventory.
pub fn record_delivery(state: &StockState, form: &DeliveryForm, id: u64) -> InputResult<StockState> {
    let date = form.date.trim();
    let count_text = form.delivery_count.trim();
    let company = form.company.trim();
    if date.is_empty() || count_text.is_empty() || company.is_empty() {
        return Err(InputError::user(
            "Date, delivery count and company are required",
        ));
    }

    NaiveDate::parse_from_str(date, "%Y-%m-%d")
        .map_err(|_| InputError::user(format!("Invalid date: {}", date)))?;

    if !COMPANIES.contains(&company) {
        return Err(InputError::user(format!("Unknown company: {}", company)));
    }

    let count = count_text
        .parse::<i64>()
        .ok()
        .filter(|n| *n > 0)
        .ok_or_else(|| InputError::user("Enter a valid delivery count"))? as u64;

    if count > state.inventory {
        return Err(InputError::user(format!(
            "Delivery count ({}) exceeds inventory ({})",
            count, state.inventory
        )));
    }

    let mut records = state.records.clone();
    records.push(DeliveryRecord {
        id,
        date: date.to_string(),
        delivery_count: count,
        company: company.to_string(),
        recipient: form.recipient.trim().to_string(),
        person: form.person.trim().to_string(),
    });

    Ok(StockState {
        inventory: state.inventory - count,
        update_date: state.update_date.clone(),
        records,
    })
}

/// Remove a hand-over and return its count to the inventory.
pub fn delete_delivery(state: &StockState, id: u64) -> InputResult<StockState> {
    let record = state
        .records
        .iter()
        .find(|r| r.id == id)
        .ok_or(InputError::NotFound(id))?;

    Ok(StockState {
        inventory: state.inventory.saturating_add(record.delivery_count),
        update_date: state.update_date.clone(),
        records: state.records.iter().filter(|r| r.id != id).cloned().collect(),
    })
}

/// Totals per month (newest first) and per company.
///
/// Every month lists all of [`COMPANIES`], zeros included. Records whose
/// date no longer parses are skipped.
pub fn monthly_stats(state: &StockState) -> Vec<MonthlyRow> {
    let mut months: BTreeMap<String, [u64; COMPANIES.len()]> = BTreeMap::new();

    for record in &state.records {
        let Ok(date) = NaiveDate::parse_from_str(&record.date, "%Y-%m-%d") else {
            continue;
        };
        let key = format!("{}/{:02}", date.year(), date.month());
        let totals = months.entry(key).or_insert([0; COMPANIES.len()]);
        if let Some(idx) = COMPANIES.iter().position(|c| *c == record.company) {
            totals[idx] += record.delivery_count;
        }
    }

    months
        .into_iter()
        .rev()
        .map(|(month, totals)| MonthlyRow {
            month,
            totals: COMPANIES
                .iter()
                .zip(totals)
                .map(|(company, count)| CompanyTotal {
                    company: company.to_string(),
                    count,
                })
                .collect(),
        })
        .collect()
}
