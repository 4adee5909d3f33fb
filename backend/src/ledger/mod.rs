//! Compensation ledger (賠償リスト).
//!
//! Entries are edited cell by cell. Every operation takes the current list
//! and returns the next one; the caller persists it under
//! [`EXPENSE_KEY`](crate::store::EXPENSE_KEY).

use std::str::FromStr;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{InputError, InputResult};

/// Delivery companies offered in the ledger. An entry may also leave the
/// company unset (`""`).
pub const DELIVERY_COMPANIES: [&str; 9] = [
    "SPG",
    "極光",
    "ソフトラン",
    "桃太郎（藤沢）",
    "桃太郎（相模原）",
    "MJ",
    "PSL",
    "TMG",
    "CROUD",
];

static NON_DIGITS: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^0-9]").expect("valid regex"));

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum PaymentMethod {
    #[default]
    #[serde(rename = "現金書留")]
    RegisteredMail,
    #[serde(rename = "銀行振込")]
    BankTransfer,
}

impl FromStr for PaymentMethod {
    type Err = InputError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "現金書留" => Ok(PaymentMethod::RegisteredMail),
            "銀行振込" => Ok(PaymentMethod::BankTransfer),
            other => Err(InputError::user(format!("Unknown payment method: {}", other))),
        }
    }
}

/// One compensation case.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompensationEntry {
    pub id: u64,
    /// 1-based position, kept contiguous after deletions.
    pub no: usize,
    #[serde(rename = "huoseNumber")]
    pub house_number: String,
    pub delivery_company: String,
    pub acceptor: String,
    /// Digits only.
    pub item_price: String,
    /// Digits only.
    pub fee: String,
    /// `item_price + fee`, set once either amount has been edited.
    #[serde(default)]
    pub total: Option<u64>,
    pub payment_method: PaymentMethod,
    pub details: String,
}

/// Editable columns, named as in the stored JSON.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryField {
    HouseNumber,
    DeliveryCompany,
    Acceptor,
    ItemPrice,
    Fee,
    PaymentMethod,
    Details,
}

impl FromStr for EntryField {
    type Err = InputError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "huoseNumber" => EntryField::HouseNumber,
            "deliveryCompany" => EntryField::DeliveryCompany,
            "acceptor" => EntryField::Acceptor,
            "itemPrice" => EntryField::ItemPrice,
            "fee" => EntryField::Fee,
            "paymentMethod" => EntryField::PaymentMethod,
            "details" => EntryField::Details,
            other => return Err(InputError::user(format!("Unknown field: {}", other))),
        })
    }
}

/// Append a blank entry numbered after the last one.
pub fn add_entry(entries: &[CompensationEntry], id: u64) -> Vec<CompensationEntry> {
    let mut next = entries.to_vec();
    next.push(CompensationEntry {
        id,
        no: entries.len() + 1,
        ..CompensationEntry::default()
    });
    next
}

/// Remove the entry with `id` and renumber the rest from 1.
pub fn delete_entry(entries: &[CompensationEntry], id: u64) -> InputResult<Vec<CompensationEntry>> {
    if !entries.iter().any(|e| e.id == id) {
        return Err(InputError::NotFound(id));
    }
    Ok(entries
        .iter()
        .filter(|e| e.id != id)
        .enumerate()
        .map(|(i, e)| CompensationEntry {
            no: i + 1,
            ..e.clone()
        })
        .collect())
}

/// Set one field of the entry with `id`.
///
/// Amounts are reduced to their ASCII digits and the total recomputed;
/// an empty amount counts as zero.
pub fn update_entry(
    entries: &[CompensationEntry],
    id: u64,
    field: EntryField,
    value: &str,
) -> InputResult<Vec<CompensationEntry>> {
    let mut next = entries.to_vec();
    let entry = next
        .iter_mut()
        .find(|e| e.id == id)
        .ok_or(InputError::NotFound(id))?;

    match field {
        EntryField::HouseNumber => entry.house_number = value.to_string(),
        EntryField::DeliveryCompany => {
            if !value.is_empty() && !DELIVERY_COMPANIES.contains(&value) {
                return Err(InputError::user(format!("Unknown delivery company: {}", value)));
            }
            entry.delivery_company = value.to_string();
        }
        EntryField::Acceptor => entry.acceptor = value.to_string(),
        EntryField::Details => entry.details = value.to_string(),
        EntryField::PaymentMethod => entry.payment_method = value.parse()?,
        EntryField::ItemPrice | EntryField::Fee => {
            let digits = digits_only(value);
            if field == EntryField::ItemPrice {
                entry.item_price = digits;
            } else {
                entry.fee = digits;
            }
            entry.total = Some(amount(&entry.item_price).saturating_add(amount(&entry.fee)));
        }
    }

    Ok(next)
}

/// Sum of all entry totals.
pub fn ledger_total(entries: &[CompensationEntry]) -> u64 {
    entries.iter().filter_map(|e| e.total).fold(0, u64::saturating_add)
}

/// `¥1,234`; `None` renders empty.
pub fn format_yen(value: Option<u64>) -> String {
    let Some(value) = value else {
        return String::new();
    };
    let digits = value.to_string();
    let mut grouped = String::new();
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    format!("¥{}", grouped)
}

fn digits_only(value: &str) -> String {
    NON_DIGITS.replace_all(value, "").into_owned()
}

fn amount(digits: &str) -> u64 {
    digits.parse().unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ledger_of(n: u64) -> Vec<CompensationEntry> {
        (1..=n).fold(Vec::new(), |acc, id| add_entry(&acc, id))
    }

    #[test]
    fn test_add_entry_defaults() {
        let entries = ledger_of(2);
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[1].no, 2);
        assert_eq!(entries[1].payment_method, PaymentMethod::RegisteredMail);
        assert_eq!(entries[1].total, None);
    }

    #[test]
    fn test_delete_renumbers() {
        let entries = delete_entry(&ledger_of(3), 2).unwrap();
        let numbers: Vec<(u64, usize)> = entries.iter().map(|e| (e.id, e.no)).collect();
        assert_eq!(numbers, vec![(1, 1), (3, 2)]);
    }

    #[test]
    fn test_delete_unknown_id() {
        assert_eq!(delete_entry(&ledger_of(1), 9), Err(InputError::NotFound(9)));
    }

    #[test]
    fn test_amounts_recompute_total() {
        let entries = ledger_of(1);
        let entries = update_entry(&entries, 1, EntryField::ItemPrice, "¥1,200").unwrap();
        assert_eq!(entries[0].item_price, "1200");
        assert_eq!(entries[0].total, Some(1200));

        let entries = update_entry(&entries, 1, EntryField::Fee, "330円").unwrap();
        assert_eq!(entries[0].fee, "330");
        assert_eq!(entries[0].total, Some(1530));

        let entries = update_entry(&entries, 1, EntryField::ItemPrice, "").unwrap();
        assert_eq!(entries[0].total, Some(330));
    }

    #[test]
    fn test_text_fields_and_payment_method() {
        let entries = ledger_of(1);
        let entries = update_entry(&entries, 1, EntryField::HouseNumber, "HX-001").unwrap();
        let entries = update_entry(&entries, 1, EntryField::PaymentMethod, "銀行振込").unwrap();
        assert_eq!(entries[0].house_number, "HX-001");
        assert_eq!(entries[0].payment_method, PaymentMethod::BankTransfer);
        assert!(update_entry(&entries, 1, EntryField::PaymentMethod, "cheque").is_err());
    }

    #[test]
    fn test_delivery_company_from_catalogue() {
        let entries = ledger_of(1);
        let entries = update_entry(&entries, 1, EntryField::DeliveryCompany, "桃太郎（藤沢）").unwrap();
        assert_eq!(entries[0].delivery_company, "桃太郎（藤沢）");

        let err = update_entry(&entries, 1, EntryField::DeliveryCompany, "Sagawa").unwrap_err();
        assert!(matches!(err, InputError::UserInput(_)));

        let entries = update_entry(&entries, 1, EntryField::DeliveryCompany, "").unwrap();
        assert_eq!(entries[0].delivery_company, "");
    }

    #[test]
    fn test_field_names() {
        assert_eq!("huoseNumber".parse::<EntryField>().unwrap(), EntryField::HouseNumber);
        assert!("total".parse::<EntryField>().is_err());
    }

    #[test]
    fn test_json_shape() {
        let entries = update_entry(&ledger_of(1), 1, EntryField::Fee, "100").unwrap();
        let json = serde_json::to_value(&entries[0]).unwrap();
        assert_eq!(json["huoseNumber"], "");
        assert_eq!(json["paymentMethod"], "現金書留");
        assert_eq!(json["total"], 100);
    }

    #[test]
    fn test_totals_and_formatting() {
        let entries = ledger_of(2);
        let entries = update_entry(&entries, 1, EntryField::ItemPrice, "1000000").unwrap();
        let entries = update_entry(&entries, 2, EntryField::Fee, "234").unwrap();
        assert_eq!(ledger_total(&entries), 1_000_234);
        assert_eq!(format_yen(Some(1_000_234)), "¥1,000,234");
        assert_eq!(format_yen(Some(0)), "¥0");
        assert_eq!(format_yen(None), "");
    }
}
