use crate::error::ForecastError;
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ExpenseRecord {
    pub date: NaiveDate,
    pub amount: f64,
}

/// Expense as it arrives on the wire. Fields stay untyped until validation so that a
/// single malformed record can be reported with its position.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawExpense {
    #[serde(default)]
    pub date: Value,
    #[serde(default)]
    pub amount: Value,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum UserId {
    Numeric(i64),
    Text(String),
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Numeric(id) => write!(f, "{id}"),
            Self::Text(id) => f.write_str(id),
        }
    }
}

pub fn parse_records(raw: &[RawExpense]) -> Result<Vec<ExpenseRecord>, ForecastError> {
    if raw.is_empty() {
        return Err(ForecastError::data("at least one expense record is required"));
    }

    raw.iter()
        .enumerate()
        .map(|(idx, item)| {
            let date = parse_date(&item.date).ok_or_else(|| {
                ForecastError::data(format!("record {idx}: unparseable date {}", item.date))
            })?;
            let amount = parse_amount(&item.amount).ok_or_else(|| {
                ForecastError::data(format!("record {idx}: unparseable amount {}", item.amount))
            })?;
            Ok(ExpenseRecord { date, amount })
        })
        .collect()
}

fn parse_date(value: &Value) -> Option<NaiveDate> {
    let s = value.as_str()?.trim();
    if s.is_empty() {
        return None;
    }

    for fmt in ["%Y-%m-%d", "%Y/%m/%d"] {
        if let Ok(d) = NaiveDate::parse_from_str(s, fmt) {
            return Some(d);
        }
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.date_naive());
    }

    for fmt in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S%.f"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt.date());
        }
    }

    None
}

// Postgres numeric columns come through as strings.
fn parse_amount(value: &Value) -> Option<f64> {
    let amount = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    (amount.is_finite() && amount >= 0.0).then_some(amount)
}
