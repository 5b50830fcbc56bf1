//! Feature derivation from dated expense records.
//!
//! Two boundary policies exist. Training keeps the raw lag/rolling gaps and drops rows
//! without a full lag history; inference shrinks the rolling window to the data and
//! fills the gaps (back-fill, then forward-fill) so every row carries a value.
//!
//! Prediction reads the frame's amounts and its last row: the next-period vector takes
//! `prev_amount` from the last amount and `rolling_mean_3` from the last row's filled
//! rolling mean.

use crate::domain::expense::ExpenseRecord;
use crate::error::ForecastError;
use crate::stats;
use crate::time::period::next_period_date;
use chrono::{Datelike, NaiveDate, Weekday};
use std::collections::BTreeMap;

pub const FEATURE_NAMES: [&str; 8] = [
    "month",
    "day_of_month",
    "is_weekend",
    "days_since_first",
    "seq",
    "trend",
    "prev_amount",
    "rolling_mean_3",
];

/// Rows earlier than this many records have an incomplete lag history at training time.
pub const TRAINING_LAG_DEPTH: usize = 3;

const ROLLING_WINDOW: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoundaryPolicy {
    /// Fixed windows, undefined values left as gaps.
    Training,
    /// Window of `min(3, n)`, gaps back-filled then forward-filled.
    Inference,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FeatureRow {
    pub date: NaiveDate,
    pub amount: f64,
    pub month: f64,
    pub day_of_month: f64,
    pub is_weekend: f64,
    pub days_since_first: f64,
    pub seq: f64,
    pub trend: f64,
    pub prev_amount: Option<f64>,
    pub rolling_mean_3: Option<f64>,
    pub lag_history_complete: bool,
}

impl FeatureRow {
    pub fn get(&self, name: &str) -> Option<f64> {
        match name {
            "month" => Some(self.month),
            "day_of_month" => Some(self.day_of_month),
            "is_weekend" => Some(self.is_weekend),
            "days_since_first" => Some(self.days_since_first),
            "seq" => Some(self.seq),
            "trend" => Some(self.trend),
            "prev_amount" => self.prev_amount,
            "rolling_mean_3" => self.rolling_mean_3,
            _ => None,
        }
    }
}

/// Named feature values for a single prediction date.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FeatureVector {
    values: BTreeMap<String, f64>,
}

impl FeatureVector {
    pub fn get(&self, name: &str) -> Option<f64> {
        self.values.get(name).copied()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Values in the order of `required`; names this vector lacks become 0.
    pub fn select(&self, required: &[String]) -> Vec<f64> {
        required
            .iter()
            .map(|name| match self.get(name) {
                Some(v) => v,
                None => {
                    tracing::info!(feature = %name, "adding missing feature as 0");
                    0.0
                }
            })
            .collect()
    }

    /// Canonical feature names that are both computed here and listed in `required`.
    pub fn known_subset(&self, required: &[String]) -> Vec<String> {
        FEATURE_NAMES
            .iter()
            .filter(|name| self.values.contains_key(**name) && required.iter().any(|r| r == *name))
            .map(|name| name.to_string())
            .collect()
    }
}

/// Sorted records with their per-row features.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureFrame {
    rows: Vec<FeatureRow>,
    first_date: NaiveDate,
}

impl FeatureFrame {
    pub fn build(records: &[ExpenseRecord], policy: BoundaryPolicy) -> Result<Self, ForecastError> {
        if records.is_empty() {
            return Err(ForecastError::data("at least one expense record is required"));
        }

        let mut sorted = records.to_vec();
        sorted.sort_by_key(|r| r.date);

        let n = sorted.len();
        let first_date = sorted[0].date;
        let max_seq = (n - 1).max(1) as f64;
        let amounts: Vec<f64> = sorted.iter().map(|r| r.amount).collect();

        let window = match policy {
            BoundaryPolicy::Training => ROLLING_WINDOW,
            BoundaryPolicy::Inference => ROLLING_WINDOW.min(n),
        };

        let mut prev_amount: Vec<Option<f64>> = (0..n)
            .map(|i| i.checked_sub(1).map(|j| amounts[j]))
            .collect();
        let mut rolling_mean: Vec<Option<f64>> = (0..n)
            .map(|i| (i + 1 >= window).then(|| stats::mean(&amounts[i + 1 - window..=i])))
            .collect();

        if policy == BoundaryPolicy::Inference {
            fill_gaps(&mut prev_amount);
            fill_gaps(&mut rolling_mean);
        }

        let rows = sorted
            .iter()
            .enumerate()
            .map(|(i, record)| {
                let date = record.date;
                FeatureRow {
                    date,
                    amount: record.amount,
                    month: date.month() as f64,
                    day_of_month: date.day() as f64,
                    is_weekend: weekend_flag(date),
                    days_since_first: (date - first_date).num_days() as f64,
                    seq: i as f64,
                    // Equals 1.0 on the last row of every dataset.
                    trend: i as f64 / max_seq,
                    prev_amount: prev_amount[i],
                    rolling_mean_3: rolling_mean[i],
                    lag_history_complete: i >= TRAINING_LAG_DEPTH,
                }
            })
            .collect();

        Ok(Self { rows, first_date })
    }

    pub fn rows(&self) -> &[FeatureRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn amounts(&self) -> Vec<f64> {
        self.rows.iter().map(|r| r.amount).collect()
    }

    pub fn last_date(&self) -> NaiveDate {
        self.rows.last().map_or(self.first_date, |r| r.date)
    }

    /// Rows kept for model fitting: those with a complete lag history.
    pub fn training_rows(&self) -> Vec<&FeatureRow> {
        self.rows.iter().filter(|r| r.lag_history_complete).collect()
    }

    /// Feature vector for the period following the last record.
    pub fn next_period_features(&self) -> FeatureVector {
        let target = next_period_date(self.last_date());
        let next_seq = self.rows.len() as f64;
        let last = self.rows.last();

        let mut values = BTreeMap::new();
        values.insert("month".to_string(), target.month() as f64);
        values.insert("day_of_month".to_string(), target.day() as f64);
        values.insert("is_weekend".to_string(), weekend_flag(target));
        values.insert(
            "days_since_first".to_string(),
            (target - self.first_date).num_days() as f64,
        );
        values.insert("seq".to_string(), next_seq);
        // The next period holds the largest seq, so trend is 1.
        values.insert("trend".to_string(), 1.0);
        if let Some(last) = last {
            values.insert("prev_amount".to_string(), last.amount);
        }
        let rolling = last
            .and_then(|row| row.rolling_mean_3)
            .unwrap_or_else(|| stats::tail_mean(&self.amounts(), ROLLING_WINDOW));
        values.insert("rolling_mean_3".to_string(), rolling);

        FeatureVector { values }
    }
}

fn weekend_flag(date: NaiveDate) -> f64 {
    match date.weekday() {
        Weekday::Sat | Weekday::Sun => 1.0,
        _ => 0.0,
    }
}

fn fill_gaps(column: &mut [Option<f64>]) {
    let mut next = None;
    for slot in column.iter_mut().rev() {
        match slot {
            Some(v) => next = Some(*v),
            None => *slot = next,
        }
    }
    let mut prev = None;
    for slot in column.iter_mut() {
        match slot {
            Some(v) => prev = Some(*v),
            None => *slot = prev,
        }
    }
}
