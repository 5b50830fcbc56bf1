use chrono::{Duration, NaiveDate};

// "Next month" is a fixed offset and does not follow calendar month boundaries.
pub const NEXT_PERIOD_OFFSET_DAYS: i64 = 30;

pub const ERROR_LABEL: &str = "Error";

pub fn next_period_date(last_date: NaiveDate) -> NaiveDate {
    last_date + Duration::days(NEXT_PERIOD_OFFSET_DAYS)
}

/// Month name and year, e.g. "February 2024".
pub fn period_label(date: NaiveDate) -> String {
    date.format("%B %Y").to_string()
}
