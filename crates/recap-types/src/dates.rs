//! Week and month bucketing.
//!
//! Weeks start on Monday and every computation happens in UTC, so an instant
//! always lands in the same bucket no matter which host evaluates it.

use chrono::{DateTime, Days, NaiveDate, Utc, Weekday};
use thiserror::Error;

const WEEK_KEY_FORMAT: &str = "%Y-%m-%d";
const MONTH_KEY_FORMAT: &str = "%Y-%m";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DateKeyError {
    #[error("Invalid week '{0}': expected YYYY-MM-DD")]
    Week(String),

    #[error("Invalid month '{0}': expected YYYY-MM")]
    Month(String),
}

/// Monday of the week containing `ts`.
pub fn week_of(ts: DateTime<Utc>) -> NaiveDate {
    monday_of(ts.date_naive())
}

pub fn monday_of(date: NaiveDate) -> NaiveDate {
    date.week(Weekday::Mon).first_day()
}

/// Canonical week-key: the Monday formatted as `YYYY-MM-DD`.
pub fn week_key(ts: DateTime<Utc>) -> String {
    format_week_key(week_of(ts))
}

pub fn format_week_key(monday: NaiveDate) -> String {
    monday.format(WEEK_KEY_FORMAT).to_string()
}

/// Canonical month-key: `YYYY-MM`.
pub fn month_of(ts: DateTime<Utc>) -> String {
    ts.format(MONTH_KEY_FORMAT).to_string()
}

/// Parses a week-key. Any day is accepted and normalized to its Monday.
pub fn parse_week_key(key: &str) -> Result<NaiveDate, DateKeyError> {
    NaiveDate::parse_from_str(key.trim(), WEEK_KEY_FORMAT)
        .map(monday_of)
        .map_err(|_| DateKeyError::Week(key.to_string()))
}

/// Parses `YYYY-MM` into the first day of that month.
pub fn parse_month_key(key: &str) -> Result<NaiveDate, DateKeyError> {
    let key = key.trim();
    let invalid = || DateKeyError::Month(key.to_string());

    if key.len() != 7 || key.as_bytes()[4] != b'-' {
        return Err(invalid());
    }
    NaiveDate::parse_from_str(&format!("{key}-01"), WEEK_KEY_FORMAT).map_err(|_| invalid())
}

pub fn format_month_key(first_day: NaiveDate) -> String {
    first_day.format(MONTH_KEY_FORMAT).to_string()
}

/// `Jan 06 - Jan 12, 2025`
pub fn format_week_range(monday: NaiveDate) -> String {
    let sunday = monday.checked_add_days(Days::new(6)).unwrap_or(monday);
    format!("{} - {}", monday.format("%b %d"), sunday.format("%b %d, %Y"))
}

/// `January 2025`
pub fn format_month_range(first_day: NaiveDate) -> String {
    first_day.format("%B %Y").to_string()
}

pub fn current_week() -> String {
    week_key(Utc::now())
}

pub fn current_month() -> String {
    month_of(Utc::now())
}

/// A week belongs to the month its Monday falls in.
pub fn week_in_month(week_key: &str, month_key: &str) -> bool {
    week_key.len() == 10 && week_key.get(..7) == Some(month_key)
}
