//! Calendar dates and timestamps.
//!
//! Dates are carried as the exact strings the user or an import supplied so
//! that a backup restores byte-for-byte. These helpers mint new values and
//! give callers a sort key without normalizing what is stored.

use std::cmp::Ordering;

use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};

use crate::error::{TypeError, TypeResult};

/// Today's date (UTC) as `YYYY-MM-DD`.
pub fn today() -> String {
    Utc::now().date_naive().format("%Y-%m-%d").to_string()
}

/// The current instant as RFC 3339 with millisecond precision.
pub fn now_timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Validate a `YYYY-MM-DD` calendar date.
pub fn validate_date(date: &str) -> TypeResult<()> {
    parse_date(date)
        .map(|_| ())
        .ok_or_else(|| TypeError::InvalidDate(date.to_string()))
}

/// Best-effort parse of a stored date.
///
/// Accepts plain calendar dates and full RFC 3339 timestamps (the date part
/// is kept).
pub fn parse_date(date: &str) -> Option<NaiveDate> {
    if let Ok(d) = NaiveDate::parse_from_str(date, "%Y-%m-%d") {
        return Some(d);
    }
    DateTime::parse_from_rfc3339(date)
        .ok()
        .map(|dt| dt.date_naive())
}

/// Order two stored dates, newest first.
///
/// Unparseable dates sort after parseable ones and fall back to string
/// comparison among themselves.
pub fn newest_first(a: &str, b: &str) -> Ordering {
    match (parse_date(a), parse_date(b)) {
        (Some(x), Some(y)) => y.cmp(&x),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => b.cmp(a),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn today_is_a_valid_date() {
        assert!(validate_date(&today()).is_ok());
    }

    #[test]
    fn timestamp_parses_back() {
        let ts = now_timestamp();
        assert!(DateTime::parse_from_rfc3339(&ts).is_ok());
        assert!(ts.ends_with('Z'));
    }

    #[test]
    fn rejects_garbage_date() {
        assert_eq!(
            validate_date("2024-13-40"),
            Err(TypeError::InvalidDate("2024-13-40".into()))
        );
    }

    #[test]
    fn parses_rfc3339_date_part() {
        let d = parse_date("2024-03-05T10:00:00.000Z").unwrap();
        assert_eq!(d, NaiveDate::from_ymd_opt(2024, 3, 5).unwrap());
    }

    #[test]
    fn newest_first_orders_descending() {
        let mut dates = vec!["2024-01-01", "not a date", "2024-06-01", "2023-12-31"];
        dates.sort_by(|a, b| newest_first(a, b));
        assert_eq!(dates, vec!["2024-06-01", "2024-01-01", "2023-12-31", "not a date"]);
    }
}
