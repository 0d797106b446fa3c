//! Date formatting shared by minutes, action items and the finalize history.

use chrono::{DateTime, Duration, Local, NaiveDate, Utc};

pub const DATE_FORMAT: &str = "%Y-%m-%d";

pub fn today() -> NaiveDate {
    Local::now().date_naive()
}

/// `YYYY-MM-DD` of `from` (default today) shifted by `delta_days`.
pub fn current_date_plus_delta_days(delta_days: i64, from: Option<NaiveDate>) -> String {
    let base = from.unwrap_or_else(today);
    format_date(base + Duration::days(delta_days))
}

pub fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

pub fn parse_date(value: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(value, DATE_FORMAT).ok()
}

/// `YYYY-MM-DD hh:mm:ss` in local time.
pub fn format_date_time(at: DateTime<Utc>) -> String {
    at.with_timezone(&Local)
        .format("%Y-%m-%d %H:%M:%S")
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plus_delta_days_crosses_month() {
        let from = NaiveDate::from_ymd_opt(2024, 1, 30).unwrap();
        assert_eq!(current_date_plus_delta_days(7, Some(from)), "2024-02-06");
        assert_eq!(current_date_plus_delta_days(0, Some(from)), "2024-01-30");
        assert_eq!(current_date_plus_delta_days(-30, Some(from)), "2023-12-31");
    }

    #[test]
    fn test_parse_date() {
        assert_eq!(parse_date("2024-03-01"), NaiveDate::from_ymd_opt(2024, 3, 1));
        assert_eq!(parse_date("2024-13-01"), None);
        assert_eq!(parse_date("yesterday"), None);
    }

    #[test]
    fn test_format_date_time_shape() {
        let formatted = format_date_time(Utc::now());
        assert_eq!(formatted.len(), 19);
        assert_eq!(&formatted[10..11], " ");
    }
}
