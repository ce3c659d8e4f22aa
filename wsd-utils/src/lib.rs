//! Shared utility functions for WSD crates.

/// Date utility functions
pub mod dates {
    use crate::error::DateError;
    use chrono::{Datelike, NaiveDate};

    /// Date format used for every tabular output: "YYYY-MM-DD"
    pub const ISO_FORMAT: &str = "%Y-%m-%d";

    /// Compact date format some sources report: "YYYYMMDD"
    pub const COMPACT_FORMAT: &str = "%Y%m%d";

    /// Format a NaiveDate as "YYYY-MM-DD"
    pub fn format_date(date: &NaiveDate) -> String {
        date.format(ISO_FORMAT).to_string()
    }

    /// Parse a date string in "YYYY-MM-DD" format
    pub fn parse_date(s: &str) -> Result<NaiveDate, DateError> {
        NaiveDate::parse_from_str(s.trim(), ISO_FORMAT)
            .map_err(|e| DateError(format!("{s:?}: {e}")))
    }

    /// Parse the date portion of whatever the ingestion side hands us.
    ///
    /// Accepts "YYYY-MM-DD", "YYYYMMDD", and timestamps that start with a
    /// "YYYY-MM-DD" date ("2024-05-01T12:00:00-05:00", "2024-05-01 00:00").
    pub fn parse_observation_date(s: &str) -> Result<NaiveDate, DateError> {
        let trimmed = s.trim();
        if trimmed.len() == 8 && trimmed.chars().all(|c| c.is_ascii_digit()) {
            return NaiveDate::parse_from_str(trimmed, COMPACT_FORMAT)
                .map_err(|e| DateError(format!("{s:?}: {e}")));
        }
        match trimmed.get(..10) {
            Some(prefix) => parse_date(prefix),
            None => Err(DateError(format!("{s:?}: too short for a date"))),
        }
    }

    /// Whether `year` has a February 29.
    pub fn is_leap_year(year: i32) -> bool {
        NaiveDate::from_ymd_opt(year, 2, 29).is_some()
    }

    /// Number of days in the given month.
    pub fn days_in_month(year: i32, month: u32) -> u32 {
        let (next_year, next_month) = if month == 12 {
            (year + 1, 1)
        } else {
            (year, month + 1)
        };
        match (
            NaiveDate::from_ymd_opt(year, month, 1),
            NaiveDate::from_ymd_opt(next_year, next_month, 1),
        ) {
            (Some(first), Some(next)) => (next - first).num_days() as u32,
            _ => 0,
        }
    }

    /// Number of days in the given calendar year.
    pub fn days_in_year(year: i32) -> u32 {
        if is_leap_year(year) {
            366
        } else {
            365
        }
    }

    /// (year, month) key of a date, used to bucket monthly aggregates.
    pub fn year_month(date: &NaiveDate) -> (i32, u32) {
        (date.year(), date.month())
    }

    #[cfg(test)]
    mod tests {
        use super::*;
        use chrono::NaiveDate;

        #[test]
        fn test_format_and_parse() {
            let date = NaiveDate::from_ymd_opt(2023, 6, 15).unwrap();
            let formatted = format_date(&date);
            assert_eq!(formatted, "2023-06-15");
            let parsed = parse_date(&formatted).unwrap();
            assert_eq!(parsed, date);
        }

        #[test]
        fn test_parse_observation_date_variants() {
            let expected = NaiveDate::from_ymd_opt(2024, 5, 1).unwrap();
            assert_eq!(parse_observation_date("2024-05-01").unwrap(), expected);
            assert_eq!(parse_observation_date("20240501").unwrap(), expected);
            assert_eq!(
                parse_observation_date("2024-05-01T12:00:00.000-05:00").unwrap(),
                expected
            );
            assert_eq!(parse_observation_date(" 2024-05-01 00:00 ").unwrap(), expected);
            assert!(parse_observation_date("May 1").is_err());
            assert!(parse_observation_date("2024-13-01").is_err());
        }

        #[test]
        fn test_calendar_helpers() {
            assert!(is_leap_year(2020));
            assert!(!is_leap_year(2021));
            assert!(!is_leap_year(1900));
            assert_eq!(days_in_month(2020, 2), 29);
            assert_eq!(days_in_month(2021, 2), 28);
            assert_eq!(days_in_month(2021, 12), 31);
            assert_eq!(days_in_year(2024), 366);
            assert_eq!(days_in_year(2023), 365);
        }
    }
}

/// Error types
pub mod error {
    use std::fmt;

    #[derive(Debug, Clone, PartialEq)]
    pub struct DateError(pub String);

    impl fmt::Display for DateError {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "Date error: {}", self.0)
        }
    }

    impl std::error::Error for DateError {}
}
