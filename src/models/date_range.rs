//! Inclusive calendar date range

use crate::{EtlError, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Date format used by the POWER API for request bounds and response keys
pub const COMPACT_DATE_FORMAT: &str = "%Y%m%d";

/// Inclusive range of calendar dates, always ordered `start <= end`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "UncheckedDateRange")]
pub struct DateRange {
    start: NaiveDate,
    end: NaiveDate,
}

#[derive(Deserialize)]
struct UncheckedDateRange {
    start: NaiveDate,
    end: NaiveDate,
}

impl TryFrom<UncheckedDateRange> for DateRange {
    type Error = EtlError;

    fn try_from(raw: UncheckedDateRange) -> Result<Self> {
        DateRange::new(raw.start, raw.end)
    }
}

impl DateRange {
    /// Create a range, rejecting `start > end`
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self> {
        if start > end {
            return Err(EtlError::validation(format!(
                "Start date {start} is after end date {end}"
            )));
        }
        Ok(Self { start, end })
    }

    #[must_use]
    pub fn start(&self) -> NaiveDate {
        self.start
    }

    #[must_use]
    pub fn end(&self) -> NaiveDate {
        self.end
    }

    /// Number of days covered, both ends included
    #[must_use]
    pub fn days(&self) -> u32 {
        u32::try_from((self.end - self.start).num_days() + 1).unwrap_or(u32::MAX)
    }

    #[must_use]
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }

    /// All dates of the range in ascending order
    pub fn iter(&self) -> impl Iterator<Item = NaiveDate> {
        let end = self.end;
        self.start.iter_days().take_while(move |d| *d <= end)
    }

    /// Reject ranges longer than the upstream source can answer in one request
    pub fn ensure_max_span(&self, max_days: u32) -> Result<()> {
        let days = self.days();
        if days > max_days {
            return Err(EtlError::validation(format!(
                "Date range {self} spans {days} days, the maximum is {max_days}"
            )));
        }
        Ok(())
    }
}

impl fmt::Display for DateRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..{}", self.start, self.end)
    }
}

/// Parse a user supplied date in either `YYYY-MM-DD` or `YYYYMMDD` form
pub fn parse_date(input: &str) -> Result<NaiveDate> {
    let trimmed = input.trim();
    NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(trimmed, COMPACT_DATE_FORMAT))
        .map_err(|_| {
            EtlError::validation(format!(
                "Invalid date '{input}', expected YYYY-MM-DD or YYYYMMDD"
            ))
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_deserialize_rejects_reversed_range() {
        let range: DateRange =
            serde_json::from_str(r#"{"start": "2024-12-01", "end": "2024-12-03"}"#).unwrap();
        assert_eq!(range.days(), 3);

        let reversed =
            serde_json::from_str::<DateRange>(r#"{"start": "2024-12-03", "end": "2024-12-01"}"#);
        assert!(reversed.unwrap_err().to_string().contains("is after end date"));
    }

    #[test]
    fn test_range_rejects_reversed_bounds() {
        let result = DateRange::new(date(2024, 12, 3), date(2024, 12, 1));
        assert!(matches!(result, Err(EtlError::Validation { .. })));
    }

    #[test]
    fn test_single_day_range() {
        let range = DateRange::new(date(2024, 2, 29), date(2024, 2, 29)).unwrap();
        assert_eq!(range.days(), 1);
        assert_eq!(range.iter().collect::<Vec<_>>(), vec![date(2024, 2, 29)]);
    }

    #[test]
    fn test_iter_is_ascending_and_inclusive() {
        let range = DateRange::new(date(2024, 12, 30), date(2025, 1, 2)).unwrap();
        let days: Vec<_> = range.iter().collect();
        assert_eq!(
            days,
            vec![
                date(2024, 12, 30),
                date(2024, 12, 31),
                date(2025, 1, 1),
                date(2025, 1, 2)
            ]
        );
        assert_eq!(range.days(), 4);
        assert!(range.contains(date(2025, 1, 2)));
        assert!(!range.contains(date(2025, 1, 3)));
    }

    #[test]
    fn test_max_span() {
        let range = DateRange::new(date(2024, 1, 1), date(2024, 12, 31)).unwrap();
        assert_eq!(range.days(), 366);
        assert!(range.ensure_max_span(366).is_ok());
        let err = range.ensure_max_span(31).unwrap_err();
        assert!(err.to_string().contains("spans 366 days"));
    }

    #[rstest]
    #[case("2024-12-01")]
    #[case("20241201")]
    #[case(" 2024-12-01 ")]
    fn test_parse_date_formats(#[case] input: &str) {
        assert_eq!(parse_date(input).unwrap(), date(2024, 12, 1));
    }

    #[rstest]
    #[case("2024-13-01")]
    #[case("01/12/2024")]
    #[case("")]
    fn test_parse_date_rejects_garbage(#[case] input: &str) {
        assert!(parse_date(input).is_err());
    }
}
