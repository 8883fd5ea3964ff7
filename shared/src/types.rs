//! Common types used across the platform

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

/// Inclusive calendar date range.
///
/// Reports cover whole days in UTC: an instant is inside the range when it
/// is at or after midnight on `start` and strictly before midnight after `end`.
/// The open upper bound keeps sub-millisecond timestamps at the end of a day
/// inside that day.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    /// Build a range, rejecting an end date before the start date
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, &'static str> {
        if end < start {
            return Err("End date must not be before start date");
        }
        Ok(Self { start, end })
    }

    pub fn single_day(date: NaiveDate) -> Self {
        Self {
            start: date,
            end: date,
        }
    }

    /// First instant of the range
    pub fn start_instant(&self) -> DateTime<Utc> {
        start_of_day(self.start)
    }

    /// First instant after the range
    pub fn end_exclusive(&self) -> DateTime<Utc> {
        start_of_next_day(self.end)
    }

    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        instant >= self.start_instant() && instant < self.end_exclusive()
    }
}

/// Midnight at the start of a calendar day
pub fn start_of_day(date: NaiveDate) -> DateTime<Utc> {
    date.and_time(NaiveTime::default()).and_utc()
}

/// Midnight at the start of the following day
pub fn start_of_next_day(date: NaiveDate) -> DateTime<Utc> {
    date.succ_opt()
        .map(start_of_day)
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

/// Parse a client-supplied date.
///
/// Accepts plain `YYYY-MM-DD` dates as well as RFC 3339 timestamps, which
/// are truncated to their UTC calendar day.
pub fn parse_calendar_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Some(date);
    }
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|dt| dt.with_timezone(&Utc).date_naive())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Timelike};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_range_bounds_cover_whole_days() {
        let range = DateRange::new(date(2024, 1, 1), date(2024, 1, 3)).unwrap();
        let start = range.start_instant();
        let end = range.end_exclusive();

        assert_eq!(start.date_naive(), date(2024, 1, 1));
        assert_eq!(start.hour(), 0);
        assert_eq!(end.date_naive(), date(2024, 1, 4));
        assert_eq!((end.hour(), end.minute(), end.second()), (0, 0, 0));
    }

    #[test]
    fn test_range_rejects_inverted_dates() {
        assert!(DateRange::new(date(2024, 1, 2), date(2024, 1, 1)).is_err());
    }

    #[test]
    fn test_contains_is_inclusive() {
        let range = DateRange::single_day(date(2024, 1, 1));
        assert!(range.contains(start_of_day(date(2024, 1, 1))));
        assert!(!range.contains(start_of_day(date(2024, 1, 2))));
        assert!(!range.contains(start_of_day(date(2024, 1, 1)) - Duration::microseconds(1)));
    }

    #[test]
    fn test_last_microsecond_of_day_is_inside() {
        let range = DateRange::single_day(date(2024, 1, 1));
        let late = start_of_next_day(date(2024, 1, 1)) - Duration::microseconds(1);
        // 23:59:59.999999, past the last whole millisecond
        assert_eq!(late.timestamp_subsec_micros(), 999_999);
        assert!(range.contains(late));

        let next = DateRange::single_day(date(2024, 1, 2));
        assert!(!next.contains(late));
    }

    #[test]
    fn test_next_day_at_calendar_limit() {
        assert_eq!(start_of_next_day(NaiveDate::MAX), DateTime::<Utc>::MAX_UTC);
    }

    #[test]
    fn test_parse_calendar_date() {
        assert_eq!(parse_calendar_date("2024-01-01"), Some(date(2024, 1, 1)));
        assert_eq!(
            parse_calendar_date("2024-01-01T15:30:00Z"),
            Some(date(2024, 1, 1))
        );
        assert_eq!(parse_calendar_date(""), None);
        assert_eq!(parse_calendar_date("not-a-date"), None);
    }
}
