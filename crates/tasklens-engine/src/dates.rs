//! Canonical UTC date anchoring.
//!
//! Every place the engine turns a stamp into a compare or bucket key goes
//! through [`anchor_day`]: the calendar-day identity of a timestamp computed
//! in UTC. Locale-dependent formatting and host-local timezone arithmetic are
//! never used for this purpose; mixing the two is how off-by-one-day
//! bucketing bugs happen.

use std::cmp::Ordering;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};

/// Anchors a stamp to its UTC calendar day.
///
/// Accepts plain calendar dates (`2025-06-10`), RFC 3339 date-times with an
/// offset (`2025-06-10T23:30:00-05:00`, anchored after conversion to UTC),
/// and naive date-times (`2025-06-10T23:30:00` or `2025-06-10 23:30`, treated
/// as already UTC). Returns `None` for anything else.
pub fn anchor_day(stamp: &str) -> Option<NaiveDate> {
    let s = stamp.trim();
    if s.is_empty() {
        return None;
    }
    if let Ok(day) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return Some(day);
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc).date_naive());
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S") {
        return Some(dt.date());
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M") {
        return Some(dt.date());
    }
    None
}

/// Anchors a UTC timestamp to its calendar day.
pub fn anchor_timestamp(ts: &DateTime<Utc>) -> NaiveDate {
    ts.date_naive()
}

/// Compares two optional anchored days; present days order naturally and an
/// absent day sorts after any present one.
pub fn compare_days(a: Option<NaiveDate>, b: Option<NaiveDate>) -> Ordering {
    match (a, b) {
        (Some(x), Some(y)) => x.cmp(&y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_anchor_plain_date() {
        assert_eq!(
            anchor_day("2025-06-10"),
            Some(NaiveDate::from_ymd_opt(2025, 6, 10).unwrap())
        );
    }

    #[test]
    fn test_anchor_rfc3339_crosses_day_boundary() {
        // 23:30 at UTC-5 is 04:30 the next day in UTC.
        assert_eq!(
            anchor_day("2025-06-10T23:30:00-05:00"),
            Some(NaiveDate::from_ymd_opt(2025, 6, 11).unwrap())
        );
        // 01:30 at UTC+3 is 22:30 the previous day in UTC.
        assert_eq!(
            anchor_day("2025-06-10T01:30:00+03:00"),
            Some(NaiveDate::from_ymd_opt(2025, 6, 9).unwrap())
        );
    }

    #[test]
    fn test_anchor_naive_datetime() {
        assert_eq!(
            anchor_day("2025-06-10T23:30:00"),
            Some(NaiveDate::from_ymd_opt(2025, 6, 10).unwrap())
        );
        assert_eq!(
            anchor_day("2025-06-10 08:00"),
            Some(NaiveDate::from_ymd_opt(2025, 6, 10).unwrap())
        );
    }

    #[test]
    fn test_anchor_rejects_garbage() {
        assert_eq!(anchor_day(""), None);
        assert_eq!(anchor_day("  "), None);
        assert_eq!(anchor_day("tomorrow"), None);
        assert_eq!(anchor_day("2025-13-40"), None);
        assert_eq!(anchor_day("10/06/2025"), None);
    }

    #[test]
    fn test_anchor_trims() {
        assert_eq!(
            anchor_day("  2025-01-02  "),
            Some(NaiveDate::from_ymd_opt(2025, 1, 2).unwrap())
        );
    }

    #[test]
    fn test_compare_days_absent_last() {
        let d1 = NaiveDate::from_ymd_opt(2025, 1, 1);
        let d2 = NaiveDate::from_ymd_opt(2025, 1, 2);

        assert_eq!(compare_days(d1, d2), Ordering::Less);
        assert_eq!(compare_days(d2, d1), Ordering::Greater);
        assert_eq!(compare_days(d1, d1), Ordering::Equal);
        assert_eq!(compare_days(d1, None), Ordering::Less);
        assert_eq!(compare_days(None, d1), Ordering::Greater);
        assert_eq!(compare_days(None, None), Ordering::Equal);
    }
}
