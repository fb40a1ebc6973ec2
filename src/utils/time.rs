//! Time utilities.
//!
//! All operations are timezone-aware and UTC-normalized.

use chrono::{DateTime, Duration, NaiveTime, TimeZone, Utc};

/// Current time in UTC.
pub fn now_utc() -> DateTime<Utc> {
    Utc::now()
}

/// Format a datetime as an ISO 8601 / RFC 3339 string.
pub fn to_iso_string(dt: DateTime<Utc>) -> String {
    dt.to_rfc3339()
}

/// Convert a Unix timestamp (seconds) to a UTC datetime.
pub fn from_unix_timestamp(ts: i64) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp(ts, 0)
}

/// Start of the given day (00:00:00) in UTC.
pub fn start_of_day(dt: DateTime<Utc>) -> DateTime<Utc> {
    Utc.from_utc_datetime(&dt.date_naive().and_time(NaiveTime::MIN))
}

/// End of the given day (23:59:59.999999) in UTC.
pub fn end_of_day(dt: DateTime<Utc>) -> DateTime<Utc> {
    start_of_day(dt) + Duration::days(1) - Duration::microseconds(1)
}

pub fn add_days(dt: DateTime<Utc>, days: i64) -> DateTime<Utc> {
    dt + Duration::days(days)
}

/// Absolute difference in minutes.
pub fn diff_in_minutes(a: DateTime<Utc>, b: DateTime<Utc>) -> f64 {
    (b - a).num_milliseconds().abs() as f64 / 60_000.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_day_bounds_wrap_the_input() {
        let now = now_utc();
        let start = start_of_day(now);
        let end = end_of_day(now);

        assert!(start <= now && now <= end);
        assert_eq!(start.date_naive(), now.date_naive());
        assert_eq!(end.date_naive(), now.date_naive());
    }

    #[test]
    fn test_unix_timestamp_round_trip() {
        let dt = from_unix_timestamp(1_700_000_000).unwrap();
        assert_eq!(dt.timestamp(), 1_700_000_000);
        assert!(from_unix_timestamp(i64::MAX).is_none());
    }

    #[test]
    fn test_diff_in_minutes_is_absolute() {
        let now = now_utc();
        let later = add_days(now, 1);
        assert_eq!(diff_in_minutes(now, later), 1440.0);
        assert_eq!(diff_in_minutes(later, now), 1440.0);
    }

    #[test]
    fn test_iso_string_is_parseable() {
        let now = now_utc();
        let parsed = DateTime::parse_from_rfc3339(&to_iso_string(now)).unwrap();
        assert_eq!(parsed.with_timezone(&Utc), now);
    }
}
