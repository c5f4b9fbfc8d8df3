//! Time utility functions

use chrono::{DateTime, Utc};

use crate::core::constants::EPOCH_MILLIS_THRESHOLD;

/// Convert milliseconds since Unix epoch to DateTime<Utc>
pub fn millis_to_datetime(millis: i64) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(millis).unwrap_or_else(|| {
        tracing::warn!(millis, "Invalid timestamp, using epoch");
        DateTime::UNIX_EPOCH
    })
}

/// Parse an RFC 3339 timestamp that carries an explicit offset
pub fn parse_rfc3339(ts: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(ts.trim())
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Parse a query timestamp: RFC 3339, or epoch seconds / milliseconds
///
/// Numbers at or above 1e12 are milliseconds.
pub fn parse_flexible_timestamp(ts: &str) -> Option<DateTime<Utc>> {
    if let Some(dt) = parse_rfc3339(ts) {
        return Some(dt);
    }

    let value: f64 = ts.trim().parse().ok()?;
    if !value.is_finite() {
        return None;
    }
    let millis = if value.abs() >= EPOCH_MILLIS_THRESHOLD {
        value
    } else {
        value * 1000.0
    };
    DateTime::from_timestamp_millis(millis.round() as i64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, TimeZone, Timelike};

    #[test]
    fn test_millis_to_datetime() {
        let dt = millis_to_datetime(1_704_067_200_123);
        assert_eq!(dt.year(), 2024);
        assert_eq!(dt.timestamp_subsec_millis(), 123);
    }

    #[test]
    fn test_parse_rfc3339_normalizes_offset() {
        let dt = parse_rfc3339("2024-01-15T12:30:00+02:00").unwrap();
        assert_eq!(dt.hour(), 10);
        assert!(parse_rfc3339("2024-01-15T12:30:00").is_none());
        assert!(parse_rfc3339("yesterday").is_none());
    }

    #[test]
    fn test_parse_flexible_epoch_seconds_and_millis() {
        let expected = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        assert_eq!(parse_flexible_timestamp("1704067200"), Some(expected));
        assert_eq!(parse_flexible_timestamp("1704067200000"), Some(expected));
        assert_eq!(
            parse_flexible_timestamp("2024-01-01T00:00:00Z"),
            Some(expected)
        );
        assert!(parse_flexible_timestamp("not-a-date").is_none());
    }
}
