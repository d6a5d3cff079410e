//! Timestamp formatting.

use chrono::{DateTime, Utc};

/// Formats a UTC time as ISO 8601 with microsecond precision:
/// `YYYY-MM-DDTHH:MM:SS.ffffff+00:00`.
///
/// # Examples
///
/// ```
/// use agentflow::utils::iso_timestamp;
/// use chrono::{TimeZone, Utc};
///
/// let ts = iso_timestamp(Utc.with_ymd_and_hms(2024, 5, 1, 12, 30, 0).unwrap());
/// assert_eq!(ts, "2024-05-01T12:30:00.000000+00:00");
/// ```
#[must_use]
pub fn iso_timestamp(at: DateTime<Utc>) -> String {
    at.format("%Y-%m-%dT%H:%M:%S%.6f+00:00").to_string()
}

/// Formats a UTC time for reports: `YYYY-MM-DD HH:MM:SS`.
#[must_use]
pub fn display_timestamp(at: DateTime<Utc>) -> String {
    at.format("%Y-%m-%d %H:%M:%S").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_iso_timestamp_format() {
        let at = Utc.with_ymd_and_hms(2024, 1, 15, 10, 30, 0).unwrap()
            + chrono::Duration::microseconds(123_456);
        assert_eq!(iso_timestamp(at), "2024-01-15T10:30:00.123456+00:00");
    }

    #[test]
    fn test_display_timestamp() {
        let at = Utc.with_ymd_and_hms(2024, 1, 15, 9, 5, 7).unwrap();
        assert_eq!(display_timestamp(at), "2024-01-15 09:05:07");
    }
}
