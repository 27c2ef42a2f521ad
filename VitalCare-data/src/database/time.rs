//! Timestamp encoding shared by every table.
//!
//! Timestamps are stored as RFC 3339 UTC text with millisecond precision so
//! that string comparison in SQL matches chronological order.

use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use rusqlite::types::Type;

pub(crate) fn to_db_timestamp(value: &DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::Millis, true)
}

pub(crate) fn parse_db_timestamp(idx: usize, raw: String) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(&raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

pub(crate) fn to_db_date(value: &NaiveDate) -> String {
    value.format("%Y-%m-%d").to_string()
}

pub(crate) fn parse_db_date(idx: usize, raw: Option<String>) -> rusqlite::Result<Option<NaiveDate>> {
    match raw {
        Some(raw) => NaiveDate::parse_from_str(&raw, "%Y-%m-%d")
            .map(Some)
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e))),
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_timestamps_sort_lexically() {
        let earlier = Utc.with_ymd_and_hms(2024, 3, 9, 23, 59, 59).unwrap();
        let later = Utc.with_ymd_and_hms(2024, 3, 10, 0, 0, 0).unwrap();

        assert!(to_db_timestamp(&earlier) < to_db_timestamp(&later));
        assert_eq!(to_db_timestamp(&later), "2024-03-10T00:00:00.000Z");
    }

    #[test]
    fn test_timestamp_round_trip_and_bad_input() {
        let now = Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap();
        let parsed = parse_db_timestamp(0, to_db_timestamp(&now)).unwrap();
        assert_eq!(parsed, now);

        assert!(parse_db_timestamp(0, "yesterday".to_string()).is_err());
        assert_eq!(parse_db_date(0, None).unwrap(), None);
    }
}
