//! Lenient UTC timestamp parsing for the mixed date formats found in raw artifacts.

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, TimeZone, Utc};
use polars::prelude::*;

/// Formats carrying an explicit UTC offset, e.g. `2006-04-01 00:00:00.000 +0200`.
const OFFSET_FORMATS: [&str; 3] = [
    "%Y-%m-%d %H:%M:%S%.f %z",
    "%Y-%m-%d %H:%M:%S%.f%z",
    "%Y-%m-%dT%H:%M:%S%.f%z",
];

/// Formats without an offset; these are taken to be UTC already.
const NAIVE_FORMATS: [&str; 3] = [
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
];

pub trait IntoUtcDateTime {
    fn into_utc(self) -> DateTime<Utc>;
}

impl IntoUtcDateTime for NaiveDateTime {
    fn into_utc(self) -> DateTime<Utc> {
        Utc.from_utc_datetime(&self)
    }
}

impl IntoUtcDateTime for DateTime<FixedOffset> {
    fn into_utc(self) -> DateTime<Utc> {
        self.with_timezone(&Utc)
    }
}

/// Parses a raw timestamp string into a UTC instant.
///
/// Offset-bearing values are converted to UTC, naive values are interpreted as UTC and
/// a bare `YYYY-MM-DD` means midnight. Returns `None` for anything else.
pub fn parse_utc(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.into_utc());
    }
    if let Some(dt) = OFFSET_FORMATS
        .iter()
        .find_map(|fmt| DateTime::parse_from_str(raw, fmt).ok())
    {
        return Some(dt.into_utc());
    }
    if let Some(ndt) = NAIVE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
    {
        return Some(ndt.into_utc());
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(IntoUtcDateTime::into_utc)
}

/// Renders an instant the way ingestion stamps records: ISO-8601 with microseconds and `Z`.
pub fn iso_timestamp(instant: DateTime<Utc>) -> String {
    instant.format("%Y-%m-%dT%H:%M:%S%.6fZ").to_string()
}

/// Replaces a textual column with a `Datetime(ms, UTC)` column.
/// Values that fail [`parse_utc`] become null.
pub(crate) fn parse_utc_column(df: &mut DataFrame, name: &str) -> PolarsResult<()> {
    let text = df.column(name)?.cast(&DataType::String)?;
    let millis: Int64Chunked = text
        .str()?
        .into_iter()
        .map(|value| value.and_then(parse_utc).map(|dt| dt.timestamp_millis()))
        .collect();
    let parsed = millis
        .with_name(PlSmallStr::from(name))
        .into_datetime(TimeUnit::Milliseconds, Some(PlSmallStr::from_static("UTC")))
        .into_series();
    df.with_column(parsed)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn utc(y: i32, m: u32, d: u32, h: u32, min: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, min, s).unwrap()
    }

    #[test]
    fn offset_timestamps_are_shifted_to_utc() {
        assert_eq!(
            parse_utc("2006-04-01 00:00:00.000 +0200"),
            Some(utc(2006, 3, 31, 22, 0, 0))
        );
        assert_eq!(
            parse_utc("2025-12-14T12:00:00+01:00"),
            Some(utc(2025, 12, 14, 11, 0, 0))
        );
    }

    #[test]
    fn naive_timestamps_are_taken_as_utc() {
        assert_eq!(
            parse_utc("2025-12-14 12:00:00"),
            Some(utc(2025, 12, 14, 12, 0, 0))
        );
        assert_eq!(parse_utc("2025-12-14"), Some(utc(2025, 12, 14, 0, 0, 0)));
    }

    #[test]
    fn ingestion_stamps_round_trip() {
        let now = utc(2025, 12, 14, 9, 30, 15);
        let stamp = iso_timestamp(now);
        assert_eq!(stamp, "2025-12-14T09:30:15.000000Z");
        assert_eq!(parse_utc(&stamp), Some(now));
    }

    #[test]
    fn garbage_is_rejected() {
        assert_eq!(parse_utc(""), None);
        assert_eq!(parse_utc("not a date"), None);
        assert_eq!(parse_utc("2025-13-40 99:00:00"), None);
    }

    #[test]
    fn column_parse_nulls_unparseable_values() -> PolarsResult<()> {
        let mut df = df!(
            "when" => [Some("2025-12-14 12:00:00"), Some("nope"), None],
        )?;
        parse_utc_column(&mut df, "when")?;

        let column = df.column("when")?;
        assert!(matches!(
            column.dtype(),
            DataType::Datetime(TimeUnit::Milliseconds, Some(_))
        ));
        assert_eq!(column.null_count(), 2);
        assert_eq!(
            column.datetime()?.get(0),
            Some(utc(2025, 12, 14, 12, 0, 0).timestamp_millis())
        );
        Ok(())
    }
}
