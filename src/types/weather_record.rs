//! The canonical weather record and the names of the curated columns.

use crate::transform::error::TransformError;
use chrono::{DateTime, Utc};
use polars::prelude::*;

pub const DATETIME_UTC: &str = "datetime_utc";
pub const TEMP_C: &str = "temp_c";
pub const HUMIDITY: &str = "humidity";
pub const WIND_SPEED_KMH: &str = "wind_speed_kmh";
pub const PRESSURE_MBAR: &str = "pressure_mbar";
pub const WEATHER_SUMMARY: &str = "weather_summary";
pub const INGESTION_TIMESTAMP: &str = "ingestion_timestamp";
pub const DATE_DAY: &str = "date_day";
pub const TEMP_FAHRENHEIT: &str = "temp_fahrenheit";

/// Column order of the curated artifact.
pub const CURATED_COLUMNS: [&str; 9] = [
    DATETIME_UTC,
    TEMP_C,
    HUMIDITY,
    WIND_SPEED_KMH,
    PRESSURE_MBAR,
    WEATHER_SUMMARY,
    INGESTION_TIMESTAMP,
    DATE_DAY,
    TEMP_FAHRENHEIT,
];

/// One cleaned and enriched weather observation, as stored in the curated artifact.
///
/// `datetime_utc` and `temp_c` are always present once a row has survived cleaning.
/// `humidity` and `pressure_mbar` are only `None` when no row in the whole run
/// carried a value to impute from.
#[derive(Debug, PartialEq, Clone)]
pub struct WeatherRecord {
    pub datetime_utc: DateTime<Utc>,
    pub temp_c: f64,
    pub humidity: Option<f64>,
    pub wind_speed_kmh: Option<f64>,
    pub pressure_mbar: Option<f64>,
    pub weather_summary: Option<String>,
    pub ingestion_timestamp: Option<DateTime<Utc>>,
    /// Calendar day of `datetime_utc`, formatted `YYYY-MM-DD`.
    pub date_day: String,
    pub temp_fahrenheit: f64,
}

fn get_opt_float(column: &Column, idx: usize) -> Option<f64> {
    column.f64().ok().and_then(|ca| ca.get(idx))
}

fn get_opt_str(column: &Column, idx: usize) -> Option<String> {
    column
        .str()
        .ok()
        .and_then(|ca| ca.get(idx))
        .map(str::to_string)
}

fn get_opt_datetime(column: &Column, idx: usize) -> Option<DateTime<Utc>> {
    let ca = column.datetime().ok()?;
    let value = ca.get(idx)?;
    match ca.time_unit() {
        TimeUnit::Milliseconds => DateTime::from_timestamp_millis(value),
        TimeUnit::Microseconds => DateTime::from_timestamp_micros(value),
        TimeUnit::Nanoseconds => Some(DateTime::from_timestamp_nanos(value)),
    }
}

/// Collects a curated frame into typed records.
///
/// Fails with [`TransformError::MissingColumn`] if a curated column is absent and with
/// [`TransformError::UnexpectedNull`] if a row violates the cleaning invariant.
pub fn records_from_frame(df: &DataFrame) -> Result<Vec<WeatherRecord>, TransformError> {
    macro_rules! get_column {
        ($name:expr) => {
            df.column($name)
                .map_err(|_| TransformError::MissingColumn($name.to_string()))?
        };
    }

    let datetime = get_column!(DATETIME_UTC);
    let temp_c = get_column!(TEMP_C);
    let humidity = get_column!(HUMIDITY);
    let wind = get_column!(WIND_SPEED_KMH);
    let pressure = get_column!(PRESSURE_MBAR);
    let summary = get_column!(WEATHER_SUMMARY);
    let ingested = get_column!(INGESTION_TIMESTAMP);
    let date_day = get_column!(DATE_DAY);
    let fahrenheit = get_column!(TEMP_FAHRENHEIT);

    let unexpected_null = |column: &str, row: usize| TransformError::UnexpectedNull {
        column: column.to_string(),
        row,
    };

    (0..df.height())
        .map(|idx| {
            Ok(WeatherRecord {
                datetime_utc: get_opt_datetime(datetime, idx)
                    .ok_or_else(|| unexpected_null(DATETIME_UTC, idx))?,
                temp_c: get_opt_float(temp_c, idx).ok_or_else(|| unexpected_null(TEMP_C, idx))?,
                humidity: get_opt_float(humidity, idx),
                wind_speed_kmh: get_opt_float(wind, idx),
                pressure_mbar: get_opt_float(pressure, idx),
                weather_summary: get_opt_str(summary, idx),
                ingestion_timestamp: get_opt_datetime(ingested, idx),
                date_day: get_opt_str(date_day, idx)
                    .ok_or_else(|| unexpected_null(DATE_DAY, idx))?,
                temp_fahrenheit: get_opt_float(fahrenheit, idx)
                    .ok_or_else(|| unexpected_null(TEMP_FAHRENHEIT, idx))?,
            })
        })
        .collect()
}
