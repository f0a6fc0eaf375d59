//! Declarative harmonization tables: how each raw source type maps onto the
//! canonical [`WeatherRecord`](crate::WeatherRecord) columns.

use crate::types::weather_record::{
    DATETIME_UTC, HUMIDITY, INGESTION_TIMESTAMP, PRESSURE_MBAR, TEMP_C, WEATHER_SUMMARY,
    WIND_SPEED_KMH,
};
use polars::prelude::{col, lit, DataType, Expr, NULL};
use std::fmt;

/// Summary literal injected for every row coming from the live feed.
pub const LIVE_FEED_SUMMARY: &str = "API Forecast";

/// The kinds of raw artifact found in the raw zone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceKind {
    /// The bulk historical CSV snapshot (one file, replaced on each ingestion).
    Historical,
    /// A batch produced by one run of the (simulated) live weather API.
    LiveFeed,
}

/// The canonical fields every source is harmonized onto, in output order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CanonicalField {
    DatetimeUtc,
    TempC,
    Humidity,
    WindSpeedKmh,
    PressureMbar,
    WeatherSummary,
    IngestionTimestamp,
}

impl CanonicalField {
    pub const ALL: [CanonicalField; 7] = [
        CanonicalField::DatetimeUtc,
        CanonicalField::TempC,
        CanonicalField::Humidity,
        CanonicalField::WindSpeedKmh,
        CanonicalField::PressureMbar,
        CanonicalField::WeatherSummary,
        CanonicalField::IngestionTimestamp,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            CanonicalField::DatetimeUtc => DATETIME_UTC,
            CanonicalField::TempC => TEMP_C,
            CanonicalField::Humidity => HUMIDITY,
            CanonicalField::WindSpeedKmh => WIND_SPEED_KMH,
            CanonicalField::PressureMbar => PRESSURE_MBAR,
            CanonicalField::WeatherSummary => WEATHER_SUMMARY,
            CanonicalField::IngestionTimestamp => INGESTION_TIMESTAMP,
        }
    }

    /// Column type right after harmonization. Timestamps stay textual until
    /// the cleaning step parses them, so every source concatenates cleanly.
    pub(crate) fn harmonized_dtype(&self) -> DataType {
        match self {
            CanonicalField::DatetimeUtc
            | CanonicalField::WeatherSummary
            | CanonicalField::IngestionTimestamp => DataType::String,
            CanonicalField::TempC
            | CanonicalField::Humidity
            | CanonicalField::WindSpeedKmh
            | CanonicalField::PressureMbar => DataType::Float64,
        }
    }
}

/// Where a canonical field's values come from for a given source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldSource {
    /// Copied (and cast) from the named source column. The column must exist.
    Column(&'static str),
    /// The source does not provide this field; filled with nulls.
    Null,
    /// Filled with a constant text value.
    Literal(&'static str),
}

/// One row of a harmonization table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldMapping {
    pub canonical: CanonicalField,
    pub source: FieldSource,
}

impl FieldMapping {
    const fn column(canonical: CanonicalField, name: &'static str) -> Self {
        Self {
            canonical,
            source: FieldSource::Column(name),
        }
    }

    const fn fill(canonical: CanonicalField, source: FieldSource) -> Self {
        Self { canonical, source }
    }

    /// Polars expression producing this canonical column from a source frame.
    pub(crate) fn to_expr(&self) -> Expr {
        let dtype = self.canonical.harmonized_dtype();
        let expr = match self.source {
            FieldSource::Column(name) => col(name).cast(dtype),
            FieldSource::Null => lit(NULL).cast(dtype),
            FieldSource::Literal(value) => lit(value).cast(dtype),
        };
        expr.alias(self.canonical.name())
    }
}

static HISTORICAL_MAPPING: [FieldMapping; 7] = [
    FieldMapping::column(CanonicalField::DatetimeUtc, "Formatted Date"),
    FieldMapping::column(CanonicalField::TempC, "Temperature (C)"),
    FieldMapping::column(CanonicalField::Humidity, "Humidity"),
    FieldMapping::column(CanonicalField::WindSpeedKmh, "Wind Speed (km/h)"),
    FieldMapping::column(CanonicalField::PressureMbar, "Pressure (millibars)"),
    FieldMapping::column(CanonicalField::WeatherSummary, "Summary"),
    FieldMapping::column(CanonicalField::IngestionTimestamp, INGESTION_TIMESTAMP),
];

static LIVE_FEED_MAPPING: [FieldMapping; 7] = [
    FieldMapping::column(CanonicalField::DatetimeUtc, "date"),
    FieldMapping::column(CanonicalField::TempC, "temp_c"),
    FieldMapping::column(CanonicalField::Humidity, "humidity"),
    FieldMapping::fill(CanonicalField::WindSpeedKmh, FieldSource::Null),
    FieldMapping::fill(CanonicalField::PressureMbar, FieldSource::Null),
    FieldMapping::fill(
        CanonicalField::WeatherSummary,
        FieldSource::Literal(LIVE_FEED_SUMMARY),
    ),
    FieldMapping::column(CanonicalField::IngestionTimestamp, INGESTION_TIMESTAMP),
];

impl SourceKind {
    pub(crate) fn label(&self) -> &'static str {
        match self {
            SourceKind::Historical => "historical",
            SourceKind::LiveFeed => "live-feed",
        }
    }

    /// The harmonization table for this source, in canonical column order.
    pub fn mapping(&self) -> &'static [FieldMapping] {
        match self {
            SourceKind::Historical => &HISTORICAL_MAPPING,
            SourceKind::LiveFeed => &LIVE_FEED_MAPPING,
        }
    }

    /// Source columns that must be present for the mapping to apply.
    pub fn required_source_columns(&self) -> impl Iterator<Item = &'static str> {
        self.mapping().iter().filter_map(|m| match m.source {
            FieldSource::Column(name) => Some(name),
            FieldSource::Null | FieldSource::Literal(_) => None,
        })
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}
