use crate::transform::error::TransformError;
use crate::types::datetime::parse_utc_column;
use crate::types::weather_record::{
    CURATED_COLUMNS, DATETIME_UTC, DATE_DAY, HUMIDITY, INGESTION_TIMESTAMP, PRESSURE_MBAR, TEMP_C,
    TEMP_FAHRENHEIT,
};
use log::info;
use polars::prelude::{col, lit, DataFrame, Expr, IntoLazy, LazyFrame};

/// Columns whose nulls are replaced by the column mean.
pub const IMPUTED_COLUMNS: [&str; 2] = [HUMIDITY, PRESSURE_MBAR];

pub trait WeatherFrameCleanExt {
    /// Drops rows without a parsed `datetime_utc` or without a `temp_c`.
    fn drop_incomplete_rows(self) -> LazyFrame;

    /// Fills nulls in each of `columns` with the mean of that column's non-null values.
    /// The mean is taken over the frame as it is at this point in the plan, so call
    /// this after [`drop_incomplete_rows`](Self::drop_incomplete_rows).
    fn impute_with_mean(self, columns: &[&str]) -> LazyFrame;

    /// Adds `date_day` (`YYYY-MM-DD`) and `temp_fahrenheit`.
    /// Expects `datetime_utc` to be a datetime column already.
    fn with_enrichment(self) -> LazyFrame;
}

impl WeatherFrameCleanExt for LazyFrame {
    fn drop_incomplete_rows(self) -> LazyFrame {
        self.filter(
            col(DATETIME_UTC)
                .is_not_null()
                .and(col(TEMP_C).is_not_null()),
        )
    }

    fn impute_with_mean(self, columns: &[&str]) -> LazyFrame {
        let fills: Vec<Expr> = columns
            .iter()
            .map(|name| col(*name).fill_null(col(*name).mean()))
            .collect();
        self.with_columns(fills)
    }

    fn with_enrichment(self) -> LazyFrame {
        self.with_columns([
            col(DATETIME_UTC).dt().strftime("%Y-%m-%d").alias(DATE_DAY),
            (col(TEMP_C) * lit(9.0) / lit(5.0) + lit(32.0)).alias(TEMP_FAHRENHEIT),
        ])
    }
}

/// Parses, cleans, imputes and enriches the combined raw frame.
///
/// `datetime_utc` and `ingestion_timestamp` arrive as text and leave as UTC datetimes.
/// Rows with an unparseable `datetime_utc` or a null `temp_c` are dropped; an
/// unparseable `ingestion_timestamp` only becomes null. `None` passes through.
pub fn clean_and_transform(combined: Option<DataFrame>) -> Result<Option<DataFrame>, TransformError> {
    let Some(mut df) = combined else {
        return Ok(None);
    };
    let rows_in = df.height();

    parse_utc_column(&mut df, DATETIME_UTC).map_err(TransformError::Cleaning)?;
    parse_utc_column(&mut df, INGESTION_TIMESTAMP).map_err(TransformError::Cleaning)?;

    let projection: Vec<Expr> = CURATED_COLUMNS.iter().map(|name| col(*name)).collect();
    let cleaned = df
        .lazy()
        .drop_incomplete_rows()
        .impute_with_mean(&IMPUTED_COLUMNS)
        .with_enrichment()
        .select(projection)
        .collect()
        .map_err(TransformError::Cleaning)?;

    info!(
        "{} of {} rows remain after cleaning",
        cleaned.height(),
        rows_in
    );
    Ok(Some(cleaned))
}
