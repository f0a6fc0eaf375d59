use crate::raw_zone::RawZoneError;
use crate::types::source::SourceKind;
use polars::error::PolarsError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TransformError {
    #[error("Failed to read raw artifact '{0}'")]
    RawArtifactRead(PathBuf, #[source] PolarsError),

    #[error("Failed to open raw artifact '{0}'")]
    RawArtifactOpen(PathBuf, #[source] std::io::Error),

    #[error("Raw artifact '{path}' does not match the {source_kind} mapping, missing columns: {missing:?}")]
    SchemaMismatch {
        path: PathBuf,
        source_kind: SourceKind,
        missing: Vec<String>,
    },

    #[error("Failed to harmonize raw artifact '{0}'")]
    Harmonize(PathBuf, #[source] PolarsError),

    #[error("Failed to combine harmonized sources")]
    Combine(#[source] PolarsError),

    #[error("Failed to clean combined weather data")]
    Cleaning(#[source] PolarsError),

    #[error("I/O error writing curated artifact '{0}'")]
    ParquetWriteIo(PathBuf, #[source] std::io::Error),

    #[error("Encoding error writing curated artifact '{0}'")]
    ParquetWritePolars(PathBuf, #[source] PolarsError),

    #[error("Failed to open curated artifact '{0}'")]
    CuratedOpen(PathBuf, #[source] std::io::Error),

    #[error("Failed to read curated artifact '{0}'")]
    CuratedRead(PathBuf, #[source] PolarsError),

    #[error("Required column '{0}' not found in curated frame")]
    MissingColumn(String),

    #[error("Column '{column}' is null at row {row} in curated frame")]
    UnexpectedNull { column: String, row: usize },

    #[error(transparent)]
    RawZone(#[from] RawZoneError),

    #[error("Background task failed to complete")]
    TaskJoin(#[from] tokio::task::JoinError),
}
