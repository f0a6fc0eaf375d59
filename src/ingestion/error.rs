use polars::error::PolarsError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum IngestionError {
    #[error("Failed to create raw zone directory '{0}'")]
    RawZoneCreation(PathBuf, #[source] std::io::Error),

    #[error("Failed to read historical source '{0}'")]
    SourceRead(PathBuf, #[source] PolarsError),

    #[error("Failed to stamp historical source '{0}' with its ingestion time")]
    Stamp(PathBuf, #[source] PolarsError),

    #[error("I/O error writing raw artifact '{0}'")]
    ArtifactWriteIo(PathBuf, #[source] std::io::Error),

    #[error("Encoding error writing CSV snapshot '{0}'")]
    CsvWrite(PathBuf, #[source] PolarsError),

    #[error("Encoding error writing JSON batch '{0}'")]
    JsonWrite(PathBuf, #[source] serde_json::Error),

    #[error("Background task failed to complete")]
    TaskJoin(#[from] tokio::task::JoinError),
}
