mod config;
mod dag;
mod error;
mod ingestion;
mod pipeline;
mod raw_zone;
mod transform;
mod types;
mod utils;
mod warehouse;

#[cfg(test)]
mod test_support;

pub use config::{ConfigError, PipelineConfig};
pub use dag::{run_dag, DagRun, RetryPolicy, Task, TaskExecutor, TaskRun, TaskState, DAG_ID};
pub use error::WeatherOpsError;
pub use pipeline::WeatherOps;
pub use raw_zone::{RawZone, RawZoneError};
pub use utils::error_chain;

pub use ingestion::collector::{HistoricalOutcome, IngestionCollector, IngestionReport};
pub use ingestion::error::IngestionError;

pub use transform::cleaning::{clean_and_transform, WeatherFrameCleanExt};
pub use transform::curated::{read_curated, save_curated};
pub use transform::engine::{TransformEngine, TransformOutcome};
pub use transform::error::TransformError;
pub use transform::raw_loader::{LoadedSource, RawLoad};

pub use types::datetime::{iso_timestamp, parse_utc};
pub use types::live_observation::LiveObservation;
pub use types::source::{CanonicalField, FieldMapping, FieldSource, SourceKind};
pub use types::weather_record::*;

pub use warehouse::bigquery::{BigQueryClient, BigQueryConnector};
pub use warehouse::client::{
    DatasetStatus, JobHandle, LoadJobConfig, SourceFormat, TableRef, Warehouse,
    WarehouseConnector, WriteDisposition,
};
pub use warehouse::error::WarehouseError;
pub use warehouse::loader::{LoadOutcome, LoadReport, LoadState, WarehouseLoader};
