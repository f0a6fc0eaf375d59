use crate::config::ConfigError;
use crate::ingestion::error::IngestionError;
use crate::transform::error::TransformError;
use crate::warehouse::error::WarehouseError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum WeatherOpsError {
    #[error(transparent)]
    Ingestion(#[from] IngestionError),

    #[error(transparent)]
    Transform(#[from] TransformError),

    #[error(transparent)]
    Warehouse(#[from] WarehouseError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Ingestion wrote no raw artifact")]
    NothingIngested,
}
