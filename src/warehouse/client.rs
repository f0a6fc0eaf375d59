//! The seam between the loader and a concrete warehouse service.

use crate::warehouse::error::WarehouseError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

/// Fully qualified destination table.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TableRef {
    pub project_id: String,
    pub dataset_id: String,
    pub table_id: String,
}

impl TableRef {
    /// `project.dataset`
    pub fn dataset_path(&self) -> String {
        format!("{}.{}", self.project_id, self.dataset_id)
    }
}

impl fmt::Display for TableRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.project_id, self.dataset_id, self.table_id)
    }
}

/// Result of asking whether a dataset exists. A failed check is kept apart from
/// "not found" so that a permissions or network problem never triggers a create.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DatasetStatus {
    Exists,
    NotFound,
    CheckFailed(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SourceFormat {
    Parquet,
}

/// Only full replacement is supported; every run reloads the whole curated artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WriteDisposition {
    WriteTruncate,
}

/// Options of a bulk load job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadJobConfig {
    pub source_format: SourceFormat,
    pub autodetect: bool,
    pub write_disposition: WriteDisposition,
}

impl Default for LoadJobConfig {
    /// Parquet with schema autodetection, replacing the table contents.
    fn default() -> Self {
        Self {
            source_format: SourceFormat::Parquet,
            autodetect: true,
            write_disposition: WriteDisposition::WriteTruncate,
        }
    }
}

/// A submitted load job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobHandle {
    pub project_id: String,
    pub job_id: String,
    pub location: Option<String>,
}

/// An authenticated connection to a warehouse.
#[async_trait]
pub trait Warehouse: Send + Sync {
    async fn dataset_status(&self, table: &TableRef) -> DatasetStatus;

    async fn create_dataset(&self, table: &TableRef) -> Result<(), WarehouseError>;

    /// Uploads `data` and starts a load job into `table`.
    async fn submit_load(
        &self,
        table: &TableRef,
        config: &LoadJobConfig,
        data: Vec<u8>,
    ) -> Result<JobHandle, WarehouseError>;

    /// Blocks until the job is done. A job that finished with an error yields
    /// [`WarehouseError::JobFailed`].
    async fn wait_for_job(&self, job: &JobHandle) -> Result<(), WarehouseError>;

    async fn table_row_count(&self, table: &TableRef) -> Result<u64, WarehouseError>;
}

/// Produces authenticated [`Warehouse`] connections from a credential file.
#[async_trait]
pub trait WarehouseConnector: Send + Sync {
    async fn connect(
        &self,
        credential_path: &Path,
        project_id: &str,
    ) -> Result<Box<dyn Warehouse>, WarehouseError>;
}
