use crate::config::PipelineConfig;
use crate::utils::error_chain;
use crate::warehouse::bigquery::BigQueryConnector;
use crate::warehouse::client::{DatasetStatus, LoadJobConfig, TableRef, WarehouseConnector};
use crate::warehouse::error::WarehouseError;
use log::{error, info};
use std::fmt;
use std::io;
use std::path::PathBuf;
use tokio::fs;

/// Progress of one warehouse load.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadState {
    Unauthenticated,
    Authenticated,
    DatasetReady,
    JobSubmitted,
    JobSucceeded,
    JobFailed,
}

impl fmt::Display for LoadState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LoadState::Unauthenticated => "unauthenticated",
            LoadState::Authenticated => "authenticated",
            LoadState::DatasetReady => "dataset-ready",
            LoadState::JobSubmitted => "job-submitted",
            LoadState::JobSucceeded => "job-succeeded",
            LoadState::JobFailed => "job-failed",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadReport {
    pub table: TableRef,
    pub bytes_uploaded: usize,
    /// Row count of the table as reported after the load.
    pub rows_in_table: u64,
}

#[derive(Debug)]
pub enum LoadOutcome {
    Loaded(LoadReport),
    Failed {
        /// Last state reached before the error.
        state: LoadState,
        error: WarehouseError,
    },
}

/// Logs and records every state change of a load.
struct StateTracker {
    state: LoadState,
    table: String,
}

impl StateTracker {
    fn advance(&mut self, next: LoadState) {
        info!("Warehouse load of {}: {} -> {}", self.table, self.state, next);
        self.state = next;
    }
}

/// Loads the curated artifact into the warehouse table, replacing its contents.
pub struct WarehouseLoader<C = BigQueryConnector> {
    connector: C,
    credential_path: PathBuf,
    curated_path: PathBuf,
    table: TableRef,
    job_config: LoadJobConfig,
}

impl WarehouseLoader<BigQueryConnector> {
    pub fn new(config: &PipelineConfig) -> Self {
        Self::with_connector(config, BigQueryConnector::new(config.job_poll_interval()))
    }
}

impl<C: WarehouseConnector> WarehouseLoader<C> {
    pub fn with_connector(config: &PipelineConfig, connector: C) -> Self {
        Self {
            connector,
            credential_path: config.credential_path.clone(),
            curated_path: config.curated_artifact_path.clone(),
            table: config.table_ref(),
            job_config: LoadJobConfig::default(),
        }
    }

    async fn read_curated(&self) -> Result<Vec<u8>, WarehouseError> {
        fs::read(&self.curated_path).await.map_err(|e| {
            if e.kind() == io::ErrorKind::NotFound {
                WarehouseError::CuratedArtifactMissing(self.curated_path.clone())
            } else {
                WarehouseError::CuratedArtifactRead(self.curated_path.clone(), e)
            }
        })
    }

    async fn load_tracked(&self, tracker: &mut StateTracker) -> Result<LoadReport, WarehouseError> {
        let warehouse = self
            .connector
            .connect(&self.credential_path, &self.table.project_id)
            .await?;
        tracker.advance(LoadState::Authenticated);

        match warehouse.dataset_status(&self.table).await {
            DatasetStatus::Exists => info!("Dataset {} exists", self.table.dataset_path()),
            DatasetStatus::NotFound => {
                info!("Dataset {} not found, creating it", self.table.dataset_path());
                warehouse.create_dataset(&self.table).await?;
            }
            DatasetStatus::CheckFailed(detail) => {
                return Err(WarehouseError::DatasetCheck {
                    dataset: self.table.dataset_path(),
                    detail,
                })
            }
        }
        tracker.advance(LoadState::DatasetReady);

        let data = self.read_curated().await?;
        let bytes_uploaded = data.len();
        let job = warehouse
            .submit_load(&self.table, &self.job_config, data)
            .await?;
        info!(
            "Submitted load job {} ({} bytes) into {}",
            job.job_id, bytes_uploaded, self.table
        );
        tracker.advance(LoadState::JobSubmitted);

        if let Err(e) = warehouse.wait_for_job(&job).await {
            tracker.advance(LoadState::JobFailed);
            return Err(e);
        }
        tracker.advance(LoadState::JobSucceeded);

        let rows_in_table = warehouse.table_row_count(&self.table).await?;
        info!("Table {} now holds {} rows", self.table, rows_in_table);
        Ok(LoadReport {
            table: self.table.clone(),
            bytes_uploaded,
            rows_in_table,
        })
    }

    /// Authenticates, makes sure the dataset exists, then replaces the table with the
    /// curated artifact. Fails with the state reached when the error occurred.
    pub async fn load_curated_to_warehouse(&self) -> Result<LoadReport, (LoadState, WarehouseError)> {
        let mut tracker = StateTracker {
            state: LoadState::Unauthenticated,
            table: self.table.to_string(),
        };
        self.load_tracked(&mut tracker)
            .await
            .map_err(|e| (tracker.state, e))
    }

    /// Like [`load_curated_to_warehouse`](Self::load_curated_to_warehouse), but logs the
    /// failure with an operator-facing message instead of returning it as an error.
    pub async fn run(&self) -> LoadOutcome {
        info!("Starting warehouse load into {}", self.table);
        match self.load_curated_to_warehouse().await {
            Ok(report) => LoadOutcome::Loaded(report),
            Err((state, error)) => {
                match &error {
                    WarehouseError::CuratedArtifactMissing(path) => error!(
                        "Curated artifact {} not found, run the transform stage before loading",
                        path.display()
                    ),
                    other => error!("Warehouse load failed in state {}: {}", state, error_chain(other)),
                }
                LoadOutcome::Failed { state, error }
            }
        }
    }
}
