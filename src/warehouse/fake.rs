//! In-memory warehouse for tests. Load jobs parse the uploaded Parquet and apply
//! the write disposition to a row counter per table.

use crate::warehouse::client::{
    DatasetStatus, JobHandle, LoadJobConfig, TableRef, Warehouse, WarehouseConnector,
    WriteDisposition,
};
use crate::warehouse::error::WarehouseError;
use async_trait::async_trait;
use polars::prelude::*;
use std::collections::{HashMap, HashSet};
use std::io::Cursor;
use std::path::Path;
use std::sync::{Arc, Mutex};

#[derive(Debug, Default)]
struct FakeState {
    datasets: HashSet<String>,
    tables: HashMap<String, u64>,
    pending: HashMap<String, (TableRef, WriteDisposition, u64)>,
    created_datasets: usize,
    dataset_check_failure: Option<String>,
    job_failure: Option<String>,
    next_job: usize,
}

#[derive(Debug, Clone, Default)]
pub struct FakeWarehouse {
    state: Arc<Mutex<FakeState>>,
}

impl FakeWarehouse {
    fn with_state<T>(&self, f: impl FnOnce(&mut FakeState) -> T) -> T {
        let mut state = self.state.lock().unwrap();
        f(&mut state)
    }

    /// Creates the dataset and table with `rows` existing rows.
    pub fn seed_table(&self, table: &TableRef, rows: u64) {
        self.with_state(|s| {
            s.datasets.insert(table.dataset_path());
            s.tables.insert(table.to_string(), rows);
        });
    }

    pub fn fail_dataset_check(&self, detail: &str) {
        self.with_state(|s| s.dataset_check_failure = Some(detail.to_string()));
    }

    pub fn fail_jobs(&self, detail: &str) {
        self.with_state(|s| s.job_failure = Some(detail.to_string()));
    }

    pub fn has_dataset(&self, table: &TableRef) -> bool {
        self.with_state(|s| s.datasets.contains(&table.dataset_path()))
    }

    pub fn created_datasets(&self) -> usize {
        self.with_state(|s| s.created_datasets)
    }

    pub fn rows(&self, table: &TableRef) -> Option<u64> {
        self.with_state(|s| s.tables.get(&table.to_string()).copied())
    }
}

#[async_trait]
impl Warehouse for FakeWarehouse {
    async fn dataset_status(&self, table: &TableRef) -> DatasetStatus {
        self.with_state(|s| match &s.dataset_check_failure {
            Some(detail) => DatasetStatus::CheckFailed(detail.clone()),
            None if s.datasets.contains(&table.dataset_path()) => DatasetStatus::Exists,
            None => DatasetStatus::NotFound,
        })
    }

    async fn create_dataset(&self, table: &TableRef) -> Result<(), WarehouseError> {
        self.with_state(|s| {
            s.datasets.insert(table.dataset_path());
            s.created_datasets += 1;
        });
        Ok(())
    }

    async fn submit_load(
        &self,
        table: &TableRef,
        config: &LoadJobConfig,
        data: Vec<u8>,
    ) -> Result<JobHandle, WarehouseError> {
        let rows = ParquetReader::new(Cursor::new(data))
            .finish()
            .map(|df| df.height() as u64)
            .unwrap_or_default();
        let job_id = self.with_state(|s| {
            s.next_job += 1;
            let job_id = format!("job_{}", s.next_job);
            s.pending.insert(
                job_id.clone(),
                (table.clone(), config.write_disposition, rows),
            );
            job_id
        });
        Ok(JobHandle {
            project_id: table.project_id.clone(),
            job_id,
            location: None,
        })
    }

    async fn wait_for_job(&self, job: &JobHandle) -> Result<(), WarehouseError> {
        self.with_state(|s| {
            let (table, disposition, rows) = s.pending.remove(&job.job_id).ok_or_else(|| {
                WarehouseError::JobFailed {
                    job_id: job.job_id.clone(),
                    detail: "unknown job".to_string(),
                }
            })?;
            if let Some(detail) = &s.job_failure {
                return Err(WarehouseError::JobFailed {
                    job_id: job.job_id.clone(),
                    detail: detail.clone(),
                });
            }
            let current = s.tables.entry(table.to_string()).or_insert(0);
            *current = match disposition {
                WriteDisposition::WriteTruncate => rows,
            };
            Ok(())
        })
    }

    async fn table_row_count(&self, table: &TableRef) -> Result<u64, WarehouseError> {
        Ok(self.rows(table).unwrap_or_default())
    }
}

/// Connector handing out a shared [`FakeWarehouse`], or refusing the credentials.
#[derive(Debug, Clone)]
pub struct FakeConnector {
    warehouse: FakeWarehouse,
    reject: bool,
}

impl FakeConnector {
    pub fn new(warehouse: FakeWarehouse) -> Self {
        Self {
            warehouse,
            reject: false,
        }
    }

    pub fn rejecting(warehouse: FakeWarehouse) -> Self {
        Self {
            warehouse,
            reject: true,
        }
    }
}

#[async_trait]
impl WarehouseConnector for FakeConnector {
    async fn connect(
        &self,
        credential_path: &Path,
        _project_id: &str,
    ) -> Result<Box<dyn Warehouse>, WarehouseError> {
        if self.reject {
            return Err(WarehouseError::CredentialRead(
                credential_path.to_path_buf(),
                std::io::Error::new(std::io::ErrorKind::NotFound, "no key file"),
            ));
        }
        Ok(Box::new(self.warehouse.clone()))
    }
}
