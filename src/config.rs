//! Pipeline configuration: every path and warehouse identifier the stages use.
//!
//! Components receive a [`PipelineConfig`] at construction instead of reading process-wide
//! constants, so tests can point each stage at temporary directories.

use crate::dag::RetryPolicy;
use crate::warehouse::client::TableRef;
use bon::Builder;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_HISTORICAL_SOURCE: &str = "/data/weatherHistory.csv";
pub const DEFAULT_RAW_ZONE: &str = "data/raw";
pub const DEFAULT_CURATED_ARTIFACT: &str = "data/processed/weather_processed_data.parquet";
pub const DEFAULT_CREDENTIAL_FILE: &str = "gcp_key.json";
pub const DEFAULT_PROJECT_ID: &str = "wagon-bootcamp-470119";
pub const DEFAULT_DATASET_ID: &str = "weather_data_lake";
pub const DEFAULT_TABLE_ID: &str = "weather_forecast_history";
pub const DEFAULT_JOB_POLL_INTERVAL_MS: u64 = 1_000;
pub const DEFAULT_TASK_RETRIES: u32 = 1;
pub const DEFAULT_RETRY_DELAY_SECS: u64 = 300;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file '{0}'")]
    Read(PathBuf, #[source] std::io::Error),

    #[error("Failed to parse config file '{0}'")]
    Parse(PathBuf, #[source] toml::de::Error),
}

/// Static configuration for one pipeline deployment.
///
/// Build one with [`PipelineConfig::builder`]; every option falls back to the
/// production default when not set.
///
/// ```
/// use weather_ops::PipelineConfig;
///
/// let config = PipelineConfig::builder()
///     .raw_zone_path("/tmp/weather/raw")
///     .curated_artifact_path("/tmp/weather/curated.parquet")
///     .live_batch_retention(30)
///     .build();
/// assert_eq!(config.dataset_id, "weather_data_lake");
/// ```
#[derive(Debug, Clone, PartialEq, Builder, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PipelineConfig {
    /// Bulk historical CSV read by the ingestion stage.
    #[builder(into, default = PathBuf::from(DEFAULT_HISTORICAL_SOURCE))]
    pub historical_source_path: PathBuf,
    #[builder(into, default = PathBuf::from(DEFAULT_RAW_ZONE))]
    pub raw_zone_path: PathBuf,
    #[builder(into, default = PathBuf::from(DEFAULT_CURATED_ARTIFACT))]
    pub curated_artifact_path: PathBuf,
    /// Service-account JSON key for the warehouse.
    #[builder(into, default = PathBuf::from(DEFAULT_CREDENTIAL_FILE))]
    pub credential_path: PathBuf,
    #[builder(into, default = DEFAULT_PROJECT_ID.to_string())]
    pub project_id: String,
    #[builder(into, default = DEFAULT_DATASET_ID.to_string())]
    pub dataset_id: String,
    #[builder(into, default = DEFAULT_TABLE_ID.to_string())]
    pub table_id: String,
    /// Keep only the newest N live-feed batches. `None` keeps every batch.
    pub live_batch_retention: Option<usize>,
    #[builder(default = DEFAULT_JOB_POLL_INTERVAL_MS)]
    pub job_poll_interval_ms: u64,
    /// Extra attempts the `run` command grants a failed task.
    #[builder(default = DEFAULT_TASK_RETRIES)]
    pub task_retries: u32,
    #[builder(default = DEFAULT_RETRY_DELAY_SECS)]
    pub retry_delay_secs: u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl PipelineConfig {
    /// Parses a TOML document. Missing keys take their defaults, unknown keys are rejected.
    pub fn from_toml_str(path: &Path, content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|e| ConfigError::Parse(path.to_path_buf(), e))
    }

    pub fn from_toml_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Read(path.to_path_buf(), e))?;
        Self::from_toml_str(path, &content)
    }

    /// Destination table of the warehouse load.
    pub fn table_ref(&self) -> TableRef {
        TableRef {
            project_id: self.project_id.clone(),
            dataset_id: self.dataset_id.clone(),
            table_id: self.table_id.clone(),
        }
    }

    pub fn job_poll_interval(&self) -> Duration {
        Duration::from_millis(self.job_poll_interval_ms)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            retries: self.task_retries,
            retry_delay: Duration::from_secs(self.retry_delay_secs),
        }
    }
}
