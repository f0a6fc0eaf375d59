use crate::config::PipelineConfig;
use crate::raw_zone::RawZone;
use crate::transform::cleaning::clean_and_transform;
use crate::transform::curated::save_curated;
use crate::transform::error::TransformError;
use crate::transform::raw_loader::{load_raw_zone, RawLoad};
use crate::utils::error_chain;
use log::{error, info, warn};
use polars::prelude::DataFrame;
use std::path::{Path, PathBuf};
use tokio::task;

/// How a transform run ended.
#[derive(Debug)]
pub enum TransformOutcome {
    Written {
        path: PathBuf,
        rows_loaded: usize,
        rows_curated: usize,
    },
    /// No raw data could be loaded, or nothing survived cleaning. The previous curated
    /// artifact, if any, is left in place.
    NothingToTransform,
    Failed(TransformError),
}

/// Turns the raw zone into the curated Parquet artifact.
#[derive(Debug, Clone)]
pub struct TransformEngine {
    raw_zone: RawZone,
    curated_path: PathBuf,
}

impl TransformEngine {
    pub fn new(config: &PipelineConfig) -> Self {
        Self {
            raw_zone: RawZone::new(&config.raw_zone_path),
            curated_path: config.curated_artifact_path.clone(),
        }
    }

    pub fn curated_path(&self) -> &Path {
        &self.curated_path
    }

    /// Loads and harmonizes every raw artifact. See [`RawLoad`].
    pub async fn load_raw(&self) -> Result<Option<RawLoad>, TransformError> {
        let raw_zone = self.raw_zone.clone();
        task::spawn_blocking(move || load_raw_zone(&raw_zone)).await?
    }

    pub async fn clean_and_transform(
        &self,
        combined: Option<DataFrame>,
    ) -> Result<Option<DataFrame>, TransformError> {
        task::spawn_blocking(move || clean_and_transform(combined)).await?
    }

    pub async fn save_curated(&self, df: Option<DataFrame>) -> Result<Option<usize>, TransformError> {
        save_curated(df, &self.curated_path).await
    }

    async fn try_run(&self) -> Result<TransformOutcome, TransformError> {
        let Some(load) = self.load_raw().await? else {
            return Ok(TransformOutcome::NothingToTransform);
        };
        let rows_loaded = load.rows();
        let cleaned = self.clean_and_transform(Some(load.frame)).await?;
        match self.save_curated(cleaned).await? {
            Some(rows_curated) => Ok(TransformOutcome::Written {
                path: self.curated_path.clone(),
                rows_loaded,
                rows_curated,
            }),
            None => Ok(TransformOutcome::NothingToTransform),
        }
    }

    /// Runs load, clean and save. Errors are logged and returned inside the outcome.
    pub async fn run(&self) -> TransformOutcome {
        info!("Starting transform of {}", self.raw_zone.root().display());
        match self.try_run().await {
            Ok(outcome) => {
                match &outcome {
                    TransformOutcome::Written {
                        path,
                        rows_loaded,
                        rows_curated,
                    } => info!(
                        "Transform finished: {} raw rows, {} curated rows in {}",
                        rows_loaded,
                        rows_curated,
                        path.display()
                    ),
                    _ => warn!("Transform finished without writing a curated artifact"),
                }
                outcome
            }
            Err(e) => {
                error!("Transform failed: {}", error_chain(&e));
                TransformOutcome::Failed(e)
            }
        }
    }
}
