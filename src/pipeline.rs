//! Entry point tying the three stages to one [`PipelineConfig`].

use crate::config::PipelineConfig;
use crate::dag::{run_dag, DagRun, Task, TaskExecutor};
use crate::error::WeatherOpsError;
use crate::ingestion::collector::{IngestionCollector, IngestionReport};
use crate::transform::engine::{TransformEngine, TransformOutcome};
use crate::warehouse::bigquery::BigQueryConnector;
use crate::warehouse::client::WarehouseConnector;
use crate::warehouse::loader::{LoadOutcome, WarehouseLoader};
use async_trait::async_trait;

/// The weather batch pipeline.
///
/// # Examples
///
/// ```no_run
/// # use weather_ops::{PipelineConfig, WeatherOps};
/// # async fn run() {
/// let ops = WeatherOps::new(PipelineConfig::default());
/// let dag_run = ops.run_all().await;
/// println!("pipeline succeeded: {}", dag_run.succeeded());
/// # }
/// ```
pub struct WeatherOps<C = BigQueryConnector> {
    config: PipelineConfig,
    collector: IngestionCollector,
    engine: TransformEngine,
    loader: WarehouseLoader<C>,
}

impl WeatherOps<BigQueryConnector> {
    pub fn new(config: PipelineConfig) -> Self {
        let loader = WarehouseLoader::new(&config);
        Self::with_loader(config, loader)
    }
}

impl<C: WarehouseConnector> WeatherOps<C> {
    /// Uses a custom warehouse connector, e.g. a different warehouse or a test double.
    pub fn with_connector(config: PipelineConfig, connector: C) -> Self {
        let loader = WarehouseLoader::with_connector(&config, connector);
        Self::with_loader(config, loader)
    }

    fn with_loader(config: PipelineConfig, loader: WarehouseLoader<C>) -> Self {
        Self {
            collector: IngestionCollector::new(&config),
            engine: TransformEngine::new(&config),
            loader,
            config,
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// `fetch_weather_data`: collects both sources into the raw zone.
    pub async fn fetch(&self) -> IngestionReport {
        self.collector.run().await
    }

    /// `transform_weather_data`: rebuilds the curated artifact from the raw zone.
    pub async fn transform(&self) -> TransformOutcome {
        self.engine.run().await
    }

    /// `load_to_bigquery`: replaces the warehouse table with the curated artifact.
    pub async fn load(&self) -> LoadOutcome {
        self.loader.run().await
    }

    /// Runs one task and reduces its outcome to success or failure.
    ///
    /// Ingestion fails only if neither source produced an artifact. A transform that found
    /// nothing to do is a success.
    pub async fn run_task(&self, task: Task) -> Result<(), WeatherOpsError> {
        match task {
            Task::FetchWeatherData => {
                let report = self.fetch().await;
                if report.produced_artifacts() {
                    Ok(())
                } else {
                    Err(match report.live {
                        Err(e) => e.into(),
                        Ok(_) => WeatherOpsError::NothingIngested,
                    })
                }
            }
            Task::TransformWeatherData => match self.transform().await {
                TransformOutcome::Failed(e) => Err(e.into()),
                TransformOutcome::Written { .. } | TransformOutcome::NothingToTransform => Ok(()),
            },
            Task::LoadToBigQuery => match self.load().await {
                LoadOutcome::Loaded(_) => Ok(()),
                LoadOutcome::Failed { error, .. } => Err(error.into()),
            },
        }
    }

    /// Runs the whole chain with the configured retry policy.
    pub async fn run_all(&self) -> DagRun {
        run_dag(self, &self.config.retry_policy()).await
    }
}

#[async_trait]
impl<C: WarehouseConnector> TaskExecutor for WeatherOps<C> {
    async fn execute(&self, task: Task) -> Result<(), WeatherOpsError> {
        self.run_task(task).await
    }
}
