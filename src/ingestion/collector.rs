use crate::config::PipelineConfig;
use crate::ingestion::error::IngestionError;
use crate::raw_zone::RawZone;
use crate::types::datetime::iso_timestamp;
use crate::types::live_observation::simulated_api_response;
use crate::types::weather_record::INGESTION_TIMESTAMP;
use crate::utils::{ensure_dir_exists, write_atomically};
use chrono::{DateTime, Utc};
use log::{error, info, warn};
use polars::prelude::*;
use std::io;
use std::path::PathBuf;
use tokio::{fs, task};

/// What happened to the historical source during one ingestion run.
#[derive(Debug, Clone, PartialEq)]
pub enum HistoricalOutcome {
    /// The stamped snapshot was written to the raw zone.
    Written { path: PathBuf, rows: usize },
    /// The source file does not exist; nothing was written.
    SourceMissing,
}

/// Result of both ingestion sub-operations. Each one succeeds or fails on its own.
#[derive(Debug)]
pub struct IngestionReport {
    pub historical: Result<HistoricalOutcome, IngestionError>,
    pub live: Result<PathBuf, IngestionError>,
}

impl IngestionReport {
    /// Whether this run left at least one new raw artifact behind.
    pub fn produced_artifacts(&self) -> bool {
        matches!(self.historical, Ok(HistoricalOutcome::Written { .. })) || self.live.is_ok()
    }
}

/// Collects the historical snapshot and the live feed into the raw zone.
#[derive(Debug, Clone)]
pub struct IngestionCollector {
    source_path: PathBuf,
    raw_zone: RawZone,
    live_batch_retention: Option<usize>,
}

impl IngestionCollector {
    pub fn new(config: &PipelineConfig) -> Self {
        Self {
            source_path: config.historical_source_path.clone(),
            raw_zone: RawZone::new(&config.raw_zone_path),
            live_batch_retention: config.live_batch_retention,
        }
    }

    /// Runs both collectors, logging every outcome. Never fails as a whole.
    pub async fn run(&self) -> IngestionReport {
        self.run_at(Utc::now()).await
    }

    pub(crate) async fn run_at(&self, now: DateTime<Utc>) -> IngestionReport {
        info!("Starting ingestion into {}", self.raw_zone.root().display());

        let historical = self.collect_historical_at(now).await;
        match &historical {
            Ok(HistoricalOutcome::Written { path, rows }) => {
                info!("Historical snapshot ({} rows) saved to {}", rows, path.display())
            }
            Ok(HistoricalOutcome::SourceMissing) => {}
            Err(e) => error!("Historical ingestion failed: {}", crate::utils::error_chain(e)),
        }

        let live = self.collect_live_at(now).await;
        match &live {
            Ok(path) => info!("Live batch saved to {}", path.display()),
            Err(e) => error!("Live ingestion failed: {}", crate::utils::error_chain(e)),
        }

        info!("Ingestion finished");
        IngestionReport { historical, live }
    }

    /// Copies the historical CSV into the raw zone with an `ingestion_timestamp` column.
    ///
    /// A missing source is logged as a warning and reported as
    /// [`HistoricalOutcome::SourceMissing`]; read errors leave the raw zone untouched.
    pub async fn collect_historical(&self) -> Result<HistoricalOutcome, IngestionError> {
        self.collect_historical_at(Utc::now()).await
    }

    pub(crate) async fn collect_historical_at(
        &self,
        now: DateTime<Utc>,
    ) -> Result<HistoricalOutcome, IngestionError> {
        info!("Reading historical source {}", self.source_path.display());
        if let Err(e) = fs::metadata(&self.source_path).await {
            if e.kind() == io::ErrorKind::NotFound {
                warn!(
                    "Historical source {} not found, skipping",
                    self.source_path.display()
                );
                return Ok(HistoricalOutcome::SourceMissing);
            }
        }

        let source = self.source_path.clone();
        let raw_root = self.raw_zone.root().to_path_buf();
        let dest = self.raw_zone.historical_snapshot_path();
        let stamp = iso_timestamp(now);

        task::spawn_blocking(move || {
            // all columns as text: the snapshot is a copy, typing happens in the transform
            let df = CsvReadOptions::default()
                .with_has_header(true)
                .with_infer_schema_length(Some(0))
                .try_into_reader_with_file_path(Some(source.clone()))
                .and_then(|reader| reader.finish())
                .map_err(|e| IngestionError::SourceRead(source.clone(), e))?;

            // one instant for the whole snapshot
            let mut stamped = df
                .lazy()
                .with_column(lit(stamp).alias(INGESTION_TIMESTAMP))
                .collect()
                .map_err(|e| IngestionError::Stamp(source.clone(), e))?;
            let rows = stamped.height();

            ensure_dir_exists(&raw_root)
                .map_err(|e| IngestionError::RawZoneCreation(raw_root.clone(), e))?;
            write_atomically(
                &dest,
                |e| IngestionError::ArtifactWriteIo(dest.clone(), e),
                |file| {
                    CsvWriter::new(file)
                        .include_header(true)
                        .finish(&mut stamped)
                        .map_err(|e| IngestionError::CsvWrite(dest.clone(), e))
                },
            )?;

            Ok(HistoricalOutcome::Written { path: dest, rows })
        })
        .await?
    }

    /// Calls the (simulated) weather API and stores the stamped batch as a new JSON file.
    /// Earlier batches are never overwritten.
    pub async fn collect_live(&self) -> Result<PathBuf, IngestionError> {
        self.collect_live_at(Utc::now()).await
    }

    pub(crate) async fn collect_live_at(
        &self,
        now: DateTime<Utc>,
    ) -> Result<PathBuf, IngestionError> {
        info!("Calling simulated weather API");
        let stamp = iso_timestamp(now);
        let mut batch = simulated_api_response();
        for record in &mut batch {
            record.ingestion_timestamp = stamp.clone();
        }
        info!("Stamped {} live records with {}", batch.len(), stamp);

        let raw_zone = self.raw_zone.clone();
        let retention = self.live_batch_retention;

        task::spawn_blocking(move || {
            let root = raw_zone.root();
            ensure_dir_exists(root)
                .map_err(|e| IngestionError::RawZoneCreation(root.to_path_buf(), e))?;

            let path = raw_zone.next_live_batch_path(now);
            write_atomically(
                &path,
                |e| IngestionError::ArtifactWriteIo(path.clone(), e),
                |file| {
                    serde_json::to_writer_pretty(file, &batch)
                        .map_err(|e| IngestionError::JsonWrite(path.clone(), e))
                },
            )?;

            // the batch is safely written; a failed prune only costs disk space
            if let Some(keep) = retention {
                if let Err(e) = raw_zone.prune_live_batches(keep) {
                    warn!("Live batch retention failed: {}", crate::utils::error_chain(&e));
                }
            }
            Ok(path)
        })
        .await?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::raw_zone::HISTORICAL_SNAPSHOT_FILE;
    use crate::test_support::{write_history_csv, HISTORY_ROWS};
    use crate::types::live_observation::LiveObservation;
    use chrono::TimeZone;
    use tempfile::TempDir;

    fn collector(tmp: &TempDir, retention: Option<usize>) -> IngestionCollector {
        let config = PipelineConfig::builder()
            .historical_source_path(tmp.path().join("weatherHistory.csv"))
            .raw_zone_path(tmp.path().join("raw"))
            .maybe_live_batch_retention(retention)
            .build();
        IngestionCollector::new(&config)
    }

    fn noon() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 12, 14, 12, 0, 0).unwrap()
    }

    #[tokio::test]
    async fn historical_snapshot_gets_one_ingestion_timestamp() -> Result<(), Box<dyn std::error::Error>>
    {
        let tmp = TempDir::new()?;
        write_history_csv(&tmp.path().join("weatherHistory.csv"), &HISTORY_ROWS);

        let outcome = collector(&tmp, None).collect_historical_at(noon()).await?;
        let expected_path = tmp.path().join("raw").join(HISTORICAL_SNAPSHOT_FILE);
        assert_eq!(
            outcome,
            HistoricalOutcome::Written {
                path: expected_path.clone(),
                rows: 3
            }
        );

        let snapshot = CsvReadOptions::default()
            .with_has_header(true)
            .try_into_reader_with_file_path(Some(expected_path))?
            .finish()?;
        assert_eq!(snapshot.height(), 3);
        let stamps = snapshot.column(INGESTION_TIMESTAMP)?.str()?;
        assert!(stamps
            .into_iter()
            .all(|s| s == Some("2025-12-14T12:00:00.000000Z")));
        Ok(())
    }

    #[tokio::test]
    async fn missing_historical_source_is_skipped() -> Result<(), IngestionError> {
        let tmp = TempDir::new().unwrap();
        let outcome = collector(&tmp, None).collect_historical_at(noon()).await?;
        assert_eq!(outcome, HistoricalOutcome::SourceMissing);
        assert!(!tmp.path().join("raw").join(HISTORICAL_SNAPSHOT_FILE).exists());
        Ok(())
    }

    #[tokio::test]
    async fn unreadable_historical_source_writes_nothing() {
        let tmp = TempDir::new().unwrap();
        // a directory where the CSV should be
        std::fs::create_dir(tmp.path().join("weatherHistory.csv")).unwrap();

        let result = collector(&tmp, None).collect_historical_at(noon()).await;
        assert!(matches!(result, Err(IngestionError::SourceRead(_, _))));
        assert!(!tmp.path().join("raw").join(HISTORICAL_SNAPSHOT_FILE).exists());
    }

    #[tokio::test]
    async fn live_batch_is_stamped_and_never_overwritten() -> Result<(), Box<dyn std::error::Error>> {
        let tmp = TempDir::new()?;
        let collector = collector(&tmp, None);

        let first = collector.collect_live_at(noon()).await?;
        let second = collector.collect_live_at(noon()).await?;
        assert_ne!(first, second);
        assert!(first.ends_with("weather_api_20251214120000.json"));

        let batch: Vec<LiveObservation> = serde_json::from_slice(&std::fs::read(&first)?)?;
        let cities: Vec<&str> = batch.iter().map(|r| r.city.as_str()).collect();
        assert_eq!(cities, ["Rabat", "Paris", "Casablanca"]);
        assert!(batch
            .iter()
            .all(|r| r.ingestion_timestamp == "2025-12-14T12:00:00.000000Z"));
        Ok(())
    }

    #[tokio::test]
    async fn retention_prunes_old_batches() -> Result<(), IngestionError> {
        let tmp = TempDir::new().unwrap();
        let collector = collector(&tmp, Some(2));
        for minute in 0..4 {
            let now = Utc.with_ymd_and_hms(2025, 12, 14, 12, minute, 0).unwrap();
            collector.collect_live_at(now).await?;
        }
        let remaining = RawZone::new(&tmp.path().join("raw"))
            .live_batches()
            .unwrap();
        assert_eq!(remaining.len(), 2);
        assert!(remaining[1].ends_with("weather_api_20251214120300.json"));
        Ok(())
    }

    #[tokio::test]
    async fn late_fractional_values_are_copied_verbatim() -> Result<(), Box<dyn std::error::Error>> {
        let tmp = TempDir::new()?;
        let rows: Vec<String> = (0..150)
            .map(|i| {
                let pressure = if i < 120 { "1015" } else { "1015.5" };
                format!(
                    "2006-04-01 00:00:00.000 +0200,Clear,rain,9.5,7.4,0.89,14.1,251.0,15.8,0.0,{pressure},Clear."
                )
            })
            .collect();
        let rows: Vec<&str> = rows.iter().map(String::as_str).collect();
        write_history_csv(&tmp.path().join("weatherHistory.csv"), &rows);

        let outcome = collector(&tmp, None).collect_historical_at(noon()).await?;
        assert!(matches!(outcome, HistoricalOutcome::Written { rows: 150, .. }));

        let snapshot = CsvReadOptions::default()
            .with_has_header(true)
            .with_infer_schema_length(Some(0))
            .try_into_reader_with_file_path(Some(
                tmp.path().join("raw").join(HISTORICAL_SNAPSHOT_FILE),
            ))?
            .finish()?;
        let pressure = snapshot.column("Pressure (millibars)")?.str()?;
        assert_eq!(pressure.get(0), Some("1015"));
        assert_eq!(pressure.get(149), Some("1015.5"));
        Ok(())
    }

    #[tokio::test]
    async fn failed_writes_are_reported_per_source() {
        let tmp = TempDir::new().unwrap();
        write_history_csv(&tmp.path().join("weatherHistory.csv"), &HISTORY_ROWS);
        // a file where the raw zone directory should be
        std::fs::write(tmp.path().join("raw"), b"").unwrap();

        let report = collector(&tmp, None).run_at(noon()).await;
        assert!(matches!(
            report.historical,
            Err(IngestionError::RawZoneCreation(_, _))
        ));
        assert!(matches!(report.live, Err(IngestionError::RawZoneCreation(_, _))));
        assert!(!report.produced_artifacts());
    }

    #[test]
    fn a_written_snapshot_counts_even_if_the_live_batch_failed() {
        let report = IngestionReport {
            historical: Ok(HistoricalOutcome::Written {
                path: PathBuf::from("raw/weatherHistory_source.csv"),
                rows: 3,
            }),
            live: Err(IngestionError::RawZoneCreation(
                PathBuf::from("raw"),
                io::Error::new(io::ErrorKind::AlreadyExists, "not a directory"),
            )),
        };
        assert!(report.produced_artifacts());
    }

    #[tokio::test]
    async fn one_failing_collector_does_not_block_the_other() {
        let tmp = TempDir::new().unwrap();
        let report = collector(&tmp, None).run_at(noon()).await;
        assert!(matches!(report.historical, Ok(HistoricalOutcome::SourceMissing)));
        assert!(report.live.is_ok());
        assert!(report.produced_artifacts());
    }
}
