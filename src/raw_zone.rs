//! File layout of the raw zone: one historical snapshot plus timestamped live-feed batches.

use chrono::{DateTime, Utc};
use log::info;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const HISTORICAL_SNAPSHOT_FILE: &str = "weatherHistory_source.csv";
pub const LIVE_BATCH_PREFIX: &str = "weather_api_";
pub const LIVE_BATCH_EXTENSION: &str = "json";

#[derive(Debug, Error)]
pub enum RawZoneError {
    #[error("Invalid live batch pattern '{0}'")]
    Pattern(String, #[source] glob::PatternError),

    #[error("Failed to list live batch '{0}'")]
    Listing(PathBuf, #[source] std::io::Error),

    #[error("Failed to delete live batch '{0}'")]
    Prune(PathBuf, #[source] std::io::Error),
}

/// `(stamp, suffix)` of a live batch name; the unsuffixed batch counts as suffix 0.
fn live_batch_order(path: &Path) -> (String, u64) {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let stem = stem.strip_prefix(LIVE_BATCH_PREFIX).unwrap_or(&stem);
    match stem.split_once('_') {
        Some((stamp, suffix)) => match suffix.parse() {
            Ok(n) => (stamp.to_string(), n),
            Err(_) => (stem.to_string(), 0),
        },
        None => (stem.to_string(), 0),
    }
}

#[derive(Debug, Clone)]
pub struct RawZone {
    root: PathBuf,
}

impl RawZone {
    pub fn new(root: &Path) -> Self {
        Self {
            root: root.to_path_buf(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn historical_snapshot_path(&self) -> PathBuf {
        self.root.join(HISTORICAL_SNAPSHOT_FILE)
    }

    /// All live-feed batches, oldest first. Same-second batches follow their
    /// collision suffix numerically.
    pub fn live_batches(&self) -> Result<Vec<PathBuf>, RawZoneError> {
        let pattern = format!(
            "{}/{}*.{}",
            glob::Pattern::escape(&self.root.to_string_lossy()),
            LIVE_BATCH_PREFIX,
            LIVE_BATCH_EXTENSION
        );
        let mut batches = glob::glob(&pattern)
            .map_err(|e| RawZoneError::Pattern(pattern.clone(), e))?
            .map(|entry| {
                entry.map_err(|e| {
                    let path = e.path().to_path_buf();
                    RawZoneError::Listing(path, e.into())
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        batches.sort_by_cached_key(|path| live_batch_order(path));
        Ok(batches)
    }

    /// Path for a new live batch stamped with `now` to the second. If a batch with that
    /// name already exists (two runs within one second) a numeric suffix is added.
    pub fn next_live_batch_path(&self, now: DateTime<Utc>) -> PathBuf {
        let stamp = now.format("%Y%m%d%H%M%S");
        let candidate = self.root.join(format!(
            "{LIVE_BATCH_PREFIX}{stamp}.{LIVE_BATCH_EXTENSION}"
        ));
        if !candidate.exists() {
            return candidate;
        }
        (1..)
            .map(|n| {
                self.root.join(format!(
                    "{LIVE_BATCH_PREFIX}{stamp}_{n}.{LIVE_BATCH_EXTENSION}"
                ))
            })
            .find(|path| !path.exists())
            .unwrap_or(candidate)
    }

    /// Deletes the oldest live batches so that at most `keep` remain.
    /// Returns the removed paths.
    pub fn prune_live_batches(&self, keep: usize) -> Result<Vec<PathBuf>, RawZoneError> {
        let batches = self.live_batches()?;
        let excess = batches.len().saturating_sub(keep);
        let doomed: Vec<PathBuf> = batches.into_iter().take(excess).collect();
        for path in &doomed {
            std::fs::remove_file(path).map_err(|e| RawZoneError::Prune(path.clone(), e))?;
            info!("Pruned live batch {}", path.display());
        }
        Ok(doomed)
    }
}
