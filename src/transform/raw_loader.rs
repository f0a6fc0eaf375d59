use crate::raw_zone::RawZone;
use crate::transform::error::TransformError;
use crate::types::source::{FieldMapping, SourceKind};
use crate::utils::error_chain;
use log::{error, info, warn};
use polars::prelude::*;
use std::fs::File;
use std::path::{Path, PathBuf};

/// One raw artifact that made it into the combined frame.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadedSource {
    pub path: PathBuf,
    pub kind: SourceKind,
    pub rows: usize,
}

/// All harmonized raw data of one transform run.
#[derive(Debug, Clone)]
pub struct RawLoad {
    /// Canonical columns only; historical rows first, then live batches in listing order.
    pub frame: DataFrame,
    pub sources: Vec<LoadedSource>,
}

impl RawLoad {
    pub fn rows(&self) -> usize {
        self.frame.height()
    }
}

/// Raw artifacts to consider, historical snapshot first.
fn discover(raw_zone: &RawZone) -> Result<Vec<(PathBuf, SourceKind)>, TransformError> {
    let mut artifacts = Vec::new();
    let historical = raw_zone.historical_snapshot_path();
    if historical.is_file() {
        artifacts.push((historical, SourceKind::Historical));
    } else {
        warn!("No historical snapshot at {}", historical.display());
    }
    artifacts.extend(
        raw_zone
            .live_batches()?
            .into_iter()
            .map(|path| (path, SourceKind::LiveFeed)),
    );
    Ok(artifacts)
}

fn read_artifact(path: &Path, kind: SourceKind) -> Result<DataFrame, TransformError> {
    match kind {
        SourceKind::Historical => CsvReadOptions::default()
            .with_has_header(true)
            .with_infer_schema_length(None)
            .try_into_reader_with_file_path(Some(path.to_path_buf()))
            .and_then(|reader| reader.finish())
            .map_err(|e| TransformError::RawArtifactRead(path.to_path_buf(), e)),
        SourceKind::LiveFeed => {
            let file = File::open(path)
                .map_err(|e| TransformError::RawArtifactOpen(path.to_path_buf(), e))?;
            JsonReader::new(file)
                .finish()
                .map_err(|e| TransformError::RawArtifactRead(path.to_path_buf(), e))
        }
    }
}

/// Projects a raw frame onto the canonical columns using the mapping table of `kind`.
///
/// Every source column the mapping reads must be present, otherwise the whole artifact
/// is rejected with [`TransformError::SchemaMismatch`].
pub(crate) fn harmonize(
    df: DataFrame,
    kind: SourceKind,
    path: &Path,
) -> Result<DataFrame, TransformError> {
    let missing: Vec<String> = kind
        .required_source_columns()
        .filter(|name| df.column(name).is_err())
        .map(str::to_string)
        .collect();
    if !missing.is_empty() {
        return Err(TransformError::SchemaMismatch {
            path: path.to_path_buf(),
            source_kind: kind,
            missing,
        });
    }

    let projection: Vec<Expr> = kind.mapping().iter().map(FieldMapping::to_expr).collect();
    df.lazy()
        .select(projection)
        .collect()
        .map_err(|e| TransformError::Harmonize(path.to_path_buf(), e))
}

fn load_artifact(path: &Path, kind: SourceKind) -> Result<DataFrame, TransformError> {
    let raw = read_artifact(path, kind)?;
    harmonize(raw, kind, path)
}

/// Loads and harmonizes every readable raw artifact.
///
/// Artifacts that cannot be read or do not match their mapping are logged and skipped.
/// Returns `Ok(None)` when nothing could be loaded at all.
pub(crate) fn load_raw_zone(raw_zone: &RawZone) -> Result<Option<RawLoad>, TransformError> {
    let mut frames = Vec::new();
    let mut sources = Vec::new();

    for (path, kind) in discover(raw_zone)? {
        match load_artifact(&path, kind) {
            Ok(df) => {
                info!(
                    "Loaded {} rows from {} artifact {}",
                    df.height(),
                    kind,
                    path.display()
                );
                sources.push(LoadedSource {
                    path,
                    kind,
                    rows: df.height(),
                });
                frames.push(df.lazy());
            }
            Err(e) => warn!("Skipping raw artifact: {}", error_chain(&e)),
        }
    }

    if frames.is_empty() {
        error!(
            "No raw data could be loaded from {}, nothing to transform",
            raw_zone.root().display()
        );
        return Ok(None);
    }

    let frame = concat(frames, UnionArgs::default())
        .and_then(|lf| lf.collect())
        .map_err(TransformError::Combine)?;
    info!(
        "Combined {} rows from {} raw artifacts",
        frame.height(),
        sources.len()
    );
    Ok(Some(RawLoad { frame, sources }))
}
