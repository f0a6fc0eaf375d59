use crate::transform::error::TransformError;
use crate::utils::write_atomically;
use log::{info, warn};
use polars::prelude::*;
use std::path::{Path, PathBuf};
use tokio::task;

/// Writes the curated frame as Snappy-compressed Parquet, replacing any previous artifact.
///
/// The directory is created if needed and the file is swapped in atomically, so a failed
/// write leaves the old artifact intact. Returns the number of rows written, or `None`
/// when there was nothing to write.
pub async fn save_curated(
    df: Option<DataFrame>,
    path: &Path,
) -> Result<Option<usize>, TransformError> {
    let mut df = match df {
        Some(df) if df.height() > 0 => df,
        Some(_) => {
            warn!("Curated frame is empty, not writing {}", path.display());
            return Ok(None);
        }
        None => {
            warn!("No curated data, not writing {}", path.display());
            return Ok(None);
        }
    };

    let path_buf = path.to_path_buf();
    let rows = df.height();
    task::spawn_blocking(move || {
        write_atomically(
            &path_buf,
            |e| TransformError::ParquetWriteIo(path_buf.clone(), e),
            |file| {
                ParquetWriter::new(file)
                    .with_compression(ParquetCompression::Snappy)
                    .finish(&mut df)
                    .map(|_| ())
                    .map_err(|e| TransformError::ParquetWritePolars(path_buf.clone(), e))
            },
        )
    })
    .await??;

    info!("Wrote {} curated rows to {}", rows, path.display());
    Ok(Some(rows))
}

/// Reads a curated artifact back into memory.
pub async fn read_curated(path: &Path) -> Result<DataFrame, TransformError> {
    let path_buf: PathBuf = path.to_path_buf();
    task::spawn_blocking(move || {
        let file = std::fs::File::open(&path_buf)
            .map_err(|e| TransformError::CuratedOpen(path_buf.clone(), e))?;
        ParquetReader::new(file)
            .finish()
            .map_err(|e| TransformError::CuratedRead(path_buf, e))
    })
    .await?
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn writes_and_replaces_the_artifact() -> Result<(), TransformError> {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("processed").join("curated.parquet");

        let first = df!("temp_c" => [1.0, 2.0, 3.0]).unwrap();
        assert_eq!(save_curated(Some(first), &path).await?, Some(3));
        let second = df!("temp_c" => [4.0]).unwrap();
        assert_eq!(save_curated(Some(second.clone()), &path).await?, Some(1));

        let back = read_curated(&path).await?;
        assert!(back.equals_missing(&second));
        Ok(())
    }

    #[tokio::test]
    async fn empty_or_missing_input_is_a_no_op() -> Result<(), TransformError> {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("curated.parquet");

        assert_eq!(save_curated(None, &path).await?, None);
        let empty = DataFrame::empty();
        assert_eq!(save_curated(Some(empty), &path).await?, None);
        assert!(!path.exists());
        Ok(())
    }
}
