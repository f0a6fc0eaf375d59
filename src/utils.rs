use log::info;
use std::fs::File;
use std::io;
use std::path::Path;
use tempfile::NamedTempFile;

/// Makes sure `path` exists and is a directory, creating it (and parents) if needed.
pub fn ensure_dir_exists(path: &Path) -> io::Result<()> {
    match std::fs::metadata(path) {
        Ok(metadata) => {
            if !metadata.is_dir() {
                return Err(io::Error::new(
                    io::ErrorKind::AlreadyExists,
                    format!("Path exists but is not a directory: {}", path.display()),
                ));
            }
            Ok(())
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            info!("Creating directory: {}", path.display());
            std::fs::create_dir_all(path)
        }
        Err(e) => Err(e),
    }
}

fn parent_dir(path: &Path) -> &Path {
    path.parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."))
}

/// Writes a file next to `path` and renames it into place once `write` succeeds,
/// so readers never observe a half-written artifact. The parent directory is created
/// if missing. On failure the temporary file is removed and `path` is left untouched.
pub fn write_atomically<E>(
    path: &Path,
    io_err: impl Fn(io::Error) -> E,
    write: impl FnOnce(&mut File) -> Result<(), E>,
) -> Result<(), E> {
    let dir = parent_dir(path);
    ensure_dir_exists(dir).map_err(&io_err)?;

    let mut temp = NamedTempFile::new_in(dir).map_err(&io_err)?;
    write(temp.as_file_mut())?;
    temp.as_file().sync_all().map_err(&io_err)?;
    temp.persist(path).map_err(|e| io_err(e.error))?;
    Ok(())
}

/// Formats an error followed by each of its sources, `outer: inner: root`.
pub fn error_chain(err: &(dyn std::error::Error + 'static)) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    #[test]
    fn creates_missing_directories() -> io::Result<()> {
        let tmp = TempDir::new()?;
        let nested = tmp.path().join("a").join("b");
        ensure_dir_exists(&nested)?;
        assert!(nested.is_dir());
        // second call is a no-op
        ensure_dir_exists(&nested)?;
        Ok(())
    }

    #[test]
    fn rejects_file_in_place_of_directory() -> io::Result<()> {
        let tmp = TempDir::new()?;
        let file = tmp.path().join("taken");
        std::fs::write(&file, b"x")?;
        assert!(ensure_dir_exists(&file).is_err());
        Ok(())
    }

    #[test]
    fn atomic_write_replaces_and_keeps_old_content_on_failure() -> io::Result<()> {
        let tmp = TempDir::new()?;
        let target = tmp.path().join("out").join("artifact.txt");

        write_atomically(&target, |e| e, |f| f.write_all(b"first"))?;
        write_atomically(&target, |e| e, |f| f.write_all(b"second"))?;
        assert_eq!(std::fs::read_to_string(&target)?, "second");

        let failed: io::Result<()> = write_atomically(
            &target,
            |e| e,
            |_| Err(io::Error::new(io::ErrorKind::Other, "boom")),
        );
        assert!(failed.is_err());
        assert_eq!(std::fs::read_to_string(&target)?, "second");
        // only the artifact remains, no stray temp files
        assert_eq!(std::fs::read_dir(target.parent().unwrap())?.count(), 1);
        Ok(())
    }

    #[test]
    fn error_chain_lists_every_source() {
        #[derive(Debug, thiserror::Error)]
        #[error("outer")]
        struct Outer(#[source] io::Error);

        let err = Outer(io::Error::new(io::ErrorKind::Other, "disk full"));
        assert_eq!(error_chain(&err), "outer: disk full");
    }
}
