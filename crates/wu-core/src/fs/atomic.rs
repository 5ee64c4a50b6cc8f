use std::fs::{self, File};
use std::io::{self, Write};
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum AtomicWriteError {
    #[error("Failed to persist temp file: {0}")]
    TempFile(#[from] tempfile::PersistError),
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("Parent directory does not exist: {0}")]
    NoParentDir(PathBuf),
}

/// Atomically write content to a file.
///
/// Writes to a temp file in the same directory, fsyncs, then renames over
/// the target so readers see either the old or the new content.
pub fn atomic_write(
    path: &Path,
    content: &[u8],
    mode: Option<u32>,
) -> Result<(), AtomicWriteError> {
    let parent = match path.parent() {
        Some(p) if p.as_os_str().is_empty() => Path::new("."),
        Some(p) => p,
        None => return Err(AtomicWriteError::NoParentDir(path.to_path_buf())),
    };

    if !parent.is_dir() {
        return Err(AtomicWriteError::NoParentDir(parent.to_path_buf()));
    }

    let mut temp = NamedTempFile::new_in(parent)?;
    temp.write_all(content)?;
    temp.as_file().sync_all()?;

    if let Some(m) = mode {
        fs::set_permissions(temp.path(), fs::Permissions::from_mode(m))?;
    }

    debug!("Atomic write: persisting temp file to {:?}", path);
    temp.persist(path)?;

    if let Ok(dir) = File::open(parent) {
        let _ = dir.sync_all();
    }

    Ok(())
}

/// Atomically write with restricted 0600 permissions (keys and other secrets).
pub fn atomic_write_secret(path: &Path, content: &[u8]) -> Result<(), AtomicWriteError> {
    atomic_write(path, content, Some(0o600))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_atomic_write_creates_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("page.html");
        atomic_write(&path, b"<p>hello</p>", Some(0o644)).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "<p>hello</p>");
    }

    #[test]
    fn test_atomic_write_overwrites() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("page.html");
        atomic_write(&path, b"first", None).unwrap();
        atomic_write(&path, b"second", None).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "second");
    }

    #[test]
    fn test_secret_permissions() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("crypto.key");
        atomic_write_secret(&path, &[7u8; 32]).unwrap();
        let meta = fs::metadata(&path).unwrap();
        assert_eq!(meta.permissions().mode() & 0o777, 0o600);
        assert_eq!(fs::read(&path).unwrap(), vec![7u8; 32]);
    }

    #[test]
    fn test_no_parent_dir_error() {
        let result = atomic_write(Path::new("/nonexistent/dir/file.txt"), b"data", None);
        assert!(matches!(result, Err(AtomicWriteError::NoParentDir(_))));
    }
}
