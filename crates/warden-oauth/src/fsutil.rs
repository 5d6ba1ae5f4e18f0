//! Atomic, owner-only file replacement.

use std::io::Write;
use std::path::Path;

use crate::error::{Result, WardenError};

/// Replace `path` with `data` so readers see either the old or the new
/// contents, never a partial write.
///
/// The bytes go to a temporary file in the same directory whose mode is
/// restricted to the owner before anything is written; the temporary file
/// is then renamed over `path`. On failure the temporary file is removed.
pub fn write_atomic(path: &Path, data: &[u8]) -> Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let file_name = path
        .file_name()
        .ok_or_else(|| {
            WardenError::Persistence(format!("Not a file path: {}", path.display()))
        })?
        .to_string_lossy()
        .into_owned();

    let mut tmp = tempfile::Builder::new()
        .prefix(&format!(".{}.", file_name))
        .suffix(".new")
        .tempfile_in(dir)
        .map_err(|e| persist_error(path, e))?;

    restrict_to_owner(tmp.as_file()).map_err(|e| persist_error(path, e))?;
    tmp.write_all(data).map_err(|e| persist_error(path, e))?;
    tmp.as_file().sync_all().map_err(|e| persist_error(path, e))?;

    tmp.persist(path).map_err(|e| persist_error(path, e.error))?;
    Ok(())
}

#[cfg(unix)]
fn restrict_to_owner(file: &std::fs::File) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    file.set_permissions(std::fs::Permissions::from_mode(0o600))
}

#[cfg(not(unix))]
fn restrict_to_owner(_file: &std::fs::File) -> std::io::Result<()> {
    Ok(())
}

fn persist_error(path: &Path, e: std::io::Error) -> WardenError {
    WardenError::Persistence(format!("Failed to write {}: {}", path.display(), e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_write_and_replace() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("token");

        write_atomic(&path, b"first").unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), b"first");

        write_atomic(&path, b"second").unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), b"second");

        // No temporary files left behind
        let entries: Vec<_> = std::fs::read_dir(dir.path()).unwrap().collect();
        assert_eq!(entries.len(), 1);
    }

    #[cfg(unix)]
    #[test]
    fn test_owner_only_permissions() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempdir().unwrap();
        let path = dir.path().join("secret.json");
        std::fs::write(&path, b"old").unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o644)).unwrap();

        write_atomic(&path, b"new").unwrap();
        let mode = std::fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[test]
    fn test_missing_directory_fails() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("missing").join("token");
        let err = write_atomic(&path, b"x").unwrap_err();
        assert!(matches!(err, WardenError::Persistence(_)));
    }

    #[test]
    fn test_concurrent_reader_never_sees_partial_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("token");
        let big_a = vec![b'a'; 256 * 1024];
        let big_b = vec![b'b'; 256 * 1024];
        write_atomic(&path, &big_a).unwrap();

        let reader_path = path.clone();
        let stop = std::sync::Arc::new(std::sync::atomic::AtomicBool::new(false));
        let reader_stop = stop.clone();
        let reader = std::thread::spawn(move || {
            let mut reads = 0;
            loop {
                let data = std::fs::read(&reader_path).unwrap();
                assert_eq!(data.len(), 256 * 1024);
                assert!(data.iter().all(|b| *b == data[0]));
                reads += 1;
                if reader_stop.load(std::sync::atomic::Ordering::Relaxed) {
                    break reads;
                }
            }
        });

        for i in 0..50 {
            let data = if i % 2 == 0 { &big_b } else { &big_a };
            write_atomic(&path, data).unwrap();
        }
        stop.store(true, std::sync::atomic::Ordering::Relaxed);
        assert!(reader.join().unwrap() > 0);
    }
}
