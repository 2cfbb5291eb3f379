//! Log-file preparation.
//!
//! The `tracing-subscriber` setup lives in the binary; this module only
//! makes sure the file can be opened and keeps old logs bounded.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Size at which the current log is rotated (10 MB).
pub const DEFAULT_MAX_LOG_SIZE: u64 = 10 * 1024 * 1024;

/// Rotated files kept next to the current log.
pub const DEFAULT_MAX_LOG_FILES: u32 = 5;

/// Create the log directory and rotate the file if it has grown past
/// `max_size`.
///
/// Rotation renames `gdbmi.log` to `gdbmi.log.1`, shifting older files up by
/// one and dropping anything beyond `max_files`.
pub fn prepare_log_file(path: &Path, max_size: u64, max_files: u32) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let size = match fs::metadata(path) {
        Ok(meta) => meta.len(),
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(()),
        Err(err) => return Err(err),
    };
    if size < max_size || max_files == 0 {
        return Ok(());
    }

    let oldest = numbered(path, max_files);
    if oldest.exists() {
        fs::remove_file(&oldest)?;
    }
    for n in (1..max_files).rev() {
        let from = numbered(path, n);
        if from.exists() {
            fs::rename(&from, numbered(path, n + 1))?;
        }
    }
    fs::rename(path, numbered(path, 1))
}

fn numbered(path: &Path, n: u32) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(format!(".{n}"));
    path.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn numbered_appends_index() {
        let base = Path::new("/var/log/gdbmi.log");
        assert_eq!(numbered(base, 2), PathBuf::from("/var/log/gdbmi.log.2"));
    }

    #[test]
    fn creates_missing_directories() {
        let dir = TempDir::new().unwrap();
        let log = dir.path().join("a").join("b").join("gdbmi.log");
        prepare_log_file(&log, DEFAULT_MAX_LOG_SIZE, DEFAULT_MAX_LOG_FILES).unwrap();
        assert!(dir.path().join("a").join("b").is_dir());
        assert!(!log.exists());
    }

    #[test]
    fn small_file_is_left_alone() {
        let dir = TempDir::new().unwrap();
        let log = dir.path().join("gdbmi.log");
        fs::write(&log, "short").unwrap();
        prepare_log_file(&log, 1024, 3).unwrap();
        assert_eq!(fs::read_to_string(&log).unwrap(), "short");
    }

    #[test]
    fn large_file_rotates_and_cascades() {
        let dir = TempDir::new().unwrap();
        let log = dir.path().join("gdbmi.log");
        fs::write(dir.path().join("gdbmi.log.1"), "older").unwrap();
        fs::write(&log, "x".repeat(64)).unwrap();

        prepare_log_file(&log, 32, 3).unwrap();

        assert!(!log.exists());
        assert_eq!(
            fs::read_to_string(dir.path().join("gdbmi.log.1")).unwrap(),
            "x".repeat(64)
        );
        assert_eq!(
            fs::read_to_string(dir.path().join("gdbmi.log.2")).unwrap(),
            "older"
        );
    }

    #[test]
    fn oldest_file_is_dropped() {
        let dir = TempDir::new().unwrap();
        let log = dir.path().join("gdbmi.log");
        fs::write(dir.path().join("gdbmi.log.1"), "one").unwrap();
        fs::write(dir.path().join("gdbmi.log.2"), "two").unwrap();
        fs::write(&log, "x".repeat(64)).unwrap();

        prepare_log_file(&log, 32, 2).unwrap();

        assert_eq!(
            fs::read_to_string(dir.path().join("gdbmi.log.2")).unwrap(),
            "one"
        );
        assert!(!dir.path().join("gdbmi.log.3").exists());
    }
}
