//! Per-run container log files.
//!
//! Each started container gets a fresh log file in the configured log
//! directory. Its contents are dumped to a diagnostics sink when the test
//! fails and the file is removed when the scope ends.

use std::fs::File;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use testbay_common::constants::{RUN_LOG_PREFIX, RUN_LOG_SUFFIX};
use testbay_common::error::{Result, TestbayError};
use testbay_common::types::ContainerType;

/// Creates an empty, uniquely named run log for `container_type` in `dir`.
///
/// The name looks like `docker-SshdContainer-runXXXXXX.log`. The file is
/// not removed automatically; see [`remove_log`].
///
/// # Errors
///
/// Returns an error if the file cannot be created.
pub fn create_run_log(dir: &Path, container_type: &ContainerType) -> Result<PathBuf> {
    let prefix = format!("{RUN_LOG_PREFIX}{}-run", container_type.name());
    let temp = tempfile::Builder::new()
        .prefix(&prefix)
        .suffix(RUN_LOG_SUFFIX)
        .tempfile_in(dir)
        .map_err(|e| TestbayError::Io {
            path: dir.to_path_buf(),
            source: e,
        })?;
    let path = temp.into_temp_path().keep().map_err(|e| TestbayError::Io {
        path: dir.to_path_buf(),
        source: e.error,
    })?;
    tracing::debug!(path = %path.display(), "created run log");
    Ok(path)
}

/// Copies the full contents of a run log to `sink`.
///
/// A log that does not exist (yet) dumps nothing. Returns the number of
/// bytes written.
///
/// # Errors
///
/// Returns an error if the log cannot be read or the sink rejects a write.
pub fn dump_log(path: &Path, sink: &mut dyn Write) -> Result<u64> {
    let io_err = |e| TestbayError::Io {
        path: path.to_path_buf(),
        source: e,
    };
    let mut file = match File::open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(0),
        Err(e) => return Err(io_err(e)),
    };
    let copied = io::copy(&mut file, sink).map_err(io_err)?;
    sink.flush().map_err(io_err)?;
    Ok(copied)
}

/// Deletes a run log.
///
/// Deleting a log that is already gone is not an error.
///
/// # Errors
///
/// Returns an error if the file exists but cannot be removed.
pub fn remove_log(path: &Path) -> Result<()> {
    match std::fs::remove_file(path) {
        Ok(()) => {
            tracing::debug!(path = %path.display(), "removed run log");
            Ok(())
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(TestbayError::Io {
            path: path.to_path_buf(),
            source: e,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sshd() -> ContainerType {
        ContainerType::new("SshdContainer", "sshd").with_port(22)
    }

    #[test]
    fn run_log_name_embeds_container_type() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = create_run_log(dir.path(), &sshd()).expect("create");

        let name = path.file_name().unwrap().to_str().unwrap();
        assert!(name.starts_with("docker-SshdContainer-run"));
        assert!(name.ends_with(".log"));
        assert!(path.exists());
        assert_eq!(std::fs::metadata(&path).unwrap().len(), 0);
    }

    #[test]
    fn run_logs_are_unique() {
        let dir = tempfile::tempdir().expect("tempdir");
        let a = create_run_log(dir.path(), &sshd()).expect("create a");
        let b = create_run_log(dir.path(), &sshd()).expect("create b");
        assert_ne!(a, b);
    }

    #[test]
    fn create_in_missing_directory_fails() {
        let dir = tempfile::tempdir().expect("tempdir");
        let err = create_run_log(&dir.path().join("missing"), &sshd()).unwrap_err();
        assert!(matches!(err, TestbayError::Io { .. }));
    }

    #[test]
    fn dump_copies_exact_contents() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = create_run_log(dir.path(), &sshd()).expect("create");
        std::fs::write(&path, "hello\nworld\n").expect("write");

        let mut sink = Vec::new();
        let copied = dump_log(&path, &mut sink).expect("dump");
        assert_eq!(copied, 12);
        assert_eq!(sink, b"hello\nworld\n");
    }

    #[test]
    fn dump_missing_log_writes_nothing() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut sink = Vec::new();
        let copied = dump_log(&dir.path().join("gone.log"), &mut sink).expect("dump");
        assert_eq!(copied, 0);
        assert!(sink.is_empty());
    }

    #[test]
    fn remove_twice_is_not_an_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = create_run_log(dir.path(), &sshd()).expect("create");

        remove_log(&path).expect("first remove");
        assert!(!path.exists());
        remove_log(&path).expect("second remove");
    }
}
