//! Tail session error types.

use std::io;
use std::path::{Path, PathBuf};

/// Errors that can occur while tailing a file.
#[derive(thiserror::Error, Debug)]
pub enum TailError {
    /// The session was constructed without a usable path.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// The path exists but is not a regular file.
    #[error("Not a regular file: {0}")]
    NotAFile(PathBuf),

    /// The file does not exist (yet, or any more).
    #[error("File not found: {0}")]
    FileMissing(PathBuf),

    /// Notify watcher error.
    #[error("File watcher error: {0}")]
    Watch(#[from] notify::Error),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl TailError {
    /// Classify an I/O error raised while touching `path`.
    ///
    /// `NotFound` becomes [`TailError::FileMissing`], everything else is kept
    /// as a plain I/O error.
    #[must_use]
    pub fn from_io(path: &Path, err: io::Error) -> Self {
        if err.kind() == io::ErrorKind::NotFound {
            Self::FileMissing(path.to_path_buf())
        } else {
            Self::Io(err)
        }
    }

    /// Whether this error is the recoverable "file currently missing" case.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::FileMissing(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_argument_display() {
        let err = TailError::InvalidArgument("empty path".to_string());
        assert_eq!(err.to_string(), "Invalid argument: empty path");
    }

    #[test]
    fn test_not_a_file_display() {
        let err = TailError::NotAFile(PathBuf::from("/var/log"));
        assert_eq!(err.to_string(), "Not a regular file: /var/log");
    }

    #[test]
    fn test_file_missing_display() {
        let err = TailError::FileMissing(PathBuf::from("/tmp/app.log"));
        assert_eq!(err.to_string(), "File not found: /tmp/app.log");
    }

    #[test]
    fn test_from_io_maps_not_found() {
        let io_err = io::Error::new(io::ErrorKind::NotFound, "gone");
        let err = TailError::from_io(Path::new("/tmp/app.log"), io_err);
        assert!(matches!(err, TailError::FileMissing(ref p) if p == Path::new("/tmp/app.log")));
        assert!(err.is_transient());
    }

    #[test]
    fn test_from_io_keeps_other_kinds() {
        let io_err = io::Error::new(io::ErrorKind::PermissionDenied, "nope");
        let err = TailError::from_io(Path::new("/tmp/app.log"), io_err);
        assert!(matches!(err, TailError::Io(_)));
        assert!(!err.is_transient());
        assert!(err.to_string().contains("I/O error"));
    }

    #[test]
    fn test_from_notify_error() {
        let notify_err = notify::Error::generic("test error");
        let err: TailError = notify_err.into();
        assert!(matches!(err, TailError::Watch(_)));
        assert!(err.to_string().contains("File watcher error"));
        assert!(!err.is_transient());
    }
}
