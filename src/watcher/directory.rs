//! Waiting for a not-yet-existing file to appear.
//!
//! Watches the parent directory, since the file itself cannot be watched
//! before it exists.

use std::ffi::OsString;
use std::io;
use std::path::{Path, PathBuf};

use tokio::sync::mpsc;

use super::backend::{classify, Notice, WatchBackend, WatchGuard};
use super::error::TailError;

/// Directory watch armed for a single target file name.
///
/// Dropping it closes the directory watch.
#[derive(Debug)]
pub struct DirectoryWait {
    dir: PathBuf,
    name: OsString,
    rx: mpsc::UnboundedReceiver<notify::Result<notify::Event>>,
    _guard: WatchGuard,
}

impl DirectoryWait {
    /// Start watching the parent directory of `path`.
    ///
    /// # Errors
    ///
    /// Returns [`TailError::InvalidArgument`] if `path` has no file name,
    /// [`TailError::Io`] with [`io::ErrorKind::NotFound`] if the parent
    /// directory does not exist, or the backend's error if the directory
    /// watch cannot be established otherwise.
    pub fn arm(backend: &dyn WatchBackend, path: &Path) -> Result<Self, TailError> {
        let name = path
            .file_name()
            .ok_or_else(|| {
                TailError::InvalidArgument(format!("path has no file name: {}", path.display()))
            })?
            .to_os_string();
        let dir = parent_dir(path);

        let (tx, rx) = mpsc::unbounded_channel();
        let guard = backend.watch(&dir, tx).map_err(|e| missing_dir_error(&dir, e))?;
        tracing::debug!(dir = %dir.display(), "Waiting for file creation");

        Ok(Self {
            dir,
            name,
            rx,
            _guard: guard,
        })
    }

    /// Directory being watched.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Resolve once an entry with the target name is created or removed.
    ///
    /// Consumes the wait, closing the directory watch.
    ///
    /// # Errors
    ///
    /// Returns [`TailError::Watch`] if the watch reports an error or its event
    /// stream ends.
    pub async fn created(mut self) -> Result<(), TailError> {
        while let Some(result) = self.rx.recv().await {
            let event = result?;
            if classify(&event.kind) != Notice::Renamed {
                continue;
            }
            if event
                .paths
                .iter()
                .any(|p| p.file_name() == Some(self.name.as_os_str()))
            {
                tracing::debug!(dir = %self.dir.display(), kind = ?event.kind, "Target entry changed");
                return Ok(());
            }
        }
        Err(notify::Error::generic("directory watch closed").into())
    }
}

/// Nothing recreates a missing parent directory, so unlike a missing file it
/// is not recoverable.
fn missing_dir_error(dir: &Path, err: TailError) -> TailError {
    if err.is_transient() {
        TailError::Io(io::Error::new(
            io::ErrorKind::NotFound,
            format!("parent directory not found: {}", dir.display()),
        ))
    } else {
        err
    }
}

/// Parent directory of `path`, with `.` standing in for a bare file name.
fn parent_dir(path: &Path) -> PathBuf {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}
