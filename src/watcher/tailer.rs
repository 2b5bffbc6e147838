//! Incremental reader.
//!
//! Reads the bytes appended since the cursor and turns them into lines.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::debounce::PassGate;
use super::error::TailError;
use super::fs::FileAccess;
use super::splitter::LineSplitter;

/// Default upper bound for a single `read_range` call.
pub const DEFAULT_READ_CHUNK_BYTES: u64 = 1024 * 1024;

/// Mutable state of one tail session.
///
/// Shared between the session facade and its background task; a read pass
/// holds the lock for its whole duration.
#[derive(Debug, Default)]
pub struct SessionState {
    /// Everything before this offset has been emitted. `None` until the first
    /// `watch` resolves a starting position.
    pub(crate) cursor: Option<u64>,
    pub(crate) splitter: LineSplitter,
    pub(crate) gate: PassGate,
}

impl SessionState {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current byte cursor, if one has been set.
    #[must_use]
    pub fn cursor(&self) -> Option<u64> {
        self.cursor
    }

    /// Set the cursor for a new watch.
    ///
    /// Moving the cursor anywhere other than its stored position discards the
    /// trailing fragment, since those bytes will be read again or skipped.
    pub fn seek(&mut self, cursor: u64) {
        if self.cursor != Some(cursor) {
            self.splitter.clear();
        }
        self.cursor = Some(cursor);
    }
}

/// Reads `[cursor, size)` of a file and feeds it to the session's splitter.
#[derive(Clone)]
pub struct IncrementalReader {
    /// Path to the tailed file.
    path: PathBuf,
    files: Arc<dyn FileAccess>,
    /// Largest byte range requested per read call.
    chunk_bytes: u64,
}

impl std::fmt::Debug for IncrementalReader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IncrementalReader")
            .field("path", &self.path)
            .field("chunk_bytes", &self.chunk_bytes)
            .finish_non_exhaustive()
    }
}

impl IncrementalReader {
    /// Create a reader for `path`.
    ///
    /// A `chunk_bytes` of zero is raised to one.
    #[must_use]
    pub fn new(path: PathBuf, files: Arc<dyn FileAccess>, chunk_bytes: u64) -> Self {
        Self {
            path,
            files,
            chunk_bytes: chunk_bytes.max(1),
        }
    }

    /// Get the path being read.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Run one read pass from the session cursor.
    ///
    /// Every line completed by the new bytes is passed to `emit` in file
    /// order, and the cursor advances past every byte read, including bytes
    /// held back as the trailing fragment. Returns the number of bytes read.
    ///
    /// A reported size of zero is treated as a spurious metadata result and
    /// leaves the cursor alone. A size below the cursor clamps the cursor down
    /// to that size and drops the trailing fragment; truncation is not
    /// reported as an error.
    ///
    /// # Errors
    ///
    /// Returns [`TailError::FileMissing`] if the file disappeared,
    /// [`TailError::NotAFile`] if the path is no longer a regular file, and
    /// [`TailError::Io`] for any other metadata or read failure.
    pub async fn read_from_cursor(
        &self,
        state: &mut SessionState,
        emit: &mut (dyn FnMut(String) + Send),
    ) -> Result<u64, TailError> {
        let stat = self
            .files
            .stat(&self.path)
            .await
            .map_err(|e| TailError::from_io(&self.path, e))?;
        if !stat.is_file {
            return Err(TailError::NotAFile(self.path.clone()));
        }

        let size = stat.len;
        if size == 0 {
            tracing::trace!(path = %self.path.display(), "Empty size reported, skipping pass");
            return Ok(0);
        }

        let mut cursor = *state.cursor.get_or_insert(size);
        if cursor > size {
            tracing::warn!(
                path = %self.path.display(),
                cursor,
                size,
                "File smaller than cursor, clamping cursor"
            );
            cursor = size;
            state.cursor = Some(size);
            state.splitter.clear();
        }
        if cursor >= size {
            return Ok(0);
        }

        let mut total = 0;
        while cursor < size {
            let start = cursor;
            let end = size.min(start.saturating_add(self.chunk_bytes));
            let bytes = self
                .files
                .read_range(&self.path, start, end)
                .await
                .map_err(|e| TailError::from_io(&self.path, e))?;
            if bytes.is_empty() {
                break;
            }

            let read = bytes.len() as u64;
            cursor = start + read;
            total += read;
            for line in state.splitter.push(&bytes) {
                emit(line);
            }
            state.cursor = Some(cursor);

            // short read: the file shrank under us
            if read < end - start {
                break;
            }
        }

        tracing::debug!(
            path = %self.path.display(),
            bytes = total,
            cursor,
            "Read pass complete"
        );
        Ok(total)
    }
}
