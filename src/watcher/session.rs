//! Tail session facade.
//!
//! Exposes `watch`/`unwatch` over a single file and a stream of line events.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tokio_stream::wrappers::UnboundedReceiverStream;
use tokio_util::sync::CancellationToken;

use crate::config::TailConfig;

use super::backend::{NotifyBackend, WatchBackend};
use super::coordinator::Coordinator;
use super::error::TailError;
use super::fs::{FileAccess, LocalFiles};
use super::tailer::SessionState;

/// Events emitted by a tail session.
#[derive(Debug)]
pub enum TailEvent {
    /// A completed, non-blank line, separator stripped.
    Line(String),
    /// The background watch failed; the session is no longer watching.
    Error(TailError),
}

/// Ordered stream of [`TailEvent`]s for one session.
pub type TailEvents = UnboundedReceiverStream<TailEvent>;

/// Options for [`TailSession::watch`].
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct WatchOptions {
    /// Byte offset to resume from. `None` keeps the session's stored cursor.
    pub cursor: Option<u64>,
}

impl WatchOptions {
    /// Resume from an explicit byte offset.
    #[must_use]
    pub fn from_cursor(cursor: u64) -> Self {
        Self {
            cursor: Some(cursor),
        }
    }
}

#[derive(Debug)]
struct WatchHandle {
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

/// Tails one file, emitting each newly completed line.
///
/// The file may be missing when `watch` is called; lines are emitted once it
/// is created. `unwatch` returns the byte cursor, which a later `watch` can
/// resume from without losing or repeating lines.
pub struct TailSession {
    path: PathBuf,
    files: Arc<dyn FileAccess>,
    backend: Arc<dyn WatchBackend>,
    chunk_bytes: u64,
    state: Arc<Mutex<SessionState>>,
    events: mpsc::UnboundedSender<TailEvent>,
    handle: Option<WatchHandle>,
}

impl std::fmt::Debug for TailSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TailSession")
            .field("path", &self.path)
            .field("chunk_bytes", &self.chunk_bytes)
            .field("watching", &self.is_watching())
            .finish_non_exhaustive()
    }
}

impl TailSession {
    /// Create a session for `path` with default settings.
    ///
    /// Returns the session and the stream its lines are delivered on.
    ///
    /// # Errors
    ///
    /// Returns [`TailError::InvalidArgument`] if `path` is empty or has no
    /// file name.
    pub fn new(path: impl Into<PathBuf>) -> Result<(Self, TailEvents), TailError> {
        Self::with_config(path, &TailConfig::default())
    }

    /// Create a session for `path` using `config`.
    ///
    /// # Errors
    ///
    /// Returns [`TailError::InvalidArgument`] if `path` is empty or has no
    /// file name.
    pub fn with_config(
        path: impl Into<PathBuf>,
        config: &TailConfig,
    ) -> Result<(Self, TailEvents), TailError> {
        let backend = match config.notify_debounce() {
            Some(window) => NotifyBackend::with_debounce(window),
            None => NotifyBackend::new(),
        };
        Self::with_collaborators(path, config, Arc::new(LocalFiles), Arc::new(backend))
    }

    /// Create a session over custom file access and watch primitives.
    ///
    /// # Errors
    ///
    /// Returns [`TailError::InvalidArgument`] if `path` is empty or has no
    /// file name.
    pub fn with_collaborators(
        path: impl Into<PathBuf>,
        config: &TailConfig,
        files: Arc<dyn FileAccess>,
        backend: Arc<dyn WatchBackend>,
    ) -> Result<(Self, TailEvents), TailError> {
        let path = path.into();
        if path.as_os_str().is_empty() {
            return Err(TailError::InvalidArgument("file path is required".to_string()));
        }
        if path.file_name().is_none() {
            return Err(TailError::InvalidArgument(format!(
                "path has no file name: {}",
                path.display()
            )));
        }

        let (events, rx) = mpsc::unbounded_channel();
        let session = Self {
            path,
            files,
            backend,
            chunk_bytes: config.read_chunk_bytes(),
            state: Arc::new(Mutex::new(SessionState::new())),
            events,
            handle: None,
        };
        Ok((session, UnboundedReceiverStream::new(rx)))
    }

    /// Get the path being tailed.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether a watch is active.
    ///
    /// Turns false on `unwatch` and after a fatal background error.
    #[must_use]
    pub fn is_watching(&self) -> bool {
        self.handle
            .as_ref()
            .is_some_and(|handle| !handle.task.is_finished())
    }

    /// Current byte cursor, if one has been set.
    ///
    /// Waits for an in-flight read pass to finish.
    pub async fn cursor(&self) -> Option<u64> {
        self.state.lock().await.cursor()
    }

    /// Start watching the file. A no-op if already watching.
    ///
    /// Lines between the starting cursor and the current end of file are
    /// emitted before this returns. If the file does not exist yet, this
    /// returns once its parent directory is watched for the file's creation.
    ///
    /// # Errors
    ///
    /// Returns [`TailError::NotAFile`] if the path is not a regular file,
    /// [`TailError::Watch`] if a watch cannot be established, and
    /// [`TailError::Io`] for other metadata or read failures. The session is
    /// left unwatched on error.
    pub async fn watch(&mut self, options: WatchOptions) -> Result<(), TailError> {
        if self.is_watching() {
            tracing::debug!(path = %self.path.display(), "Already watching");
            return Ok(());
        }
        self.handle = None;

        let coordinator = Coordinator::new(
            self.path.clone(),
            self.files.clone(),
            self.backend.clone(),
            self.chunk_bytes,
            self.state.clone(),
            self.events.clone(),
        );
        let phase = coordinator.establish(options.cursor).await?;

        let cancel = CancellationToken::new();
        let task = tokio::spawn(coordinator.run(phase, cancel.clone()));
        self.handle = Some(WatchHandle { cancel, task });
        Ok(())
    }

    /// Stop watching and return the cursor for a later resume.
    ///
    /// Safe to call when not watching. A read pass already in flight is
    /// allowed to finish, and its cursor advance is kept.
    pub async fn unwatch(&mut self) -> u64 {
        if let Some(handle) = self.handle.take() {
            handle.cancel.cancel();
            if let Err(e) = handle.task.await {
                tracing::warn!(path = %self.path.display(), error = %e, "Watch task ended abnormally");
            }
            tracing::debug!(path = %self.path.display(), "Unwatched");
        }
        self.state.lock().await.cursor().unwrap_or(0)
    }
}

impl Drop for TailSession {
    fn drop(&mut self) {
        if let Some(handle) = &self.handle {
            handle.cancel.cancel();
        }
    }
}
