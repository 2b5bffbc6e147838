//! Watch coordination for one tail session.
//!
//! Drives `WaitingForFile -> CatchingUp -> Watching`: waits for a missing
//! file through its parent directory, runs the catch-up pass, then turns file
//! change notifications into read passes, coalescing bursts through the
//! session's [`PassGate`](super::debounce::PassGate).

use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::{mpsc, Mutex};
use tokio_util::sync::CancellationToken;

use super::backend::{classify, Notice, WatchBackend, WatchGuard};
use super::directory::DirectoryWait;
use super::error::TailError;
use super::fs::{FileAccess, FileStat};
use super::session::TailEvent;
use super::tailer::{IncrementalReader, SessionState};

/// Live watch on the tailed file.
#[derive(Debug)]
pub(crate) struct LiveWatch {
    rx: mpsc::UnboundedReceiver<notify::Result<notify::Event>>,
    guard: WatchGuard,
}

/// Where a session stands once `watch` has done its inline work.
#[derive(Debug)]
pub(crate) enum Phase {
    /// File absent; the parent directory is watched for its creation.
    WaitingForFile(DirectoryWait),
    /// File present, caught up, and watched.
    Watching(LiveWatch),
}

pub(crate) struct Coordinator {
    path: PathBuf,
    files: Arc<dyn FileAccess>,
    backend: Arc<dyn WatchBackend>,
    reader: IncrementalReader,
    state: Arc<Mutex<SessionState>>,
    events: mpsc::UnboundedSender<TailEvent>,
}

impl Coordinator {
    pub(crate) fn new(
        path: PathBuf,
        files: Arc<dyn FileAccess>,
        backend: Arc<dyn WatchBackend>,
        chunk_bytes: u64,
        state: Arc<Mutex<SessionState>>,
        events: mpsc::UnboundedSender<TailEvent>,
    ) -> Self {
        let reader = IncrementalReader::new(path.clone(), files.clone(), chunk_bytes);
        Self {
            path,
            files,
            backend,
            reader,
            state,
            events,
        }
    }

    /// Resolve the starting cursor, then either attach and catch up or arm the
    /// directory wait.
    ///
    /// An explicit `cursor` wins; otherwise the stored cursor is kept, and a
    /// cursor that was never set starts at the current end of file (or 0 if
    /// the file does not exist yet).
    pub(crate) async fn establish(&self, cursor: Option<u64>) -> Result<Phase, TailError> {
        let stat = self.stat().await?;
        {
            let mut state = self.state.lock().await;
            match cursor {
                Some(cursor) => state.seek(cursor),
                None if state.cursor.is_none() => state.seek(stat.map_or(0, |s| s.len)),
                None => {}
            }
            tracing::debug!(path = %self.path.display(), cursor = ?state.cursor, "Starting watch");
        }
        self.enter(stat).await
    }

    /// Background half of the session. Runs until cancelled or a fatal error,
    /// which is reported on the event stream.
    pub(crate) async fn run(self, phase: Phase, cancel: CancellationToken) {
        let mut phase = phase;
        loop {
            match phase {
                Phase::WaitingForFile(wait) => {
                    // The file may have appeared between the check and arming the wait
                    match self.stat().await {
                        Ok(Some(_)) => {}
                        Ok(None) => {
                            tokio::select! {
                                biased;
                                () = cancel.cancelled() => return,
                                result = wait.created() => {
                                    if let Err(e) = result {
                                        self.fail(e).await;
                                        return;
                                    }
                                }
                            }
                        }
                        Err(e) => {
                            drop(wait);
                            self.fail(e).await;
                            return;
                        }
                    }
                    phase = match self.locate().await {
                        Ok(next) => next,
                        Err(e) => {
                            self.fail(e).await;
                            return;
                        }
                    };
                }
                Phase::Watching(live) => {
                    self.watch_file(live, &cancel).await;
                    return;
                }
            }
        }
    }

    async fn watch_file(&self, live: LiveWatch, cancel: &CancellationToken) {
        let LiveWatch { mut rx, guard } = live;
        tracing::debug!(path = %self.path.display(), "Watching file");

        loop {
            let result = tokio::select! {
                biased;
                () = cancel.cancelled() => break,
                result = rx.recv() => result,
            };
            let Some(result) = result else {
                break;
            };
            if let Err(e) = self.on_notification(result, &mut rx, cancel).await {
                drop(guard);
                self.fail(e).await;
                return;
            }
        }

        drop(guard);
        tracing::debug!(path = %self.path.display(), "File watch detached");
    }

    /// Handle one notification, plus any that pile up while its passes run.
    async fn on_notification(
        &self,
        result: notify::Result<notify::Event>,
        rx: &mut mpsc::UnboundedReceiver<notify::Result<notify::Event>>,
        cancel: &CancellationToken,
    ) -> Result<(), TailError> {
        match classify(&result?.kind) {
            Notice::Changed => {}
            Notice::Renamed => {
                tracing::trace!(path = %self.path.display(), "Ignoring rename notification");
                return Ok(());
            }
            Notice::Ignored => return Ok(()),
        }

        // Passes only run inside this call, so the gate is idle on entry
        let started = self.state.lock().await.gate.notify();
        debug_assert!(started, "pass gate busy outside a pass");

        loop {
            match self.pass().await {
                Ok(_) => {}
                Err(e) if e.is_transient() => {
                    tracing::warn!(path = %self.path.display(), "Watched file disappeared");
                    self.state.lock().await.gate.reset();
                    return Ok(());
                }
                Err(e) => {
                    self.state.lock().await.gate.reset();
                    return Err(e);
                }
            }

            let mut state = self.state.lock().await;
            while let Ok(queued) = rx.try_recv() {
                match queued {
                    Ok(event) if classify(&event.kind) == Notice::Changed => {
                        state.gate.notify();
                    }
                    Ok(_) => {}
                    Err(e) => {
                        state.gate.reset();
                        return Err(e.into());
                    }
                }
            }
            if cancel.is_cancelled() {
                state.gate.reset();
                return Ok(());
            }
            if !state.gate.finish_pass() {
                return Ok(());
            }
            tracing::trace!(path = %self.path.display(), "Running coalesced pass");
        }
    }

    /// Re-check the file and move to the matching phase.
    async fn locate(&self) -> Result<Phase, TailError> {
        let stat = self.stat().await?;
        self.enter(stat).await
    }

    async fn enter(&self, stat: Option<FileStat>) -> Result<Phase, TailError> {
        match stat {
            Some(stat) if !stat.is_file => Err(TailError::NotAFile(self.path.clone())),
            Some(_) => match self.attach().await {
                Err(e) if e.is_transient() => self.wait_for_file(),
                result => result,
            },
            None => self.wait_for_file(),
        }
    }

    fn wait_for_file(&self) -> Result<Phase, TailError> {
        DirectoryWait::arm(&*self.backend, &self.path).map(Phase::WaitingForFile)
    }

    /// Attach the live watch, then run the catch-up pass.
    ///
    /// Attaching first means a write racing the catch-up still produces a
    /// notification; the extra pass it triggers finds nothing new.
    async fn attach(&self) -> Result<Phase, TailError> {
        let (tx, rx) = mpsc::unbounded_channel();
        let guard = self.backend.watch(&self.path, tx)?;

        match self.pass().await {
            Ok(bytes) => {
                tracing::debug!(path = %self.path.display(), bytes, "Catch-up pass complete");
            }
            Err(e) if e.is_transient() => {
                tracing::debug!(path = %self.path.display(), "File vanished during catch-up");
                self.state.lock().await.gate.reset();
            }
            Err(e) => return Err(e),
        }

        Ok(Phase::Watching(LiveWatch { rx, guard }))
    }

    async fn pass(&self) -> Result<u64, TailError> {
        let mut state = self.state.lock().await;
        let events = &self.events;
        let mut emit = |line: String| {
            let _ = events.send(TailEvent::Line(line));
        };
        self.reader.read_from_cursor(&mut state, &mut emit).await
    }

    /// Metadata query with "not found" folded into `None`.
    async fn stat(&self) -> Result<Option<FileStat>, TailError> {
        match self.files.stat(&self.path).await {
            Ok(stat) => Ok(Some(stat)),
            Err(e) => match TailError::from_io(&self.path, e) {
                TailError::FileMissing(_) => Ok(None),
                other => Err(other),
            },
        }
    }

    async fn fail(&self, err: TailError) {
        tracing::error!(path = %self.path.display(), error = %err, "Tail session failed");
        self.state.lock().await.gate.reset();
        let _ = self.events.send(TailEvent::Error(err));
    }
}
