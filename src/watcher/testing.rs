//! In-memory collaborators for deterministic session tests.

use std::collections::VecDeque;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use notify::event::{CreateKind, DataChange, ModifyKind, RemoveKind};
use notify::{Event, EventKind};
use tokio::sync::Semaphore;

use super::backend::{NotifySink, WatchBackend, WatchGuard};
use super::error::TailError;
use super::fs::{FileAccess, FileStat};

#[derive(Debug, Default)]
struct FakeFile {
    content: Option<Vec<u8>>,
    is_dir: bool,
    reported_lens: VecDeque<u64>,
    read_error: Option<io::ErrorKind>,
    stat_error: Option<io::ErrorKind>,
}

/// A single in-memory file with scripted metadata quirks.
#[derive(Debug, Default)]
pub(crate) struct FakeFiles {
    file: Mutex<FakeFile>,
    stats: AtomicUsize,
    reads: AtomicUsize,
    read_gate: Mutex<Option<Arc<Semaphore>>>,
}

impl FakeFiles {
    pub(crate) fn with_content(bytes: &[u8]) -> Self {
        let files = Self::default();
        files.file.lock().unwrap().content = Some(bytes.to_vec());
        files
    }

    pub(crate) fn missing() -> Self {
        Self::default()
    }

    pub(crate) fn directory() -> Self {
        let files = Self::with_content(b"");
        files.file.lock().unwrap().is_dir = true;
        files
    }

    pub(crate) fn append(&self, bytes: &[u8]) {
        self.file
            .lock()
            .unwrap()
            .content
            .get_or_insert_with(Vec::new)
            .extend_from_slice(bytes);
    }

    pub(crate) fn truncate(&self, len: usize) {
        if let Some(content) = self.file.lock().unwrap().content.as_mut() {
            content.truncate(len);
        }
    }

    pub(crate) fn delete(&self) {
        self.file.lock().unwrap().content = None;
    }

    /// Make the next metadata query report `len` regardless of content.
    pub(crate) fn report_len_once(&self, len: u64) {
        self.file.lock().unwrap().reported_lens.push_back(len);
    }

    pub(crate) fn fail_reads_with(&self, kind: io::ErrorKind) {
        self.file.lock().unwrap().read_error = Some(kind);
    }

    pub(crate) fn fail_stats_with(&self, kind: io::ErrorKind) {
        self.file.lock().unwrap().stat_error = Some(kind);
    }

    /// Hold every later read until [`release_read`](Self::release_read).
    pub(crate) fn gate_reads(&self) {
        *self.read_gate.lock().unwrap() = Some(Arc::new(Semaphore::new(0)));
    }

    pub(crate) fn release_read(&self) {
        if let Some(gate) = self.read_gate.lock().unwrap().as_ref() {
            gate.add_permits(1);
        }
    }

    pub(crate) fn stat_calls(&self) -> usize {
        self.stats.load(Ordering::SeqCst)
    }

    pub(crate) fn read_calls(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl FileAccess for FakeFiles {
    async fn stat(&self, _path: &Path) -> io::Result<FileStat> {
        self.stats.fetch_add(1, Ordering::SeqCst);
        let mut file = self.file.lock().unwrap();
        if let Some(kind) = file.stat_error {
            return Err(kind.into());
        }
        let Some(content) = file.content.as_ref() else {
            return Err(io::ErrorKind::NotFound.into());
        };
        let actual = content.len() as u64;
        let is_file = !file.is_dir;
        let len = file.reported_lens.pop_front().unwrap_or(actual);
        Ok(FileStat { len, is_file })
    }

    async fn read_range(&self, _path: &Path, start: u64, end: u64) -> io::Result<Vec<u8>> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        let gate = self.read_gate.lock().unwrap().clone();
        if let Some(gate) = gate {
            gate.acquire().await.unwrap().forget();
        }
        let file = self.file.lock().unwrap();
        if let Some(kind) = file.read_error {
            return Err(kind.into());
        }
        let Some(content) = file.content.as_ref() else {
            return Err(io::ErrorKind::NotFound.into());
        };
        let len = content.len();
        let start = usize::try_from(start).unwrap().min(len);
        let end = usize::try_from(end).unwrap().min(len);
        Ok(content[start..end].to_vec())
    }
}

/// Watch backend that hands its sinks to the test.
#[derive(Debug, Default)]
pub(crate) struct FakeBackend {
    sinks: Mutex<Vec<(PathBuf, NotifySink)>>,
    watches: AtomicUsize,
    fail_next: Mutex<Option<String>>,
    missing_next: AtomicBool,
}

impl FakeBackend {
    pub(crate) fn watch_count(&self) -> usize {
        self.watches.load(Ordering::SeqCst)
    }

    pub(crate) fn fail_next_watch(&self, message: &str) {
        *self.fail_next.lock().unwrap() = Some(message.to_string());
    }

    /// Fail the next watch as if its path did not exist.
    pub(crate) fn fail_next_watch_missing(&self) {
        self.missing_next.store(true, Ordering::SeqCst);
    }

    /// Whether a live receiver still listens on `path`.
    pub(crate) fn is_attached(&self, path: &Path) -> bool {
        self.sinks
            .lock()
            .unwrap()
            .iter()
            .any(|(watched, sink)| watched == path && !sink.is_closed())
    }

    pub(crate) fn emit(&self, watched: &Path, kind: EventKind, subject: &Path) {
        for (path, sink) in self.sinks.lock().unwrap().iter() {
            if path == watched {
                let _ = sink.send(Ok(Event::new(kind.clone()).add_path(subject.to_path_buf())));
            }
        }
    }

    pub(crate) fn emit_change(&self, path: &Path) {
        self.emit(
            path,
            EventKind::Modify(ModifyKind::Data(DataChange::Content)),
            path,
        );
    }

    pub(crate) fn emit_created(&self, dir: &Path, path: &Path) {
        self.emit(dir, EventKind::Create(CreateKind::File), path);
    }

    pub(crate) fn emit_removed(&self, path: &Path) {
        self.emit(path, EventKind::Remove(RemoveKind::File), path);
    }

    pub(crate) fn emit_error(&self, watched: &Path, message: &str) {
        for (path, sink) in self.sinks.lock().unwrap().iter() {
            if path == watched {
                let _ = sink.send(Err(notify::Error::generic(message)));
            }
        }
    }
}

impl WatchBackend for FakeBackend {
    fn watch(&self, path: &Path, sink: NotifySink) -> Result<WatchGuard, TailError> {
        if let Some(message) = self.fail_next.lock().unwrap().take() {
            return Err(notify::Error::generic(&message).into());
        }
        if self.missing_next.swap(false, Ordering::SeqCst) {
            return Err(TailError::FileMissing(path.to_path_buf()));
        }
        self.watches.fetch_add(1, Ordering::SeqCst);
        self.sinks.lock().unwrap().push((path.to_path_buf(), sink));
        Ok(WatchGuard::new(()))
    }
}

/// Let spawned session tasks run until they park again.
pub(crate) async fn settle() {
    for _ in 0..32 {
        tokio::task::yield_now().await;
    }
}
