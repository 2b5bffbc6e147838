//! Filesystem change notifications.
//!
//! Bridges notify callbacks, which run on the watcher's own thread, into a
//! tokio channel consumed by the session task.

use std::path::Path;
use std::time::Duration;

use notify::event::ModifyKind;
use notify::{EventKind, RecursiveMode, Watcher};
use notify_debouncer_full::{new_debouncer, DebounceEventResult};
use tokio::sync::mpsc;

use super::error::TailError;

/// Receiving end of a watch: raw notify results, in delivery order.
pub type NotifySink = mpsc::UnboundedSender<notify::Result<notify::Event>>;

/// Keeps a watch alive; dropping it stops the watch.
pub struct WatchGuard {
    _inner: Box<dyn Send>,
}

impl WatchGuard {
    /// Wrap whatever object owns the underlying watch.
    pub fn new<T: Send + 'static>(inner: T) -> Self {
        Self {
            _inner: Box::new(inner),
        }
    }
}

impl std::fmt::Debug for WatchGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("WatchGuard")
    }
}

/// Source of change notifications for a path.
pub trait WatchBackend: Send + Sync {
    /// Start watching `path` non-recursively, forwarding events to `sink`.
    ///
    /// # Errors
    ///
    /// Returns [`TailError::FileMissing`] if `path` does not exist, or
    /// [`TailError::Watch`] if the watch cannot be established.
    fn watch(&self, path: &Path, sink: NotifySink) -> Result<WatchGuard, TailError>;
}

/// [`WatchBackend`] using the platform's recommended notify watcher.
///
/// With a debounce window configured, events are batched by
/// notify-debouncer-full before they reach the session.
#[derive(Debug, Default, Clone, Copy)]
pub struct NotifyBackend {
    debounce: Option<Duration>,
}

impl NotifyBackend {
    /// Deliver raw notify events.
    #[must_use]
    pub fn new() -> Self {
        Self { debounce: None }
    }

    /// Batch events over `window` before delivering them.
    #[must_use]
    pub fn with_debounce(window: Duration) -> Self {
        Self {
            debounce: Some(window),
        }
    }

    /// Configured debounce window, if any.
    #[must_use]
    pub fn debounce(&self) -> Option<Duration> {
        self.debounce
    }
}

impl WatchBackend for NotifyBackend {
    fn watch(&self, path: &Path, sink: NotifySink) -> Result<WatchGuard, TailError> {
        if let Some(window) = self.debounce {
            let mut debouncer = new_debouncer(window, None, move |result: DebounceEventResult| {
                match result {
                    Ok(events) => {
                        for event in events {
                            let _ = sink.send(Ok(event.event));
                        }
                    }
                    Err(errors) => {
                        for error in errors {
                            let _ = sink.send(Err(error));
                        }
                    }
                }
            })?;
            debouncer
                .watch(path, RecursiveMode::NonRecursive)
                .map_err(|e| watch_error(path, e))?;
            return Ok(WatchGuard::new(debouncer));
        }

        let mut watcher = notify::recommended_watcher(move |result: notify::Result<notify::Event>| {
            let _ = sink.send(result);
        })?;
        watcher
            .watch(path, RecursiveMode::NonRecursive)
            .map_err(|e| watch_error(path, e))?;
        Ok(WatchGuard::new(watcher))
    }
}

/// A watch on a path that vanished is the missing-file case, not a watcher
/// failure.
fn watch_error(path: &Path, err: notify::Error) -> TailError {
    let missing = match &err.kind {
        notify::ErrorKind::PathNotFound => true,
        notify::ErrorKind::Io(io) => io.kind() == std::io::ErrorKind::NotFound,
        _ => false,
    };
    if missing {
        TailError::FileMissing(path.to_path_buf())
    } else {
        TailError::Watch(err)
    }
}

/// How the session reacts to a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Notice {
    /// File content or metadata changed; schedule a read pass.
    Changed,
    /// Entry created, removed or renamed.
    Renamed,
    /// Nothing to act on.
    Ignored,
}

/// Sort a notify event kind into the categories the session acts on.
#[must_use]
pub fn classify(kind: &EventKind) -> Notice {
    match kind {
        EventKind::Create(_) | EventKind::Remove(_) | EventKind::Modify(ModifyKind::Name(_)) => {
            Notice::Renamed
        }
        EventKind::Access(_) => Notice::Ignored,
        EventKind::Modify(_) | EventKind::Any | EventKind::Other => Notice::Changed,
    }
}
