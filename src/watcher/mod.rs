//! Incremental tailing of a single text file.
//!
//! A [`TailSession`] follows one file: it emits each newly completed line,
//! tolerates the file not existing yet or being deleted, and can be paused
//! and resumed from a byte cursor.

mod backend;
mod coordinator;
mod debounce;
mod directory;
mod error;
mod fs;
mod session;
mod splitter;
mod tailer;
#[cfg(test)]
mod testing;

pub use backend::{classify, Notice, NotifyBackend, NotifySink, WatchBackend, WatchGuard};
pub use debounce::PassGate;
pub use directory::DirectoryWait;
pub use error::TailError;
pub use fs::{FileAccess, FileStat, LocalFiles};
pub use session::{TailEvent, TailEvents, TailSession, WatchOptions};
pub use splitter::{LineSplitter, LINE_SEPARATOR};
pub use tailer::{IncrementalReader, SessionState, DEFAULT_READ_CHUNK_BYTES};
