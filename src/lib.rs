//! Tailwatch - incremental single-file tailing with pause/resume cursors.

pub mod config;
pub mod watcher;
