//! File metadata and byte-range reads.

use std::io::{self, SeekFrom};
use std::path::Path;

use async_trait::async_trait;
use tokio::fs::File;
use tokio::io::{AsyncReadExt, AsyncSeekExt};

/// Result of a metadata query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileStat {
    /// Current length in bytes.
    pub len: u64,
    /// Whether the path is a regular file.
    pub is_file: bool,
}

/// Metadata and read access to the tailed file.
#[async_trait]
pub trait FileAccess: Send + Sync {
    /// Query size and type of `path`.
    async fn stat(&self, path: &Path) -> io::Result<FileStat>;

    /// Read the bytes in `[start, end)`.
    ///
    /// May return fewer bytes if the file shrank in the meantime.
    async fn read_range(&self, path: &Path, start: u64, end: u64) -> io::Result<Vec<u8>>;
}

/// [`FileAccess`] backed by the local filesystem.
#[derive(Debug, Default, Clone, Copy)]
pub struct LocalFiles;

#[async_trait]
impl FileAccess for LocalFiles {
    async fn stat(&self, path: &Path) -> io::Result<FileStat> {
        let metadata = tokio::fs::metadata(path).await?;
        Ok(FileStat {
            len: metadata.len(),
            is_file: metadata.is_file(),
        })
    }

    async fn read_range(&self, path: &Path, start: u64, end: u64) -> io::Result<Vec<u8>> {
        let wanted = end.saturating_sub(start);
        let capacity = usize::try_from(wanted).map_err(|_| {
            io::Error::new(io::ErrorKind::InvalidInput, "read range exceeds address space")
        })?;

        let mut file = File::open(path).await?;
        file.seek(SeekFrom::Start(start)).await?;

        let mut buf = Vec::with_capacity(capacity);
        file.take(wanted).read_to_end(&mut buf).await?;
        Ok(buf)
    }
}
