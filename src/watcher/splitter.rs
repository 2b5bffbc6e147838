//! Chunk-to-line splitting with a carried trailing fragment.

/// Line separator of the host platform.
#[cfg(windows)]
pub const LINE_SEPARATOR: &[u8] = b"\r\n";
/// Line separator of the host platform.
#[cfg(not(windows))]
pub const LINE_SEPARATOR: &[u8] = b"\n";

/// Turns a byte stream, delivered in arbitrary chunks, into complete lines.
///
/// Bytes after the last separator of a chunk are held back as the trailing
/// fragment and prepended to the next chunk, so a line split across two reads
/// is emitted exactly once, after its terminator arrives. The fragment is kept
/// as raw bytes, which also reassembles UTF-8 sequences cut mid-character.
#[derive(Debug, Clone)]
pub struct LineSplitter {
    separator: &'static [u8],
    fragment: Vec<u8>,
}

impl Default for LineSplitter {
    fn default() -> Self {
        Self::new()
    }
}

impl LineSplitter {
    /// Create a splitter using the platform line separator.
    #[must_use]
    pub fn new() -> Self {
        Self::with_separator(LINE_SEPARATOR)
    }

    /// Create a splitter for an explicit, non-empty separator.
    ///
    /// # Panics
    ///
    /// Panics if `separator` is empty.
    #[must_use]
    pub fn with_separator(separator: &'static [u8]) -> Self {
        assert!(!separator.is_empty(), "line separator must not be empty");
        Self {
            separator,
            fragment: Vec::new(),
        }
    }

    /// Feed the next chunk and return every line it completes.
    ///
    /// Lines are returned without their separator. Lines that are blank after
    /// trimming whitespace are dropped; emitted lines keep their whitespace.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.fragment.extend_from_slice(chunk);

        let mut lines = Vec::new();
        let mut start = 0;
        while let Some(pos) = find(&self.fragment[start..], self.separator) {
            let segment = &self.fragment[start..start + pos];
            let line = String::from_utf8_lossy(segment);
            if !line.trim().is_empty() {
                lines.push(line.into_owned());
            }
            start += pos + self.separator.len();
        }
        self.fragment.drain(..start);

        lines
    }

    /// Bytes received after the last separator.
    #[must_use]
    pub fn fragment(&self) -> &[u8] {
        &self.fragment
    }

    /// Drop the held-back fragment.
    pub fn clear(&mut self) {
        self.fragment.clear();
    }
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.len() == 1 {
        return haystack.iter().position(|b| *b == needle[0]);
    }
    haystack.windows(needle.len()).position(|w| w == needle)
}
