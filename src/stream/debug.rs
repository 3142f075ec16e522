use std::fs::File;
use std::io::{self, Write};
use std::path::Path;
use std::sync::{Arc, Mutex};

/// Thread-safe sink appending raw tags to a capture file.
///
/// Tags are stored exactly as they arrived, so the capture is itself a
/// sequential FIFF stream in the source's byte order.
#[derive(Clone)]
pub struct TagRecorder {
    inner: Arc<Mutex<File>>,
}

impl TagRecorder {
    /// Create a recorder that writes to the provided path, truncating any existing file.
    pub fn create(path: &Path) -> io::Result<Self> {
        let file = File::create(path)?;
        Ok(Self {
            inner: Arc::new(Mutex::new(file)),
        })
    }

    /// Append one encoded tag (header and payload).
    pub fn record(&self, tag: &[u8]) -> io::Result<()> {
        let mut guard = self
            .inner
            .lock()
            .map_err(|_| io::Error::other("tag recorder poisoned"))?;
        guard.write_all(tag)?;
        guard.flush()
    }
}

impl std::fmt::Debug for TagRecorder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TagRecorder").finish_non_exhaustive()
    }
}

/// Hex rendering of a header for trace output.
pub(crate) fn hex(bytes: &[u8]) -> String {
    use std::fmt::Write as _;

    let mut out = String::with_capacity(bytes.len() * 3);
    for (i, byte) in bytes.iter().enumerate() {
        if i > 0 && i % 4 == 0 {
            out.push(' ');
        }
        let _ = write!(out, "{byte:02x}");
    }
    out
}
