//! Stream configuration

use std::time::Duration;

#[cfg(feature = "debug-tools")]
use std::path::PathBuf;

use crate::format::{ByteOrder, DEFAULT_MAX_TAG_SIZE};

/// Stream configuration options.
#[derive(Debug, Clone)]
pub struct StreamConfig {
    /// Byte order of tags in the stream.
    pub byte_order: ByteOrder,
    /// Largest payload accepted before allocating, in bytes.
    pub max_tag_size: usize,
    /// Default bound for blocking live reads; `None` waits indefinitely.
    pub wait_timeout: Option<Duration>,
    /// Optional capture file receiving every tag read from a live source (debug builds only).
    #[cfg(feature = "debug-tools")]
    pub capture_path: Option<PathBuf>,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            byte_order: ByteOrder::Big,
            max_tag_size: DEFAULT_MAX_TAG_SIZE,
            wait_timeout: None,
            #[cfg(feature = "debug-tools")]
            capture_path: None,
        }
    }
}

impl StreamConfig {
    /// Configuration for the given byte order, other options defaulted.
    #[must_use]
    pub fn with_byte_order(byte_order: ByteOrder) -> Self {
        Self {
            byte_order,
            ..Self::default()
        }
    }
}
