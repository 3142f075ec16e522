//! Live tag source with an explicit, bounded blocking read.
//!
//! A [`LiveWriter`] appends encoded tags (or arbitrary chunks of them) to a
//! shared buffer; a [`LiveReader`] waits until a complete tag is buffered.
//! Waiting is the only suspension point in the crate and is always opted
//! into through [`LiveReader::read_rt_tag`] with a [`Wait`] bound.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use bytes::{Buf, BytesMut};
use tracing::{debug, instrument, trace, warn};

use super::config::StreamConfig;
#[cfg(feature = "debug-tools")]
use super::debug::TagRecorder;
use crate::format::metrics::{Metrics, TagDirection};
use crate::format::{Error, HEADER_SIZE, Result, Tag, TagHeader};

/// Longest single sleep while waiting, so cancellation is noticed promptly.
const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Shared flag used to abandon a blocking read from another thread.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    /// Fresh, uncancelled token.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    /// Check whether cancellation was requested.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }
}

/// Bound on a blocking read.
#[derive(Debug, Clone, Default)]
pub struct Wait {
    /// Give up after this long; `None` waits until data, close or cancel.
    pub timeout: Option<Duration>,
    /// Abandon the wait when cancelled.
    pub cancel: Option<CancelToken>,
}

impl Wait {
    /// Wait without a time limit.
    #[must_use]
    pub fn forever() -> Self {
        Self::default()
    }

    /// Wait at most `timeout`.
    #[must_use]
    pub fn timeout(timeout: Duration) -> Self {
        Self {
            timeout: Some(timeout),
            cancel: None,
        }
    }

    /// Also stop when `token` is cancelled.
    #[must_use]
    pub fn with_cancel(mut self, token: CancelToken) -> Self {
        self.cancel = Some(token);
        self
    }

    fn is_cancelled(&self) -> bool {
        self.cancel.as_ref().is_some_and(CancelToken::is_cancelled)
    }
}

#[derive(Debug, Default)]
struct LiveState {
    buffer: BytesMut,
    closed: bool,
}

#[derive(Debug, Default)]
struct Shared {
    state: Mutex<LiveState>,
    ready: Condvar,
}

impl Shared {
    fn lock(&self) -> Result<MutexGuard<'_, LiveState>> {
        self.state
            .lock()
            .map_err(|_| Error::Io(std::io::Error::other("live buffer poisoned")))
    }
}

/// Create a connected writer/reader pair.
#[must_use]
pub fn channel(config: StreamConfig) -> (LiveWriter, LiveReader) {
    let shared = Arc::new(Shared::default());
    let writer = LiveWriter {
        shared: Arc::clone(&shared),
        config: config.clone(),
    };
    #[cfg(feature = "debug-tools")]
    let recorder = config.capture_path.as_deref().and_then(|path| {
        TagRecorder::create(path)
            .map_err(|err| debug!(error = ?err, "failed to create capture file"))
            .ok()
    });
    let reader = LiveReader {
        shared,
        config,
        #[cfg(feature = "debug-tools")]
        recorder,
    };
    (writer, reader)
}

/// Producing side of a live source. Dropping it closes the source.
#[derive(Debug)]
pub struct LiveWriter {
    shared: Arc<Shared>,
    config: StreamConfig,
}

impl LiveWriter {
    /// Append raw bytes, which may hold any part of a tag.
    pub fn write_bytes(&self, bytes: &[u8]) -> Result<()> {
        let mut state = self.shared.lock()?;
        if state.closed {
            return Err(Error::Closed);
        }
        state.buffer.extend_from_slice(bytes);
        drop(state);
        self.shared.ready.notify_all();
        Ok(())
    }

    /// Encode and append a whole tag.
    pub fn write_tag(&self, tag: &Tag) -> Result<()> {
        let mut encoded = BytesMut::with_capacity(HEADER_SIZE + tag.size());
        tag.encode(self.config.byte_order, &mut encoded)?;
        self.write_bytes(&encoded)?;
        Metrics::record_tag(TagDirection::Written, tag.size());
        Ok(())
    }

    /// Close the source, waking any blocked reader.
    pub fn close(&self) {
        if let Ok(mut state) = self.shared.lock() {
            state.closed = true;
        }
        self.shared.ready.notify_all();
    }
}

impl Drop for LiveWriter {
    fn drop(&mut self) {
        self.close();
    }
}

/// Consuming side of a live source.
#[derive(Debug)]
pub struct LiveReader {
    shared: Arc<Shared>,
    config: StreamConfig,
    #[cfg(feature = "debug-tools")]
    recorder: Option<TagRecorder>,
}

impl LiveReader {
    /// Bytes currently buffered.
    pub fn bytes_available(&self) -> Result<usize> {
        Ok(self.shared.lock()?.buffer.len())
    }

    /// Wait bound taken from the configuration.
    #[must_use]
    pub fn default_wait(&self) -> Wait {
        Wait {
            timeout: self.config.wait_timeout,
            cancel: None,
        }
    }

    fn wait_for<'a>(
        &'a self,
        mut state: MutexGuard<'a, LiveState>,
        needed: usize,
        wait: &Wait,
        deadline: Option<Instant>,
    ) -> Result<MutexGuard<'a, LiveState>> {
        loop {
            if wait.is_cancelled() {
                return Err(Error::Cancelled);
            }
            if state.buffer.len() >= needed {
                return Ok(state);
            }
            if state.closed {
                return Err(Error::Closed);
            }
            let slice = match deadline {
                Some(deadline) => {
                    let now = Instant::now();
                    if now >= deadline {
                        return Err(Error::Timeout { needed });
                    }
                    (deadline - now).min(POLL_INTERVAL)
                }
                None => POLL_INTERVAL,
            };
            trace!(needed, buffered = state.buffer.len(), "waiting for live data");
            state = self
                .shared
                .ready
                .wait_timeout(state, slice)
                .map_err(|_| Error::Io(std::io::Error::other("live buffer poisoned")))?
                .0;
        }
    }

    /// Block until a complete tag is buffered, then take it.
    ///
    /// Fails with [`Error::Timeout`], [`Error::Cancelled`] or
    /// [`Error::Closed`] according to `wait`; on those failures nothing is
    /// consumed from the buffer. A header whose size is negative or above
    /// the configured limit is dropped from the buffer and reported as
    /// [`Error::TagTooLarge`], so the next call starts at the following
    /// bytes.
    #[instrument(level = "trace", skip(self))]
    pub fn read_rt_tag(&mut self, wait: &Wait) -> Result<Tag> {
        let deadline = wait.timeout.map(|t| Instant::now() + t);
        let state = self.shared.lock()?;
        let mut state = self.wait_for(state, HEADER_SIZE, wait, deadline)?;
        let header = TagHeader::from_bytes(&state.buffer, self.config.byte_order)?;
        let size = match header.payload_len(self.config.max_tag_size) {
            Ok(size) => size,
            Err(err) => {
                state.buffer.advance(HEADER_SIZE);
                warn!(kind = header.kind, size = header.size, "dropped live tag header");
                return Err(err);
            }
        };
        let mut state = self.wait_for(state, HEADER_SIZE + size, wait, deadline)?;

        let mut raw = state.buffer.split_to(HEADER_SIZE + size);
        drop(state);
        #[cfg(feature = "debug-tools")]
        if let Some(recorder) = &self.recorder {
            if let Err(err) = recorder.record(&raw) {
                debug!(error = ?err, "failed to record live tag");
            }
        }
        let payload = raw.split_off(HEADER_SIZE);
        Metrics::record_tag(TagDirection::Read, size);
        debug!(kind = header.kind, size, "live tag received");
        Ok(Tag::from_wire(&header, payload, self.config.byte_order))
    }

    fn has_complete_tag(&self) -> Result<bool> {
        let state = self.shared.lock()?;
        if state.buffer.len() < HEADER_SIZE {
            return Ok(false);
        }
        let header = TagHeader::from_bytes(&state.buffer, self.config.byte_order)?;
        // A bad header is handed to read_rt_tag, which drops it.
        Ok(header
            .payload_len(self.config.max_tag_size)
            .map_or(true, |size| state.buffer.len() >= HEADER_SIZE + size))
    }

    /// Take a complete tag if one is buffered, without waiting.
    pub fn try_read_tag(&mut self) -> Result<Option<Tag>> {
        if !self.has_complete_tag()? {
            return Ok(None);
        }
        self.read_rt_tag(&Wait::timeout(Duration::ZERO)).map(Some)
    }
}
