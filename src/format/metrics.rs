//! Process-wide codec counters.

use std::sync::atomic::{AtomicU64, Ordering};

/// Track FIFF codec metrics without external dependencies.
pub(crate) struct Metrics;

static TAGS_READ: AtomicU64 = AtomicU64::new(0);
static TAGS_WRITTEN: AtomicU64 = AtomicU64::new(0);
static BYTES_READ: AtomicU64 = AtomicU64::new(0);
static BYTES_WRITTEN: AtomicU64 = AtomicU64::new(0);
static SHORT_READS: AtomicU64 = AtomicU64::new(0);
static DECODE_FAILURES: AtomicU64 = AtomicU64::new(0);

/// Direction of tag flow for counting.
#[derive(Clone, Copy)]
pub(crate) enum TagDirection {
    Read,
    Written,
}

impl Metrics {
    #[inline]
    pub(crate) fn record_tag(direction: TagDirection, payload_len: usize) {
        let bytes = payload_len as u64;
        match direction {
            TagDirection::Read => {
                TAGS_READ.fetch_add(1, Ordering::Relaxed);
                BYTES_READ.fetch_add(bytes, Ordering::Relaxed);
            }
            TagDirection::Written => {
                TAGS_WRITTEN.fetch_add(1, Ordering::Relaxed);
                BYTES_WRITTEN.fetch_add(bytes, Ordering::Relaxed);
            }
        }
    }

    #[inline]
    pub(crate) fn record_short_read() {
        SHORT_READS.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn record_decode_failure() {
        DECODE_FAILURES.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn totals() -> MetricsSnapshot {
        MetricsSnapshot {
            tags_read: TAGS_READ.load(Ordering::Relaxed),
            tags_written: TAGS_WRITTEN.load(Ordering::Relaxed),
            bytes_read: BYTES_READ.load(Ordering::Relaxed),
            bytes_written: BYTES_WRITTEN.load(Ordering::Relaxed),
            short_reads: SHORT_READS.load(Ordering::Relaxed),
            decode_failures: DECODE_FAILURES.load(Ordering::Relaxed),
        }
    }
}

/// Current values of the process-wide counters
#[must_use]
pub fn snapshot() -> MetricsSnapshot {
    Metrics::totals()
}

/// Lightweight snapshot of codec counters.
#[derive(Default, Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MetricsSnapshot {
    /// Tags read from any source
    pub tags_read: u64,
    /// Tags written to any sink
    pub tags_written: u64,
    /// Payload bytes read
    pub bytes_read: u64,
    /// Payload bytes written
    pub bytes_written: u64,
    /// Header or payload reads that ran out of data
    pub short_reads: u64,
    /// Payloads kept raw because typed decoding failed
    pub decode_failures: u64,
}

impl MetricsSnapshot {
    /// Average payload size of tags read, in bytes.
    #[must_use]
    pub fn avg_read_payload(&self) -> Option<u64> {
        self.bytes_read.checked_div(self.tags_read)
    }

    /// Counter deltas since an earlier snapshot.
    #[must_use]
    pub fn since(&self, earlier: &Self) -> Self {
        Self {
            tags_read: self.tags_read.saturating_sub(earlier.tags_read),
            tags_written: self.tags_written.saturating_sub(earlier.tags_written),
            bytes_read: self.bytes_read.saturating_sub(earlier.bytes_read),
            bytes_written: self.bytes_written.saturating_sub(earlier.bytes_written),
            short_reads: self.short_reads.saturating_sub(earlier.short_reads),
            decode_failures: self.decode_failures.saturating_sub(earlier.decode_failures),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters_grow() {
        let before = snapshot();
        Metrics::record_tag(TagDirection::Read, 12);
        Metrics::record_tag(TagDirection::Written, 8);
        Metrics::record_short_read();
        let delta = snapshot().since(&before);
        // Other tests run concurrently, so only lower bounds hold.
        assert!(delta.tags_read >= 1);
        assert!(delta.bytes_read >= 12);
        assert!(delta.tags_written >= 1);
        assert!(delta.short_reads >= 1);
    }

    #[test]
    fn test_average_payload() {
        let snap = MetricsSnapshot {
            tags_read: 4,
            bytes_read: 100,
            ..MetricsSnapshot::default()
        };
        assert_eq!(snap.avg_read_payload(), Some(25));
        assert_eq!(MetricsSnapshot::default().avg_read_payload(), None);
    }
}
