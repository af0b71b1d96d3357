//! Store contracts shared by every backend.

use serde::Serialize;
use serde::de::DeserializeOwned;

/// Errors from event and snapshot stores.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("CBOR serialization error: {0}")]
    CborEncode(String),
    #[error("CBOR deserialization error: {0}")]
    CborDecode(String),
    #[error("concurrency conflict on stream {stream}: expected sequence {expected}, stream is at {actual}")]
    Conflict {
        stream: String,
        expected: u64,
        actual: u64,
    },
    #[error("corrupt event at {stream}:{line}: {reason}")]
    Corrupt {
        stream: String,
        line: usize,
        reason: String,
    },
    #[error("integrity check failed: expected {expected}, got {actual}")]
    Integrity { expected: String, actual: String },
    #[error("schema version mismatch: file has v{file_version}, expected v{expected_version}")]
    SchemaMismatch {
        file_version: u32,
        expected_version: u32,
    },
    #[error("invalid stream name: {0:?}")]
    InvalidStream(String),
}

impl StoreError {
    /// True when an append was rejected by the optimistic-concurrency check.
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict { .. })
    }
}

/// An event that can live in a log: serializable and sequence-stampable.
pub trait LogEvent: Clone + Serialize + DeserializeOwned + Send + Sync {
    fn sequence(&self) -> Option<u64>;
    fn set_sequence(&mut self, sequence: u64);
}

/// One page returned by [`EventStore::read`].
#[derive(Debug, Clone, PartialEq)]
pub struct ReadPage<E> {
    pub events: Vec<E>,
    /// Sequence of the last returned event, or `from_seq - 1` for an empty page.
    pub last_seq: u64,
    /// True once nothing exists beyond this page.
    pub eof: bool,
}

/// Append-only, per-stream event storage.
pub trait EventStore<E: LogEvent>: Send + Sync {
    /// Append `events`, stamping sequences `current + 1..`. When
    /// `expected_seq` is set and differs from the stream length, fail with
    /// [`StoreError::Conflict`] and write nothing. Returns the new last sequence.
    fn append(&self, stream: &str, events: &[E], expected_seq: Option<u64>)
    -> Result<u64, StoreError>;

    /// Read events in `[from_seq, from_seq + limit)` in append order.
    fn read(&self, stream: &str, from_seq: u64, limit: usize) -> Result<ReadPage<E>, StoreError>;
}

/// A materialized state at a given sequence.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot<S> {
    pub state: S,
    pub sequence: u64,
}

/// Latest-snapshot storage, one per stream.
pub trait SnapshotStore<S>: Send + Sync {
    fn load(&self, stream: &str) -> Result<Option<Snapshot<S>>, StoreError>;
    fn save(&self, stream: &str, state: &S, sequence: u64) -> Result<(), StoreError>;
}

/// Page bounds shared by the backends: `(start index, end index, eof)`.
pub(crate) fn page_bounds(total: usize, from_seq: u64, limit: usize) -> (usize, usize, bool) {
    let start = (from_seq.max(1) - 1) as usize;
    let start = start.min(total);
    let end = start.saturating_add(limit).min(total);
    (start, end, end >= total)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_bounds_cover_tail() {
        assert_eq!(page_bounds(10, 1, 4), (0, 4, false));
        assert_eq!(page_bounds(10, 9, 4), (8, 10, true));
        assert_eq!(page_bounds(10, 11, 4), (10, 10, true));
        assert_eq!(page_bounds(0, 1, 1000), (0, 0, true));
    }

    #[test]
    fn zero_from_seq_reads_from_start() {
        assert_eq!(page_bounds(3, 0, 2), (0, 2, false));
    }

    #[test]
    fn conflict_is_distinguishable() {
        let err = StoreError::Conflict {
            stream: "w".into(),
            expected: 1,
            actual: 2,
        };
        assert!(err.is_conflict());
        assert!(!StoreError::InvalidStream("a/b".into()).is_conflict());
    }
}
