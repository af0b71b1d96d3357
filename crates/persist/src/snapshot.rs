use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

use crate::log::{EventStore, LogEvent, ReadPage, Snapshot, SnapshotStore, StoreError, page_bounds};

/// In-memory event store.
///
/// Cloning yields another handle onto the same streams, which is how tests
/// model two writers racing on one stream.
#[derive(Debug)]
pub struct MemoryEventStore<E> {
    streams: Arc<Mutex<HashMap<String, Vec<E>>>>,
}

impl<E> MemoryEventStore<E> {
    pub fn new() -> Self {
        Self {
            streams: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Number of events stored for `stream`.
    pub fn len(&self, stream: &str) -> usize {
        self.streams.lock().get(stream).map_or(0, Vec::len)
    }

    pub fn is_empty(&self, stream: &str) -> bool {
        self.len(stream) == 0
    }
}

impl<E> Clone for MemoryEventStore<E> {
    fn clone(&self) -> Self {
        Self {
            streams: Arc::clone(&self.streams),
        }
    }
}

impl<E> Default for MemoryEventStore<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: LogEvent> EventStore<E> for MemoryEventStore<E> {
    fn append(
        &self,
        stream: &str,
        events: &[E],
        expected_seq: Option<u64>,
    ) -> Result<u64, StoreError> {
        let mut streams = self.streams.lock();
        let list = streams.entry(stream.to_string()).or_default();
        let current = list.len() as u64;
        if let Some(expected) = expected_seq {
            if expected != current {
                return Err(StoreError::Conflict {
                    stream: stream.to_string(),
                    expected,
                    actual: current,
                });
            }
        }
        list.extend(events.iter().enumerate().map(|(idx, event)| {
            let mut stamped = event.clone();
            stamped.set_sequence(current + idx as u64 + 1);
            stamped
        }));
        Ok(list.len() as u64)
    }

    fn read(&self, stream: &str, from_seq: u64, limit: usize) -> Result<ReadPage<E>, StoreError> {
        let streams = self.streams.lock();
        let list = streams.get(stream).map(Vec::as_slice).unwrap_or_default();
        let (start, end, eof) = page_bounds(list.len(), from_seq, limit);
        let events = list[start..end].to_vec();
        let last_seq = events
            .last()
            .and_then(LogEvent::sequence)
            .unwrap_or(from_seq.saturating_sub(1));
        Ok(ReadPage {
            events,
            last_seq,
            eof,
        })
    }
}

/// In-memory latest-snapshot store. Cloning shares the underlying map.
#[derive(Debug)]
pub struct MemorySnapshotStore<S> {
    snapshots: Arc<Mutex<HashMap<String, Snapshot<S>>>>,
}

impl<S> MemorySnapshotStore<S> {
    pub fn new() -> Self {
        Self {
            snapshots: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Sequence of the stored snapshot for `stream`, if any.
    pub fn sequence(&self, stream: &str) -> Option<u64> {
        self.snapshots.lock().get(stream).map(|s| s.sequence)
    }
}

impl<S> Clone for MemorySnapshotStore<S> {
    fn clone(&self) -> Self {
        Self {
            snapshots: Arc::clone(&self.snapshots),
        }
    }
}

impl<S> Default for MemorySnapshotStore<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: Clone + Send + Sync> SnapshotStore<S> for MemorySnapshotStore<S> {
    fn load(&self, stream: &str) -> Result<Option<Snapshot<S>>, StoreError> {
        Ok(self.snapshots.lock().get(stream).cloned())
    }

    fn save(&self, stream: &str, state: &S, sequence: u64) -> Result<(), StoreError> {
        self.snapshots.lock().insert(
            stream.to_string(),
            Snapshot {
                state: state.clone(),
                sequence,
            },
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{Tally, tallies};

    #[test]
    fn append_stamps_one_based_sequences() {
        let store = MemoryEventStore::new();
        let last = store.append("w", &tallies("a", 3), Some(0)).unwrap();
        assert_eq!(last, 3);

        let page = store.read("w", 1, 10).unwrap();
        let seqs: Vec<_> = page.events.iter().map(|e| e.sequence).collect();
        assert_eq!(seqs, vec![Some(1), Some(2), Some(3)]);
        assert_eq!(page.last_seq, 3);
        assert!(page.eof);
    }

    #[test]
    fn stale_expected_seq_writes_nothing() {
        let store = MemoryEventStore::new();
        store.append("w", &tallies("a", 2), Some(0)).unwrap();

        let err = store.append("w", &tallies("b", 5), Some(1)).unwrap_err();
        assert!(err.is_conflict());
        assert_eq!(store.len("w"), 2);
    }

    #[test]
    fn append_without_expectation_skips_check() {
        let store = MemoryEventStore::new();
        store.append("w", &[Tally::new("x", 1)], None).unwrap();
        assert_eq!(store.append("w", &[Tally::new("y", 1)], None).unwrap(), 2);
    }

    #[test]
    fn read_pages_in_order() {
        let store = MemoryEventStore::new();
        store.append("w", &tallies("a", 5), Some(0)).unwrap();

        let first = store.read("w", 1, 2).unwrap();
        assert_eq!(first.events.len(), 2);
        assert_eq!(first.last_seq, 2);
        assert!(!first.eof);

        let last = store.read("w", 5, 2).unwrap();
        assert_eq!(last.events[0].id, "a-4");
        assert!(last.eof);
    }

    #[test]
    fn read_unknown_stream_is_empty_eof() {
        let store: MemoryEventStore<Tally> = MemoryEventStore::new();
        let page = store.read("missing", 1, 1000).unwrap();
        assert!(page.events.is_empty());
        assert_eq!(page.last_seq, 0);
        assert!(page.eof);
    }

    #[test]
    fn streams_are_independent() {
        let store = MemoryEventStore::new();
        store.append("a", &tallies("a", 2), Some(0)).unwrap();
        store.append("b", &tallies("b", 1), Some(0)).unwrap();
        assert_eq!(store.len("a"), 2);
        assert_eq!(store.len("b"), 1);
    }

    #[test]
    fn snapshot_store_keeps_latest() {
        let store = MemorySnapshotStore::new();
        assert!(store.load("w").unwrap().is_none());
        store.save("w", &10_i64, 4).unwrap();
        store.save("w", &25_i64, 9).unwrap();
        let snap = store.load("w").unwrap().unwrap();
        assert_eq!(snap.state, 25);
        assert_eq!(snap.sequence, 9);
        assert_eq!(store.sequence("w"), Some(9));
    }
}
