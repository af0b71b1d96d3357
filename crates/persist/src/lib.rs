//! Persistence: a generic append-only event log with paged replay, optimistic
//! concurrency and periodic snapshots.
//!
//! # Invariants
//! - Event log is append-only; sequences are 1-based and gap-free per stream.
//! - An append with a stale expected sequence fails and writes nothing.
//! - Replaying the same events yields the same state regardless of page size.

mod engine;
mod log;
mod snapshot;
mod store;

pub use engine::{
    CborClone, Committed, EngineOptions, LogEngine, LogError, Reducer, Replayed, StateCloner,
    StructuralClone,
};
pub use log::{EventStore, LogEvent, ReadPage, Snapshot, SnapshotStore, StoreError};
pub use snapshot::{MemoryEventStore, MemorySnapshotStore};
pub use store::{FileSnapshotStore, JsonlEventStore};

#[cfg(test)]
mod fixtures;
