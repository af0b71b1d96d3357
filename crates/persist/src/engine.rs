//! The log engine: folds a stream through a reducer, appends with an
//! optimistic-concurrency check and writes periodic snapshots.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::log::{EventStore, LogEvent, SnapshotStore, StoreError};
use crate::store::{cbor_deserialize, cbor_serialize};

/// Pure transition function folded over a stream.
pub type Reducer<S, E> = fn(S, &E) -> S;

/// Errors from replay and apply.
#[derive(Debug, thiserror::Error)]
pub enum LogError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("state clone failed: {0}")]
    Clone(String),
}

impl LogError {
    /// True when the append lost an optimistic-concurrency race. Callers
    /// should replay and retry.
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Store(e) if e.is_conflict())
    }
}

/// Deep-copies a state loaded from a snapshot before it is folded onto.
pub trait StateCloner<S>: Send + Sync {
    fn clone_state(&self, state: &S) -> Result<S, LogError>;
}

/// Clones through the type's own `Clone` impl.
#[derive(Debug, Clone, Copy, Default)]
pub struct StructuralClone;

impl<S: Clone> StateCloner<S> for StructuralClone {
    fn clone_state(&self, state: &S) -> Result<S, LogError> {
        Ok(state.clone())
    }
}

/// Clones by round-tripping through CBOR, the same encoding file snapshots use.
#[derive(Debug, Clone, Copy, Default)]
pub struct CborClone;

impl<S: Serialize + DeserializeOwned> StateCloner<S> for CborClone {
    fn clone_state(&self, state: &S) -> Result<S, LogError> {
        let bytes = cbor_serialize(state).map_err(|e| LogError::Clone(e.to_string()))?;
        cbor_deserialize(&bytes).map_err(|e| LogError::Clone(e.to_string()))
    }
}

/// Engine tuning.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineOptions {
    /// Write a snapshot once this many events were folded since the last one.
    /// `None` disables snapshotting.
    pub snapshot_every: Option<u64>,
    /// Events requested per store read.
    pub page_size: usize,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            snapshot_every: None,
            page_size: 1000,
        }
    }
}

/// Result of [`LogEngine::replay`].
#[derive(Debug, Clone, PartialEq)]
pub struct Replayed<S> {
    pub state: S,
    pub last_seq: u64,
}

/// Result of [`LogEngine::apply`]: the new state plus the appended events
/// with their store-assigned sequences.
#[derive(Debug, Clone, PartialEq)]
pub struct Committed<S, E> {
    pub state: S,
    pub last_seq: u64,
    pub events: Vec<E>,
}

/// Replay/append engine over pluggable stores.
pub struct LogEngine<S, E> {
    store: Box<dyn EventStore<E>>,
    snapshots: Option<Box<dyn SnapshotStore<S>>>,
    reducer: Reducer<S, E>,
    init: fn() -> S,
    cloner: Box<dyn StateCloner<S>>,
    options: EngineOptions,
}

impl<S, E> LogEngine<S, E>
where
    S: Clone + 'static,
    E: LogEvent + 'static,
{
    /// Engine without snapshots, cloning structurally.
    pub fn new(
        store: impl EventStore<E> + 'static,
        reducer: Reducer<S, E>,
        init: fn() -> S,
    ) -> Self {
        Self {
            store: Box::new(store),
            snapshots: None,
            reducer,
            init,
            cloner: Box::new(StructuralClone),
            options: EngineOptions::default(),
        }
    }

    pub fn with_snapshots(mut self, snapshots: impl SnapshotStore<S> + 'static) -> Self {
        self.snapshots = Some(Box::new(snapshots));
        self
    }

    pub fn with_cloner(mut self, cloner: impl StateCloner<S> + 'static) -> Self {
        self.cloner = Box::new(cloner);
        self
    }

    pub fn with_options(mut self, options: EngineOptions) -> Self {
        self.options = options;
        self
    }

    pub fn options(&self) -> &EngineOptions {
        &self.options
    }

    /// Rebuild the state of `stream` from its latest snapshot plus every
    /// event after it.
    pub fn replay(&self, stream: &str) -> Result<Replayed<S>, LogError> {
        self.replay_tracked(stream).map(|(replayed, _)| replayed)
    }

    /// Replay, append `events` expecting the replayed length, then fold them.
    ///
    /// A concurrent writer surfaces as an error for which
    /// [`LogError::is_conflict`] holds; nothing is written in that case.
    pub fn apply(&self, stream: &str, events: &[E]) -> Result<Committed<S, E>, LogError> {
        let (Replayed { mut state, last_seq }, snapshot_seq) = self.replay_tracked(stream)?;

        let new_last = match self.store.append(stream, events, Some(last_seq)) {
            Ok(seq) => seq,
            Err(e) => {
                if e.is_conflict() {
                    tracing::warn!(stream, expected = last_seq, "append rejected: {e}");
                }
                return Err(e.into());
            }
        };

        let mut committed = Vec::with_capacity(events.len());
        for (idx, event) in events.iter().enumerate() {
            let mut stamped = event.clone();
            stamped.set_sequence(last_seq + idx as u64 + 1);
            state = (self.reducer)(state, &stamped);
            committed.push(stamped);
        }
        tracing::debug!(stream, count = events.len(), last_seq = new_last, "applied events");

        self.maybe_snapshot(stream, &state, new_last, snapshot_seq)?;
        Ok(Committed {
            state,
            last_seq: new_last,
            events: committed,
        })
    }

    /// Replay and also report the sequence of the newest snapshot.
    fn replay_tracked(&self, stream: &str) -> Result<(Replayed<S>, u64), LogError> {
        let loaded = match &self.snapshots {
            Some(store) => store.load(stream)?,
            None => None,
        };
        let (mut state, mut snapshot_seq) = match loaded {
            Some(snapshot) => (self.cloner.clone_state(&snapshot.state)?, snapshot.sequence),
            None => ((self.init)(), 0),
        };

        let mut seq = snapshot_seq;
        let page_size = self.options.page_size.max(1);
        loop {
            let page = self.store.read(stream, seq + 1, page_size)?;
            let folded = page.events.len();
            for event in &page.events {
                state = (self.reducer)(state, event);
            }
            seq = page.last_seq.max(seq);
            tracing::debug!(stream, folded, seq, "replayed page");

            if folded > 0 {
                snapshot_seq = self.maybe_snapshot(stream, &state, seq, snapshot_seq)?;
            }
            if page.eof || folded == 0 {
                break;
            }
        }

        Ok((
            Replayed {
                state,
                last_seq: seq,
            },
            snapshot_seq,
        ))
    }

    /// Save a snapshot at `seq` if the threshold is met. Returns the sequence
    /// of the newest snapshot afterwards.
    fn maybe_snapshot(
        &self,
        stream: &str,
        state: &S,
        seq: u64,
        snapshot_seq: u64,
    ) -> Result<u64, LogError> {
        let (Some(store), Some(every)) = (&self.snapshots, self.options.snapshot_every) else {
            return Ok(snapshot_seq);
        };
        if every == 0 || seq.saturating_sub(snapshot_seq) < every {
            return Ok(snapshot_seq);
        }
        store.save(stream, state, seq)?;
        tracing::info!(stream, seq, "snapshot saved");
        Ok(seq)
    }
}
