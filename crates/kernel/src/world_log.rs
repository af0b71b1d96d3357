use loam_persist::{
    EngineOptions, EventStore, FileSnapshotStore, JsonlEventStore, LogEngine, LogError,
    MemoryEventStore, MemorySnapshotStore, SnapshotStore,
};
use serde::{Deserialize, Serialize};
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::path::Path;

use crate::events::DomainEvent;
use crate::world::{WorldState, reduce};

/// Called with exactly the events of each successful append.
pub type Observer = Box<dyn Fn(&[DomainEvent]) + Send + Sync>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldLogOptions {
    pub stream: String,
    pub snapshot_every: Option<u64>,
    pub page_size: usize,
    /// Attach the snapshot store. When off, every replay folds from the
    /// first event and nothing is loaded or saved.
    pub use_snapshots: bool,
}

impl Default for WorldLogOptions {
    fn default() -> Self {
        Self {
            stream: "loam".to_string(),
            snapshot_every: Some(1000),
            page_size: 1000,
            use_snapshots: true,
        }
    }
}

impl WorldLogOptions {
    pub fn engine_options(&self) -> EngineOptions {
        EngineOptions {
            snapshot_every: self.snapshot_every,
            page_size: self.page_size,
        }
    }
}

/// One world's stream plus a cached fold of it.
///
/// The cache only advances after the store accepted an append, so a failed
/// append or a misbehaving observer leaves it as it was.
pub struct WorldLog {
    engine: LogEngine<WorldState, DomainEvent>,
    stream: String,
    state: WorldState,
    last_seq: u64,
    observers: Vec<Observer>,
}

impl WorldLog {
    pub fn new(engine: LogEngine<WorldState, DomainEvent>, stream: impl Into<String>) -> Self {
        Self {
            engine,
            stream: stream.into(),
            state: WorldState::default(),
            last_seq: 0,
            observers: Vec::new(),
        }
    }

    /// A log over the given stores. Call [`WorldLog::replay`] before use when
    /// the stores may already hold events.
    pub fn with_stores(
        events: impl EventStore<DomainEvent> + 'static,
        snapshots: impl SnapshotStore<WorldState> + 'static,
        options: WorldLogOptions,
    ) -> Self {
        let engine = LogEngine::new(events, reduce, WorldState::default)
            .with_options(options.engine_options());
        let engine = if options.use_snapshots {
            engine.with_snapshots(snapshots)
        } else {
            engine
        };
        Self::new(engine, options.stream)
    }

    pub fn in_memory(options: WorldLogOptions) -> Self {
        Self::with_stores(MemoryEventStore::new(), MemorySnapshotStore::new(), options)
    }

    /// File-backed log rooted at `dir`, replayed and ready.
    pub fn open(dir: impl AsRef<Path>, options: WorldLogOptions) -> Result<Self, LogError> {
        let dir = dir.as_ref();
        let events = JsonlEventStore::open(dir)?;
        let snapshots = FileSnapshotStore::open(dir)?;
        let mut log = Self::with_stores(events, snapshots, options);
        log.replay()?;
        Ok(log)
    }

    pub fn stream(&self) -> &str {
        &self.stream
    }

    pub fn state(&self) -> &WorldState {
        &self.state
    }

    pub fn last_seq(&self) -> u64 {
        self.last_seq
    }

    pub fn add_observer(&mut self, observer: impl Fn(&[DomainEvent]) + Send + Sync + 'static) {
        self.observers.push(Box::new(observer));
    }

    /// Rebuild the cache from the stores.
    pub fn replay(&mut self) -> Result<&WorldState, LogError> {
        let replayed = self.engine.replay(&self.stream)?;
        self.state = replayed.state;
        self.last_seq = replayed.last_seq;
        tracing::info!(stream = %self.stream, last_seq = self.last_seq, "world replayed");
        Ok(&self.state)
    }

    /// Append events and notify observers. Returns the events as stored,
    /// sequence-stamped. An empty batch touches nothing.
    pub fn append(&mut self, events: Vec<DomainEvent>) -> Result<Vec<DomainEvent>, LogError> {
        if events.is_empty() {
            return Ok(Vec::new());
        }
        let committed = self.engine.apply(&self.stream, &events)?;
        self.state = committed.state;
        self.last_seq = committed.last_seq;
        tracing::debug!(
            stream = %self.stream,
            count = committed.events.len(),
            last_seq = self.last_seq,
            "world events appended"
        );

        for (idx, observer) in self.observers.iter().enumerate() {
            let outcome = catch_unwind(AssertUnwindSafe(|| observer(&committed.events)));
            if outcome.is_err() {
                tracing::warn!(stream = %self.stream, observer = idx, "observer panicked");
            }
        }
        Ok(committed.events)
    }
}
