//! World Kernel: material/kind/strike-rule registration, domain events, the
//! pure world-state reducer and the world log that binds them to a stream.
//!
//! # Invariants
//! - Registry values are immutable; registration publishes a new value.
//! - All world-state mutations flow through [`reduce`] over a [`DomainEvent`].
//! - Replaying the same events from the initial state is bit-for-bit identical.

mod error;
pub mod events;
mod kernel;
pub mod modules;
pub mod registry;
mod validate;
pub mod world;
mod world_log;

pub use error::KernelError;
pub use events::{DomainEvent, EventKind, InventoryCounts};
pub use kernel::Kernel;
pub use modules::{ModuleError, ModuleHost, ModuleMeta, ServerApi, ServerModule};
pub use registry::{
    ClientKindSpec, DropKind, DropSpec, ItemDrop, KindSpec, MaterialCategory, MaterialSpec,
    Registry, ServerKindSpec, StrikeOutcome, StrikeRule,
};
pub use world::{Facing, Inventory, PlayerSnapshot, WorldState, reduce};
pub use world_log::{Observer, WorldLog, WorldLogOptions};
