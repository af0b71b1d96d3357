//! Terrain and the rules that move it: a seeded generator, a sparse override
//! store on top of it, the column settling cascade, and the pure command
//! evaluators that decide whether a mine, place or shot is legal.
//!
//! # Invariants
//! - The generator is a pure function of `(seed, x, y)`.
//! - The override map only holds tiles that differ from the generator.
//! - Evaluators never mutate; callers apply the descriptors they return.

pub mod commands;
pub mod content;
mod settle;
mod store;
mod terrain;

pub use commands::{
    CommandError, evaluate_mine, evaluate_place, evaluate_shoot, evaluate_strike, mined_event,
    parse_coord, placed_event, tool_changed_event,
};
pub use content::{CoreModule, correct_tool, hardness, material_from_id, material_id};
pub use settle::{RemovalComputation, SettleRules, column_from_sampler, compute_removal};
pub use store::WorldStore;
pub use terrain::{FlatTerrain, LayeredTerrain, TerrainGenerator};
