//! Shared primitives: validated tile coordinates, materials, tools, player ids
//! and immutable block-change descriptors.
//!
//! # Invariants
//! - A [`TileY`] is always within `[0, CHUNK_HEIGHT)`.
//! - A removal [`BlockChange`] carries [`Material::Air`]; a placement never does.

mod material;
mod types;

pub use material::{Material, SolidMaterial, Tool};
pub use types::{
    BlockChange, CHUNK_HEIGHT, CHUNK_WIDTH, DEFAULT_SEED, PlayerId, PrimitiveError, TileCoord,
    TileX, TileY,
};
