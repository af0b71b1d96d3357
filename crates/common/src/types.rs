use serde::{Deserialize, Serialize};
use std::fmt;

use crate::material::{Material, SolidMaterial};

/// Vertical tiles kept per column.
pub const CHUNK_HEIGHT: u16 = 64;
/// Tiles per chunk horizontally.
pub const CHUNK_WIDTH: u16 = 32;
/// Terrain seed used when none is configured.
pub const DEFAULT_SEED: u32 = 20_250_920;

/// Errors from constructing primitives out of untrusted input.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PrimitiveError {
    #[error("tile x must be a finite integer, got {0}")]
    TileXRange(String),
    #[error("tile y must be an integer within [0, {CHUNK_HEIGHT}), got {0}")]
    TileYRange(String),
    #[error("material must be solid (not air)")]
    NotSolid,
    #[error("unknown material: {0}")]
    UnknownMaterial(String),
    #[error("unknown tool: {0}")]
    UnknownTool(String),
    #[error("player id must not be empty")]
    EmptyPlayerId,
}

impl PrimitiveError {
    /// True for the coordinate range errors.
    pub fn is_range(&self) -> bool {
        matches!(self, Self::TileXRange(_) | Self::TileYRange(_))
    }
}

/// Horizontal tile index. Any integer in the engine's `i32` domain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub struct TileX(i32);

impl TileX {
    pub fn new(value: i64) -> Result<Self, PrimitiveError> {
        i32::try_from(value)
            .map(Self)
            .map_err(|_| PrimitiveError::TileXRange(value.to_string()))
    }

    /// Accept a raw wire number, rejecting NaN, infinities and fractions.
    pub fn from_f64(value: f64) -> Result<Self, PrimitiveError> {
        if !value.is_finite() || value.fract() != 0.0 {
            return Err(PrimitiveError::TileXRange(value.to_string()));
        }
        if value < i32::MIN as f64 || value > i32::MAX as f64 {
            return Err(PrimitiveError::TileXRange(value.to_string()));
        }
        Ok(Self(value as i32))
    }

    pub fn get(self) -> i32 {
        self.0
    }
}

impl TryFrom<i64> for TileX {
    type Error = PrimitiveError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<TileX> for i64 {
    fn from(x: TileX) -> Self {
        x.0 as i64
    }
}

/// Vertical tile index, always within `[0, CHUNK_HEIGHT)`. Grows downward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub struct TileY(u16);

impl TileY {
    pub fn new(value: i64) -> Result<Self, PrimitiveError> {
        if !(0..CHUNK_HEIGHT as i64).contains(&value) {
            return Err(PrimitiveError::TileYRange(value.to_string()));
        }
        Ok(Self(value as u16))
    }

    pub fn from_f64(value: f64) -> Result<Self, PrimitiveError> {
        if !value.is_finite() || value.fract() != 0.0 {
            return Err(PrimitiveError::TileYRange(value.to_string()));
        }
        if value < 0.0 || value >= CHUNK_HEIGHT as f64 {
            return Err(PrimitiveError::TileYRange(value.to_string()));
        }
        Ok(Self(value as u16))
    }

    pub fn get(self) -> u16 {
        self.0
    }

    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl TryFrom<i64> for TileY {
    type Error = PrimitiveError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<TileY> for i64 {
    fn from(y: TileY) -> Self {
        y.0 as i64
    }
}

/// A validated tile position. Immutable once constructed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TileCoord {
    x: TileX,
    y: TileY,
}

impl TileCoord {
    pub fn new(x: i64, y: i64) -> Result<Self, PrimitiveError> {
        Ok(Self {
            x: TileX::new(x)?,
            y: TileY::new(y)?,
        })
    }

    pub fn from_parts(x: TileX, y: TileY) -> Self {
        Self { x, y }
    }

    pub fn x(&self) -> TileX {
        self.x
    }

    pub fn y(&self) -> TileY {
        self.y
    }
}

impl fmt::Display for TileCoord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x.0, self.y.0)
    }
}

/// One committed change to a tile.
///
/// Fields are private: the only constructors are [`BlockChange::removal`] and
/// [`BlockChange::placement`], which keep the air/solid invariant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BlockChange {
    coord: TileCoord,
    material: Material,
}

impl BlockChange {
    pub fn removal(coord: TileCoord) -> Self {
        Self {
            coord,
            material: Material::Air,
        }
    }

    pub fn placement(coord: TileCoord, material: SolidMaterial) -> Self {
        Self {
            coord,
            material: material.material(),
        }
    }

    pub fn coord(&self) -> TileCoord {
        self.coord
    }

    pub fn material(&self) -> Material {
        self.material
    }

    pub fn is_removal(&self) -> bool {
        self.material.is_air()
    }
}

/// Identifier of a connected player. Never empty.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PlayerId(String);

impl PlayerId {
    pub fn new(id: impl Into<String>) -> Result<Self, PrimitiveError> {
        let id = id.into();
        if id.is_empty() {
            return Err(PrimitiveError::EmptyPlayerId);
        }
        Ok(Self(id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for PlayerId {
    type Error = PrimitiveError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<PlayerId> for String {
    fn from(id: PlayerId) -> Self {
        id.0
    }
}

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
