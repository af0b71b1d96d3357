//! Domain events: a flat JSON envelope plus a closed set of payloads.

use loam_common::{PlayerId, SolidMaterial, TileCoord, TileX, TileY, Tool};
use loam_persist::LogEvent;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

/// Signed per-material counts as carried on the wire. Folded into an
/// inventory with negatives clamped to zero.
pub type InventoryCounts = BTreeMap<SolidMaterial, i64>;

/// One entry in a world stream.
///
/// Serialized flat: `{"id", "type", "timestamp", "sequence"?, "metadata"?, ...payload}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DomainEvent {
    pub id: String,
    pub timestamp: i64,
    /// Stamped by the store on append.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sequence: Option<u64>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, serde_json::Value>,
    #[serde(flatten)]
    pub kind: EventKind,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum EventKind {
    #[serde(rename = "player.mined", rename_all = "camelCase")]
    Mined {
        player_id: PlayerId,
        tile_x: TileX,
        tile_y: TileY,
        material: SolidMaterial,
    },
    #[serde(rename = "player.placed", rename_all = "camelCase")]
    Placed {
        player_id: PlayerId,
        tile_x: TileX,
        tile_y: TileY,
        material: SolidMaterial,
    },
    #[serde(rename = "player.changedTool", rename_all = "camelCase")]
    ChangedTool { player_id: PlayerId, tool: Tool },
    #[serde(rename = "player.inventoryUpdated", rename_all = "camelCase")]
    InventoryUpdated {
        player_id: PlayerId,
        inventory: InventoryCounts,
    },
    #[serde(rename = "player.shot", rename_all = "camelCase")]
    Shot {
        shooter_id: PlayerId,
        origin_x: f32,
        origin_y: f32,
        dir_x: f32,
        dir_y: f32,
        hit_id: Option<PlayerId>,
    },
    #[serde(rename = "player.respawned", rename_all = "camelCase")]
    Respawned {
        player_id: PlayerId,
        x: f32,
        y: f32,
        hp: u32,
        energy: f32,
    },
}

impl EventKind {
    /// Wire discriminator.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Mined { .. } => "player.mined",
            Self::Placed { .. } => "player.placed",
            Self::ChangedTool { .. } => "player.changedTool",
            Self::InventoryUpdated { .. } => "player.inventoryUpdated",
            Self::Shot { .. } => "player.shot",
            Self::Respawned { .. } => "player.respawned",
        }
    }

    pub fn mined(player_id: PlayerId, coord: TileCoord, material: SolidMaterial) -> Self {
        Self::Mined {
            player_id,
            tile_x: coord.x(),
            tile_y: coord.y(),
            material,
        }
    }

    pub fn placed(player_id: PlayerId, coord: TileCoord, material: SolidMaterial) -> Self {
        Self::Placed {
            player_id,
            tile_x: coord.x(),
            tile_y: coord.y(),
            material,
        }
    }
}

impl DomainEvent {
    /// A fresh event with a random v4 id.
    pub fn new(kind: EventKind, timestamp: i64) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            timestamp,
            sequence: None,
            metadata: BTreeMap::new(),
            kind,
        }
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    pub fn type_name(&self) -> &'static str {
        self.kind.type_name()
    }
}

impl LogEvent for DomainEvent {
    fn sequence(&self) -> Option<u64> {
        self.sequence
    }

    fn set_sequence(&mut self, sequence: u64) {
        self.sequence = Some(sequence);
    }
}
