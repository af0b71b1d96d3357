use glam::Vec2;
use loam_common::{BlockChange, PlayerId, SolidMaterial, TileCoord, Tool};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::events::{DomainEvent, EventKind, InventoryCounts};

/// Per-material quantities. Never negative.
pub type Inventory = BTreeMap<SolidMaterial, u32>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Facing {
    Left,
    #[default]
    Right,
}

/// Last known state of one player.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerSnapshot {
    pub id: PlayerId,
    pub position: Vec2,
    pub velocity: Vec2,
    pub hp: u32,
    pub energy: f32,
    pub facing: Facing,
    pub current_tool: Tool,
    pub selected_material: Option<SolidMaterial>,
    pub inventory: Inventory,
}

impl PlayerSnapshot {
    /// A freshly joined player: full health, shovel in hand, every material at zero.
    pub fn default_for(id: PlayerId) -> Self {
        Self {
            id,
            position: Vec2::ZERO,
            velocity: Vec2::ZERO,
            hp: 100,
            energy: 100.0,
            facing: Facing::Right,
            current_tool: Tool::Shovel,
            selected_material: None,
            inventory: SolidMaterial::ALL.into_iter().map(|m| (m, 0)).collect(),
        }
    }
}

/// The folded world.
///
/// `blocks` is the full ordered history of committed block changes, not a
/// compacted grid. Maps are `BTreeMap` so iteration and hashing are stable.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct WorldState {
    pub tick: u64,
    pub players: BTreeMap<PlayerId, PlayerSnapshot>,
    pub blocks: Vec<BlockChange>,
}

impl WorldState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn player(&self, id: &PlayerId) -> Option<&PlayerSnapshot> {
        self.players.get(id)
    }

    /// Deterministic FNV-1a hash over the canonical iteration order.
    pub fn state_hash(&self) -> u64 {
        let mut h: u64 = 0xcbf2_9ce4_8422_2325;
        let mix = |h: &mut u64, bytes: &[u8]| {
            for &b in bytes {
                *h ^= b as u64;
                *h = h.wrapping_mul(0x0100_0000_01b3);
            }
        };
        mix(&mut h, &self.tick.to_le_bytes());
        for (id, p) in &self.players {
            mix(&mut h, id.as_str().as_bytes());
            for v in [p.position.x, p.position.y, p.velocity.x, p.velocity.y, p.energy] {
                mix(&mut h, &v.to_bits().to_le_bytes());
            }
            mix(&mut h, &p.hp.to_le_bytes());
            mix(&mut h, &[p.facing as u8, p.current_tool as u8]);
            mix(&mut h, &[p.selected_material.map_or(0, |m| m.material() as u8)]);
            for (mat, qty) in &p.inventory {
                mix(&mut h, &[mat.material() as u8]);
                mix(&mut h, &qty.to_le_bytes());
            }
        }
        for change in &self.blocks {
            let coord = change.coord();
            mix(&mut h, &coord.x().get().to_le_bytes());
            mix(&mut h, &coord.y().get().to_le_bytes());
            mix(&mut h, &[change.material() as u8]);
        }
        h
    }

    fn upsert_player(mut self, id: &PlayerId, f: impl FnOnce(&mut PlayerSnapshot)) -> Self {
        let player = self
            .players
            .entry(id.clone())
            .or_insert_with(|| PlayerSnapshot::default_for(id.clone()));
        f(player);
        self
    }
}

/// Fold one event into the world. Pure and total.
///
/// Player events for an id not yet present synthesize a default player first.
pub fn reduce(state: WorldState, event: &DomainEvent) -> WorldState {
    match &event.kind {
        EventKind::Mined {
            tile_x, tile_y, ..
        } => {
            let mut state = state;
            let coord = TileCoord::from_parts(*tile_x, *tile_y);
            state.blocks.push(BlockChange::removal(coord));
            state
        }
        EventKind::Placed {
            tile_x,
            tile_y,
            material,
            ..
        } => {
            let mut state = state;
            let coord = TileCoord::from_parts(*tile_x, *tile_y);
            state.blocks.push(BlockChange::placement(coord, *material));
            state
        }
        EventKind::ChangedTool { player_id, tool } => {
            state.upsert_player(player_id, |p| p.current_tool = *tool)
        }
        EventKind::InventoryUpdated {
            player_id,
            inventory,
        } => state.upsert_player(player_id, |p| p.inventory = clamp_counts(inventory)),
        EventKind::Shot { .. } => state,
        EventKind::Respawned {
            player_id,
            x,
            y,
            hp,
            energy,
        } => state.upsert_player(player_id, |p| {
            p.position = Vec2::new(*x, *y);
            p.hp = *hp;
            p.energy = *energy;
        }),
    }
}

fn clamp_counts(counts: &InventoryCounts) -> Inventory {
    counts
        .iter()
        .map(|(mat, qty)| (*mat, (*qty).clamp(0, u32::MAX as i64) as u32))
        .collect()
}
