//! Pure command evaluators.
//!
//! Each evaluator reads the world and either returns what the command would
//! change or a [`CommandError`] whose [`code`](CommandError::code) is sent
//! back to the player. Nothing here mutates; the caller applies the result.

use loam_common::{
    BlockChange, PlayerId, PrimitiveError, SolidMaterial, TileCoord, TileX, TileY, Tool,
};
use loam_kernel::{DomainEvent, EventKind, Inventory, ItemDrop, Registry, StrikeOutcome};

use crate::content::material_id;
use crate::settle::RemovalComputation;
use crate::store::WorldStore;
use crate::terrain::TerrainGenerator;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CommandError {
    #[error("nothing to mine at {0}")]
    MineInvalid(TileCoord),
    #[error("{tool} cannot break {material}")]
    MineForbidden { tool: Tool, material: SolidMaterial },
    #[error("no {0} left to place")]
    PlaceEmpty(SolidMaterial),
    #[error("tile {0} is occupied")]
    PlaceOccupied(TileCoord),
    #[error("rifle cooling down for {remaining_ms}ms")]
    ShootCooldown { remaining_ms: i64 },
    #[error(transparent)]
    Input(#[from] PrimitiveError),
}

impl CommandError {
    /// Stable reason code for the client.
    pub fn code(&self) -> &'static str {
        match self {
            Self::MineInvalid(_) => "mine-block/invalid",
            Self::MineForbidden { .. } => "mine-block/forbidden",
            Self::PlaceEmpty(_) => "place-block/empty",
            Self::PlaceOccupied(_) => "place-block/occupied",
            Self::ShootCooldown { .. } => "shoot/cooldown",
            Self::Input(e) if e.is_range() => "coord/out-of-range",
            Self::Input(_) => "input/invalid",
        }
    }
}

/// Validate raw client coordinates.
pub fn parse_coord(x: f64, y: f64) -> Result<TileCoord, CommandError> {
    Ok(TileCoord::from_parts(TileX::from_f64(x)?, TileY::from_f64(y)?))
}

/// What mining `coord` would remove and how the column would settle.
pub fn evaluate_mine<G: TerrainGenerator>(
    world: &WorldStore<G>,
    coord: TileCoord,
) -> Result<RemovalComputation, CommandError> {
    world
        .compute_removal(coord)
        .ok_or(CommandError::MineInvalid(coord))
}

/// Look up what `tool` does to `material`.
///
/// `Ok(None)` means the strike lands but removes nothing yet.
pub fn evaluate_strike(
    registry: &Registry,
    tool: Tool,
    material: SolidMaterial,
) -> Result<Option<Vec<ItemDrop>>, CommandError> {
    let forbidden = CommandError::MineForbidden { tool, material };
    match registry.strike_rule(tool.name(), &material_id(material)) {
        None => Err(forbidden),
        Some(rule) => match &rule.outcome {
            StrikeOutcome::Error { .. } => Err(forbidden),
            StrikeOutcome::NoOp => Ok(None),
            StrikeOutcome::Removed { drops } => Ok(Some(drops.clone())),
        },
    }
}

/// Placement descriptor for `material` at `coord`, if the player holds one
/// and the tile is free.
pub fn evaluate_place<G: TerrainGenerator>(
    world: &WorldStore<G>,
    coord: TileCoord,
    material: SolidMaterial,
    inventory: &Inventory,
) -> Result<BlockChange, CommandError> {
    if inventory.get(&material).copied().unwrap_or(0) == 0 {
        return Err(CommandError::PlaceEmpty(material));
    }
    world
        .prepare_placement(coord, material)
        .ok_or(CommandError::PlaceOccupied(coord))
}

/// Rate limit for the rifle. A player who never fired may always fire; a
/// last shot stamped after `now` counts as still cooling down.
pub fn evaluate_shoot(
    now: i64,
    last_shot_at: Option<i64>,
    cooldown_ms: i64,
) -> Result<(), CommandError> {
    let Some(last) = last_shot_at else {
        return Ok(());
    };
    let elapsed = now.saturating_sub(last);
    if elapsed < cooldown_ms {
        return Err(CommandError::ShootCooldown {
            remaining_ms: cooldown_ms.saturating_sub(elapsed),
        });
    }
    Ok(())
}

pub fn mined_event(
    player_id: &PlayerId,
    coord: TileCoord,
    material: SolidMaterial,
    now: i64,
) -> DomainEvent {
    DomainEvent::new(EventKind::mined(player_id.clone(), coord, material), now)
}

pub fn placed_event(
    player_id: &PlayerId,
    coord: TileCoord,
    material: SolidMaterial,
    now: i64,
) -> DomainEvent {
    DomainEvent::new(EventKind::placed(player_id.clone(), coord, material), now)
}

pub fn tool_changed_event(player_id: &PlayerId, tool: Tool, now: i64) -> DomainEvent {
    DomainEvent::new(
        EventKind::ChangedTool {
            player_id: player_id.clone(),
            tool,
        },
        now,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::CoreModule;
    use crate::terrain::FlatTerrain;
    use loam_common::Material;
    use loam_kernel::{Kernel, ModuleHost};
    use std::sync::Arc;

    fn at(x: i64, y: i64) -> TileCoord {
        TileCoord::new(x, y).unwrap()
    }

    fn world() -> WorldStore<FlatTerrain> {
        WorldStore::new(FlatTerrain::new(20))
    }

    fn core_registry() -> Arc<Registry> {
        let mut host = ModuleHost::new(Arc::new(Kernel::new()));
        host.load(&CoreModule).unwrap();
        host.kernel().registry()
    }

    #[test]
    fn mining_air_is_invalid() {
        let err = evaluate_mine(&world(), at(0, 4)).unwrap_err();
        assert_eq!(err.code(), "mine-block/invalid");
    }

    #[test]
    fn mining_is_read_only() {
        let store = world();
        let result = evaluate_mine(&store, at(0, 20)).unwrap();
        assert_eq!(result.removed, SolidMaterial::GRASS);
        assert!(result.descriptors[0].is_removal());
        assert_eq!(store.actual_material(at(0, 20)), Material::Grass);
        assert_eq!(store.override_count(), 0);
    }

    #[test]
    fn strike_rules_gate_mining() {
        let registry = core_registry();
        let drops = evaluate_strike(&registry, Tool::Pickaxe, SolidMaterial::ROCK)
            .unwrap()
            .unwrap();
        assert_eq!(drops[0].id, "core.loam.material.rock");
        assert_eq!(drops[0].qty, 1);

        let err = evaluate_strike(&registry, Tool::Shovel, SolidMaterial::ROCK).unwrap_err();
        assert_eq!(err.code(), "mine-block/forbidden");
        let err = evaluate_strike(&registry, Tool::Rifle, SolidMaterial::DIRT).unwrap_err();
        assert_eq!(err.code(), "mine-block/forbidden");
        let empty = Registry::new();
        assert!(evaluate_strike(&empty, Tool::Shovel, SolidMaterial::DIRT).is_err());
    }

    #[test]
    fn placement_legality() {
        let store = world();
        let mut inventory = Inventory::new();
        let err = evaluate_place(&store, at(0, 5), SolidMaterial::DIRT, &inventory).unwrap_err();
        assert_eq!(err.code(), "place-block/empty");

        inventory.insert(SolidMaterial::DIRT, 0);
        assert_eq!(
            evaluate_place(&store, at(0, 5), SolidMaterial::DIRT, &inventory)
                .unwrap_err()
                .code(),
            "place-block/empty"
        );

        inventory.insert(SolidMaterial::DIRT, 2);
        let err = evaluate_place(&store, at(0, 22), SolidMaterial::DIRT, &inventory).unwrap_err();
        assert_eq!(err.code(), "place-block/occupied");

        let change = evaluate_place(&store, at(0, 5), SolidMaterial::DIRT, &inventory).unwrap();
        assert_eq!(change.coord(), at(0, 5));
        assert_eq!(change.material(), Material::Dirt);
        assert!(!change.is_removal());
    }

    #[test]
    fn shoot_cooldown_boundary() {
        let now = 1_000_000;
        let cooldown = 500;
        assert!(evaluate_shoot(now, Some(now - cooldown - 1), cooldown).is_ok());
        assert!(evaluate_shoot(now, Some(now - cooldown), cooldown).is_ok());
        let err = evaluate_shoot(now, Some(now - 1), 500).unwrap_err();
        assert_eq!(err.code(), "shoot/cooldown");
        assert_eq!(err, CommandError::ShootCooldown { remaining_ms: 499 });
        assert!(evaluate_shoot(now, None, cooldown).is_ok());
    }

    #[test]
    fn shoot_cooldown_with_skewed_or_extreme_clocks() {
        assert_eq!(
            evaluate_shoot(100, Some(200), 500),
            Err(CommandError::ShootCooldown { remaining_ms: 600 })
        );
        assert_eq!(
            evaluate_shoot(0, Some(i64::MAX), 500),
            Err(CommandError::ShootCooldown {
                remaining_ms: i64::MAX
            })
        );
        assert_eq!(
            evaluate_shoot(i64::MIN, Some(i64::MAX), 500),
            Err(CommandError::ShootCooldown {
                remaining_ms: i64::MAX
            })
        );
        assert!(evaluate_shoot(i64::MAX, Some(i64::MIN), 500).is_ok());
        assert!(evaluate_shoot(i64::MAX, Some(0), i64::MAX).is_ok());
    }

    #[test]
    fn malformed_coordinates_are_rejected() {
        assert_eq!(parse_coord(3.0, 64.0).unwrap_err().code(), "coord/out-of-range");
        assert_eq!(parse_coord(3.0, -1.0).unwrap_err().code(), "coord/out-of-range");
        assert_eq!(parse_coord(f64::NAN, 1.0).unwrap_err().code(), "coord/out-of-range");
        assert_eq!(parse_coord(1.5, 1.0).unwrap_err().code(), "coord/out-of-range");
        assert_eq!(parse_coord(-12.0, 63.0).unwrap(), at(-12, 63));
    }

    #[test]
    fn event_builders_stamp_fresh_ids() {
        let player = PlayerId::new("p1").unwrap();
        let a = mined_event(&player, at(1, 20), SolidMaterial::GRASS, 77);
        let b = placed_event(&player, at(1, 20), SolidMaterial::GRASS, 78);
        let c = tool_changed_event(&player, Tool::Pickaxe, 79);
        assert_ne!(a.id, b.id);
        assert_eq!(a.type_name(), "player.mined");
        assert_eq!(b.type_name(), "player.placed");
        assert_eq!(c.type_name(), "player.changedTool");
        assert_eq!((a.timestamp, c.sequence), (77, None));
    }
}
