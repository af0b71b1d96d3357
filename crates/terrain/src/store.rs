use loam_common::{BlockChange, Material, SolidMaterial, TileCoord, TileX};
use std::collections::BTreeMap;

use crate::settle::{RemovalComputation, SettleRules, column_from_sampler, compute_removal};
use crate::terrain::{LayeredTerrain, TerrainGenerator};

/// Generated terrain plus the tiles players have changed.
///
/// Only tiles that differ from the generator are stored; writing a tile back
/// to its generated value drops the override.
#[derive(Debug, Clone)]
pub struct WorldStore<G = LayeredTerrain> {
    terrain: G,
    rules: SettleRules,
    overrides: BTreeMap<TileCoord, Material>,
}

impl Default for WorldStore {
    fn default() -> Self {
        Self::new(LayeredTerrain::default())
    }
}

impl<G: TerrainGenerator> WorldStore<G> {
    pub fn new(terrain: G) -> Self {
        Self::with_rules(terrain, SettleRules::default())
    }

    pub fn with_rules(terrain: G, rules: SettleRules) -> Self {
        Self {
            terrain,
            rules,
            overrides: BTreeMap::new(),
        }
    }

    pub fn terrain(&self) -> &G {
        &self.terrain
    }

    pub fn rules(&self) -> &SettleRules {
        &self.rules
    }

    /// Generated material, ignoring overrides.
    pub fn base_material(&self, coord: TileCoord) -> Material {
        self.terrain
            .material_at(coord.x().get(), coord.y().get() as i32)
    }

    pub fn actual_material(&self, coord: TileCoord) -> Material {
        self.overrides
            .get(&coord)
            .copied()
            .unwrap_or_else(|| self.base_material(coord))
    }

    pub fn set_material(&mut self, coord: TileCoord, material: Material) {
        if material == self.base_material(coord) {
            self.overrides.remove(&coord);
        } else {
            self.overrides.insert(coord, material);
        }
    }

    /// Current materials of column `x`, row 0 first.
    pub fn column(&self, x: TileX) -> Vec<Material> {
        let overrides = &self.overrides;
        column_from_sampler(|y| {
            let coord = TileCoord::new(x.get() as i64, y as i64).ok();
            coord
                .and_then(|c| overrides.get(&c).copied())
                .unwrap_or_else(|| self.terrain.material_at(x.get(), y))
        })
    }

    /// What removing `coord` would do, without doing it.
    pub fn compute_removal(&self, coord: TileCoord) -> Option<RemovalComputation> {
        compute_removal(&self.column(coord.x()), coord.x(), coord.y(), &self.rules)
    }

    /// Remove `coord` and settle its column. `None` if the tile is empty.
    pub fn remove_block(&mut self, coord: TileCoord) -> Option<RemovalComputation> {
        let result = self.compute_removal(coord)?;
        self.apply_descriptors(&result.descriptors);
        tracing::debug!(
            %coord,
            removed = %result.removed,
            changes = result.descriptors.len(),
            "block removed"
        );
        Some(result)
    }

    /// A placement descriptor if `coord` is empty.
    pub fn prepare_placement(
        &self,
        coord: TileCoord,
        material: SolidMaterial,
    ) -> Option<BlockChange> {
        self.actual_material(coord)
            .is_air()
            .then(|| BlockChange::placement(coord, material))
    }

    pub fn place_block(&mut self, coord: TileCoord, material: SolidMaterial) -> Option<BlockChange> {
        let change = self.prepare_placement(coord, material)?;
        self.apply_descriptors(&[change]);
        Some(change)
    }

    /// Commit descriptors in order.
    pub fn apply_descriptors(&mut self, changes: &[BlockChange]) {
        for change in changes {
            self.set_material(change.coord(), change.material());
        }
    }

    /// Rebuild edits from a recorded history of struck and placed tiles.
    ///
    /// Removals are re-run through the cascade so settled material ends up
    /// where it did live; entries that are no longer legal are skipped.
    pub fn replay_history(&mut self, history: &[BlockChange]) {
        let mut skipped = 0usize;
        for change in history {
            let applied = match SolidMaterial::try_from(change.material()) {
                Err(_) => self.remove_block(change.coord()).is_some(),
                Ok(solid) => self.place_block(change.coord(), solid).is_some(),
            };
            if !applied {
                skipped += 1;
            }
        }
        if skipped > 0 {
            tracing::warn!(skipped, total = history.len(), "history entries did not apply");
        }
    }

    /// Every override as a descriptor, ordered by coordinate.
    pub fn snapshot_descriptors(&self) -> Vec<BlockChange> {
        self.overrides
            .iter()
            .map(|(coord, material)| match SolidMaterial::try_from(*material) {
                Ok(solid) => BlockChange::placement(*coord, solid),
                Err(_) => BlockChange::removal(*coord),
            })
            .collect()
    }

    pub fn override_count(&self) -> usize {
        self.overrides.len()
    }
}
