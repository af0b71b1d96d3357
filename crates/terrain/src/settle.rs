//! Column settling.
//!
//! Removing a tile can leave the material above it unsupported. Scanning
//! upward from the hole, every maximal run of one material (a cluster) is
//! weighed: its own weight plus the unbroken stack resting on it, against the
//! material's stickiness. Clusters that lose fall as a rigid unit into the
//! empty run directly below them.

use loam_common::{BlockChange, CHUNK_HEIGHT, Material, SolidMaterial, TileCoord, TileX, TileY};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Per-material weight and stickiness.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettleRules {
    weight: BTreeMap<SolidMaterial, u32>,
    stickiness: BTreeMap<SolidMaterial, i32>,
}

impl Default for SettleRules {
    fn default() -> Self {
        [
            (SolidMaterial::GRASS, 1, 0),
            (SolidMaterial::DIRT, 1, 0),
            (SolidMaterial::ROCK, 4, 14),
            (SolidMaterial::WOOD, 2, 5),
            (SolidMaterial::COAL, 2, 8),
            (SolidMaterial::COPPER, 3, 10),
            (SolidMaterial::SILVER, 3, 11),
            (SolidMaterial::GOLD, 4, 9),
            (SolidMaterial::DIAMOND, 5, 16),
        ]
        .into_iter()
        .fold(Self::empty(), |rules, (m, w, s)| rules.with(m, w, s))
    }
}

impl SettleRules {
    /// No entries: every material weighs 1 and has no stickiness.
    pub fn empty() -> Self {
        Self {
            weight: BTreeMap::new(),
            stickiness: BTreeMap::new(),
        }
    }

    pub fn with(mut self, material: SolidMaterial, weight: u32, stickiness: i32) -> Self {
        self.weight.insert(material, weight);
        self.stickiness.insert(material, stickiness);
        self
    }

    pub fn weight(&self, material: SolidMaterial) -> u32 {
        self.weight.get(&material).copied().unwrap_or(1)
    }

    pub fn stickiness(&self, material: SolidMaterial) -> i32 {
        self.stickiness.get(&material).copied().unwrap_or(0)
    }

    /// Whether the cluster spanning rows `top..=bottom` of `column` gives way.
    fn cluster_falls(
        &self,
        column: &[Material],
        top: usize,
        bottom: usize,
        material: SolidMaterial,
    ) -> bool {
        let stickiness = self.stickiness(material);
        if stickiness <= 0 {
            return true;
        }
        let height = (bottom - top + 1) as i64;
        let own = height * self.weight(material) as i64;
        // Load is the contiguous stack above; an air gap ends it.
        let above: i64 = column[..top]
            .iter()
            .rev()
            .map_while(|m| SolidMaterial::try_from(*m).ok())
            .map(|m| self.weight(m) as i64)
            .sum();
        own + above > stickiness as i64
    }
}

/// Outcome of removing one tile from a column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemovalComputation {
    /// What was struck.
    pub removed: SolidMaterial,
    /// Removals in computation order, then placements.
    pub descriptors: Vec<BlockChange>,
    /// The column after settling.
    pub column: Vec<Material>,
}

impl RemovalComputation {
    pub fn placements(&self) -> impl Iterator<Item = &BlockChange> {
        self.descriptors.iter().filter(|d| !d.is_removal())
    }
}

/// Sample a full column, row 0 first.
pub fn column_from_sampler(sampler: impl Fn(i32) -> Material) -> Vec<Material> {
    (0..CHUNK_HEIGHT as i32).map(sampler).collect()
}

/// Remove the tile at row `y` of `column` (which sits at horizontal position
/// `x`) and settle everything above it.
///
/// Returns `None` when the tile is already empty or outside the column.
pub fn compute_removal(
    column: &[Material],
    x: TileX,
    y: TileY,
    rules: &SettleRules,
) -> Option<RemovalComputation> {
    let height = column.len().min(CHUNK_HEIGHT as usize);
    let start = y.index();
    if start >= height {
        return None;
    }
    let removed = SolidMaterial::try_from(column[start]).ok()?;
    let at = |row: usize| TileY::new(row as i64).map(|ty| TileCoord::from_parts(x, ty)).ok();

    let mut updated = column[..height].to_vec();
    let mut removals = vec![BlockChange::removal(at(start)?)];
    let mut placements = Vec::new();
    updated[start] = Material::Air;

    // `cursor` is one past the next row to inspect, so the scan ends at row 0.
    let mut cursor = start;
    while cursor > 0 {
        let bottom = cursor - 1;
        let Ok(material) = SolidMaterial::try_from(updated[bottom]) else {
            cursor = bottom;
            continue;
        };
        let mut top = bottom;
        while top > 0 && updated[top - 1] == material.material() {
            top -= 1;
        }

        if rules.cluster_falls(&updated, top, bottom, material) {
            for row in (top..=bottom).rev() {
                updated[row] = Material::Air;
                removals.push(BlockChange::removal(at(row)?));
            }
            let mut landing = bottom;
            while landing + 1 < height && updated[landing + 1].is_air() {
                landing += 1;
            }
            for offset in 0..=(bottom - top) {
                let row = landing - offset;
                updated[row] = material.material();
                placements.push(BlockChange::placement(at(row)?, material));
            }
        }
        cursor = top;
    }

    removals.extend(placements);
    Some(RemovalComputation {
        removed,
        descriptors: removals,
        column: updated,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const X: i32 = 7;

    fn x() -> TileX {
        TileX::new(X as i64).unwrap()
    }

    fn y(row: i64) -> TileY {
        TileY::new(row).unwrap()
    }

    fn column(cells: &[(std::ops::RangeInclusive<i32>, Material)]) -> Vec<Material> {
        column_from_sampler(|row| {
            cells
                .iter()
                .find(|(range, _)| range.contains(&row))
                .map_or(Material::Air, |(_, m)| *m)
        })
    }

    fn rows(descriptors: &[BlockChange], removal: bool) -> Vec<u16> {
        descriptors
            .iter()
            .filter(|d| d.is_removal() == removal)
            .map(|d| d.coord().y().get())
            .collect()
    }

    /// Apply descriptors in order to the pre-removal column.
    fn replay(mut col: Vec<Material>, descriptors: &[BlockChange]) -> Vec<Material> {
        for d in descriptors {
            col[d.coord().y().index()] = d.material();
        }
        col
    }

    #[test]
    fn empty_or_out_of_range_is_a_no_op() {
        let col = column(&[(20..=63, Material::Rock)]);
        let rules = SettleRules::default();
        assert!(compute_removal(&col, x(), y(5), &rules).is_none());
        assert!(compute_removal(&col[..10], x(), y(30), &rules).is_none());
    }

    #[test]
    fn grass_over_rock_leaves_a_hole() {
        let col = column(&[(15..=15, Material::Grass), (16..=63, Material::Rock)]);
        let result = compute_removal(&col, x(), y(15), &SettleRules::default()).unwrap();

        assert_eq!(result.removed, SolidMaterial::GRASS);
        let first = result.descriptors[0];
        assert!(first.is_removal());
        assert_eq!(first.coord(), TileCoord::new(X as i64, 15).unwrap());
        assert_eq!(first.material(), Material::Air);
        assert!(result.column[15].is_air());
        // The rock lies below the hole and only material above a hole can
        // fall, so no rock placement appears here.
        assert_eq!(result.descriptors.len(), 1);
        assert!(result.column[16..].iter().all(|m| *m == Material::Rock));
    }

    #[test]
    fn heavy_rock_slab_drops_onto_a_sticky_ledge() {
        let col = column(&[
            (9..=12, Material::Rock),
            (14..=14, Material::Diamond),
            (15..=15, Material::Grass),
            (16..=63, Material::Rock),
        ]);
        let result = compute_removal(&col, x(), y(15), &SettleRules::default()).unwrap();

        assert_eq!(rows(&result.descriptors, true), [15, 12, 11, 10, 9]);
        assert_eq!(rows(&result.descriptors, false), [13, 12, 11, 10]);
        assert!(result.placements().all(|d| d.material() == Material::Rock));
        assert!(result.descriptors[0].is_removal());
        // Diamond (weight 5, stickiness 16) holds; the hole stays open.
        assert_eq!(result.column[14], Material::Diamond);
        assert!(result.column[15].is_air());
        assert!(result.column[9].is_air());
        assert!(result.column[10..=13].iter().all(|m| *m == Material::Rock));
    }

    #[test]
    fn rock_directly_above_falls_into_the_hole() {
        let col = column(&[
            (10..=14, Material::Rock),
            (15..=15, Material::Grass),
            (16..=63, Material::Rock),
        ]);
        let result = compute_removal(&col, x(), y(15), &SettleRules::default()).unwrap();

        assert_eq!(rows(&result.descriptors, true), [15, 14, 13, 12, 11, 10]);
        assert_eq!(rows(&result.descriptors, false), [15, 14, 13, 12, 11]);
        assert_eq!(result.column[15], Material::Rock);
        assert!(result.column[10].is_air());
        assert_eq!(replay(col, &result.descriptors), result.column);
    }

    #[test]
    fn load_above_tips_a_sticky_cluster() {
        let rules = SettleRules::default();
        // Three rock weigh 12 <= 14; three dirt resting on them add 3.
        let loaded = column(&[
            (7..=9, Material::Dirt),
            (10..=12, Material::Rock),
            (13..=13, Material::Coal),
            (14..=63, Material::Rock),
        ]);
        let result = compute_removal(&loaded, x(), y(13), &rules).unwrap();
        assert_eq!(result.column[13], Material::Rock);

        // An air gap between the dirt and the rock removes that load.
        let gapped = column(&[
            (6..=8, Material::Dirt),
            (10..=12, Material::Rock),
            (13..=13, Material::Coal),
            (14..=63, Material::Rock),
        ]);
        let result = compute_removal(&gapped, x(), y(13), &rules).unwrap();
        assert!(result.column[13].is_air());
        assert_eq!(result.column[10..=12], [Material::Rock; 3]);
        // The loose dirt still drops into the gap and rests on the rock.
        assert!(result.column[6].is_air());
        assert_eq!(result.column[7..=9], [Material::Dirt; 3]);
    }

    #[test]
    fn loose_material_always_falls_and_keeps_order() {
        let col = column(&[
            (5..=6, Material::Grass),
            (7..=8, Material::Dirt),
            (9..=11, Material::Rock),
            (12..=63, Material::Rock),
        ]);
        let rules = SettleRules::default();
        let dug = compute_removal(&col, x(), y(11), &rules).unwrap();
        // Rock 9..=10 (weight 8, plus 4 loose tiles = 12) holds at 14.
        assert_eq!(dug.column[9..=10], [Material::Rock; 2]);
        assert!(dug.column[11].is_air());

        let bare = column(&[
            (5..=6, Material::Grass),
            (7..=8, Material::Dirt),
            (9..=63, Material::Rock),
        ]);
        let result = compute_removal(&bare, x(), y(9), &rules).unwrap();
        assert_eq!(
            result.column[5..=9],
            [
                Material::Air,
                Material::Grass,
                Material::Grass,
                Material::Dirt,
                Material::Dirt
            ]
        );
        assert_eq!(replay(bare, &result.descriptors), result.column);
    }

    #[test]
    fn injected_rules_change_the_outcome() {
        let col = column(&[(10..=14, Material::Rock), (15..=63, Material::Gold)]);
        let glue = SettleRules::default().with(SolidMaterial::ROCK, 4, 100);
        let held = compute_removal(&col, x(), y(15), &glue).unwrap();
        assert_eq!(held.descriptors.len(), 1);

        let result = compute_removal(&col, x(), y(15), &SettleRules::empty()).unwrap();
        assert_eq!(result.column[15], Material::Rock);
    }

    #[test]
    fn deterministic() {
        let col = column(&[
            (3..=4, Material::Dirt),
            (5..=9, Material::Copper),
            (10..=12, Material::Wood),
            (13..=13, Material::Coal),
            (14..=63, Material::Rock),
        ]);
        let rules = SettleRules::default();
        let a = compute_removal(&col, x(), y(13), &rules);
        let b = compute_removal(&col, x(), y(13), &rules);
        assert_eq!(a, b);
    }
}
