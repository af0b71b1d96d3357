use loam_common::{CHUNK_HEIGHT, DEFAULT_SEED, Material, SolidMaterial};

/// Base terrain, before any player edits. Must be a pure function of its
/// inputs: the world store re-samples it freely.
pub trait TerrainGenerator {
    /// Material at a tile. `y` grows downward; rows above 0 are air.
    fn material_at(&self, x: i32, y: i32) -> Material;

    /// First non-air row of column `x`, or `CHUNK_HEIGHT` if the column is empty.
    fn surface_at(&self, x: i32) -> i32 {
        (0..CHUNK_HEIGHT as i32)
            .find(|&y| !self.material_at(x, y).is_air())
            .unwrap_or(CHUNK_HEIGHT as i32)
    }
}

impl<F> TerrainGenerator for F
where
    F: Fn(i32, i32) -> Material,
{
    fn material_at(&self, x: i32, y: i32) -> Material {
        self(x, y)
    }
}

/// Integer hash of `x` mapped to `[0, 1)` with five decimal digits.
fn hash01(x: i64, seed: i64) -> f64 {
    let mut h = ((x ^ seed) as u32).wrapping_mul(0x27d4_eb2d);
    h ^= h >> 15;
    h = h.wrapping_mul(0x85eb_ca6b);
    h ^= h >> 13;
    h ^= 0xc2b2_ae35;
    (h % 100_000) as f64 / 100_000.0
}

/// Smoothstep-interpolated 1D value noise in `[0, 1]`.
fn value_noise(x: i64, seed: i64, freq: f64) -> f64 {
    let xf = x as f64 * freq;
    let x0 = xf.floor();
    let t = xf - x0;
    let v0 = hash01(x0 as i64, seed);
    let v1 = hash01(x0 as i64 + 1, seed);
    let tt = t * t * (3.0 - 2.0 * t);
    v0 * (1.0 - tt) + v1 * tt
}

struct OreRule {
    material: SolidMaterial,
    min_depth: i64,
    max_depth: i64,
    cell_span: i64,
    chance: f64,
    max_radius: i64,
    offset: i64,
}

/// Checked in order; rarer ores win where bands overlap.
const ORE_RULES: [OreRule; 5] = [
    OreRule {
        material: SolidMaterial::DIAMOND,
        min_depth: 22,
        max_depth: 58,
        cell_span: 48,
        chance: 0.12,
        max_radius: 2,
        offset: 397,
    },
    OreRule {
        material: SolidMaterial::GOLD,
        min_depth: 16,
        max_depth: 52,
        cell_span: 36,
        chance: 0.18,
        max_radius: 3,
        offset: 211,
    },
    OreRule {
        material: SolidMaterial::SILVER,
        min_depth: 12,
        max_depth: 48,
        cell_span: 28,
        chance: 0.25,
        max_radius: 3,
        offset: 577,
    },
    OreRule {
        material: SolidMaterial::COPPER,
        min_depth: 6,
        max_depth: 42,
        cell_span: 20,
        chance: 0.35,
        max_radius: 4,
        offset: 863,
    },
    OreRule {
        material: SolidMaterial::COAL,
        min_depth: 3,
        max_depth: 46,
        cell_span: 16,
        chance: 0.45,
        max_radius: 4,
        offset: 109,
    },
];

/// Rolling surface with a grass cap, three rows of dirt, rock below and ore
/// clusters banded by depth. Occasional wood trunks stand on flat ground.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LayeredTerrain {
    seed: u32,
}

impl Default for LayeredTerrain {
    fn default() -> Self {
        Self::new(DEFAULT_SEED)
    }
}

impl LayeredTerrain {
    pub fn new(seed: u32) -> Self {
        Self { seed }
    }

    pub fn seed(&self) -> u32 {
        self.seed
    }

    fn seed_i64(&self) -> i64 {
        self.seed as i64
    }

    /// Surface row, between 12 and 21 inclusive.
    fn ground_y(&self, x: i64) -> i64 {
        let n = value_noise(x, self.seed_i64(), 0.03);
        (12.0 + n * 10.0).floor() as i64
    }

    fn trunk_height(&self, x: i64, ground: i64) -> i64 {
        let left = self.ground_y(x - 1);
        let right = self.ground_y(x + 1);
        if (left - ground).abs() > 1 || (right - ground).abs() > 1 {
            return 0;
        }
        let seed = self.seed_i64();
        if hash01(x * 911 + seed * 131, seed + 57) < 0.965 {
            return 0;
        }
        let variant = hash01(x * 577 + seed * 311, seed + 409);
        3 + (variant * 3.0).floor() as i64
    }

    fn ore_at(&self, x: i64, y: i64, depth: i64) -> Option<SolidMaterial> {
        let seed = self.seed_i64();
        ORE_RULES.iter().find_map(|rule| {
            if depth < rule.min_depth || depth > rule.max_depth {
                return None;
            }
            let cell_x = x.div_euclid(rule.cell_span);
            let cell_y = y.div_euclid(rule.cell_span);
            let cluster = seed * 131_071 + rule.offset * 17 + cell_x * 9289 + cell_y * 6263;
            let salt = seed + rule.offset;
            if hash01(cluster, salt) > rule.chance {
                return None;
            }

            let center_x =
                cell_x * rule.cell_span + (hash01(cluster + 11, salt) * rule.cell_span as f64) as i64;
            let span = (rule.max_depth - rule.min_depth).max(1);
            let center_depth = rule.min_depth + (hash01(cluster + 23, salt) * span as f64) as i64;
            let radius = 1 + (hash01(cluster + 41, salt) * rule.max_radius as f64) as i64;
            if (x - center_x).abs() > radius || (depth - center_depth).abs() > radius {
                return None;
            }
            // Ragged edges.
            if hash01(x * 7919 + y * 1543 + rule.offset, seed) < 0.25 {
                return None;
            }
            Some(rule.material)
        })
    }
}

impl TerrainGenerator for LayeredTerrain {
    fn material_at(&self, x: i32, y: i32) -> Material {
        let (x, y) = (x as i64, y as i64);
        let ground = self.ground_y(x);
        if y < ground {
            let trunk = self.trunk_height(x, ground);
            if trunk > 0 && y > ground - trunk {
                return Material::Wood;
            }
            return Material::Air;
        }
        if y == ground {
            return Material::Grass;
        }
        let depth = y - ground;
        if depth <= 3 {
            return Material::Dirt;
        }
        self.ore_at(x, y, depth)
            .map_or(Material::Rock, SolidMaterial::material)
    }

    fn surface_at(&self, x: i32) -> i32 {
        self.ground_y(x as i64) as i32
    }
}

/// Level ground at a fixed row: grass, three rows of dirt, then rock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlatTerrain {
    pub surface: i32,
}

impl FlatTerrain {
    pub fn new(surface: i32) -> Self {
        Self { surface }
    }
}

impl TerrainGenerator for FlatTerrain {
    fn material_at(&self, _x: i32, y: i32) -> Material {
        match y - self.surface {
            d if d < 0 => Material::Air,
            0 => Material::Grass,
            1..=3 => Material::Dirt,
            _ => Material::Rock,
        }
    }

    fn surface_at(&self, _x: i32) -> i32 {
        self.surface
    }
}
