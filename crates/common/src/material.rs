use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::types::PrimitiveError;

/// Contents of a single tile. `Air` is the empty sentinel.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Material {
    #[default]
    Air,
    Grass,
    Dirt,
    Rock,
    Wood,
    Coal,
    Copper,
    Silver,
    Gold,
    Diamond,
}

impl Material {
    pub const ALL: [Material; 10] = [
        Material::Air,
        Material::Grass,
        Material::Dirt,
        Material::Rock,
        Material::Wood,
        Material::Coal,
        Material::Copper,
        Material::Silver,
        Material::Gold,
        Material::Diamond,
    ];

    pub fn is_air(self) -> bool {
        self == Material::Air
    }

    /// Narrow to a solid material; fails for air.
    pub fn as_solid(self) -> Result<SolidMaterial, PrimitiveError> {
        SolidMaterial::try_from(self)
    }

    pub fn name(self) -> &'static str {
        match self {
            Material::Air => "air",
            Material::Grass => "grass",
            Material::Dirt => "dirt",
            Material::Rock => "rock",
            Material::Wood => "wood",
            Material::Coal => "coal",
            Material::Copper => "copper",
            Material::Silver => "silver",
            Material::Gold => "gold",
            Material::Diamond => "diamond",
        }
    }
}

impl fmt::Display for Material {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Material {
    type Err = PrimitiveError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Material::ALL
            .into_iter()
            .find(|m| m.name() == s)
            .ok_or_else(|| PrimitiveError::UnknownMaterial(s.to_string()))
    }
}

/// A material that is known not to be [`Material::Air`].
///
/// The only way to obtain one from an arbitrary [`Material`] is the checked
/// `TryFrom` conversion, so placement descriptors can never carry air.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "Material", into = "Material")]
pub struct SolidMaterial(Material);

impl SolidMaterial {
    pub const GRASS: SolidMaterial = SolidMaterial(Material::Grass);
    pub const DIRT: SolidMaterial = SolidMaterial(Material::Dirt);
    pub const ROCK: SolidMaterial = SolidMaterial(Material::Rock);
    pub const WOOD: SolidMaterial = SolidMaterial(Material::Wood);
    pub const COAL: SolidMaterial = SolidMaterial(Material::Coal);
    pub const COPPER: SolidMaterial = SolidMaterial(Material::Copper);
    pub const SILVER: SolidMaterial = SolidMaterial(Material::Silver);
    pub const GOLD: SolidMaterial = SolidMaterial(Material::Gold);
    pub const DIAMOND: SolidMaterial = SolidMaterial(Material::Diamond);

    /// Every solid material, in declaration order.
    pub const ALL: [SolidMaterial; 9] = [
        Self::GRASS,
        Self::DIRT,
        Self::ROCK,
        Self::WOOD,
        Self::COAL,
        Self::COPPER,
        Self::SILVER,
        Self::GOLD,
        Self::DIAMOND,
    ];

    pub fn material(self) -> Material {
        self.0
    }

    pub fn name(self) -> &'static str {
        self.0.name()
    }
}

impl TryFrom<Material> for SolidMaterial {
    type Error = PrimitiveError;

    fn try_from(material: Material) -> Result<Self, Self::Error> {
        if material.is_air() {
            return Err(PrimitiveError::NotSolid);
        }
        Ok(SolidMaterial(material))
    }
}

impl From<SolidMaterial> for Material {
    fn from(solid: SolidMaterial) -> Self {
        solid.0
    }
}

impl PartialEq<Material> for SolidMaterial {
    fn eq(&self, other: &Material) -> bool {
        self.0 == *other
    }
}

impl fmt::Display for SolidMaterial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for SolidMaterial {
    type Err = PrimitiveError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse::<Material>()?.try_into()
    }
}

/// Tool held by a player.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Tool {
    #[default]
    Shovel,
    Pickaxe,
    Rifle,
}

impl Tool {
    pub const ALL: [Tool; 3] = [Tool::Shovel, Tool::Pickaxe, Tool::Rifle];

    pub fn name(self) -> &'static str {
        match self {
            Tool::Shovel => "shovel",
            Tool::Pickaxe => "pickaxe",
            Tool::Rifle => "rifle",
        }
    }
}

impl fmt::Display for Tool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Tool {
    type Err = PrimitiveError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Tool::ALL
            .into_iter()
            .find(|t| t.name() == s)
            .ok_or_else(|| PrimitiveError::UnknownTool(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn air_is_not_solid() {
        assert_eq!(
            SolidMaterial::try_from(Material::Air),
            Err(PrimitiveError::NotSolid)
        );
    }

    #[test]
    fn solid_cast_is_identity() {
        assert_eq!(Material::Rock.as_solid(), Ok(SolidMaterial::ROCK));
        let solid = SolidMaterial::try_from(Material::Gold).unwrap();
        assert_eq!(solid.material(), Material::Gold);
        assert_eq!(solid, SolidMaterial::GOLD);
    }

    #[test]
    fn names_parse_back() {
        for m in Material::ALL {
            assert_eq!(m.name().parse::<Material>().unwrap(), m);
        }
        for t in Tool::ALL {
            assert_eq!(t.name().parse::<Tool>().unwrap(), t);
        }
        assert!("lava".parse::<Material>().is_err());
        assert!("air".parse::<SolidMaterial>().is_err());
    }

    #[test]
    fn solid_material_rejects_air_on_deserialize() {
        let ok: SolidMaterial = serde_json::from_str("\"rock\"").unwrap();
        assert_eq!(ok, SolidMaterial::ROCK);
        assert!(serde_json::from_str::<SolidMaterial>("\"air\"").is_err());
    }
}
