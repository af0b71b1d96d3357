//! The built-in `core.loam` content module.

use loam_common::{SolidMaterial, Tool};
use loam_kernel::{
    DropKind, DropSpec, ItemDrop, KernelError, KindSpec, MaterialCategory, MaterialSpec,
    ModuleMeta, ServerApi, ServerKindSpec, ServerModule, StrikeOutcome, StrikeRule,
};
use serde_json::json;
use std::collections::BTreeMap;

pub const MODULE_ID: &str = "core.loam";
pub const PLAYER_KIND: &str = "core.loam.player";

/// Registry id of a core material, e.g. `core.loam.material.rock`.
pub fn material_id(material: SolidMaterial) -> String {
    format!("{MODULE_ID}.material.{}", material.name())
}

/// Inverse of [`material_id`].
pub fn material_from_id(id: &str) -> Option<SolidMaterial> {
    id.strip_prefix(MODULE_ID)?
        .strip_prefix(".material.")?
        .parse()
        .ok()
}

/// Strikes needed with the right tool.
pub fn hardness(material: SolidMaterial) -> u32 {
    match material {
        SolidMaterial::GRASS | SolidMaterial::DIRT => 1,
        SolidMaterial::WOOD | SolidMaterial::COAL => 2,
        SolidMaterial::DIAMOND => 4,
        _ => 3,
    }
}

/// Shovel for loose ground, pickaxe for everything else.
pub fn correct_tool(material: SolidMaterial) -> Tool {
    match material {
        SolidMaterial::GRASS | SolidMaterial::DIRT => Tool::Shovel,
        _ => Tool::Pickaxe,
    }
}

fn display_name(material: SolidMaterial) -> &'static str {
    match material {
        SolidMaterial::GRASS => "Grass",
        SolidMaterial::DIRT => "Dirt",
        SolidMaterial::ROCK => "Stone",
        SolidMaterial::WOOD => "Wood",
        SolidMaterial::COAL => "Coal",
        SolidMaterial::COPPER => "Copper",
        SolidMaterial::SILVER => "Silver",
        SolidMaterial::GOLD => "Gold",
        _ => "Diamond",
    }
}

/// Registers the nine terrain materials, one strike rule per material for its
/// proper tool, and the player kind.
#[derive(Debug, Clone, Copy, Default)]
pub struct CoreModule;

impl CoreModule {
    pub fn material_specs() -> Vec<MaterialSpec> {
        SolidMaterial::ALL
            .into_iter()
            .map(|m| MaterialSpec {
                id: material_id(m),
                display_name: display_name(m).to_string(),
                category: MaterialCategory::Solid,
                hardness: hardness(m) as f32,
                drop: Some(DropSpec {
                    kind: DropKind::Material,
                    id: material_id(m),
                    amount: 1,
                }),
            })
            .collect()
    }

    pub fn strike_rules() -> Vec<StrikeRule> {
        SolidMaterial::ALL
            .into_iter()
            .map(|m| StrikeRule {
                tool: correct_tool(m).name().to_string(),
                material: material_id(m),
                outcome: StrikeOutcome::Removed {
                    drops: vec![ItemDrop {
                        id: material_id(m),
                        qty: 1,
                    }],
                },
            })
            .collect()
    }

    pub fn player_kind() -> KindSpec {
        let components = BTreeMap::from([
            ("Transform".to_string(), json!({"x": 0, "y": 0, "rot": 0})),
            ("Stats".to_string(), json!({"hp": 100, "energy": 100})),
        ]);
        KindSpec {
            id: PLAYER_KIND.to_string(),
            server: Some(ServerKindSpec {
                components,
                hooks: None,
            }),
            client: None,
        }
    }
}

impl ServerModule for CoreModule {
    fn meta(&self) -> ModuleMeta {
        ModuleMeta {
            id: MODULE_ID.to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }

    fn init(&self, api: &ServerApi<'_>) -> Result<(), KernelError> {
        for spec in Self::material_specs() {
            api.register_material(spec)?;
        }
        for rule in Self::strike_rules() {
            api.register_strike_rule(rule)?;
        }
        api.register_kind(Self::player_kind())
    }
}
