//! Registration specs and the copy-on-write registry that holds them.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MaterialCategory {
    Solid,
    Liquid,
    Gas,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DropKind {
    Item,
    Material,
}

/// What a material yields when removed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DropSpec {
    pub kind: DropKind,
    pub id: String,
    pub amount: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaterialSpec {
    /// Dotted id such as `core.loam.material.rock`.
    pub id: String,
    pub display_name: String,
    pub category: MaterialCategory,
    pub hardness: f32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub drop: Option<DropSpec>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ServerKindSpec {
    pub components: BTreeMap<String, serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hooks: Option<BTreeMap<String, serde_json::Value>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ClientKindSpec {
    /// Renderer asset the client loads for this kind.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub renderer: Option<String>,
}

/// An entity kind: server-side components plus optional client hints.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct KindSpec {
    pub id: String,
    #[serde(default)]
    pub server: Option<ServerKindSpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client: Option<ClientKindSpec>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemDrop {
    pub id: String,
    pub qty: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum StrikeOutcome {
    NoOp,
    Error { code: String },
    Removed { drops: Vec<ItemDrop> },
}

/// What happens when `tool` strikes `material`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StrikeRule {
    pub tool: String,
    pub material: String,
    pub outcome: StrikeOutcome,
}

/// Immutable view of everything registered so far.
///
/// Each map sits behind its own `Arc`. Adding an entry copies only the map it
/// touches; holders of an older `Registry` keep seeing the old maps.
#[derive(Debug, Clone, Default)]
pub struct Registry {
    materials: Arc<BTreeMap<String, MaterialSpec>>,
    kinds: Arc<BTreeMap<String, KindSpec>>,
    strike_rules: Arc<BTreeMap<String, BTreeMap<String, StrikeRule>>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn materials(&self) -> &BTreeMap<String, MaterialSpec> {
        &self.materials
    }

    pub fn kinds(&self) -> &BTreeMap<String, KindSpec> {
        &self.kinds
    }

    /// Strike rules keyed by tool, then material.
    pub fn strike_rules(&self) -> &BTreeMap<String, BTreeMap<String, StrikeRule>> {
        &self.strike_rules
    }

    pub fn material(&self, id: &str) -> Option<&MaterialSpec> {
        self.materials.get(id)
    }

    pub fn kind(&self, id: &str) -> Option<&KindSpec> {
        self.kinds.get(id)
    }

    pub fn strike_rule(&self, tool: &str, material: &str) -> Option<&StrikeRule> {
        self.strike_rules.get(tool)?.get(material)
    }

    pub(crate) fn with_material(&self, spec: MaterialSpec) -> Self {
        let mut materials = (*self.materials).clone();
        materials.insert(spec.id.clone(), spec);
        Self {
            materials: Arc::new(materials),
            ..self.clone()
        }
    }

    pub(crate) fn with_kind(&self, spec: KindSpec) -> Self {
        let mut kinds = (*self.kinds).clone();
        kinds.insert(spec.id.clone(), spec);
        Self {
            kinds: Arc::new(kinds),
            ..self.clone()
        }
    }

    pub(crate) fn with_strike_rule(&self, rule: StrikeRule) -> Self {
        let mut rules = (*self.strike_rules).clone();
        rules
            .entry(rule.tool.clone())
            .or_default()
            .insert(rule.material.clone(), rule);
        Self {
            strike_rules: Arc::new(rules),
            ..self.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rock() -> MaterialSpec {
        MaterialSpec {
            id: "core.loam.material.rock".into(),
            display_name: "Stone".into(),
            category: MaterialCategory::Solid,
            hardness: 3.0,
            drop: None,
        }
    }

    #[test]
    fn adding_leaves_previous_version_untouched() {
        let v1 = Registry::new();
        let v2 = v1.with_material(rock());
        assert!(v1.material("core.loam.material.rock").is_none());
        assert!(v2.material("core.loam.material.rock").is_some());
    }

    #[test]
    fn untouched_maps_are_shared() {
        let v1 = Registry::new().with_kind(KindSpec {
            id: "core.loam.player".into(),
            ..KindSpec::default()
        });
        let v2 = v1.with_material(rock());
        assert!(Arc::ptr_eq(&v1.kinds, &v2.kinds));
        assert!(!Arc::ptr_eq(&v1.materials, &v2.materials));
    }

    #[test]
    fn strike_rules_nest_by_tool() {
        let reg = Registry::new().with_strike_rule(StrikeRule {
            tool: "pickaxe".into(),
            material: "core.loam.material.rock".into(),
            outcome: StrikeOutcome::NoOp,
        });
        assert!(reg.strike_rule("pickaxe", "core.loam.material.rock").is_some());
        assert!(reg.strike_rule("shovel", "core.loam.material.rock").is_none());
    }

    #[test]
    fn strike_outcome_wire_shape() {
        let json = serde_json::to_value(StrikeOutcome::Removed {
            drops: vec![ItemDrop {
                id: "x.y".into(),
                qty: 1,
            }],
        })
        .unwrap();
        assert_eq!(json["kind"], "Removed");
        assert_eq!(json["drops"][0]["qty"], 1);
    }
}
