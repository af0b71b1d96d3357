use arc_swap::ArcSwap;
use parking_lot::Mutex;
use std::sync::Arc;

use crate::error::KernelError;
use crate::registry::{KindSpec, MaterialSpec, Registry, StrikeRule};
use crate::validate::{validate_kind, validate_material, validate_strike_rule};

/// Registration context for one server.
///
/// Constructed explicitly and passed to whoever needs it, so several worlds
/// (or tests) can each own an isolated kernel. Reads load the current
/// `Arc<Registry>` without locking. Writers take turns on `writer`, build a
/// new registry from the current one and publish it in a single store.
#[derive(Debug, Default)]
pub struct Kernel {
    registry: ArcSwap<Registry>,
    writer: Mutex<()>,
}

impl Kernel {
    pub fn new() -> Self {
        Self::default()
    }

    /// The current registry snapshot. Later registrations do not affect it.
    pub fn registry(&self) -> Arc<Registry> {
        self.registry.load_full()
    }

    pub fn register_material(&self, spec: MaterialSpec) -> Result<MaterialSpec, KernelError> {
        let _writer = self.writer.lock();
        let current = self.registry.load_full();
        if current.material(&spec.id).is_some() {
            return Err(KernelError::MaterialAlreadyRegistered { id: spec.id });
        }
        validate_material(&spec).map_err(|reasons| KernelError::MaterialInvalid {
            id: spec.id.clone(),
            reasons,
        })?;
        self.registry.store(Arc::new(current.with_material(spec.clone())));
        tracing::debug!(id = %spec.id, "material registered");
        Ok(spec)
    }

    pub fn register_kind(&self, spec: KindSpec) -> Result<KindSpec, KernelError> {
        let _writer = self.writer.lock();
        let current = self.registry.load_full();
        if current.kind(&spec.id).is_some() {
            return Err(KernelError::KindAlreadyRegistered { id: spec.id });
        }
        validate_kind(&spec).map_err(|reasons| KernelError::KindInvalid {
            id: spec.id.clone(),
            reasons,
        })?;
        self.registry.store(Arc::new(current.with_kind(spec.clone())));
        tracing::debug!(id = %spec.id, "kind registered");
        Ok(spec)
    }

    /// Register a strike rule. The material must already be registered and
    /// the `(tool, material)` pair must be free.
    pub fn register_strike_rule(&self, rule: StrikeRule) -> Result<StrikeRule, KernelError> {
        let _writer = self.writer.lock();
        let current = self.registry.load_full();
        if current.material(&rule.material).is_none() {
            return Err(KernelError::StrikeRuleInvalid {
                reasons: vec!["material/missing".to_string()],
            });
        }
        if current.strike_rule(&rule.tool, &rule.material).is_some() {
            return Err(KernelError::StrikeRuleAlreadyRegistered {
                tool: rule.tool,
                material: rule.material,
            });
        }
        validate_strike_rule(&rule).map_err(|reasons| KernelError::StrikeRuleInvalid { reasons })?;
        self.registry.store(Arc::new(current.with_strike_rule(rule.clone())));
        tracing::debug!(tool = %rule.tool, material = %rule.material, "strike rule registered");
        Ok(rule)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::{ItemDrop, MaterialCategory, ServerKindSpec, StrikeOutcome};
    use std::collections::BTreeMap;

    fn material(id: &str) -> MaterialSpec {
        MaterialSpec {
            id: id.into(),
            display_name: "Stone".into(),
            category: MaterialCategory::Solid,
            hardness: 3.0,
            drop: None,
        }
    }

    fn rule(tool: &str, material: &str) -> StrikeRule {
        StrikeRule {
            tool: tool.into(),
            material: material.into(),
            outcome: StrikeOutcome::Removed {
                drops: vec![ItemDrop {
                    id: material.into(),
                    qty: 1,
                }],
            },
        }
    }

    #[test]
    fn duplicate_material_is_rejected() {
        let kernel = Kernel::new();
        assert!(kernel.register_material(material("core.rock")).is_ok());
        let err = kernel.register_material(material("core.rock")).unwrap_err();
        assert_eq!(err.code(), "material/already-registered");
        assert_eq!(kernel.registry().materials().len(), 1);
    }

    #[test]
    fn invalid_material_lists_reasons_and_commits_nothing() {
        let kernel = Kernel::new();
        let mut spec = material("rock");
        spec.hardness = -1.0;
        let err = kernel.register_material(spec).unwrap_err();
        assert_eq!(err.code(), "material/invalid");
        assert_eq!(err.reasons(), ["id/invalid-format", "hardness/non-positive"]);
        assert!(kernel.registry().materials().is_empty());
    }

    #[test]
    fn strike_rule_for_unknown_material_fails() {
        let kernel = Kernel::new();
        let err = kernel
            .register_strike_rule(rule("pickaxe", "core.rock"))
            .unwrap_err();
        assert_eq!(err.code(), "strike-rule/invalid");
        assert_eq!(err.reasons(), ["material/missing"]);
    }

    #[test]
    fn strike_rule_is_unique_per_pair() {
        let kernel = Kernel::new();
        kernel.register_material(material("core.rock")).unwrap();
        kernel
            .register_strike_rule(rule("pickaxe", "core.rock"))
            .unwrap();
        kernel
            .register_strike_rule(rule("shovel", "core.rock"))
            .unwrap();
        let err = kernel
            .register_strike_rule(rule("pickaxe", "core.rock"))
            .unwrap_err();
        assert_eq!(err.code(), "strike-rule/already-registered");
    }

    #[test]
    fn kind_registration() {
        let kernel = Kernel::new();
        let mut components = BTreeMap::new();
        components.insert("Stats".to_string(), serde_json::json!({"hp": 100}));
        let spec = KindSpec {
            id: "core.player".into(),
            server: Some(ServerKindSpec {
                components,
                hooks: None,
            }),
            client: None,
        };
        kernel.register_kind(spec.clone()).unwrap();
        assert_eq!(
            kernel.register_kind(spec).unwrap_err().code(),
            "kind/already-registered"
        );

        let err = kernel
            .register_kind(KindSpec {
                id: "core.ghost".into(),
                ..KindSpec::default()
            })
            .unwrap_err();
        assert_eq!(err.code(), "kind/invalid");
    }

    #[test]
    fn earlier_snapshots_never_change() {
        let kernel = Kernel::new();
        kernel.register_material(material("core.rock")).unwrap();
        let before = kernel.registry();
        kernel.register_material(material("core.dirt")).unwrap();
        assert_eq!(before.materials().len(), 1);
        assert_eq!(kernel.registry().materials().len(), 2);
    }

    #[test]
    fn concurrent_registrations_are_all_visible() {
        let kernel = Arc::new(Kernel::new());
        let handles: Vec<_> = (0..8)
            .map(|t| {
                let kernel = Arc::clone(&kernel);
                std::thread::spawn(move || {
                    for i in 0..25 {
                        let snapshot = kernel.registry();
                        let seen = snapshot.materials().len();
                        kernel
                            .register_material(material(&format!("mod{t}.mat{i}")))
                            .unwrap();
                        // A snapshot taken earlier is frozen.
                        assert_eq!(snapshot.materials().len(), seen);
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(kernel.registry().materials().len(), 200);
    }

    #[test]
    fn reads_do_not_wait_for_a_registration_in_progress() {
        use std::sync::mpsc;
        use std::time::{Duration, Instant};

        let kernel = Arc::new(Kernel::new());
        kernel.register_material(material("core.rock")).unwrap();

        let (locked_tx, locked_rx) = mpsc::channel();
        let (release_tx, release_rx) = mpsc::channel::<()>();
        let writer = {
            let kernel = Arc::clone(&kernel);
            std::thread::spawn(move || {
                let _writer = kernel.writer.lock();
                locked_tx.send(()).unwrap();
                let _ = release_rx.recv_timeout(Duration::from_secs(5));
            })
        };
        locked_rx.recv().unwrap();

        let started = Instant::now();
        let snapshot = kernel.registry();
        let waited = started.elapsed();
        release_tx.send(()).unwrap();
        writer.join().unwrap();

        assert_eq!(snapshot.materials().len(), 1);
        assert!(waited < Duration::from_millis(100), "reader waited {waited:?}");
    }
}
