//! Content modules and the host that loads them at startup.
//!
//! A module registers its materials, kinds and strike rules through a
//! [`ServerApi`]. Any registration failure aborts the load: the server must not
//! proceed with an inconsistent registry.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::error::KernelError;
use crate::kernel::Kernel;
use crate::registry::{KindSpec, MaterialSpec, StrikeRule};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleMeta {
    pub id: String,
    pub version: String,
}

/// Registration surface handed to modules during `init`.
pub struct ServerApi<'k> {
    kernel: &'k Kernel,
}

impl ServerApi<'_> {
    pub fn register_material(&self, spec: MaterialSpec) -> Result<(), KernelError> {
        self.kernel.register_material(spec).map(drop)
    }

    pub fn register_kind(&self, spec: KindSpec) -> Result<(), KernelError> {
        self.kernel.register_kind(spec).map(drop)
    }

    pub fn register_strike_rule(&self, rule: StrikeRule) -> Result<(), KernelError> {
        self.kernel.register_strike_rule(rule).map(drop)
    }
}

pub trait ServerModule {
    fn meta(&self) -> ModuleMeta;
    fn init(&self, api: &ServerApi<'_>) -> Result<(), KernelError>;
}

#[derive(Debug, thiserror::Error)]
pub enum ModuleError {
    #[error("module already loaded: {0}")]
    AlreadyLoaded(String),
    #[error("module {module} failed to register: {source}")]
    Registration {
        module: String,
        #[source]
        source: KernelError,
    },
}

/// Loads modules into one kernel, each at most once.
pub struct ModuleHost {
    kernel: Arc<Kernel>,
    loaded: BTreeMap<String, ModuleMeta>,
}

impl ModuleHost {
    pub fn new(kernel: Arc<Kernel>) -> Self {
        Self {
            kernel,
            loaded: BTreeMap::new(),
        }
    }

    pub fn kernel(&self) -> &Arc<Kernel> {
        &self.kernel
    }

    pub fn load(&mut self, module: &dyn ServerModule) -> Result<(), ModuleError> {
        let meta = module.meta();
        if self.loaded.contains_key(&meta.id) {
            return Err(ModuleError::AlreadyLoaded(meta.id));
        }
        let api = ServerApi {
            kernel: &self.kernel,
        };
        module
            .init(&api)
            .map_err(|source| ModuleError::Registration {
                module: meta.id.clone(),
                source,
            })?;
        tracing::info!(module = %meta.id, version = %meta.version, "module loaded");
        self.loaded.insert(meta.id.clone(), meta);
        Ok(())
    }

    /// Metadata of every loaded module, ordered by id.
    pub fn list(&self) -> Vec<ModuleMeta> {
        self.loaded.values().cloned().collect()
    }
}
