use anyhow::Context;
use loam_common::{PlayerId, SolidMaterial, TileCoord, Tool};
use loam_kernel::{
    DomainEvent, EventKind, InventoryCounts, Kernel, ModuleHost, PlayerSnapshot, Registry,
    WorldLog, WorldLogOptions,
};
use loam_terrain::{
    CoreModule, LayeredTerrain, WorldStore, evaluate_mine, evaluate_place, evaluate_strike,
    material_from_id, mined_event, placed_event, tool_changed_event,
};
use std::sync::Arc;

use crate::config::LoamConfig;

/// One open world: its log, the terrain it edits and the loaded content.
pub struct Session {
    log: WorldLog,
    store: WorldStore<LayeredTerrain>,
    registry: Arc<Registry>,
}

#[derive(Debug)]
pub enum MineOutcome {
    /// The strike landed but the rule removes nothing.
    Struck,
    Removed {
        material: SolidMaterial,
        changes: usize,
    },
}

impl Session {
    pub fn open(config: &LoamConfig) -> anyhow::Result<Self> {
        let mut host = ModuleHost::new(Arc::new(Kernel::new()));
        host.load(&CoreModule).context("loading core module")?;

        let mut log = WorldLog::open(&config.data_dir, config.log.clone())
            .with_context(|| format!("opening world at {}", config.data_dir.display()))?;
        log.add_observer(|events| {
            for event in events {
                tracing::info!(
                    seq = event.sequence.unwrap_or_default(),
                    kind = event.type_name(),
                    "event committed"
                );
            }
        });

        let mut store = WorldStore::new(LayeredTerrain::new(config.seed));
        store.replay_history(&log.state().blocks);

        Ok(Self {
            log,
            store,
            registry: host.kernel().registry(),
        })
    }

    pub fn log(&self) -> &WorldLog {
        &self.log
    }

    pub fn store(&self) -> &WorldStore<LayeredTerrain> {
        &self.store
    }

    fn player(&self, id: &PlayerId) -> PlayerSnapshot {
        self.log
            .state()
            .player(id)
            .cloned()
            .unwrap_or_else(|| PlayerSnapshot::default_for(id.clone()))
    }

    fn counts(player: &PlayerSnapshot) -> InventoryCounts {
        player
            .inventory
            .iter()
            .map(|(m, q)| (*m, *q as i64))
            .collect()
    }

    fn inventory_event(player: &PlayerSnapshot, counts: InventoryCounts, now: i64) -> DomainEvent {
        DomainEvent::new(
            EventKind::InventoryUpdated {
                player_id: player.id.clone(),
                inventory: counts,
            },
            now,
        )
    }

    pub fn mine(&mut self, id: &PlayerId, coord: TileCoord, now: i64) -> anyhow::Result<MineOutcome> {
        let player = self.player(id);
        let removal = evaluate_mine(&self.store, coord)?;
        let Some(drops) = evaluate_strike(&self.registry, player.current_tool, removal.removed)?
        else {
            return Ok(MineOutcome::Struck);
        };

        let mut counts = Self::counts(&player);
        for drop in &drops {
            match material_from_id(&drop.id) {
                Some(m) => *counts.entry(m).or_default() += drop.qty as i64,
                None => tracing::warn!(id = %drop.id, "drop is not a terrain material"),
            }
        }
        self.log.append(vec![
            mined_event(id, coord, removal.removed, now),
            Self::inventory_event(&player, counts, now),
        ])?;
        self.store.apply_descriptors(&removal.descriptors);
        Ok(MineOutcome::Removed {
            material: removal.removed,
            changes: removal.descriptors.len(),
        })
    }

    pub fn place(
        &mut self,
        id: &PlayerId,
        coord: TileCoord,
        material: SolidMaterial,
        now: i64,
    ) -> anyhow::Result<()> {
        let player = self.player(id);
        let change = evaluate_place(&self.store, coord, material, &player.inventory)?;

        let mut counts = Self::counts(&player);
        *counts.entry(material).or_default() -= 1;
        self.log.append(vec![
            placed_event(id, coord, material, now),
            Self::inventory_event(&player, counts, now),
        ])?;
        self.store.apply_descriptors(&[change]);
        Ok(())
    }

    pub fn change_tool(&mut self, id: &PlayerId, tool: Tool, now: i64) -> anyhow::Result<()> {
        self.log.append(vec![tool_changed_event(id, tool, now)])?;
        Ok(())
    }
}

/// One stream folded twice: through the configured snapshot store, and from
/// the first event with snapshots detached and a different page size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReplayCheck {
    pub snapshot_seq: u64,
    pub snapshot_hash: u64,
    pub genesis_seq: u64,
    pub genesis_hash: u64,
}

impl ReplayCheck {
    pub fn matches(&self) -> bool {
        self.snapshot_seq == self.genesis_seq && self.snapshot_hash == self.genesis_hash
    }
}

pub fn check_replay(config: &LoamConfig, genesis_page_size: usize) -> anyhow::Result<ReplayCheck> {
    let accelerated = WorldLog::open(&config.data_dir, config.log.clone())
        .with_context(|| format!("replaying {}", config.data_dir.display()))?;
    let genesis = WorldLog::open(
        &config.data_dir,
        WorldLogOptions {
            page_size: genesis_page_size,
            snapshot_every: None,
            use_snapshots: false,
            ..config.log.clone()
        },
    )
    .with_context(|| format!("replaying {} from genesis", config.data_dir.display()))?;
    Ok(ReplayCheck {
        snapshot_seq: accelerated.last_seq(),
        snapshot_hash: accelerated.state().state_hash(),
        genesis_seq: genesis.last_seq(),
        genesis_hash: genesis.state().state_hash(),
    })
}
