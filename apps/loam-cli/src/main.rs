mod config;
mod session;

use clap::{Parser, Subcommand};
use loam_common::{Material, PlayerId, SolidMaterial, TileX, Tool};
use loam_kernel::{Kernel, ModuleHost};
use loam_terrain::{CoreModule, parse_coord};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing_subscriber::EnvFilter;

use config::{LoamConfig, Overrides};
use session::{MineOutcome, Session};

#[derive(Parser)]
#[command(name = "loam", about = "Inspect and edit loam worlds")]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// JSON config file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Directory holding event logs and snapshots
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// World stream name
    #[arg(long)]
    stream: Option<String>,

    /// Terrain seed
    #[arg(long)]
    seed: Option<u32>,

    /// Snapshot after this many events (0 disables)
    #[arg(long)]
    snapshot_every: Option<u64>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print version and registered content
    Info,
    /// Summarize the current world
    Status,
    /// Compare the snapshot-backed replay with a fold from the first event
    Verify,
    /// Print one terrain column
    Column {
        #[arg(allow_negative_numbers = true)]
        x: i32,
    },
    /// Mine a tile with the player's current tool
    Mine {
        #[arg(long, default_value = "cli")]
        player: String,
        #[arg(allow_negative_numbers = true)]
        x: f64,
        y: f64,
    },
    /// Place a block from the player's inventory
    Place {
        #[arg(long, default_value = "cli")]
        player: String,
        #[arg(allow_negative_numbers = true)]
        x: f64,
        y: f64,
        material: SolidMaterial,
    },
    /// Switch the player's tool
    Tool {
        #[arg(long, default_value = "cli")]
        player: String,
        tool: Tool,
    },
}

fn now_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or_default()
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .init();

    let config = LoamConfig::load(
        cli.config.as_deref(),
        Overrides {
            data_dir: cli.data_dir,
            stream: cli.stream,
            seed: cli.seed,
            snapshot_every: cli.snapshot_every,
        },
    )?;

    match cli.command {
        Commands::Info => {
            let mut host = ModuleHost::new(Arc::new(Kernel::new()));
            host.load(&CoreModule)?;
            let registry = host.kernel().registry();
            println!("loam v{}", env!("CARGO_PKG_VERSION"));
            for module in host.list() {
                println!("module: {} {}", module.id, module.version);
            }
            println!(
                "registry: materials={}, kinds={}, strike tools={}",
                registry.materials().len(),
                registry.kinds().len(),
                registry.strike_rules().len()
            );
            println!(
                "world: dir={}, stream={}, seed={}",
                config.data_dir.display(),
                config.log.stream,
                config.seed
            );
        }
        Commands::Status => {
            let session = Session::open(&config)?;
            let state = session.log().state();
            println!(
                "stream={} last_seq={} hash={:#x}",
                session.log().stream(),
                session.log().last_seq(),
                state.state_hash()
            );
            println!(
                "players={} block changes={} overrides={}",
                state.players.len(),
                state.blocks.len(),
                session.store().override_count()
            );
            for (id, player) in &state.players {
                let held: Vec<String> = player
                    .inventory
                    .iter()
                    .filter(|(_, q)| **q > 0)
                    .map(|(m, q)| format!("{m}x{q}"))
                    .collect();
                println!(
                    "  {} tool={} hp={} inventory=[{}]",
                    id.as_str(),
                    player.current_tool,
                    player.hp,
                    held.join(", ")
                );
            }
        }
        Commands::Verify => {
            let check = session::check_replay(&config, 7)?;
            println!(
                "snapshot: last_seq={} hash={:#x}",
                check.snapshot_seq, check.snapshot_hash
            );
            println!(
                "genesis (page=7): last_seq={} hash={:#x}",
                check.genesis_seq, check.genesis_hash
            );
            println!("Match: {}", if check.matches() { "OK" } else { "MISMATCH" });
            if !check.matches() {
                anyhow::bail!("snapshot replay disagrees with a fold from genesis");
            }
        }
        Commands::Column { x } => {
            let session = Session::open(&config)?;
            let column = session.store().column(TileX::new(x as i64)?);
            for (y, material) in column.iter().enumerate() {
                if *material != Material::Air {
                    println!("{y:>2} {material}");
                }
            }
        }
        Commands::Mine { player, x, y } => {
            let player = PlayerId::new(player)?;
            let coord = parse_coord(x, y)?;
            let mut session = Session::open(&config)?;
            match session.mine(&player, coord, now_ms())? {
                MineOutcome::Struck => println!("struck {coord}, nothing removed"),
                MineOutcome::Removed { material, changes } => {
                    println!("mined {material} at {coord} ({changes} tile changes)")
                }
            }
        }
        Commands::Place {
            player,
            x,
            y,
            material,
        } => {
            let player = PlayerId::new(player)?;
            let coord = parse_coord(x, y)?;
            let mut session = Session::open(&config)?;
            session.place(&player, coord, material, now_ms())?;
            println!("placed {material} at {coord}");
        }
        Commands::Tool { player, tool } => {
            let player = PlayerId::new(player)?;
            let mut session = Session::open(&config)?;
            session.change_tool(&player, tool, now_ms())?;
            println!("{} now holds {tool}", player.as_str());
        }
    }

    Ok(())
}
