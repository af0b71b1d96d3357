use anyhow::Context;
use loam_common::DEFAULT_SEED;
use loam_kernel::WorldLogOptions;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Settings shared by every subcommand. Loaded from an optional JSON file,
/// then overridden by command-line flags.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoamConfig {
    pub data_dir: PathBuf,
    pub seed: u32,
    pub log: WorldLogOptions,
}

impl Default for LoamConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("loam-data"),
            seed: DEFAULT_SEED,
            log: WorldLogOptions::default(),
        }
    }
}

/// Flag values that take precedence over the file.
#[derive(Debug, Default)]
pub struct Overrides {
    pub data_dir: Option<PathBuf>,
    pub stream: Option<String>,
    pub seed: Option<u32>,
    pub snapshot_every: Option<u64>,
}

impl LoamConfig {
    pub fn load(path: Option<&Path>, overrides: Overrides) -> anyhow::Result<Self> {
        let mut config = match path {
            Some(path) => {
                let raw = std::fs::read_to_string(path)
                    .with_context(|| format!("reading config {}", path.display()))?;
                serde_json::from_str(&raw)
                    .with_context(|| format!("parsing config {}", path.display()))?
            }
            None => Self::default(),
        };
        if let Some(dir) = overrides.data_dir {
            config.data_dir = dir;
        }
        if let Some(stream) = overrides.stream {
            config.log.stream = stream;
        }
        if let Some(seed) = overrides.seed {
            config.seed = seed;
        }
        if let Some(every) = overrides.snapshot_every {
            config.log.snapshot_every = (every > 0).then_some(every);
        }
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_without_a_file() {
        let config = LoamConfig::load(None, Overrides::default()).unwrap();
        assert_eq!(config, LoamConfig::default());
        assert_eq!(config.log.stream, "loam");
        assert_eq!(config.log.snapshot_every, Some(1000));
    }

    #[test]
    fn file_values_then_flags() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("loam.json");
        std::fs::write(
            &path,
            r#"{"seed": 9, "log": {"stream": "arena", "page_size": 50}}"#,
        )
        .unwrap();

        let config = LoamConfig::load(Some(&path), Overrides::default()).unwrap();
        assert_eq!(config.seed, 9);
        assert_eq!(config.log.stream, "arena");
        assert_eq!(config.log.page_size, 50);
        assert_eq!(config.log.snapshot_every, Some(1000));

        let config = LoamConfig::load(
            Some(&path),
            Overrides {
                stream: Some("duel".into()),
                snapshot_every: Some(0),
                ..Overrides::default()
            },
        )
        .unwrap();
        assert_eq!(config.log.stream, "duel");
        assert_eq!(config.log.snapshot_every, None);
        assert_eq!(config.seed, 9);
    }

    #[test]
    fn malformed_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.json");
        std::fs::write(&path, "{ seed: ").unwrap();
        let err = LoamConfig::load(Some(&path), Overrides::default()).unwrap_err();
        assert!(err.to_string().contains("parsing config"));
    }
}
