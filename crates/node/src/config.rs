// node/src/config.rs
use ledger_core::{Difficulty, MinerConfig, TargetScheme};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

pub const CHAIN_FILE: &str = "chain_state.json";
pub const WORLD_FILE: &str = "vr_state.json";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeConfig {
    pub data_dir: String,
    #[serde(default)]
    pub ledger: LedgerConfig,
    #[serde(default)]
    pub rpc: RpcConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerConfig {
    pub difficulty: Difficulty,
    pub target_scheme: TargetScheme,
    pub default_max_iters: u64,
    pub allow_empty_blocks: bool,
    /// Search threads; 0 means one per CPU
    pub workers: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcConfig {
    pub enabled: bool,
    pub listen_addr: SocketAddr,
    pub cors_origins: Vec<String>,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            difficulty: 4,
            target_scheme: TargetScheme::LeadingZeroHex,
            default_max_iters: 200_000,
            allow_empty_blocks: false,
            workers: 1,
        }
    }
}

impl Default for RpcConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            listen_addr: SocketAddr::from(([127, 0, 0, 1], 8000)),
            cors_origins: vec!["*".into()],
        }
    }
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            data_dir: "./data".into(),
            ledger: LedgerConfig::default(),
            rpc: RpcConfig::default(),
        }
    }
}

impl LedgerConfig {
    pub fn miner_config(&self) -> MinerConfig {
        MinerConfig {
            require_pending: !self.allow_empty_blocks,
            workers: self.workers,
        }
    }
}

impl NodeConfig {
    pub fn from_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Reads `path`, falling back to defaults when it does not exist
    pub fn load_or_default(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        if path.exists() {
            Self::from_file(path)
        } else {
            tracing::warn!("No config at {}, using defaults", path.display());
            Ok(Self::default())
        }
    }

    pub fn to_file(&self, path: impl AsRef<Path>) -> anyhow::Result<()> {
        let contents = toml::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    pub fn chain_path(&self) -> PathBuf {
        Path::new(&self.data_dir).join(CHAIN_FILE)
    }

    pub fn world_path(&self) -> PathBuf {
        Path::new(&self.data_dir).join(WORLD_FILE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config = NodeConfig::default();
        assert_eq!(config.ledger.difficulty, 4);
        assert_eq!(config.ledger.default_max_iters, 200_000);
        assert!(!config.ledger.allow_empty_blocks);
        assert!(config.ledger.miner_config().require_pending);
        assert_eq!(config.rpc.listen_addr.port(), 8000);
        assert!(config.chain_path().ends_with("chain_state.json"));
    }

    #[test]
    fn test_file_roundtrip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");

        let mut config = NodeConfig::default();
        config.ledger.target_scheme = TargetScheme::LeadingZeroBits;
        config.ledger.workers = 0;
        config.to_file(&path).unwrap();

        let loaded = NodeConfig::from_file(&path).unwrap();
        assert_eq!(loaded.ledger.target_scheme, TargetScheme::LeadingZeroBits);
        assert_eq!(loaded.ledger.workers, 0);
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "data_dir = \"/tmp/x\"\n\n[ledger]\ndifficulty = 2\n").unwrap();

        let loaded = NodeConfig::from_file(&path).unwrap();
        assert_eq!(loaded.ledger.difficulty, 2);
        assert_eq!(loaded.ledger.default_max_iters, 200_000);
        assert!(loaded.rpc.enabled);
    }

    #[test]
    fn test_missing_file_falls_back() {
        let dir = TempDir::new().unwrap();
        let config = NodeConfig::load_or_default(dir.path().join("absent.toml")).unwrap();
        assert_eq!(config.data_dir, "./data");
    }
}
