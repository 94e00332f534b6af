//! Configuration file management.

use std::path::PathBuf;

use rategate_types::{parse_i256, parse_u256, Address, I256, U256};
use serde::{Deserialize, Serialize};

/// Complete daemon configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DaemonConfig {
    /// Service settings.
    #[serde(default)]
    pub service: ServiceConfig,
    /// Values used once to initialize an empty store.
    #[serde(default)]
    pub genesis: Option<GenesisConfig>,
    /// Stub reserve feeds to register.
    #[serde(default)]
    pub feeds: Vec<FeedConfig>,
    /// Advanced settings.
    #[serde(default)]
    pub advanced: AdvancedConfig,
}

/// Service configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Data directory. Empty = platform default.
    #[serde(default)]
    pub data_dir: String,
    /// Unix socket file name inside the data directory.
    #[serde(default = "default_socket_name")]
    pub socket_name: String,
    /// Per-subscriber event buffer.
    #[serde(default = "default_event_buffer")]
    pub event_buffer: usize,
}

/// Initial snapshot configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenesisConfig {
    pub owner: Address,
    pub updater: Address,
    pub reserve_feed: Address,
    /// Max-difference fraction, scale 1e18, as a decimal string.
    pub max_difference: String,
}

/// A stub reserve feed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedConfig {
    pub address: Address,
    /// Reported reserve, scale 1e18, as a decimal string. May be negative.
    #[serde(default = "default_answer")]
    pub answer: String,
    #[serde(default = "default_decimals")]
    pub decimals: u8,
}

/// Advanced configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdvancedConfig {
    /// Log level: "debug" | "info" | "warn" | "error".
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Enables `dev_set_reserve`.
    #[serde(default)]
    pub dev_mode: bool,
}

// Default value functions

fn default_socket_name() -> String {
    "rategate.sock".to_string()
}

fn default_event_buffer() -> usize {
    1000
}

fn default_answer() -> String {
    "0".to_string()
}

fn default_decimals() -> u8 {
    18
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            data_dir: String::new(),
            socket_name: default_socket_name(),
            event_buffer: default_event_buffer(),
        }
    }
}

impl Default for AdvancedConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            dev_mode: false,
        }
    }
}

impl GenesisConfig {
    /// The parsed max-difference fraction.
    pub fn max_difference(&self) -> anyhow::Result<U256> {
        parse_u256(&self.max_difference)
            .map_err(|e| anyhow::anyhow!("genesis.max_difference '{}': {e}", self.max_difference))
    }
}

impl FeedConfig {
    /// The parsed initial answer.
    pub fn answer(&self) -> anyhow::Result<I256> {
        parse_i256(&self.answer)
            .map_err(|e| anyhow::anyhow!("feed {} answer '{}': {e}", self.address, self.answer))
    }
}

impl DaemonConfig {
    /// Load configuration from the default config file location.
    ///
    /// Falls back to defaults if file does not exist.
    pub fn load() -> anyhow::Result<Self> {
        let config_path = Self::config_path();
        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            Self::parse(&content)
        } else {
            Ok(Self::default())
        }
    }

    /// Parse configuration from TOML text.
    pub fn parse(content: &str) -> anyhow::Result<Self> {
        let config: DaemonConfig = toml::from_str(content)?;
        Ok(config)
    }

    /// Get the data directory path.
    pub fn data_dir(&self) -> PathBuf {
        if self.service.data_dir.is_empty() {
            Self::default_data_dir()
        } else {
            PathBuf::from(&self.service.data_dir)
        }
    }

    /// Get the IPC socket path.
    pub fn socket_path(&self) -> PathBuf {
        self.data_dir().join(&self.service.socket_name)
    }

    /// Get the config file path.
    fn config_path() -> PathBuf {
        Self::default_data_dir().join("config.toml")
    }

    /// Default data directory: `$RATEGATE_DATA_DIR`, else `~/.rategate`.
    fn default_data_dir() -> PathBuf {
        if let Ok(dir) = std::env::var("RATEGATE_DATA_DIR") {
            return PathBuf::from(dir);
        }
        std::env::var("HOME")
            .map(|h| PathBuf::from(h).join(".rategate"))
            .unwrap_or_else(|_| PathBuf::from("/tmp/rategate"))
    }
}
