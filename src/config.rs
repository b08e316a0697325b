//! Configuration for shutter-mint services
//!
//! One JSON config file drives both deployments; each binary reads the
//! sections it needs. Priority: CLI overrides > environment variables >
//! config file > defaults.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Global configuration shared by the coordinator and device services
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GlobalConfig {
    pub coordinator: CoordinatorConfig,
    pub device: DeviceConfig,
    pub services: ServiceEndpoints,
}

/// Public coordinator service settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoordinatorConfig {
    /// Listen address, e.g. "0.0.0.0:5000"
    pub bind_addr: String,
    /// Directory holding the coordinator's claims database
    pub data_dir: String,
    /// Public base URL used to build claim and metadata URLs
    pub public_base_url: String,
}

/// Device-side orchestrator settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceConfig {
    /// Directory holding the device's local database
    pub data_dir: String,
    /// Wallet receiving original mints
    pub owner_wallet: String,
    /// Ledger address of the signing device
    pub device_address: String,
    /// Hardware public key submitted at registration
    pub device_public_key: String,
    /// Stable hardware identifier stamped into claim provenance
    pub device_id: String,
    /// Camera module identifier
    pub camera_id: String,
    /// Edition poll interval in seconds
    pub poll_interval_secs: u64,
    /// How many pending requests each tick fetches
    pub poll_batch_size: u32,
    /// Ceiling for concurrent proof pipelines
    pub max_proof_tasks: usize,
}

/// Endpoints for the coordinator and provider gateways
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceEndpoints {
    pub coordinator_url: String,
    pub ledger_gateway_url: String,
    pub storage_gateway_url: String,
    pub prover_url: String,
}

impl Default for GlobalConfig {
    fn default() -> Self {
        let data_root = default_config_dir()
            .map(|d| d.to_string_lossy().to_string())
            .unwrap_or_else(|_| ".shutter-mint".to_string());

        Self {
            coordinator: CoordinatorConfig {
                bind_addr: "0.0.0.0:5000".to_string(),
                data_dir: format!("{}/coordinator", data_root),
                public_base_url: "http://localhost:5000".to_string(),
            },
            device: DeviceConfig {
                data_dir: format!("{}/device", data_root),
                owner_wallet: String::new(),
                device_address: String::new(),
                device_public_key: String::new(),
                device_id: String::new(),
                camera_id: String::new(),
                poll_interval_secs: 10,
                poll_batch_size: 10,
                max_proof_tasks: 4,
            },
            services: ServiceEndpoints {
                coordinator_url: "http://localhost:5000".to_string(),
                ledger_gateway_url: "http://localhost:5100".to_string(),
                storage_gateway_url: "http://localhost:5200".to_string(),
                prover_url: "http://localhost:5300".to_string(),
            },
        }
    }
}

/// Configuration error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Config directory not found")]
    DirectoryNotFound,
}

/// Overrides from CLI arguments or environment variables
#[derive(Debug, Default, Clone)]
pub struct ConfigOverrides {
    pub bind_addr: Option<String>,
    pub public_base_url: Option<String>,
    pub coordinator_url: Option<String>,
    pub ledger_gateway_url: Option<String>,
    pub storage_gateway_url: Option<String>,
    pub prover_url: Option<String>,
    pub data_dir: Option<String>,
    pub owner_wallet: Option<String>,
    pub device_address: Option<String>,
    pub poll_interval_secs: Option<u64>,
}

impl ConfigOverrides {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read overrides from SHUTTER_* environment variables
    pub fn from_env() -> Self {
        Self {
            bind_addr: std::env::var("SHUTTER_BIND_ADDR").ok(),
            public_base_url: std::env::var("SHUTTER_PUBLIC_URL").ok(),
            coordinator_url: std::env::var("SHUTTER_COORDINATOR_URL").ok(),
            ledger_gateway_url: std::env::var("SHUTTER_LEDGER_URL").ok(),
            storage_gateway_url: std::env::var("SHUTTER_STORAGE_URL").ok(),
            prover_url: std::env::var("SHUTTER_PROVER_URL").ok(),
            data_dir: std::env::var("SHUTTER_DATA_DIR").ok(),
            owner_wallet: std::env::var("SHUTTER_OWNER_WALLET").ok(),
            device_address: std::env::var("SHUTTER_DEVICE_ADDRESS").ok(),
            poll_interval_secs: std::env::var("SHUTTER_POLL_INTERVAL")
                .ok()
                .and_then(|s| s.parse().ok()),
        }
    }

    /// Merge with another set of overrides (other takes precedence)
    pub fn merge(mut self, other: Self) -> Self {
        macro_rules! take {
            ($field:ident) => {
                if other.$field.is_some() {
                    self.$field = other.$field;
                }
            };
        }
        take!(bind_addr);
        take!(public_base_url);
        take!(coordinator_url);
        take!(ledger_gateway_url);
        take!(storage_gateway_url);
        take!(prover_url);
        take!(data_dir);
        take!(owner_wallet);
        take!(device_address);
        take!(poll_interval_secs);
        self
    }
}

/// Get the default configuration directory path
///
/// Returns: `~/.shutter-mint/`
pub fn default_config_dir() -> Result<PathBuf, ConfigError> {
    dirs::home_dir()
        .map(|home| home.join(".shutter-mint"))
        .ok_or(ConfigError::DirectoryNotFound)
}

/// Get the default configuration file path
pub fn default_config_path() -> Result<PathBuf, ConfigError> {
    Ok(default_config_dir()?.join("config.json"))
}

/// Load configuration from file with overrides applied
pub fn load_config(
    config_path: Option<&Path>,
    cli_overrides: ConfigOverrides,
) -> Result<GlobalConfig, ConfigError> {
    let path = match config_path {
        Some(p) => p.to_path_buf(),
        None => default_config_path()?,
    };

    let mut config = if path.exists() {
        let contents = std::fs::read_to_string(&path)?;
        serde_json::from_str(&contents)?
    } else {
        GlobalConfig::default()
    };

    apply_overrides(&mut config, ConfigOverrides::from_env());
    apply_overrides(&mut config, cli_overrides);

    Ok(config)
}

/// Save configuration, creating parent directories as needed
pub fn save_config(config: &GlobalConfig, config_path: Option<&Path>) -> Result<(), ConfigError> {
    let path = match config_path {
        Some(p) => p.to_path_buf(),
        None => default_config_path()?,
    };

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let json = serde_json::to_string_pretty(config)?;
    std::fs::write(&path, json)?;

    Ok(())
}

fn apply_overrides(config: &mut GlobalConfig, overrides: ConfigOverrides) {
    if let Some(bind_addr) = overrides.bind_addr {
        config.coordinator.bind_addr = bind_addr;
    }
    if let Some(url) = overrides.public_base_url {
        config.coordinator.public_base_url = url;
    }
    if let Some(url) = overrides.coordinator_url {
        config.services.coordinator_url = url;
    }
    if let Some(url) = overrides.ledger_gateway_url {
        config.services.ledger_gateway_url = url;
    }
    if let Some(url) = overrides.storage_gateway_url {
        config.services.storage_gateway_url = url;
    }
    if let Some(url) = overrides.prover_url {
        config.services.prover_url = url;
    }
    if let Some(dir) = overrides.data_dir {
        config.coordinator.data_dir = format!("{}/coordinator", dir);
        config.device.data_dir = format!("{}/device", dir);
    }
    if let Some(wallet) = overrides.owner_wallet {
        config.device.owner_wallet = wallet;
    }
    if let Some(address) = overrides.device_address {
        config.device.device_address = address;
    }
    if let Some(secs) = overrides.poll_interval_secs {
        config.device.poll_interval_secs = secs;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overrides_merge_with_precedence() {
        let base = ConfigOverrides {
            bind_addr: Some("0.0.0.0:1111".to_string()),
            poll_interval_secs: Some(5),
            ..Default::default()
        };
        let top = ConfigOverrides {
            bind_addr: Some("0.0.0.0:2222".to_string()),
            ..Default::default()
        };

        let merged = base.merge(top);
        assert_eq!(merged.bind_addr.as_deref(), Some("0.0.0.0:2222"));
        assert_eq!(merged.poll_interval_secs, Some(5));
    }

    #[test]
    fn config_round_trips_through_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");

        let mut config = GlobalConfig::default();
        config.coordinator.bind_addr = "127.0.0.1:9999".to_string();
        save_config(&config, Some(&path)).unwrap();

        let loaded = load_config(Some(&path), ConfigOverrides::new()).unwrap();
        assert_eq!(loaded.coordinator.bind_addr, "127.0.0.1:9999");
    }

    #[test]
    fn cli_overrides_beat_file_values() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        save_config(&GlobalConfig::default(), Some(&path)).unwrap();

        let overrides = ConfigOverrides {
            poll_interval_secs: Some(3),
            ..Default::default()
        };
        let loaded = load_config(Some(&path), overrides).unwrap();
        assert_eq!(loaded.device.poll_interval_secs, 3);
    }
}
