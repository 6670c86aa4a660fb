use crate::registry::{ChainDescriptor, ChainRegistry, RegistryError};
use crate::snapshot::{ReferenceSnapshot, SnapshotEntry, SnapshotError};
use config::{Config, ConfigError, File, FileFormat};
use log::warn;
use serde::Deserialize;
use std::collections::HashMap;
use std::env;
use std::path::PathBuf;

pub const DEFAULT_CONFIG_FILE: &str = "Config.toml";

pub const ENV_CONFIG_PATH: &str = "CHAIN_PULSE_CONFIG";
pub const ENV_GATEWAY_URL: &str = "CHAIN_PULSE_GATEWAY_URL";
pub const ENV_OUTPUT_DIR: &str = "CHAIN_PULSE_OUTPUT_DIR";
pub const ENV_SEED: &str = "CHAIN_PULSE_SEED";

#[derive(Debug, Deserialize, Clone)]
pub struct Gateway {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_gateway_base_url")]
    pub base_url: String,
    #[serde(default = "default_vs_currency")]
    pub vs_currency: String,
    /// Whole-request timeout. The resolver never waits longer than this for live data
    #[serde(default = "default_gateway_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_true() -> bool {
    true
}
fn default_gateway_base_url() -> String {
    "https://api.coingecko.com/api/v3".to_string()
}
fn default_vs_currency() -> String {
    "usd".to_string()
}
fn default_gateway_timeout_ms() -> u64 {
    5000
}

impl Default for Gateway {
    fn default() -> Self {
        Self {
            enabled: default_true(),
            base_url: default_gateway_base_url(),
            vs_currency: default_vs_currency(),
            timeout_ms: default_gateway_timeout_ms(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct Output {
    #[serde(default = "default_output_dir")]
    pub dir: String,
    #[serde(default = "default_output_file_name")]
    pub file_name: String,
}

fn default_output_dir() -> String {
    "public".to_string()
}
fn default_output_file_name() -> String {
    "chain_data.json".to_string()
}

impl Default for Output {
    fn default() -> Self {
        Self {
            dir: default_output_dir(),
            file_name: default_output_file_name(),
        }
    }
}

impl Output {
    pub fn path(&self) -> PathBuf {
        PathBuf::from(&self.dir).join(&self.file_name)
    }
}

/// Base daily transaction volumes for the synthetic activity estimate.
#[derive(Debug, Deserialize, Clone)]
pub struct Estimates {
    #[serde(default = "default_base_tx")]
    pub default_base_tx: u64,
    /// Per-chain overrides for high-throughput chains
    #[serde(default)]
    pub base_tx: HashMap<String, u64>,
}

fn default_base_tx() -> u64 {
    1_000_000
}

impl Default for Estimates {
    fn default() -> Self {
        Self {
            default_base_tx: default_base_tx(),
            base_tx: HashMap::new(),
        }
    }
}

impl Estimates {
    pub fn base_tx_for(&self, id: &str) -> u64 {
        self.base_tx.get(id).copied().unwrap_or(self.default_base_tx)
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct RunSettings {
    /// Fixed seed for the random source. None draws a fresh seed from the OS
    #[serde(default)]
    pub seed: Option<u64>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct Settings {
    #[serde(default)]
    pub gateway: Gateway,
    #[serde(default)]
    pub output: Output,
    #[serde(default)]
    pub estimates: Estimates,
    #[serde(default)]
    pub run: RunSettings,
    pub chains: Vec<ChainDescriptor>,
    #[serde(default)]
    pub snapshot: Vec<SnapshotEntry>,
}

#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("Failed to load configuration: {0}")]
    Config(#[from] ConfigError),
    #[error("Invalid chain registry: {0}")]
    Registry(#[from] RegistryError),
    #[error("Invalid reference snapshot: {0}")]
    Snapshot(#[from] SnapshotError),
}

impl Settings {
    /// Loads `Config.toml` (or the file named by `CHAIN_PULSE_CONFIG`) and applies
    /// environment overrides.
    pub fn new() -> Result<Self, SettingsError> {
        let path = env::var(ENV_CONFIG_PATH)
            .ok()
            .filter(|p| !p.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_CONFIG_FILE.to_string());

        let mut settings = Self::from_file(&path)?;
        settings.apply_overrides(|key| env::var(key).ok());
        Ok(settings)
    }

    pub fn from_file(path: &str) -> Result<Self, SettingsError> {
        let s = Config::builder()
            .add_source(File::new(path, FileFormat::Toml))
            .build()?;
        Ok(s.try_deserialize()?)
    }

    pub fn from_toml_str(raw: &str) -> Result<Self, SettingsError> {
        let s = Config::builder()
            .add_source(File::from_str(raw, FileFormat::Toml))
            .build()?;
        Ok(s.try_deserialize()?)
    }

    /// Applies `CHAIN_PULSE_*` overrides read through `lookup`. Blank or unparsable
    /// values are ignored.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let value = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        if let Some(url) = value(ENV_GATEWAY_URL) {
            self.gateway.base_url = url;
        }
        if let Some(dir) = value(ENV_OUTPUT_DIR) {
            self.output.dir = dir;
        }
        if let Some(raw_seed) = value(ENV_SEED) {
            match raw_seed.parse::<u64>() {
                Ok(seed) => self.run.seed = Some(seed),
                Err(e) => warn!("⚠️ Ignoring {}={:?}: {}", ENV_SEED, raw_seed, e),
            }
        }
    }

    /// Validated registry built from `[[chains]]`.
    pub fn registry(&self) -> Result<ChainRegistry, SettingsError> {
        Ok(ChainRegistry::new(self.chains.clone())?)
    }

    /// Validated snapshot built from `[[snapshot]]`, restricted to registered chains.
    pub fn reference_snapshot(&self, registry: &ChainRegistry) -> Result<ReferenceSnapshot, SettingsError> {
        let mut snapshot = ReferenceSnapshot::new(self.snapshot.clone())?;
        snapshot.retain_registered(registry);
        Ok(snapshot)
    }
}
