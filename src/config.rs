// src/config.rs

use serde::Deserialize;
use std::fs;
use std::path::Path;

use crate::types::LogSource;

/// Tuning knobs for the scan engine
#[derive(Debug, Deserialize, Clone)]
pub struct ScanConfig {
    /// Entries fetched per batch
    #[serde(default = "default_window_size")]
    pub window_size: u64,
    /// Hard ceiling on batches planned per log; absent means unbounded and
    /// the cutoff date is the sole stopping condition
    #[serde(default)]
    pub max_batches_per_log: Option<u32>,
    /// Worker pool size for batch execution
    #[serde(default = "default_max_workers")]
    pub max_workers: usize,
    /// Additional attempts after a failed entry-range fetch (0 = single attempt)
    #[serde(default)]
    pub fetch_retries: u32,
    /// Default cutoff when the request omits cut_off_date
    #[serde(default = "default_cutoff_days")]
    pub default_cutoff_days: i64,
    /// Overall scan deadline; absent means no deadline
    #[serde(default)]
    pub scan_timeout_secs: Option<u64>,
    /// Directory for raw per-batch response snapshots; absent disables persistence
    #[serde(default)]
    pub snapshot_dir: Option<String>,
}

fn default_window_size() -> u64 { 1000 }
fn default_max_workers() -> usize { 4 }
fn default_cutoff_days() -> i64 { 30 }

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            window_size: default_window_size(),
            max_batches_per_log: None,
            max_workers: default_max_workers(),
            fetch_retries: 0,
            default_cutoff_days: default_cutoff_days(),
            scan_timeout_secs: None,
            snapshot_dir: None,
        }
    }
}

/// One log entry in the provider registry
#[derive(Debug, Deserialize, Clone)]
pub struct LogDef {
    /// Path segment under the provider base URL; empty means the log is
    /// rooted at the base URL itself
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub period: Option<String>,
    #[serde(default)]
    pub mode: Option<String>,
    #[serde(default)]
    pub tree_size: Option<String>,
}

/// A CT log provider with its base URL and logs
#[derive(Debug, Deserialize, Clone)]
pub struct ProviderDef {
    pub name: String,
    pub base_url: String,
    #[serde(default)]
    pub logs: Vec<LogDef>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,
}

fn default_listen_addr() -> String { "0.0.0.0:8080".to_string() }

impl Default for ServerConfig {
    fn default() -> Self {
        Self { listen_addr: default_listen_addr() }
    }
}

#[derive(Debug, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
}

#[derive(Debug, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub scan: ScanConfig,
    #[serde(default)]
    pub server: ServerConfig,
    pub logging: LoggingConfig,
    /// Ordered provider registry; engine consumes only the flattened sources
    #[serde(default)]
    pub providers: Vec<ProviderDef>,
}

impl Config {
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let contents = fs::read_to_string(path)?;
        let cfg: Config = toml::from_str(&contents)?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn validate(&self) -> anyhow::Result<()> {
        if self.scan.window_size == 0 {
            anyhow::bail!("scan.window_size must be greater than zero");
        }
        if self.scan.max_workers == 0 {
            anyhow::bail!("scan.max_workers must be greater than zero");
        }
        for provider in &self.providers {
            if provider.base_url.is_empty() {
                anyhow::bail!("provider '{}' has an empty base_url", provider.name);
            }
        }
        Ok(())
    }

    /// Flatten the registry into the ordered source list the engine scans.
    /// Providers keep file order, logs keep list order.
    pub fn all_sources(&self) -> Vec<LogSource> {
        self.providers
            .iter()
            .flat_map(|provider| {
                provider.logs.iter().map(|log| LogSource {
                    provider: provider.name.clone(),
                    base_url: provider.base_url.clone(),
                    log_id: log.id.clone(),
                    description: log.description.clone(),
                })
            })
            .collect()
    }
}
