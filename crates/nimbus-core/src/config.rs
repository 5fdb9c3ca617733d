use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::backoff::BackoffSchedule;

/// Retry policy parameters (`[retry]` section of config.toml).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Maximum retries per logical call (0 disables retrying).
    pub max_attempts: u32,
    /// First backoff delay in milliseconds.
    pub initial_delay_ms: u64,
    /// Upper bound on any backoff delay in milliseconds.
    pub max_delay_ms: u64,
    /// Geometric growth between consecutive delays.
    pub growth_factor: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            initial_delay_ms: 500,
            max_delay_ms: 5000,
            growth_factor: 1.5,
        }
    }
}

impl RetryConfig {
    pub fn schedule(&self) -> BackoffSchedule {
        BackoffSchedule::new(
            Duration::from_millis(self.initial_delay_ms),
            Duration::from_millis(self.max_delay_ms),
        )
        .with_growth_factor(self.growth_factor)
    }
}

/// Redirect policy parameters (`[redirect]` section).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedirectConfig {
    /// Maximum redirects followed per logical call.
    pub max_redirects: u32,
}

impl Default for RedirectConfig {
    fn default() -> Self {
        Self { max_redirects: 5 }
    }
}

/// Transport timeouts (`[transport]` section).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransportConfig {
    pub connect_timeout_secs: u64,
    /// Per-attempt total timeout.
    pub timeout_secs: u64,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            connect_timeout_secs: 15,
            timeout_secs: 30,
        }
    }
}

/// Classifier configuration (`[classifier]` section).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassifierConfig {
    /// Provider error codes treated as transient and retried with backoff.
    pub transient_codes: Vec<String>,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            transient_codes: vec![
                "RequestTimeout".to_string(),
                "OperationAborted".to_string(),
                "RequestTimeTooSkewed".to_string(),
                "Throttling".to_string(),
            ],
        }
    }
}

/// Global configuration loaded from `~/.config/nimbus/config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NimbusConfig {
    #[serde(default)]
    pub retry: RetryConfig,
    #[serde(default)]
    pub redirect: RedirectConfig,
    #[serde(default)]
    pub transport: TransportConfig,
    #[serde(default)]
    pub classifier: ClassifierConfig,
}

pub fn config_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("nimbus")?;
    Ok(xdg_dirs.place_config_file("config.toml")?)
}

/// Load configuration from disk, creating a default file if none exists.
pub fn load_or_init() -> Result<NimbusConfig> {
    let path = config_path()?;
    if !path.exists() {
        let default_cfg = NimbusConfig::default();
        let toml = toml::to_string_pretty(&default_cfg)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, toml)?;
        tracing::info!("created default config at {}", path.display());
        return Ok(default_cfg);
    }
    load_from_path(&path)
}

pub fn load_from_path(path: &Path) -> Result<NimbusConfig> {
    let data = fs::read_to_string(path)?;
    let cfg: NimbusConfig = toml::from_str(&data)?;
    Ok(cfg)
}
