//! Configuration file support for autoheal.
//!
//! Provides YAML-based configuration through `autoheal.config.yml` files,
//! including data structures, file loading, validation, and the merge of
//! file values with command-line overrides into run [`Settings`].

use anyhow::{bail, Context};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::warn;

use crate::application::dto::SelectionStrategy;
use crate::application::factories::ReasoningOptions;
use crate::application::use_cases::{ScanSettings, DEFAULT_SCAN_THROTTLE_MS};
use crate::shared::{Result, RetryPolicy};

pub const CONFIG_FILENAME: &str = "autoheal.config.yml";

/// Environment variable that relocates the metadata cache
pub const CACHE_DIR_ENV: &str = "AUTOHEAL_CACHE";

const DEFAULT_CACHE_DIRNAME: &str = ".autoheal_cache";
const DEFAULT_VERIFY_TIMEOUT_SECS: u64 = 600;
const MAX_SCAN_BATCH_SIZE: usize = 1000;

/// Top-level configuration file schema.
#[derive(Debug, Deserialize, Default)]
pub struct ConfigFile {
    pub cache_dir: Option<PathBuf>,
    /// Verification argv; `{manifest}` is replaced with the candidate path
    pub verify_command: Option<Vec<String>>,
    pub verify_timeout_secs: Option<u64>,
    pub network_timeout_secs: Option<u64>,
    pub max_retries: Option<u32>,
    pub retry_base_delay_ms: Option<u64>,
    pub scan_throttle_ms: Option<u64>,
    pub scan_batch_size: Option<usize>,
    pub strategy: Option<SelectionStrategy>,
    pub reasoning: Option<ReasoningConfig>,
    pub marker_environment: Option<HashMap<String, String>>,
    pub pypi_fallback: Option<bool>,
    pub ignore_vulns: Option<Vec<IgnoreVuln>>,
    /// Captures unknown fields for warnings.
    #[serde(flatten)]
    pub unknown_fields: HashMap<String, serde_yaml_ng::Value>,
}

/// Reasoning collaborator settings for the delegated strategy.
#[derive(Debug, Deserialize, Default)]
pub struct ReasoningConfig {
    pub model: Option<String>,
    pub api_base: Option<String>,
    pub api_key_env: Option<String>,
}

/// An advisory to drop from findings before candidates are computed.
#[derive(Debug, Deserialize)]
pub struct IgnoreVuln {
    pub id: String,
    pub reason: Option<String>,
}

/// Load config from an explicit path. Returns an error if the file is not found.
pub fn load_config_from_path(path: &Path) -> Result<ConfigFile> {
    let content = std::fs::read_to_string(path).with_context(|| {
        format!(
            "Failed to read config file: {}\n\n💡 Hint: Check that the file exists and is readable.",
            path.display()
        )
    })?;

    let config: ConfigFile = serde_yaml_ng::from_str(&content).with_context(|| {
        format!(
            "Failed to parse config file: {}\n\n💡 Hint: Ensure the file contains valid YAML syntax.",
            path.display()
        )
    })?;

    validate_config(&config)?;
    warn_unknown_fields(&config);

    Ok(config)
}

/// Auto-discover config in a directory. Returns `None` silently if not found.
pub fn discover_config(dir: &Path) -> Result<Option<ConfigFile>> {
    let config_path = dir.join(CONFIG_FILENAME);

    if !config_path.exists() {
        return Ok(None);
    }

    let config = load_config_from_path(&config_path)?;
    Ok(Some(config))
}

/// Validate the loaded configuration.
fn validate_config(config: &ConfigFile) -> Result<()> {
    if let Some(ref ignore_vulns) = config.ignore_vulns {
        for (i, entry) in ignore_vulns.iter().enumerate() {
            if entry.id.trim().is_empty() {
                bail!(
                    "Invalid config: ignore_vulns[{}].id must not be empty.\n\n\
                     💡 Hint: Each ignore_vulns entry must have a non-empty 'id' field (e.g., \"GHSA-xxxx-xxxx-xxxx\" or \"CVE-2024-1234\").",
                    i
                );
            }
        }
    }

    if let Some(ref command) = config.verify_command {
        if command.is_empty() || command[0].trim().is_empty() {
            bail!(
                "Invalid config: verify_command must not be empty.\n\n\
                 💡 Hint: Give the command as a list, e.g. [\"pip\", \"install\", \"--dry-run\", \"-r\", \"{{manifest}}\"], or remove the key."
            );
        }
    }

    for (key, value) in [
        ("verify_timeout_secs", config.verify_timeout_secs),
        ("network_timeout_secs", config.network_timeout_secs),
    ] {
        if value == Some(0) {
            bail!(
                "Invalid config: {} must be greater than zero.\n\n\
                 💡 Hint: Remove the key to use the default timeout.",
                key
            );
        }
    }

    Ok(())
}

/// Warn about unknown fields in the config file.
fn warn_unknown_fields(config: &ConfigFile) {
    for key in config.unknown_fields.keys() {
        warn!(field = %key, "Unknown config field will be ignored");
        eprintln!(
            "⚠️  Warning: Unknown config field '{}' will be ignored.",
            key
        );
    }
}

/// Default metadata cache location: `$AUTOHEAL_CACHE`, else `~/.autoheal_cache`
pub fn default_cache_dir() -> PathBuf {
    if let Some(dir) = std::env::var_os(CACHE_DIR_ENV).filter(|v| !v.is_empty()) {
        return PathBuf::from(dir);
    }
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(DEFAULT_CACHE_DIRNAME)
}

/// Values given on the command line; each one wins over the config file.
#[derive(Debug, Default, Clone)]
pub struct CliOverrides {
    pub cache_dir: Option<PathBuf>,
    pub verify_command: Option<Vec<String>>,
    pub strategy: Option<SelectionStrategy>,
    pub no_fallback: bool,
}

/// Fully resolved run settings: CLI flag > config file > built-in default
#[derive(Debug, Clone)]
pub struct Settings {
    pub cache_dir: PathBuf,
    pub verify_command: Option<Vec<String>>,
    pub verify_timeout: Duration,
    /// `None` keeps each HTTP client's own default
    pub network_timeout: Option<Duration>,
    pub retry: RetryPolicy,
    pub scan: ScanSettings,
    pub strategy: SelectionStrategy,
    pub reasoning: ReasoningOptions,
    pub marker_overrides: HashMap<String, String>,
    pub pypi_fallback: bool,
    pub ignore_vulns: Vec<String>,
}

impl Settings {
    pub fn resolve(config: ConfigFile, overrides: CliOverrides) -> Self {
        let retry = RetryPolicy::new(
            config
                .max_retries
                .unwrap_or(RetryPolicy::DEFAULT_MAX_RETRIES),
            Duration::from_millis(
                config
                    .retry_base_delay_ms
                    .unwrap_or(RetryPolicy::DEFAULT_BASE_DELAY_MS),
            ),
        );

        let scan = ScanSettings {
            batch_size: config
                .scan_batch_size
                .unwrap_or(MAX_SCAN_BATCH_SIZE)
                .clamp(1, MAX_SCAN_BATCH_SIZE),
            throttle: Duration::from_millis(
                config.scan_throttle_ms.unwrap_or(DEFAULT_SCAN_THROTTLE_MS),
            ),
            retry,
        };

        let mut reasoning = ReasoningOptions::default();
        if let Some(file) = config.reasoning {
            if let Some(model) = file.model {
                reasoning.model = model;
            }
            if let Some(api_base) = file.api_base {
                reasoning.api_base = api_base;
            }
            if let Some(api_key_env) = file.api_key_env {
                reasoning.api_key_env = api_key_env;
            }
        }

        Self {
            cache_dir: overrides
                .cache_dir
                .or(config.cache_dir)
                .unwrap_or_else(default_cache_dir),
            verify_command: overrides
                .verify_command
                .filter(|argv| !argv.is_empty())
                .or(config.verify_command),
            verify_timeout: Duration::from_secs(
                config
                    .verify_timeout_secs
                    .unwrap_or(DEFAULT_VERIFY_TIMEOUT_SECS),
            ),
            network_timeout: config.network_timeout_secs.map(Duration::from_secs),
            retry,
            scan,
            strategy: overrides.strategy.or(config.strategy).unwrap_or_default(),
            reasoning,
            marker_overrides: config.marker_environment.unwrap_or_default(),
            pypi_fallback: !overrides.no_fallback && config.pypi_fallback.unwrap_or(true),
            ignore_vulns: config
                .ignore_vulns
                .unwrap_or_default()
                .into_iter()
                .map(|entry| entry.id.trim().to_string())
                .collect(),
        }
    }
}
