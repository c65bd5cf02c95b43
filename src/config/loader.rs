//! Configuration loading and merging logic
//!
//! Handles loading configuration from multiple sources and merging them
//! according to precedence rules.

use super::{defaults, paths, schema::Config};
use anyhow::{Context, Result};
use std::path::Path;

/// Overrides `defaultNamespace`
pub const NAMESPACE_ENV: &str = "KXRAY_DEFAULT_NAMESPACE";
/// Overrides `xray.scanTimeoutSecs`
pub const SCAN_TIMEOUT_ENV: &str = "KXRAY_SCAN_TIMEOUT";

/// Configuration loader
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration with all layers merged
    ///
    /// Precedence order (highest to lowest):
    /// 1. Environment variable overrides
    /// 2. Root config file
    /// 3. Built-in defaults
    pub fn load() -> Result<Config> {
        let mut config = Self::load_defaults();

        let root = paths::root_config_path();
        if root.exists() {
            config = Self::merge_config(config, Self::load_file(&root)?);
        }

        Ok(Self::apply_env_overrides(config))
    }

    /// Load configuration from a file
    pub fn load_file(path: &Path) -> Result<Config> {
        if !path.exists() {
            return Err(anyhow::anyhow!("Config file not found: {}", path.display()));
        }

        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        serde_yaml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    /// Validate the root file and the merged result
    ///
    /// Fails on invalid YAML, wrong value types, a zero scan timeout or a
    /// log filter that does not parse.
    pub fn validate() -> Result<()> {
        let root_path = paths::root_config_path();
        if root_path.exists() {
            let config = Self::load_file(&root_path)?;
            Self::check(&config)
                .with_context(|| format!("Invalid config file: {}", root_path.display()))?;
        }

        let merged = Self::load().context("Failed to load merged configuration")?;
        Self::check(&merged)
    }

    fn check(config: &Config) -> Result<()> {
        if config.xray.scan_timeout_secs == 0 {
            return Err(anyhow::anyhow!("xray.scanTimeoutSecs must be at least 1"));
        }
        tracing_subscriber::EnvFilter::try_new(&config.logger.level)
            .with_context(|| format!("Invalid logger.level: {}", config.logger.level))?;
        Ok(())
    }

    /// Load default configuration
    pub fn load_defaults() -> Config {
        defaults::default_config()
    }

    /// Merge two configurations, with `other` taking precedence
    fn merge_config(_base: Config, other: Config) -> Config {
        Config {
            default_namespace: other.default_namespace,
            xray: other.xray,
            logger: other.logger,
        }
    }

    /// Apply environment variable overrides
    fn apply_env_overrides(mut config: Config) -> Config {
        if let Ok(namespace) = std::env::var(NAMESPACE_ENV) {
            config.default_namespace = namespace;
        }

        if let Ok(timeout) = std::env::var(SCAN_TIMEOUT_ENV) {
            match timeout.parse::<u64>() {
                Ok(secs) => config.xray.scan_timeout_secs = secs,
                Err(_) => tracing::warn!("Ignoring {}={}: not a number", SCAN_TIMEOUT_ENV, timeout),
            }
        }

        config
    }

    /// Save configuration to a file
    pub fn save(config: &Config, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            paths::ensure_dir(parent)?;
        }

        let yaml =
            serde_yaml::to_string(config).context("Failed to serialize configuration to YAML")?;

        std::fs::write(path, yaml)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }

    /// Save root configuration
    pub fn save_root(config: &Config) -> Result<()> {
        Self::save(config, &paths::root_config_path())
    }
}
