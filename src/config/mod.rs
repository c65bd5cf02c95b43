//! Configuration for kxray
//!
//! A single YAML file layered over built-in defaults, with environment
//! variable overrides on top.

mod defaults;
pub mod loader;
pub mod paths;
pub mod schema;

pub use defaults::default_config_yaml;
pub use loader::ConfigLoader;
pub use schema::{Config, LoggerConfig, XrayConfig};

use anyhow::Context;

/// Get a configuration value by key (dot notation)
pub fn get_config_value(config: &Config, key: &str) -> anyhow::Result<String> {
    match key {
        "defaultNamespace" => Ok(config.default_namespace.clone()),
        "xray.scanTimeoutSecs" => Ok(config.xray.scan_timeout_secs.to_string()),
        "xray.waitForSync" => Ok(config.xray.wait_for_sync.to_string()),
        "xray.showCompleted" => Ok(config.xray.show_completed.to_string()),
        "logger.level" => Ok(config.logger.level.clone()),
        _ => Err(anyhow::anyhow!("Unknown configuration key: {}", key)),
    }
}

/// Set a configuration value by key (dot notation)
pub fn set_config_value(config: &mut Config, key: &str, value: &str) -> anyhow::Result<()> {
    match key {
        "defaultNamespace" => {
            config.default_namespace = value.to_string();
        }
        "xray.scanTimeoutSecs" => {
            config.xray.scan_timeout_secs = value
                .parse()
                .context("xray.scanTimeoutSecs must be a number")?;
        }
        "xray.waitForSync" => {
            config.xray.wait_for_sync = value
                .parse()
                .context("xray.waitForSync must be 'true' or 'false'")?;
        }
        "xray.showCompleted" => {
            config.xray.show_completed = value
                .parse()
                .context("xray.showCompleted must be 'true' or 'false'")?;
        }
        "logger.level" => {
            config.logger.level = value.to_string();
        }
        _ => return Err(anyhow::anyhow!("Unknown configuration key: {}", key)),
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_set_round() {
        let mut config = Config::default();
        set_config_value(&mut config, "xray.scanTimeoutSecs", "20").unwrap();
        set_config_value(&mut config, "xray.showCompleted", "false").unwrap();
        assert_eq!(get_config_value(&config, "xray.scanTimeoutSecs").unwrap(), "20");
        assert_eq!(get_config_value(&config, "xray.showCompleted").unwrap(), "false");
    }

    #[test]
    fn test_set_invalid_values() {
        let mut config = Config::default();
        let err = set_config_value(&mut config, "xray.waitForSync", "maybe").unwrap_err();
        assert!(err.to_string().contains("must be 'true' or 'false'"));
        assert!(set_config_value(&mut config, "ui.skin", "dracula").is_err());
        assert!(get_config_value(&config, "readOnly").is_err());
    }
}
