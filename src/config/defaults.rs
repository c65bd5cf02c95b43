//! Default configuration values

use super::schema::Config;

/// Get the default configuration
pub fn default_config() -> Config {
    Config::default()
}

/// Starter file written by `config init`
pub fn default_config_yaml() -> anyhow::Result<String> {
    use anyhow::Context;
    serde_yaml::to_string(&default_config()).context("Failed to serialize default configuration")
}
