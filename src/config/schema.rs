//! Configuration schema definitions
//!
//! Defines the structure of the configuration file using serde.

use serde::{Deserialize, Serialize};

/// Root configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Namespace used when none is given; `all` or empty means every namespace
    #[serde(default = "default_namespace")]
    pub default_namespace: String,

    #[serde(default)]
    pub xray: XrayConfig,

    #[serde(default)]
    pub logger: LoggerConfig,
}

/// Tree building and scan settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct XrayConfig {
    /// Budget for one render or scan, in seconds
    #[serde(default = "default_scan_timeout")]
    pub scan_timeout_secs: u64,

    /// Ask the accessor for fresh reads during scans
    #[serde(default = "default_true")]
    pub wait_for_sync: bool,

    /// Keep branches running through completed pods
    #[serde(default = "default_true")]
    pub show_completed: bool,
}

/// Logger configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LoggerConfig {
    /// Filter used when RUST_LOG is unset
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_namespace() -> String {
    "default".to_string()
}

fn default_true() -> bool {
    true
}

fn default_scan_timeout() -> u64 {
    5
}

fn default_log_level() -> String {
    "debug".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_namespace: default_namespace(),
            xray: XrayConfig::default(),
            logger: LoggerConfig::default(),
        }
    }
}

impl Default for XrayConfig {
    fn default() -> Self {
        Self {
            scan_timeout_secs: default_scan_timeout(),
            wait_for_sync: default_true(),
            show_completed: default_true(),
        }
    }
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = Config::default();
        assert_eq!(config.default_namespace, "default");
        assert_eq!(config.xray.scan_timeout_secs, 5);
        assert!(config.xray.wait_for_sync);
        assert!(config.xray.show_completed);
        assert_eq!(config.logger.level, "debug");
    }

    #[test]
    fn test_config_serialization() {
        let yaml = serde_yaml::to_string(&Config::default()).unwrap();
        assert!(yaml.contains("defaultNamespace"));
        assert!(yaml.contains("scanTimeoutSecs"));
        assert!(yaml.contains("showCompleted"));
    }

    #[test]
    fn test_config_deserialization() {
        let yaml = r#"
defaultNamespace: kube-system
xray:
  scanTimeoutSecs: 12
  showCompleted: false
"#;
        let config: Config = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.default_namespace, "kube-system");
        assert_eq!(config.xray.scan_timeout_secs, 12);
        assert!(!config.xray.show_completed);
        assert!(config.xray.wait_for_sync);
        assert_eq!(config.logger.level, "debug");
    }
}
