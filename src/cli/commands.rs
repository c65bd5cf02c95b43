//! CLI command handlers

use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use crate::config::{self, Config, ConfigLoader, paths};
use crate::dao::{KubeAccessor, MemoryAccessor, ResourceAccessor};
use crate::models::ResourceKind;
use crate::scan::{ScanParams, scan_for_refs, scan_for_sa_refs};
use crate::xray::XrayModel;

/// Configuration management subcommands
#[derive(Subcommand, Debug)]
pub enum ConfigSubcommand {
    /// Get configuration value
    Get {
        /// Configuration key (e.g., "defaultNamespace", "xray.scanTimeoutSecs")
        key: Option<String>,
    },
    /// Set configuration value
    Set {
        /// Configuration key (e.g., "defaultNamespace", "xray.scanTimeoutSecs")
        key: String,
        /// Configuration value
        value: String,
    },
    /// List all configuration
    List,
    /// Show configuration file path
    Path,
    /// Write a default configuration file if none exists
    Init,
    /// Validate configuration
    Validate,
}

/// Where objects are read from
#[derive(Args, Debug, Clone)]
pub struct SourceArgs {
    /// Read objects from a YAML/JSON manifest dump instead of the cluster
    #[arg(long, short = 'f', value_name = "FILE")]
    pub from_file: Option<PathBuf>,

    /// Kubeconfig context to use
    #[arg(long)]
    pub context: Option<String>,
}

/// Arguments of `kxray xray`
#[derive(Args, Debug)]
pub struct XrayArgs {
    /// Root resource kind (alias like `deploy` or a full `group/version/resource`)
    pub kind: String,

    /// Namespace to render; `all` for every namespace
    #[arg(long, short = 'n')]
    pub namespace: Option<String>,

    /// Search query: regex, `!regex` to invert, `-f text` for fuzzy
    #[arg(long)]
    pub filter: Option<String>,

    #[command(flatten)]
    pub source: SourceArgs,
}

/// Arguments of `kxray refs`
#[derive(Args, Debug)]
pub struct RefsArgs {
    /// Kind of the target object
    pub kind: String,

    /// Target object as `namespace/name`, or `name` when cluster scoped
    pub path: String,

    /// Look for workloads running as this service account
    #[arg(long)]
    pub sa: bool,

    #[command(flatten)]
    pub source: SourceArgs,
}

fn parse_kind(raw: &str) -> Result<ResourceKind> {
    if let Some(kind) = ResourceKind::from_alias(raw) {
        return Ok(kind);
    }
    if raw.contains('/') {
        return Ok(ResourceKind::from(raw));
    }
    Err(anyhow::anyhow!("Unknown resource kind: {}", raw))
}

async fn accessor(source: &SourceArgs) -> Result<Arc<dyn ResourceAccessor>> {
    if let Some(path) = source.from_file.as_deref() {
        let store = MemoryAccessor::load_file(path)?;
        tracing::debug!("Loaded {} objects from {}", store.len(), path.display());
        return Ok(Arc::new(store));
    }
    let client = crate::kube::create_client(source.context.as_deref()).await?;
    Ok(Arc::new(KubeAccessor::new(client)))
}

/// Token cancelled once the configured scan budget elapses
fn budget(config: &Config) -> CancellationToken {
    let token = CancellationToken::new();
    let deadline = Duration::from_secs(config.xray.scan_timeout_secs);
    let timer = token.clone();
    tokio::spawn(async move {
        tokio::select! {
            _ = tokio::time::sleep(deadline) => {
                tracing::debug!("Scan budget of {:?} elapsed", deadline);
                timer.cancel();
            }
            _ = timer.cancelled() => {}
        }
    });
    token
}

/// Build and print the dependency tree of a root kind
pub async fn handle_xray_command(args: XrayArgs, config: &Config) -> Result<()> {
    let kind = parse_kind(&args.kind)?;
    let namespace = crate::kube::resolve_namespace(
        args.namespace.as_deref(),
        &config.default_namespace,
    );
    let accessor = accessor(&args.source).await?;

    let mut model = XrayModel::new(kind.clone(), namespace)
        .with_show_completed(config.xray.show_completed);
    if let Some(q) = args.filter.as_deref() {
        model.set_query(q);
    }

    let budget = budget(config);
    model
        .refresh(accessor.as_ref(), budget.clone())
        .await
        .with_context(|| format!("Failed to render {}", kind))?;
    budget.cancel();

    match model.tree() {
        Some(tree) => print!("{}", tree.dump()),
        None => println!("No match for {}", model.query().unwrap_or_default()),
    }
    Ok(())
}

/// Print every workload referencing the target
pub async fn handle_refs_command(args: RefsArgs, config: &Config) -> Result<()> {
    let kind = if args.sa {
        ResourceKind::SERVICE_ACCOUNT
    } else {
        parse_kind(&args.kind)?
    };
    let accessor = accessor(&args.source).await?;
    let params = ScanParams::new(kind, args.path.as_str()).with_wait(config.xray.wait_for_sync);

    let budget = budget(config);
    let refs = if args.sa {
        scan_for_sa_refs(accessor, &params, &budget).await?
    } else {
        scan_for_refs(accessor, &params, &budget).await?
    };
    if budget.is_cancelled() {
        eprintln!("Scan budget elapsed, results may be partial");
    }
    budget.cancel();

    let mut lines: Vec<String> = refs.iter().map(ToString::to_string).collect();
    lines.sort();
    if lines.is_empty() {
        println!("No references to {}", args.path);
    }
    for line in lines {
        println!("{}", line);
    }
    Ok(())
}

/// Handle configuration subcommands
pub async fn handle_config_command(cmd: ConfigSubcommand) -> Result<()> {
    match cmd {
        ConfigSubcommand::Get { key } => {
            let config = ConfigLoader::load().context("Failed to load configuration")?;

            if let Some(key) = key {
                let value = config::get_config_value(&config, &key)?;
                println!("{}", value);
            } else {
                let yaml =
                    serde_yaml::to_string(&config).context("Failed to serialize configuration")?;
                print!("{}", yaml);
            }
        }
        ConfigSubcommand::Set { key, value } => {
            let mut config = ConfigLoader::load().unwrap_or_else(|e| {
                tracing::warn!("Starting from defaults: {:#}", e);
                ConfigLoader::load_defaults()
            });

            config::set_config_value(&mut config, &key, &value)
                .with_context(|| format!("Failed to set {} = {}", key, value))?;

            ConfigLoader::save_root(&config).context("Failed to save configuration")?;
            println!("Configuration saved");
        }
        ConfigSubcommand::List => {
            let config = ConfigLoader::load().context("Failed to load configuration")?;
            let yaml =
                serde_yaml::to_string(&config).context("Failed to serialize configuration")?;
            print!("{}", yaml);
        }
        ConfigSubcommand::Path => {
            println!("{}", paths::root_config_path().display());
        }
        ConfigSubcommand::Init => {
            let path = paths::root_config_path();
            if path.exists() {
                println!("Configuration already exists: {}", path.display());
                return Ok(());
            }
            if let Some(parent) = path.parent() {
                paths::ensure_dir(parent)
                    .with_context(|| format!("Failed to create {}", parent.display()))?;
            }
            std::fs::write(&path, config::default_config_yaml()?)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            println!("Configuration written to {}", path.display());
        }
        ConfigSubcommand::Validate => {
            ConfigLoader::validate().context("Configuration validation failed")?;
            println!("Configuration is valid");
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_kind() {
        assert_eq!(parse_kind("deploy").unwrap(), ResourceKind::DEPLOYMENT);
        assert_eq!(
            parse_kind("example.io/v1/widgets").unwrap(),
            ResourceKind::from("example.io/v1/widgets")
        );
        assert!(parse_kind("bozo").is_err());
    }

    #[tokio::test]
    async fn test_budget_elapses() {
        let mut config = Config::default();
        config.xray.scan_timeout_secs = 0;
        let token = budget(&config);
        tokio::time::timeout(Duration::from_secs(1), token.cancelled())
            .await
            .unwrap();
    }
}
