//! kxray - dependency trees and reference scans for Kubernetes resources

use anyhow::Result;
use clap::{Parser, Subcommand};

use kxray::cli::{self, ConfigSubcommand, RefsArgs, XrayArgs};
use kxray::config::{Config, ConfigLoader};

/// Dependency trees and reference scans for Kubernetes resources
#[derive(Parser, Debug)]
#[command(name = "kxray", version)]
#[command(about = "Dependency trees and reference scans for Kubernetes resources", long_about = None)]
struct Args {
    /// Enable debug logging
    #[arg(long, short = 'd', global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Render the dependency tree of every object of a kind
    Xray(XrayArgs),
    /// Find the workloads referencing an object
    Refs(RefsArgs),
    /// Configuration management
    Config {
        #[command(subcommand)]
        subcommand: ConfigSubcommand,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    match args.command {
        Command::Config { subcommand } => cli::handle_config_command(subcommand).await,
        Command::Xray(xray) => {
            let config = setup(args.debug);
            cli::handle_xray_command(xray, &config).await
        }
        Command::Refs(refs) => {
            let config = setup(args.debug);
            cli::handle_refs_command(refs, &config).await
        }
    }
}

/// Load configuration and start logging for the cluster commands
fn setup(debug: bool) -> Config {
    let config = ConfigLoader::load().unwrap_or_else(|e| {
        eprintln!("Ignoring configuration: {:#}", e);
        ConfigLoader::load_defaults()
    });

    if let Some(log_path) = cli::init_logging(debug, &config.logger.level) {
        eprintln!(
            "Debug logging enabled. Logs written to: {}",
            log_path.display()
        );
    }
    tracing::debug!(
        "Configuration loaded: defaultNamespace={}, scanTimeoutSecs={}",
        config.default_namespace,
        config.xray.scan_timeout_secs
    );
    config
}
