//! CLI command handling module
//!
//! Handles all CLI subcommands and argument parsing.

mod commands;
mod logging;

pub use commands::{
    ConfigSubcommand, RefsArgs, SourceArgs, XrayArgs, handle_config_command,
    handle_refs_command, handle_xray_command,
};
pub use logging::init_logging;
