//! Command-line interface:
//! - Argument parsing (`args`)
//! - Command handlers (`commands`)
//! - Flag overrides on top of the file configuration (`config_builder`)

pub mod args;
pub mod commands;
pub mod config_builder;

pub use args::{Cli, Commands, OutputFormat, ScanArgs};
pub use commands::{
    handle_analyze_command, handle_clear_cache_command, handle_commit_message_command, run,
};
pub use config_builder::{apply_overrides, build_config};

/// Parse CLI arguments using Clap
pub fn parse_args() -> Cli {
    args::parse_args()
}
