//! omni-tool-opener CLI: gateway, one-shot open, or catalog listing.
//!
//! Settings from `packages/conf/settings.yaml` and `<config home>/omni-tool-opener/settings.yaml`.
//!
//! Logging: set `RUST_LOG=omni_tool_opener=info` (or `warn`, `debug`) to see logs on stderr.

mod cli;
mod nodes;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use omni_tool_opener::{load_runtime_settings, set_config_home_override};

use crate::cli::{Cli, Command};
use crate::nodes::{run_gateway_mode, run_open_mode, run_tools_mode};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    if let Some(conf_dir) = cli.conf.clone() {
        set_config_home_override(conf_dir);
    }

    // Initialize tracing: RUST_LOG overrides; --verbose => debug; else info
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(if cli.verbose {
            "omni_tool_opener=debug"
        } else {
            "omni_tool_opener=info"
        })
    });
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();

    let runtime_settings = load_runtime_settings();

    match cli.command {
        Command::Gateway {
            bind,
            max_in_flight,
            max_duration,
        } => run_gateway_mode(bind, max_in_flight, max_duration, &runtime_settings).await,
        Command::Open { tool, duration } => run_open_mode(&tool, duration, &runtime_settings).await,
        Command::Tools => run_tools_mode(&runtime_settings),
    }
}
