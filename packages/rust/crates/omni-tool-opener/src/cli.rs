use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "omni-tool-opener")]
#[command(about = "Open a workspace tool in the browser and close it again after N seconds.")]
pub(crate) struct Cli {
    /// Override config directory (settings at `<conf>/omni-tool-opener/settings.yaml`).
    #[arg(long, global = true)]
    pub(crate) conf: Option<PathBuf>,

    /// Debug logging for this crate (ignored when RUST_LOG is set).
    #[arg(long, short, global = true)]
    pub(crate) verbose: bool,

    #[command(subcommand)]
    pub(crate) command: Command,
}

#[derive(Subcommand)]
pub(crate) enum Command {
    /// Run HTTP server (POST /api/open-tool). Default bind: 127.0.0.1:5005
    Gateway {
        /// Listen address (default: settings `gateway.bind`, else 127.0.0.1:5005)
        #[arg(long)]
        bind: Option<String>,

        /// Max jobs running at once (default: settings `jobs.max_in_flight`, else 16)
        #[arg(long)]
        max_in_flight: Option<usize>,

        /// Longest allowed duration in seconds (default: settings `jobs.max_duration_secs`, else 3600)
        #[arg(long)]
        max_duration: Option<u64>,
    },
    /// Open one tool, wait until it is closed again, print the final status as JSON.
    Open {
        /// Catalog name (e.g. gmail, calendar, notion, tasks).
        #[arg(long)]
        tool: String,

        /// Seconds to keep the tool open (default: settings `jobs.default_duration_secs`, else 60)
        #[arg(long)]
        duration: Option<u64>,
    },
    /// Print the effective tool catalog.
    Tools,
}
