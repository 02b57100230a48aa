use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(
    name = "labelguard",
    version,
    about = "Cardinality patrol agent for Prometheus scrape configurations"
)]
pub struct Opts {
    /// Path to the YAML settings file; built-in defaults apply when omitted.
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub cmd: Option<Command>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the patrol daemon (the default when no subcommand is given).
    Run,
    /// Print every suppressed metric.label pair.
    List,
    /// Remove the silence rule recorded for a metric.label pair.
    Unsilence {
        /// Target in metric.label form, split on the first dot.
        target: String,
    },
}
