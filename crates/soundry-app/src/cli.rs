//! Command-line flags for the `soundry` binary.

use std::path::PathBuf;

use clap::Parser;

/// Audio processing service.
#[derive(Debug, Clone, Parser)]
#[command(name = "soundry", version, about)]
pub struct Cli {
    /// YAML configuration file; `SOUNDRY_CONFIG` is consulted when omitted.
    #[arg(long, short = 'c', value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Print the effective configuration as YAML and exit.
    #[arg(long)]
    pub print_config: bool,
}
