//! Command-line arguments.

use std::path::PathBuf;

use clap::Parser;

/// Terminal session deck: opens PTY-backed terminals and keeps their
/// thumbnails and previews current until Ctrl-C.
///
/// Logging follows RUST_LOG, falling back to deck.log_level.
#[derive(Debug, Clone, Default, PartialEq, Eq, Parser)]
#[command(name = "termdeck", version)]
pub struct CliArgs {
    /// Load deck configuration from a YAML file
    #[arg(short, long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Number of terminals to open at startup
    #[arg(short = 'n', long, value_name = "N")]
    pub sessions: Option<usize>,

    /// Print the configuration JSON schema and exit
    #[arg(long)]
    pub schema: bool,
}
