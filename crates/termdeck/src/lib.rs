//! termdeck driver library
//!
//! Command-line parsing, the configuration schema, and the tick runner used
//! by the `termdeck` binary. The binary itself is in main.rs.

pub mod cli;
pub mod runner;
pub mod schema;

// Re-export commonly used types
pub use cli::CliArgs;
pub use runner::{OverviewTile, RunStats, Runner};
pub use schema::config_schema;
