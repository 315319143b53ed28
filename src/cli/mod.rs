//! Command-line interface.

use std::path::PathBuf;

use clap::{ArgAction, Parser};

pub mod commands;
pub mod output;

pub use commands::Commands;

/// Resolve skill selections against a skills matrix.
#[derive(Parser, Debug)]
#[command(name = "smx", version, about, long_about = None)]
pub struct Cli {
    /// Config file; replaces the global and project config files
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Matrix document to use instead of the configured one
    #[arg(long, global = true)]
    pub matrix: Option<PathBuf>,

    /// Additional skills directory (repeatable)
    #[arg(long = "skills-dir", global = true)]
    pub skills_dir: Vec<PathBuf>,

    /// Machine-readable JSON output
    #[arg(long, global = true)]
    pub robot: bool,

    /// Increase log verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress log output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}
