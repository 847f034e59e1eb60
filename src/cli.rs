use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::scan::ScanKind;

#[derive(Parser, Debug)]
#[command(name = "scan-snapshot")]
#[command(about = "Load domain-scan results into a dated, agency-attributed document store snapshot")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Create default configuration file at ./config/scan-snapshot.toml
    #[arg(long, global = true)]
    pub init: bool,

    /// Configuration file to use instead of ./config/scan-snapshot.toml
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Verbose logging (-v for per-stage detail, -vv for debug output)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Export run logs to a file
    #[arg(long, global = true, value_name = "PATH")]
    pub log_file: Option<PathBuf>,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Commands {
    /// Write a new snapshot of one scanner's results
    Load {
        /// Scanner whose results to load
        #[arg(value_enum)]
        kind: ScanKind,

        /// Results CSV to read (defaults to <results_dir>/<kind>.csv)
        #[arg(long, value_name = "FILE")]
        results: Option<PathBuf>,

        /// Do not write the unique-agency and clean-inventory exports
        #[arg(long)]
        skip_exports: bool,
    },

    /// Refresh the domain -> agency mapping collection from the inventory
    Domains,

    /// Print the current latest documents of a scanner's collection as JSON lines
    Latest {
        #[arg(value_enum)]
        kind: ScanKind,

        /// Only documents for this domain
        #[arg(short, long)]
        domain: Option<String>,
    },
}

impl Cli {
    pub fn validate(&self) -> Result<(), String> {
        if !self.init && self.command.is_none() {
            return Err("A command is required (load, domains or latest), or use --init".to_string());
        }

        if let Some(Commands::Latest { domain: Some(d), .. }) = &self.command {
            if d.trim().is_empty() {
                return Err("Domain cannot be empty".to_string());
            }
        }

        Ok(())
    }
}
