//! CLI argument parsing with clap.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "ip-guard")]
#[command(author, version, about = "IP allow/deny gate and rule administration")]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Config file path (default: ./ip-guard.toml if present)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Verbose mode (debug output)
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Debug, PartialEq, Eq, Subcommand)]
pub enum Commands {
    /// Run the HTTP server behind the IP guard
    Serve,

    #[command(flatten)]
    Admin(AdminCommand),
}

/// Rule administration. Arguments the action needs are checked when it runs,
/// so a missing one is reported like any other failure.
#[derive(Debug, Clone, PartialEq, Eq, Subcommand)]
pub enum AdminCommand {
    /// Add an address, CIDR block or wildcard pattern to a list
    Add {
        /// whitelist or blacklist
        #[arg(value_name = "TYPE")]
        kind: Option<String>,
        ip: Option<String>,
        /// Free-text label stored with the rule
        #[arg(short, long)]
        description: Option<String>,
    },

    /// Remove a pattern from a list
    Remove {
        #[arg(value_name = "TYPE")]
        kind: Option<String>,
        ip: Option<String>,
    },

    /// List rules, active and inactive
    List {
        #[arg(value_name = "TYPE")]
        kind: Option<String>,
    },

    /// Delete every rule of a list, or of both lists
    Clear {
        #[arg(value_name = "TYPE")]
        kind: Option<String>,
    },

    /// Show rule counts
    Stats,

    /// Activate or deactivate a rule
    Toggle {
        #[arg(long)]
        id: Option<i64>,
    },

    /// Add every pattern of a file (one per line, # comments allowed)
    Import {
        #[arg(value_name = "TYPE")]
        kind: Option<String>,
        file: Option<PathBuf>,
        #[arg(short, long)]
        description: Option<String>,
    },

    /// Show what the guard would decide for an address
    Check {
        /// IP address to check
        ip: String,
    },
}
