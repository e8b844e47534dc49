//! CLI argument definitions using clap
//!
//! Commands:
//! - grprov compat --source <version> --target <version>
//! - grprov group-name
//! - grprov member-state <state>

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// grprov - Group Replication provisioning helpers
#[derive(Parser, Debug)]
#[command(name = "grprov")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// JSON settings file; its log_level becomes the log threshold
    #[arg(long, global = true)]
    pub settings: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Command {
    /// Can a member on --source replicate to a member on --target
    Compat {
        /// Version of the sending member, e.g. 8.0.36
        #[arg(long)]
        source: String,

        /// Version of the receiving member
        #[arg(long)]
        target: String,
    },

    /// Print a fresh group name
    GroupName,

    /// Normalize a member state string (case-insensitive)
    MemberState {
        /// State as reported by the server, e.g. online
        state: String,
    },
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}
