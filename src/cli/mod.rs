//! CLI module for grprov
//!
//! Offline operator helpers; nothing here opens a server connection:
//! - compat: replication compatibility verdict for two versions
//! - group-name: fresh group name
//! - member-state: normalize a member state string

mod args;
mod commands;
mod errors;
mod io;

pub use args::{Cli, Command};
pub use commands::{apply_settings, compat, group_name, member_state, run, run_command};
pub use errors::{CliError, CliErrorCode, CliResult};
pub use io::{write_error, write_response};
