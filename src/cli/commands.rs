//! CLI command implementations
//!
//! Each command returns the `data` object of its response; `run` wraps it
//! and writes it out.

use serde_json::{json, Value};
use std::path::Path;

use crate::group_replication::{generate_group_name, to_member_state, LifecycleSettings};
use crate::version::{verify_compatible_replication_versions, Version};

use super::args::Command;
use super::errors::CliResult;
use super::io::{write_error, write_response};

/// Parse arguments, run the command, print the JSON response
pub fn run() -> CliResult<()> {
    let cli = super::args::Cli::parse_args();
    let result = match &cli.settings {
        Some(path) => apply_settings(path).map(|_| ()),
        None => Ok(()),
    }
    .and_then(|()| run_command(cli.command));

    match result {
        Ok(data) => write_response(data),
        Err(e) => {
            write_error(e.code_str(), e.message())?;
            Err(e)
        }
    }
}

/// Run the appropriate command based on CLI args
pub fn run_command(cmd: Command) -> CliResult<Value> {
    match cmd {
        Command::Compat { source, target } => compat(&source, &target),
        Command::GroupName => Ok(group_name()),
        Command::MemberState { state } => member_state(&state),
    }
}

/// Load a settings file and install its log level
pub fn apply_settings(path: &Path) -> CliResult<LifecycleSettings> {
    let settings = LifecycleSettings::load(path)?;
    settings.install_log_level();
    Ok(settings)
}

/// Compatibility verdict for `source` replicating to `target`
pub fn compat(source: &str, target: &str) -> CliResult<Value> {
    let source = Version::parse(source)?;
    let target = Version::parse(target)?;
    let verdict = verify_compatible_replication_versions(&source, &target)?;
    Ok(json!({
        "source": source.to_string(),
        "target": target.to_string(),
        "compatibility": verdict,
    }))
}

pub fn group_name() -> Value {
    json!({ "group_name": generate_group_name() })
}

/// Canonical spelling of a member state
pub fn member_state(state: &str) -> CliResult<Value> {
    let state = to_member_state(state)?;
    Ok(json!({
        "state": state,
        "active": state.is_active(),
    }))
}
