//! Config collaborator
//!
//! A `Config` stages setting changes and applies them in one step. Each
//! change targets a scope: the running server, the server's persisted
//! variable store, or the option file.
//!
//! Two building blocks are provided:
//! - `OptionFile`: a my.cnf editor that keeps unrelated lines intact
//! - `InstanceConfig`: routes RUNTIME and PERSISTED writes to an `Instance`
//!   and CONFIG_FILE writes to an optional `OptionFile`

mod instance_config;
mod option_file;

pub use instance_config::InstanceConfig;
pub use option_file::{OptionFile, MYSQLD_SECTION};

use serde::Serialize;
use std::fmt;

use crate::errors::GrResult;

/// Where a setting change lands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConfigScope {
    /// `SET GLOBAL`, lost on restart
    Runtime,
    /// `SET PERSIST` / `SET PERSIST_ONLY`
    Persisted,
    /// The server's option file
    ConfigFile,
}

impl ConfigScope {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConfigScope::Runtime => "RUNTIME",
            ConfigScope::Persisted => "PERSISTED",
            ConfigScope::ConfigFile => "CONFIG_FILE",
        }
    }
}

impl fmt::Display for ConfigScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Option-file and server setting handler
pub trait Config {
    /// Value held by the option file; `None` when there is no option file
    /// or the variable is not in it.
    fn read(&self, variable: &str) -> GrResult<Option<String>>;

    /// Stage a change. Nothing reaches the server or disk before `apply`.
    fn write(&mut self, variable: &str, value: &str, scope: ConfigScope) -> GrResult<()>;

    /// Apply every staged change in the order it was written
    fn apply(&mut self) -> GrResult<()>;

    /// Whether CONFIG_FILE writes can be honoured
    fn has_option_file(&self) -> bool;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scope_names() {
        assert_eq!(ConfigScope::Runtime.as_str(), "RUNTIME");
        assert_eq!(ConfigScope::ConfigFile.to_string(), "CONFIG_FILE");
        assert_eq!(
            serde_json::to_string(&ConfigScope::Persisted).unwrap(),
            "\"PERSISTED\""
        );
    }
}
