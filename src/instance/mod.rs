//! Instance collaborator contract
//!
//! An `Instance` is one exclusive session to one MySQL server. The core
//! borrows it for a single call and never caches it. Implementations use
//! interior mutability; calls against one instance are never concurrent.

mod errors;

pub use errors::{SessionError, SessionResult};

use std::fmt;

use crate::version::Version;

/// Variable scope for reads and writes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VarScope {
    /// `SET GLOBAL` / `@@global.`
    Global,
    /// `SET SESSION` / `@@session.`
    Session,
    /// `SET PERSIST`; reads return the persisted value
    Persist,
    /// `SET PERSIST_ONLY`; reads return the persisted value
    PersistOnly,
}

impl VarScope {
    /// SQL keyword for `SET <scope> name = value`
    pub fn as_sql(&self) -> &'static str {
        match self {
            VarScope::Global => "GLOBAL",
            VarScope::Session => "SESSION",
            VarScope::Persist => "PERSIST",
            VarScope::PersistOnly => "PERSIST_ONLY",
        }
    }
}

impl fmt::Display for VarScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_sql())
    }
}

/// One result row, columns addressed by name (case-insensitive)
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Row {
    columns: Vec<(String, Option<String>)>,
}

impl Row {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder: append a non-NULL column
    pub fn with(mut self, column: &str, value: impl Into<String>) -> Self {
        self.columns.push((column.to_string(), Some(value.into())));
        self
    }

    /// Builder: append a NULL column
    pub fn with_null(mut self, column: &str) -> Self {
        self.columns.push((column.to_string(), None));
        self
    }

    /// Column value; `None` for NULL or an unknown column
    pub fn get(&self, column: &str) -> Option<&str> {
        self.columns
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(column))
            .and_then(|(_, value)| value.as_deref())
    }

    /// Column value with NULL read as the empty string
    pub fn get_or_empty(&self, column: &str) -> &str {
        self.get(column).unwrap_or("")
    }
}

/// Statement-level access
pub trait Session {
    /// Run a query and return its rows
    fn query(&self, sql: &str) -> SessionResult<Vec<Row>>;

    /// Run a statement with no result set
    fn execute(&self, sql: &str) -> SessionResult<()>;
}

/// Outcome of a privilege check on one account
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserPrivileges {
    /// Account exists
    pub exists: bool,
    /// Comma separated privileges that are missing, empty when none
    pub missing_privileges: String,
    /// Account holds WITH GRANT OPTION on the checked object
    pub has_grant_option: bool,
}

impl UserPrivileges {
    /// Exists and holds every checked privilege
    pub fn is_complete(&self) -> bool {
        self.exists && self.missing_privileges.is_empty()
    }
}

/// One GRANT to issue when creating an account
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Grant {
    pub privileges: Vec<String>,
    /// `db.table` pattern, e.g. `*.*`
    pub on: String,
    pub grant_option: bool,
}

/// One server, one session
pub trait Instance {
    /// Statement-level access
    fn session(&self) -> &dyn Session;

    /// Read a system variable; `None` when unset or unknown
    fn get_sysvar_string(&self, name: &str, scope: VarScope) -> SessionResult<Option<String>>;

    /// Read a boolean system variable (`ON`/`OFF`/`1`/`0`)
    fn get_sysvar_bool(&self, name: &str, scope: VarScope) -> SessionResult<Option<bool>> {
        match self.get_sysvar_string(name, scope)? {
            None => Ok(None),
            Some(value) => parse_bool(&value).map(Some).ok_or_else(|| {
                SessionError::Protocol(format!("'{}' is not a boolean value for {}", value, name))
            }),
        }
    }

    /// Read an integer system variable
    fn get_sysvar_int(&self, name: &str, scope: VarScope) -> SessionResult<Option<i64>> {
        match self.get_sysvar_string(name, scope)? {
            None => Ok(None),
            Some(value) => value.trim().parse::<i64>().map(Some).map_err(|_| {
                SessionError::Protocol(format!("'{}' is not an integer value for {}", value, name))
            }),
        }
    }

    /// `SET <scope> name = value`
    fn set_sysvar(&self, name: &str, value: &str, scope: VarScope) -> SessionResult<()>;

    /// `SET <scope> name = DEFAULT`
    fn set_sysvar_default(&self, name: &str, scope: VarScope) -> SessionResult<()>;

    /// `PLUGIN_STATUS` from `information_schema.plugins`; `None` when absent
    fn get_plugin_status(&self, name: &str) -> SessionResult<Option<String>>;

    fn install_plugin(&self, name: &str) -> SessionResult<()>;

    fn uninstall_plugin(&self, name: &str) -> SessionResult<()>;

    /// Check `privileges` for `user@host` on `db.table`
    fn check_user(
        &self,
        user: &str,
        host: &str,
        privileges: &[&str],
        db: &str,
        table: &str,
    ) -> SessionResult<UserPrivileges>;

    fn create_user(
        &self,
        user: &str,
        host: &str,
        password: &str,
        grants: &[Grant],
    ) -> SessionResult<()>;

    fn get_version(&self) -> Version;

    /// `host:port`, for diagnostics only
    fn get_connection_endpoint(&self) -> String;
}

/// `ON`/`TRUE`/`1` and `OFF`/`FALSE`/`0`, case-insensitive
pub fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_uppercase().as_str() {
        "ON" | "TRUE" | "1" | "YES" => Some(true),
        "OFF" | "FALSE" | "0" | "NO" => Some(false),
        _ => None,
    }
}
