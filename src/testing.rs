//! In-memory collaborators for exercising the core without a server.
//!
//! `FakeInstance` keeps global and persisted variables in maps, answers
//! queries from scripted results matched by substring, records every call,
//! and fails statements on request. `CountingSleeper` replaces real sleeps
//! in the bootstrap read-only wait.

use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, VecDeque};
use std::time::Duration;

use crate::group_replication::Sleeper;
use crate::instance::{
    Grant, Instance, Row, Session, SessionError, SessionResult, UserPrivileges, VarScope,
};
use crate::version::Version;

/// A recorded `check_user` call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserCheckCall {
    pub user: String,
    pub host: String,
    pub privileges: Vec<String>,
    pub db: String,
    pub table: String,
}

/// A recorded `create_user` call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatedUser {
    pub user: String,
    pub host: String,
    pub password: String,
    pub grants: Vec<Grant>,
}

#[derive(Default)]
struct FakeState {
    globals: BTreeMap<String, String>,
    persisted: BTreeMap<String, String>,
    read_sequences: BTreeMap<String, VecDeque<String>>,
    sysvar_reads: Vec<String>,
    sysvar_writes: Vec<(String, String, VarScope)>,
    default_writes: Vec<(String, VarScope)>,
    plugin_status: Option<String>,
    plugin_status_after_install: Option<String>,
    plugin_calls: Vec<String>,
    query_results: Vec<(String, VecDeque<Vec<Row>>)>,
    queries: Vec<String>,
    executed: Vec<String>,
    execute_failures: BTreeMap<String, SessionError>,
    set_failures: BTreeMap<String, SessionError>,
    users: BTreeMap<(String, String), UserPrivileges>,
    user_checks: Vec<UserCheckCall>,
    created_users: Vec<CreatedUser>,
}

fn key(name: &str) -> String {
    name.to_ascii_lowercase()
}

/// Scriptable `Instance`
pub struct FakeInstance {
    version: Version,
    endpoint: String,
    state: RefCell<FakeState>,
}

impl FakeInstance {
    /// Fake server at `localhost:3306`; installing the plugin makes it ACTIVE
    pub fn new(version: Version) -> Self {
        let state = FakeState {
            plugin_status_after_install: Some("ACTIVE".to_string()),
            ..Default::default()
        };
        Self {
            version,
            endpoint: "localhost:3306".to_string(),
            state: RefCell::new(state),
        }
    }

    pub fn with_endpoint(mut self, endpoint: &str) -> Self {
        self.endpoint = endpoint.to_string();
        self
    }

    /// Global variable value
    pub fn with_sysvar(self, name: &str, value: &str) -> Self {
        self.state
            .borrow_mut()
            .globals
            .insert(key(name), value.to_string());
        self
    }

    /// Persisted variable value
    pub fn with_persisted(self, name: &str, value: &str) -> Self {
        self.state
            .borrow_mut()
            .persisted
            .insert(key(name), value.to_string());
        self
    }

    /// Successive global reads return `values` in order, then the last
    /// one forever. A later write replaces the sequence.
    pub fn with_sysvar_sequence(self, name: &str, values: &[&str]) -> Self {
        self.state.borrow_mut().read_sequences.insert(
            key(name),
            values.iter().map(|v| v.to_string()).collect(),
        );
        self
    }

    pub fn with_plugin_status(self, status: Option<&str>) -> Self {
        self.state.borrow_mut().plugin_status = status.map(str::to_string);
        self
    }

    /// Status the plugin reports after `install_plugin`
    pub fn with_plugin_status_after_install(self, status: Option<&str>) -> Self {
        self.state.borrow_mut().plugin_status_after_install = status.map(str::to_string);
        self
    }

    /// Queries containing `pattern` (case-insensitive) return `rows`.
    /// Registering the same pattern again queues another result; the last
    /// queued result repeats.
    pub fn with_query_result(self, pattern: &str, rows: Vec<Row>) -> Self {
        {
            let mut state = self.state.borrow_mut();
            let pattern = pattern.to_ascii_lowercase();
            match state.query_results.iter_mut().find(|(p, _)| *p == pattern) {
                Some((_, queue)) => queue.push_back(rows),
                None => state.query_results.push((pattern, VecDeque::from([rows]))),
            }
        }
        self
    }

    /// `execute(sql)` fails with `error`
    pub fn failing_execute(self, sql: &str, error: SessionError) -> Self {
        self.state
            .borrow_mut()
            .execute_failures
            .insert(sql.to_ascii_uppercase(), error);
        self
    }

    /// `set_sysvar(name, value, _)` fails with `error`
    pub fn failing_set(self, name: &str, value: &str, error: SessionError) -> Self {
        self.state
            .borrow_mut()
            .set_failures
            .insert(format!("{}={}", key(name), value.to_ascii_uppercase()), error);
        self
    }

    /// Account with the given privilege check outcome
    pub fn with_user(self, user: &str, host: &str, privileges: UserPrivileges) -> Self {
        self.state
            .borrow_mut()
            .users
            .insert((user.to_string(), host.to_string()), privileges);
        self
    }

    pub fn executed(&self) -> Vec<String> {
        self.state.borrow().executed.clone()
    }

    pub fn queries(&self) -> Vec<String> {
        self.state.borrow().queries.clone()
    }

    /// Names of variables read at GLOBAL or SESSION scope, in order
    pub fn sysvar_reads(&self) -> Vec<String> {
        self.state.borrow().sysvar_reads.clone()
    }

    pub fn sysvar_writes(&self) -> Vec<(String, String, VarScope)> {
        self.state.borrow().sysvar_writes.clone()
    }

    pub fn default_writes(&self) -> Vec<(String, VarScope)> {
        self.state.borrow().default_writes.clone()
    }

    /// `INSTALL` / `UNINSTALL`, in order
    pub fn plugin_calls(&self) -> Vec<String> {
        self.state.borrow().plugin_calls.clone()
    }

    pub fn user_checks(&self) -> Vec<UserCheckCall> {
        self.state.borrow().user_checks.clone()
    }

    pub fn created_users(&self) -> Vec<CreatedUser> {
        self.state.borrow().created_users.clone()
    }

    /// Current global value
    pub fn global(&self, name: &str) -> Option<String> {
        self.state.borrow().globals.get(&key(name)).cloned()
    }

    /// Current persisted value
    pub fn persisted(&self, name: &str) -> Option<String> {
        self.state.borrow().persisted.get(&key(name)).cloned()
    }
}

impl Session for FakeInstance {
    fn query(&self, sql: &str) -> SessionResult<Vec<Row>> {
        let mut state = self.state.borrow_mut();
        state.queries.push(sql.to_string());

        let lowered = sql.to_ascii_lowercase();
        let matched = state
            .query_results
            .iter_mut()
            .find(|(pattern, _)| lowered.contains(pattern.as_str()));

        Ok(match matched {
            Some((_, queue)) if queue.len() > 1 => queue.pop_front().unwrap_or_default(),
            Some((_, queue)) => queue.front().cloned().unwrap_or_default(),
            None => Vec::new(),
        })
    }

    fn execute(&self, sql: &str) -> SessionResult<()> {
        let mut state = self.state.borrow_mut();
        state.executed.push(sql.to_string());
        match state.execute_failures.get(&sql.to_ascii_uppercase()) {
            Some(error) => Err(error.clone()),
            None => Ok(()),
        }
    }
}

impl Instance for FakeInstance {
    fn session(&self) -> &dyn Session {
        self
    }

    fn get_sysvar_string(&self, name: &str, scope: VarScope) -> SessionResult<Option<String>> {
        let mut state = self.state.borrow_mut();
        let name = key(name);
        match scope {
            VarScope::Global | VarScope::Session => {
                state.sysvar_reads.push(name.clone());
                if let Some(queue) = state.read_sequences.get_mut(&name) {
                    let value = if queue.len() > 1 {
                        queue.pop_front()
                    } else {
                        queue.front().cloned()
                    };
                    if value.is_some() {
                        return Ok(value);
                    }
                }
                Ok(state.globals.get(&name).cloned())
            }
            VarScope::Persist | VarScope::PersistOnly => Ok(state.persisted.get(&name).cloned()),
        }
    }

    fn set_sysvar(&self, name: &str, value: &str, scope: VarScope) -> SessionResult<()> {
        let mut state = self.state.borrow_mut();
        let name = key(name);
        if let Some(error) = state
            .set_failures
            .get(&format!("{}={}", name, value.to_ascii_uppercase()))
        {
            return Err(error.clone());
        }

        state
            .sysvar_writes
            .push((name.clone(), value.to_string(), scope));
        if scope != VarScope::PersistOnly {
            state.read_sequences.remove(&name);
            state.globals.insert(name.clone(), value.to_string());
        }
        if matches!(scope, VarScope::Persist | VarScope::PersistOnly) {
            state.persisted.insert(name, value.to_string());
        }
        Ok(())
    }

    fn set_sysvar_default(&self, name: &str, scope: VarScope) -> SessionResult<()> {
        let mut state = self.state.borrow_mut();
        let name = key(name);
        state.default_writes.push((name.clone(), scope));
        if scope != VarScope::PersistOnly {
            state.read_sequences.remove(&name);
            state.globals.remove(&name);
        }
        if matches!(scope, VarScope::Persist | VarScope::PersistOnly) {
            state.persisted.remove(&name);
        }
        Ok(())
    }

    fn get_plugin_status(&self, _name: &str) -> SessionResult<Option<String>> {
        Ok(self.state.borrow().plugin_status.clone())
    }

    fn install_plugin(&self, _name: &str) -> SessionResult<()> {
        let mut state = self.state.borrow_mut();
        state.plugin_calls.push("INSTALL".to_string());
        state.plugin_status = state.plugin_status_after_install.clone();
        Ok(())
    }

    fn uninstall_plugin(&self, _name: &str) -> SessionResult<()> {
        let mut state = self.state.borrow_mut();
        state.plugin_calls.push("UNINSTALL".to_string());
        state.plugin_status = None;
        Ok(())
    }

    fn check_user(
        &self,
        user: &str,
        host: &str,
        privileges: &[&str],
        db: &str,
        table: &str,
    ) -> SessionResult<UserPrivileges> {
        let mut state = self.state.borrow_mut();
        state.user_checks.push(UserCheckCall {
            user: user.to_string(),
            host: host.to_string(),
            privileges: privileges.iter().map(|p| p.to_string()).collect(),
            db: db.to_string(),
            table: table.to_string(),
        });
        Ok(state
            .users
            .get(&(user.to_string(), host.to_string()))
            .cloned()
            .unwrap_or_else(|| UserPrivileges {
                exists: false,
                missing_privileges: privileges.join(", "),
                has_grant_option: false,
            }))
    }

    fn create_user(
        &self,
        user: &str,
        host: &str,
        password: &str,
        grants: &[Grant],
    ) -> SessionResult<()> {
        let mut state = self.state.borrow_mut();
        let account = (user.to_string(), host.to_string());
        if state.users.contains_key(&account) {
            return Err(SessionError::server(
                1396,
                format!("Operation CREATE USER failed for '{}'@'{}'", user, host),
            ));
        }
        state.created_users.push(CreatedUser {
            user: user.to_string(),
            host: host.to_string(),
            password: password.to_string(),
            grants: grants.to_vec(),
        });
        state.users.insert(
            account,
            UserPrivileges {
                exists: true,
                missing_privileges: String::new(),
                has_grant_option: grants.iter().any(|g| g.grant_option),
            },
        );
        Ok(())
    }

    fn get_version(&self) -> Version {
        self.version.clone()
    }

    fn get_connection_endpoint(&self) -> String {
        self.endpoint.clone()
    }
}

/// `Sleeper` that only counts
#[derive(Debug, Default)]
pub struct CountingSleeper {
    sleeps: Cell<u32>,
    total: Cell<Duration>,
}

impl CountingSleeper {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sleeps(&self) -> u32 {
        self.sleeps.get()
    }

    pub fn total(&self) -> Duration {
        self.total.get()
    }
}

impl Sleeper for CountingSleeper {
    fn sleep(&self, duration: Duration) {
        self.sleeps.set(self.sleeps.get() + 1);
        self.total.set(self.total.get() + duration);
    }
}
