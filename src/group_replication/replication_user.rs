//! Replication User Provisioner
//!
//! The recovery account needs `REPLICATION SLAVE` on `*.*` and nothing else.
//! An empty host falls back to `LifecycleSettings::recovery_user_host`,
//! which is `%` unless configured.

use super::settings::LifecycleSettings;
use crate::errors::{GrError, GrResult};
use crate::instance::{Grant, Instance, UserPrivileges};
use crate::observability::{log_event, Event};

const REPLICATION_PRIVILEGE: &str = "REPLICATION SLAVE";

const RECOVERY_USER_SQL: &str = "SELECT USER_NAME \
     FROM performance_schema.replication_connection_configuration \
     WHERE CHANNEL_NAME = 'group_replication_recovery'";

fn account<'a>(
    user: &'a str,
    host: &'a str,
    settings: &'a LifecycleSettings,
) -> GrResult<(&'a str, &'a str)> {
    if user.is_empty() {
        return Err(GrError::validation("replication user name must not be empty"));
    }
    let host = if host.is_empty() {
        settings.recovery_user_host.as_str()
    } else {
        host
    };
    Ok((user, host))
}

/// Privilege check for `user@host`; an empty host means `%`
pub fn check_replication_user(
    instance: &dyn Instance,
    user: &str,
    host: &str,
) -> GrResult<UserPrivileges> {
    check_replication_user_with(instance, user, host, &LifecycleSettings::default())
}

/// `check_replication_user` with the default host taken from `settings`
pub fn check_replication_user_with(
    instance: &dyn Instance,
    user: &str,
    host: &str,
    settings: &LifecycleSettings,
) -> GrResult<UserPrivileges> {
    let (user, host) = account(user, host, settings)?;
    Ok(instance.check_user(user, host, &[REPLICATION_PRIVILEGE], "*", "*")?)
}

/// Create `user@host` with `REPLICATION SLAVE` on `*.*`, no grant option
pub fn create_replication_user(
    instance: &dyn Instance,
    user: &str,
    host: &str,
    password: &str,
) -> GrResult<()> {
    create_replication_user_with(instance, user, host, password, &LifecycleSettings::default())
}

/// `create_replication_user` with the default host taken from `settings`
pub fn create_replication_user_with(
    instance: &dyn Instance,
    user: &str,
    host: &str,
    password: &str,
    settings: &LifecycleSettings,
) -> GrResult<()> {
    let (user, host) = account(user, host, settings)?;
    let grants = [Grant {
        privileges: vec![REPLICATION_PRIVILEGE.to_string()],
        on: "*.*".to_string(),
        grant_option: false,
    }];

    instance.create_user(user, host, password, &grants)?;

    let account_name = format!("'{}'@'{}'", user, host);
    log_event(
        Event::ReplicationUserCreated,
        &instance.get_connection_endpoint(),
        &[("account", &account_name)],
    );
    Ok(())
}

/// User configured on the recovery channel, `None` when unset
pub fn get_recovery_user(instance: &dyn Instance) -> GrResult<Option<String>> {
    let rows = instance.session().query(RECOVERY_USER_SQL)?;
    Ok(rows
        .first()
        .and_then(|row| row.get("USER_NAME"))
        .filter(|user| !user.is_empty())
        .map(str::to_string))
}
