//! Membership Exit Procedure
//!
//! Stops Group Replication on a member that is still part of a group and
//! clears the settings that would make it rejoin or bootstrap on restart.

use serde::Serialize;

use super::lifecycle::stop_group_replication;
use super::member_state::{get_member_state, MemberState};
use super::BOOTSTRAP_GROUP_VAR;
use crate::config::{Config, ConfigScope};
use crate::errors::GrResult;
use crate::instance::{Instance, VarScope};
use crate::observability::{log_event, Event, ObservationScope};

const START_ON_BOOT_VAR: &str = "group_replication_start_on_boot";
const PERSISTED_GLOBALS_LOAD_VAR: &str = "persisted_globals_load";

/// Reset to their defaults when leaving
const RESET_VARS: &[&str] = &[
    BOOTSTRAP_GROUP_VAR,
    "group_replication_force_members",
    "group_replication_group_seeds",
    "group_replication_local_address",
];

/// What `leave_replicaset` did
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LeaveOutcome {
    /// STOP GROUP_REPLICATION was issued
    pub stopped: bool,
    /// State read back after the stop
    pub state_after: Option<MemberState>,
    /// The cleared settings survive a restart
    pub persisted: bool,
    /// Follow-up the operator has to do by hand
    pub warnings: Vec<String>,
}

/// Take `instance` out of its group.
///
/// `config` is only used on servers without `SET PERSIST`, to carry
/// `start_on_boot=OFF` and the cleared settings into the option file.
pub fn leave_replicaset(
    instance: &dyn Instance,
    config: Option<&mut dyn Config>,
) -> GrResult<LeaveOutcome> {
    let endpoint = instance.get_connection_endpoint();
    let scope = ObservationScope::with_fields("GR_LEAVE", &[("instance", &endpoint)]);

    match leave_steps(instance, config, &endpoint) {
        Ok(outcome) => {
            scope.complete_with_fields(&[
                ("stopped", if outcome.stopped { "true" } else { "false" }),
                ("persisted", if outcome.persisted { "true" } else { "false" }),
            ]);
            Ok(outcome)
        }
        Err(e) => {
            scope.fail(&e.to_string());
            Err(e)
        }
    }
}

fn leave_steps(
    instance: &dyn Instance,
    config: Option<&mut dyn Config>,
    endpoint: &str,
) -> GrResult<LeaveOutcome> {
    let mut outcome = LeaveOutcome::default();

    let state = get_member_state(instance)?;
    if matches!(state, MemberState::Offline | MemberState::NotFound) {
        log_event(Event::LeaveStopSkipped, endpoint, &[("state", state.as_str())]);
    } else {
        stop_group_replication(instance)?;
        outcome.stopped = true;

        let after = get_member_state(instance)?;
        log_event(Event::LeaveStateAfterStop, endpoint, &[("state", after.as_str())]);
        outcome.state_after = Some(after);
    }

    let can_persist = instance.get_version().supports_persist();
    let var_scope = if can_persist {
        VarScope::Persist
    } else {
        VarScope::Global
    };

    instance.set_sysvar(START_ON_BOOT_VAR, "OFF", var_scope)?;
    for name in RESET_VARS {
        instance.set_sysvar_default(name, var_scope)?;
    }

    if can_persist {
        let load = instance.get_sysvar_bool(PERSISTED_GLOBALS_LOAD_VAR, VarScope::Global)?;
        if load == Some(false) {
            outcome.warnings.push(format!(
                "persisted_globals_load is OFF on '{}': the cleared Group Replication \
                 settings will not take effect on the next restart",
                endpoint
            ));
        } else {
            outcome.persisted = true;
        }
    } else {
        match config {
            Some(config) if config.has_option_file() => {
                config.write(START_ON_BOOT_VAR, "OFF", ConfigScope::ConfigFile)?;
                for name in RESET_VARS {
                    // an empty value is the compiled default for the address lists
                    let value = if *name == BOOTSTRAP_GROUP_VAR { "OFF" } else { "" };
                    config.write(name, value, ConfigScope::ConfigFile)?;
                }
                config.apply()?;
                outcome.persisted = true;
            }
            _ => outcome.warnings.push(format!(
                "set {}=OFF in the option file of '{}' so the instance does not \
                 rejoin the group on restart",
                START_ON_BOOT_VAR, endpoint
            )),
        }
    }

    for warning in &outcome.warnings {
        log_event(Event::ManualActionRequired, endpoint, &[("warning", warning)]);
    }
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{InstanceConfig, OptionFile, MYSQLD_SECTION};
    use crate::instance::Row;
    use crate::testing::FakeInstance;
    use crate::version::Version;

    const STATE_PATTERN: &str = "replication_group_member_stats";

    fn state_row(state: &str) -> Vec<Row> {
        vec![Row::new().with("MEMBER_STATE", state)]
    }

    #[test]
    fn test_online_member_is_stopped_and_persisted() {
        let instance = FakeInstance::new(Version::new(8, 0, 36))
            .with_query_result(STATE_PATTERN, state_row("ONLINE"))
            .with_query_result(STATE_PATTERN, state_row("OFFLINE"))
            .with_sysvar("persisted_globals_load", "ON");

        let outcome = leave_replicaset(&instance, None).unwrap();

        assert!(outcome.stopped);
        assert_eq!(outcome.state_after, Some(MemberState::Offline));
        assert!(outcome.persisted);
        assert!(outcome.warnings.is_empty());
        assert_eq!(instance.executed(), vec!["STOP GROUP_REPLICATION"]);
        assert_eq!(
            instance.sysvar_writes(),
            vec![(
                START_ON_BOOT_VAR.to_string(),
                "OFF".to_string(),
                VarScope::Persist
            )]
        );
        let defaults: Vec<(String, VarScope)> = RESET_VARS
            .iter()
            .map(|name| (name.to_string(), VarScope::Persist))
            .collect();
        assert_eq!(instance.default_writes(), defaults);
    }

    #[test]
    fn test_offline_member_skips_stop() {
        let instance = FakeInstance::new(Version::new(8, 0, 36))
            .with_query_result(STATE_PATTERN, state_row("OFFLINE"));

        let outcome = leave_replicaset(&instance, None).unwrap();
        assert!(!outcome.stopped);
        assert_eq!(outcome.state_after, None);
        assert!(instance.executed().is_empty());
    }

    #[test]
    fn test_unknown_member_skips_stop() {
        let instance = FakeInstance::new(Version::new(8, 0, 36));
        let outcome = leave_replicaset(&instance, None).unwrap();
        assert!(!outcome.stopped);
        assert_eq!(instance.default_writes().len(), RESET_VARS.len());
    }

    #[test]
    fn test_persisted_globals_load_off_warns() {
        let instance = FakeInstance::new(Version::new(8, 0, 36))
            .with_sysvar("persisted_globals_load", "OFF");
        let outcome = leave_replicaset(&instance, None).unwrap();
        assert!(!outcome.persisted);
        assert_eq!(outcome.warnings.len(), 1);
        assert!(outcome.warnings[0].contains("persisted_globals_load"));
    }

    #[test]
    fn test_legacy_server_without_option_file_warns() {
        let instance = FakeInstance::new(Version::new(5, 7, 44));
        let outcome = leave_replicaset(&instance, None).unwrap();

        assert!(!outcome.persisted);
        assert_eq!(outcome.warnings.len(), 1);
        assert_eq!(instance.sysvar_writes()[0].2, VarScope::Global);
        assert!(instance
            .default_writes()
            .iter()
            .all(|(_, scope)| *scope == VarScope::Global));
    }

    #[test]
    fn test_legacy_server_updates_option_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("my.cnf");
        let instance = FakeInstance::new(Version::new(5, 7, 44))
            .with_query_result(STATE_PATTERN, state_row("ONLINE"))
            .with_query_result(STATE_PATTERN, state_row("OFFLINE"));
        let mut config =
            InstanceConfig::with_option_file(&instance, OptionFile::open(&path).unwrap());

        let outcome = leave_replicaset(&instance, Some(&mut config)).unwrap();

        assert!(outcome.stopped);
        assert!(outcome.persisted);
        assert!(outcome.warnings.is_empty());
        let on_disk = OptionFile::open(&path).unwrap();
        assert_eq!(
            on_disk.get(MYSQLD_SECTION, START_ON_BOOT_VAR).as_deref(),
            Some("OFF")
        );
        assert_eq!(
            on_disk.get(MYSQLD_SECTION, BOOTSTRAP_GROUP_VAR).as_deref(),
            Some("OFF")
        );
    }

    #[test]
    fn test_legacy_server_clears_stale_addresses_in_option_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("my.cnf");
        std::fs::write(
            &path,
            "[mysqld]\n\
             group_replication_group_seeds = db1:33061,db2:33061\n\
             group_replication_local_address = db3:33061\n\
             group_replication_force_members = db3:33061\n",
        )
        .unwrap();
        let instance = FakeInstance::new(Version::new(5, 7, 44));
        let mut config =
            InstanceConfig::with_option_file(&instance, OptionFile::open(&path).unwrap());

        let outcome = leave_replicaset(&instance, Some(&mut config)).unwrap();
        assert!(outcome.persisted);

        let on_disk = OptionFile::open(&path).unwrap();
        for name in &RESET_VARS[1..] {
            assert_eq!(on_disk.get(MYSQLD_SECTION, name).as_deref(), Some(""), "{}", name);
        }
    }

    #[test]
    fn test_stop_failure_propagates() {
        let instance = FakeInstance::new(Version::new(8, 0, 36))
            .with_query_result(STATE_PATTERN, state_row("ONLINE"))
            .failing_execute(
                "STOP GROUP_REPLICATION",
                crate::instance::SessionError::server(3093, "stop failed"),
            );
        assert!(leave_replicaset(&instance, None).is_err());
        assert!(instance.sysvar_writes().is_empty());
    }
}
