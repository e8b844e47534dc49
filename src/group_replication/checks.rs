//! Configuration Validator & Remediator
//!
//! `check_instance_config` lists every setting that keeps an instance from
//! joining a group; `configure_instance` writes the required values in the
//! scope each entry names. Running the check again after a successful
//! configure returns an empty list: restart-only settings count as
//! satisfied once their new value is persisted or in the option file.

use rand::Rng;
use serde::Serialize;

use crate::config::{Config, ConfigScope};
use crate::errors::{GrError, GrResult};
use crate::instance::{parse_bool, Instance, VarScope};
use crate::observability::{log_event, Event};
use crate::version::Version;

/// Placeholder required value for `server_id`; the remediator picks one
pub const UNIQUE_SERVER_ID: &str = "<unique ID>";

const NOT_SET: &str = "<not set>";
const SERVER_ID_VAR: &str = "server_id";

const GR_VARIABLES_SQL: &str = "SELECT VARIABLE_NAME, VARIABLE_VALUE \
     FROM performance_schema.global_variables \
     WHERE VARIABLE_NAME LIKE 'group\\_replication\\_%'";

/// Settings that only change with a server restart
const RESTART_ONLY: &[&str] = &[
    "enforce_gtid_consistency",
    "gtid_mode",
    "log_slave_updates",
    "log_replica_updates",
    "master_info_repository",
    "relay_log_info_repository",
];

const REPLICA_TERMINOLOGY_VERSION: Version = Version::new(8, 0, 26);

/// Whether a new value for `variable` only takes effect after a restart
pub fn requires_restart(variable: &str) -> bool {
    RESTART_ONLY
        .iter()
        .any(|name| name.eq_ignore_ascii_case(variable))
}

/// A setting whose value does not satisfy Group Replication
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InvalidConfig {
    pub name: String,
    pub current_value: String,
    pub required_value: String,
    pub scope: ConfigScope,
    pub restart_required: bool,
}

impl InvalidConfig {
    fn new(
        name: &str,
        current: Option<String>,
        required: &str,
        scope: ConfigScope,
        restart_required: bool,
    ) -> Self {
        Self {
            name: name.to_string(),
            current_value: current.unwrap_or_else(|| NOT_SET.to_string()),
            required_value: required.to_string(),
            scope,
            restart_required,
        }
    }
}

struct Requirement {
    name: &'static str,
    required: &'static str,
}

impl Requirement {
    fn new(name: &'static str, required: &'static str) -> Self {
        Self { name, required }
    }

    fn dynamic(&self) -> bool {
        !requires_restart(self.name)
    }
}

/// `replica_*` from 8.0.26 on, `slave_*` before
fn replica_name(version: &Version, replica: &'static str, slave: &'static str) -> &'static str {
    if *version >= REPLICA_TERMINOLOGY_VERSION {
        replica
    } else {
        slave
    }
}

fn parallel_workers_var(version: &Version) -> &'static str {
    replica_name(version, "replica_parallel_workers", "slave_parallel_workers")
}

fn requirements(version: &Version, parallel_applier: bool) -> Vec<Requirement> {
    let mut requirements = vec![
        Requirement::new("binlog_format", "ROW"),
        Requirement::new("enforce_gtid_consistency", "ON"),
        Requirement::new("gtid_mode", "ON"),
        Requirement::new(
            replica_name(version, "log_replica_updates", "log_slave_updates"),
            "ON",
        ),
    ];

    if *version < Version::new(8, 0, 21) {
        requirements.push(Requirement::new("binlog_checksum", "NONE"));
    }
    if *version < Version::new(8, 0, 23) {
        requirements.push(Requirement::new("master_info_repository", "TABLE"));
        requirements.push(Requirement::new("relay_log_info_repository", "TABLE"));
    }
    if *version < REPLICA_TERMINOLOGY_VERSION {
        requirements.push(Requirement::new("transaction_write_set_extraction", "XXHASH64"));
    }

    if parallel_applier {
        if *version < Version::new(8, 3, 0) {
            requirements.push(Requirement::new(
                replica_name(version, "replica_parallel_type", "slave_parallel_type"),
                "LOGICAL_CLOCK",
            ));
        }
        requirements.push(Requirement::new(
            replica_name(
                version,
                "replica_preserve_commit_order",
                "slave_preserve_commit_order",
            ),
            "ON",
        ));
        if *version >= Version::new(8, 0, 1) && *version < Version::new(8, 4, 0) {
            requirements.push(Requirement::new(
                "binlog_transaction_dependency_tracking",
                "WRITESET",
            ));
        }
    }

    requirements
}

fn normalize_value(value: &str) -> String {
    match parse_bool(value) {
        Some(true) => "ON".to_string(),
        Some(false) => "OFF".to_string(),
        None => value.trim().to_ascii_uppercase(),
    }
}

fn value_matches(value: Option<&str>, required: &str) -> bool {
    value.is_some_and(|v| normalize_value(v) == normalize_value(required))
}

/// 0 disables replication and 1 is the compiled default every fresh
/// server shares; neither identifies a member.
fn server_id_valid(value: Option<&str>) -> bool {
    value
        .and_then(|v| v.trim().parse::<u64>().ok())
        .is_some_and(|id| id > 1)
}

/// Scope for fixing a value the running server holds
fn server_scope(can_persist: bool, dynamic: bool) -> ConfigScope {
    if can_persist {
        ConfigScope::Persisted
    } else if dynamic {
        ConfigScope::Runtime
    } else {
        ConfigScope::ConfigFile
    }
}

fn check_server_id(
    instance: &dyn Instance,
    config: &dyn Config,
    can_persist: bool,
    invalid: &mut Vec<InvalidConfig>,
) -> GrResult<()> {
    let current = instance.get_sysvar_string(SERVER_ID_VAR, VarScope::Global)?;
    if !server_id_valid(current.as_deref()) {
        invalid.push(InvalidConfig::new(
            SERVER_ID_VAR,
            current,
            UNIQUE_SERVER_ID,
            server_scope(can_persist, true),
            false,
        ));
    }

    if config.has_option_file() {
        let file_value = config.read(SERVER_ID_VAR)?;
        if !server_id_valid(file_value.as_deref()) {
            invalid.push(InvalidConfig::new(
                SERVER_ID_VAR,
                file_value,
                UNIQUE_SERVER_ID,
                ConfigScope::ConfigFile,
                false,
            ));
        }
    }
    Ok(())
}

fn check_requirement(
    instance: &dyn Instance,
    config: &dyn Config,
    requirement: &Requirement,
    can_persist: bool,
    invalid: &mut Vec<InvalidConfig>,
) -> GrResult<()> {
    let name = requirement.name;
    let required = requirement.required;
    let dynamic = requirement.dynamic();

    let current = instance.get_sysvar_string(name, VarScope::Global)?;
    if !value_matches(current.as_deref(), required) {
        // A restart-only value that is already staged for the next boot
        // is not reported again.
        let pending = if dynamic {
            None
        } else if can_persist {
            instance.get_sysvar_string(name, VarScope::Persist)?
        } else {
            config.read(name)?
        };

        if !value_matches(pending.as_deref(), required) {
            invalid.push(InvalidConfig::new(
                name,
                current,
                required,
                server_scope(can_persist, dynamic),
                !dynamic,
            ));
        }
    }

    let file_entry_exists = invalid
        .iter()
        .any(|c| c.name == name && c.scope == ConfigScope::ConfigFile);
    if config.has_option_file() && !file_entry_exists {
        let file_value = config.read(name)?;
        if !value_matches(file_value.as_deref(), required) {
            invalid.push(InvalidConfig::new(
                name,
                file_value,
                required,
                ConfigScope::ConfigFile,
                false,
            ));
        }
    }
    Ok(())
}

/// Every setting that keeps `instance` from running Group Replication.
/// An empty list means the instance is ready.
pub fn check_instance_config(
    instance: &dyn Instance,
    config: &dyn Config,
) -> GrResult<Vec<InvalidConfig>> {
    let version = instance.get_version();
    let can_persist = version.supports_persist();
    let mut invalid = Vec::new();

    check_server_id(instance, config, can_persist, &mut invalid)?;

    let workers = instance
        .get_sysvar_int(parallel_workers_var(&version), VarScope::Global)?
        .unwrap_or(0);

    for requirement in requirements(&version, workers > 0) {
        check_requirement(instance, config, &requirement, can_persist, &mut invalid)?;
    }

    let endpoint = instance.get_connection_endpoint();
    for item in &invalid {
        log_event(
            Event::InvalidSetting,
            &endpoint,
            &[
                ("variable", &item.name),
                ("current", &item.current_value),
                ("required", &item.required_value),
                ("scope", item.scope.as_str()),
            ],
        );
    }
    Ok(invalid)
}

fn generate_server_id() -> String {
    rand::thread_rng().gen_range(2..=u32::MAX).to_string()
}

/// Apply every entry of `invalid_configs` through `config`. Returns true
/// when a restart is needed for the new values to take effect.
pub fn configure_instance(
    config: &mut dyn Config,
    invalid_configs: &[InvalidConfig],
) -> GrResult<bool> {
    if invalid_configs.is_empty() {
        return Ok(false);
    }

    if !config.has_option_file() {
        if let Some(item) = invalid_configs
            .iter()
            .find(|c| c.scope == ConfigScope::ConfigFile)
        {
            return Err(GrError::validation(format!(
                "'{}' can only be changed in the option file, but no option file was given",
                item.name
            )));
        }
    }

    // One id per call, so server and option file agree
    let mut server_id: Option<String> = None;
    for item in invalid_configs {
        let value = if item.required_value == UNIQUE_SERVER_ID {
            server_id.get_or_insert_with(generate_server_id).clone()
        } else {
            item.required_value.clone()
        };
        config.write(&item.name, &value, item.scope)?;
    }
    config.apply()?;

    Ok(invalid_configs.iter().any(|c| c.restart_required))
}

/// Copy the instance's Group Replication variables into the option file
/// so they survive a restart. Servers with `SET PERSIST` need nothing.
pub fn persist_gr_configurations(instance: &dyn Instance, config: &mut dyn Config) -> GrResult<()> {
    if instance.get_version().supports_persist() {
        return Ok(());
    }

    if !config.has_option_file() {
        return Err(GrError::validation(format!(
            "an option file is required to persist Group Replication settings of '{}'",
            instance.get_connection_endpoint()
        )));
    }

    for row in instance.session().query(GR_VARIABLES_SQL)? {
        let (Some(name), Some(value)) = (row.get("VARIABLE_NAME"), row.get("VARIABLE_VALUE"))
        else {
            continue;
        };
        config.write(name, value, ConfigScope::ConfigFile)?;
    }
    config.apply()
}
